use crate::core::{
    ACHIEVEMENT_NEXT_DELAY_MS, ACHIEVEMENT_SHOW_DELAY_MS, DEFAULT_APPROACHING_DISTANCE_M,
    DEFAULT_PROXIMITY_THRESHOLD_M, DEFAULT_UPDATE_INTERVAL_MS, DEFAULT_VOICE_LANGUAGE,
    ONE_SHOT_TIMEOUT_MS, SEEN_ACHIEVEMENTS_KEY, STEP_PAUSE_MS, WATCH_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Complete navigation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub tracker: TrackerConfig,
    pub voice: VoiceConfig,
    pub achievements: AchievementConfig,
    pub host: HostConfig,
}

/// Location tracker parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A step within this distance is reached (meters)
    pub proximity_threshold_m: f64,
    /// The next step within this distance is approaching (meters)
    pub approaching_distance_m: f64,
    /// Ask the platform for high-accuracy fixes
    pub enable_high_accuracy: bool,
    /// Timeout for the immediate one-shot fix (milliseconds)
    pub one_shot_timeout_ms: u32,
    /// Timeout for each watch delivery (milliseconds)
    pub watch_timeout_ms: u32,
    /// Watch refresh interval, also the maximum accepted fix age (milliseconds)
    pub update_interval_ms: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_m: DEFAULT_PROXIMITY_THRESHOLD_M,
            approaching_distance_m: DEFAULT_APPROACHING_DISTANCE_M,
            enable_high_accuracy: true,
            one_shot_timeout_ms: ONE_SHOT_TIMEOUT_MS,
            watch_timeout_ms: WATCH_TIMEOUT_MS,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

/// Voice announcer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// BCP 47 language tag used for utterances and voice selection
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Pause between utterances when reading the whole route (milliseconds)
    pub step_pause_ms: u64,
    /// Start enabled instead of waiting for the user to opt in
    pub enabled_by_default: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_VOICE_LANGUAGE.to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            step_pause_ms: STEP_PAUSE_MS,
            enabled_by_default: false,
        }
    }
}

/// Achievement queue parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementConfig {
    /// Key under which the seen badge ids are persisted
    pub storage_key: String,
    /// Delay before the first toast (milliseconds)
    pub show_delay_ms: u64,
    /// Delay after a dismissal before the next toast (milliseconds)
    pub next_delay_ms: u64,
}

impl Default for AchievementConfig {
    fn default() -> Self {
        Self {
            storage_key: SEEN_ACHIEVEMENTS_KEY.to_string(),
            show_delay_ms: ACHIEVEMENT_SHOW_DELAY_MS,
            next_delay_ms: ACHIEVEMENT_NEXT_DELAY_MS,
        }
    }
}

/// Route screen composition parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Distance from the route polyline that counts as off route (meters)
    pub off_route_threshold_m: f64,
    /// Distance from the destination that counts as arrived (meters)
    pub arrival_radius_m: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            off_route_threshold_m: 50.0,
            arrival_radius_m: DEFAULT_PROXIMITY_THRESHOLD_M,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("no file path set for saving configuration")]
    NoFilePath,
}

fn invalid(parameter: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// `false` for NaN as well as for zero and negatives
fn is_positive(value: f64) -> bool {
    value.partial_cmp(&0.0) == Some(Ordering::Greater)
}

impl NavigationConfig {
    /// Check every parameter, returning the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tracker;
        if !is_positive(t.proximity_threshold_m) {
            return Err(invalid("tracker.proximity_threshold_m", t.proximity_threshold_m, "must be positive"));
        }
        if t.approaching_distance_m < t.proximity_threshold_m {
            return Err(invalid(
                "tracker.approaching_distance_m",
                t.approaching_distance_m,
                "must not be below the proximity threshold",
            ));
        }
        if t.one_shot_timeout_ms == 0 {
            return Err(invalid("tracker.one_shot_timeout_ms", 0, "must be positive"));
        }
        if t.watch_timeout_ms == 0 {
            return Err(invalid("tracker.watch_timeout_ms", 0, "must be positive"));
        }

        let v = &self.voice;
        if v.language.trim().is_empty() {
            return Err(invalid("voice.language", "", "must not be empty"));
        }
        if !(0.1..=10.0).contains(&v.rate) {
            return Err(invalid("voice.rate", v.rate, "must be within 0.1..=10"));
        }
        if !(0.0..=2.0).contains(&v.pitch) {
            return Err(invalid("voice.pitch", v.pitch, "must be within 0..=2"));
        }
        if !(0.0..=1.0).contains(&v.volume) {
            return Err(invalid("voice.volume", v.volume, "must be within 0..=1"));
        }

        if self.achievements.storage_key.trim().is_empty() {
            return Err(invalid("achievements.storage_key", "", "must not be empty"));
        }

        let h = &self.host;
        if !is_positive(h.off_route_threshold_m) {
            return Err(invalid("host.off_route_threshold_m", h.off_route_threshold_m, "must be positive"));
        }
        if !is_positive(h.arrival_radius_m) {
            return Err(invalid("host.arrival_radius_m", h.arrival_radius_m, "must be positive"));
        }

        Ok(())
    }
}

/// Loads, validates and saves a [`NavigationConfig`] JSON file
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    config: NavigationConfig,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Replace the configuration after validation
    pub fn update_config(&mut self, config: NavigationConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;
        let config: NavigationConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!(path = %path_str, "navigation config loaded");
        self.config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(&self.config)?;

        fs::write(&path, content).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        debug!(path = %path_str, "navigation config saved");
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the file the configuration was loaded from
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::NoFilePath),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Change the step proximity threshold, returning the old value
    pub fn set_proximity_threshold(&mut self, threshold_m: f64) -> Result<f64, ConfigError> {
        let mut candidate = self.config.clone();
        candidate.tracker.proximity_threshold_m = threshold_m;
        candidate.validate()?;

        let old = self.config.tracker.proximity_threshold_m;
        self.config = candidate;
        self.is_modified = true;
        Ok(old)
    }

    /// Change the speech language, returning the old tag
    pub fn set_voice_language(&mut self, language: &str) -> Result<String, ConfigError> {
        let mut candidate = self.config.clone();
        candidate.voice.language = language.to_string();
        candidate.validate()?;

        let old = std::mem::replace(&mut self.config, candidate);
        self.is_modified = true;
        Ok(old.voice.language)
    }
}
