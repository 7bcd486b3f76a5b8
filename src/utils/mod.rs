//! Configuration and time utilities

pub mod clock;
pub mod config;

pub use clock::{Clock, ManualClock, SystemClock, Timer};
pub use config::{
    AchievementConfig, ConfigError, ConfigurationManager, HostConfig, NavigationConfig,
    TrackerConfig, VoiceConfig,
};
