//! Physical constants and navigation defaults

/// Mean Earth radius used for great-circle distances (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance at which a route step counts as reached (meters)
pub const DEFAULT_PROXIMITY_THRESHOLD_M: f64 = 30.0;

/// Distance at which the next step is announced as approaching (meters)
pub const DEFAULT_APPROACHING_DISTANCE_M: f64 = 100.0;

/// Watch-position refresh interval, also used as the watch maximum age (ms)
pub const DEFAULT_UPDATE_INTERVAL_MS: u32 = 3000;

/// One-shot position request timeout (ms)
pub const ONE_SHOT_TIMEOUT_MS: u32 = 10_000;

/// Continuous watch timeout (ms)
pub const WATCH_TIMEOUT_MS: u32 = 30_000;

/// Pause between utterances when reading a whole route (ms)
pub const STEP_PAUSE_MS: u64 = 500;

/// Delay before the first queued achievement toast is shown (ms)
pub const ACHIEVEMENT_SHOW_DELAY_MS: u64 = 500;

/// Delay after a dismissed toast before the next one is shown (ms)
pub const ACHIEVEMENT_NEXT_DELAY_MS: u64 = 300;

/// Storage key of the persisted "seen" badge id array
pub const SEEN_ACHIEVEMENTS_KEY: &str = "vendhub-achievements-seen";

/// Default speech language tag
pub const DEFAULT_VOICE_LANGUAGE: &str = "ru-RU";

/// Step index meaning "no step reached / no active route"
pub const NO_STEP: i32 = -1;

/// Walking pace used to estimate travel time when none is reported (m/s)
pub const WALKING_SPEED_MPS: f64 = 1.4;
