//! Navigation components and their composition
//!
//! [`LocationTracker`], [`VoiceAnnouncer`] and [`AchievementQueue`] are
//! independent state machines driven by `process()` calls from the host's
//! event loop. [`RouteHost`] wires the first two to a map view.

pub mod achievements;
pub mod callback;
pub mod formatting;
pub mod route_host;
pub mod tracker;
pub mod types;
pub mod voice;

pub use achievements::AchievementQueue;
pub use callback::{Callback, CallbackHandle, CallbackRegistry};
pub use formatting::{arrival_text, format_distance, format_duration, route_start_text};
pub use route_host::{HostEvent, RouteHost};
pub use tracker::{LocationTracker, PermissionFuture};
pub use types::{
    AchievementReady, ApiError, ApiResult, ApproachingStep, SpeechError, StepChanged,
    TrackerEvent, TrackingError, TrackingErrorKind, TrackingState, VoiceEvent, VoiceState,
};
pub use voice::{VoiceAnnouncer, SPEECH_UNSUPPORTED_MESSAGE};
