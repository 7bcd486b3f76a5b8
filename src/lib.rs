//! VendHub in-app navigation core
//!
//! Turn-by-turn walking guidance to a vending machine: GPS step tracking,
//! voice announcements, live map overlay and achievement toast sequencing.
//! Device capabilities are reached through the ports in [`platform`], so
//! every component runs unchanged against the scripted mocks.

pub mod core;
pub mod algorithms;
pub mod utils;
pub mod platform;
pub mod api;

// Re-export commonly used types
pub use core::{BadgeCategory, BadgeDefinition, Destination, GeoPoint, LocationSample, Route, RouteStep};
pub use algorithms::{distance_to_route_m, haversine_meters, initial_bearing_deg, route_length_m};
pub use utils::{Clock, ConfigurationManager, ManualClock, NavigationConfig, SystemClock};
pub use platform::{GeolocationProvider, KeyValueStore, MapView, SpeechSynthesizer, StoreError};
pub use api::{
    AchievementQueue, ApiError, ApiResult, HostEvent, LocationTracker, RouteHost, TrackerEvent,
    VoiceAnnouncer, VoiceEvent,
};
