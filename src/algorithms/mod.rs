//! Navigation geometry

pub mod distance;
pub mod progress;

pub use distance::{haversine_meters, initial_bearing_deg, route_length_m, to_local_m};
pub use progress::{distance_to_route_m, resolve_step, Approach, ProximityParams, StepResolution};
