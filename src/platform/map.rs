//! Map view port

use crate::core::{GeoPoint, RouteStep};

/// External map rendering surface driven by the route screen
pub trait MapView {
    /// Draw the route polyline and step markers
    fn show_route(&mut self, steps: &[RouteStep]);

    /// Remove the route overlay
    fn clear_route(&mut self);

    /// Place or move the user marker
    fn set_user_marker(&mut self, position: GeoPoint, heading_deg: Option<f64>, accuracy_m: f64);

    /// Remove the user marker
    fn remove_user_marker(&mut self);

    /// Emphasise the step the user is currently on
    fn highlight_step(&mut self, index: usize);
}
