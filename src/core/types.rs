//! Core data types for navigation and achievements

use serde::{Deserialize, Serialize};

/// Geographic coordinate in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to another point (meters)
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        crate::algorithms::haversine_meters(self.lat, self.lng, other.lat, other.lng)
    }
}

/// A single GPS fix delivered by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coords: GeoPoint,
    pub accuracy_m: f64,
    pub heading_deg: Option<f64>,
    pub speed_mps: Option<f64>,
    pub timestamp_ms: u64,
}

impl LocationSample {
    pub fn new(coords: GeoPoint, timestamp_ms: u64) -> Self {
        Self {
            coords,
            accuracy_m: 10.0,
            heading_deg: None,
            speed_mps: None,
            timestamp_ms,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = accuracy_m;
        self
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }
}

/// One leg of a turn-by-turn route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub position: GeoPoint,
    pub instruction: String,
}

impl RouteStep {
    pub fn new(position: GeoPoint, instruction: impl Into<String>) -> Self {
        Self {
            position,
            instruction: instruction.into(),
        }
    }
}

/// Where a route ends (usually a vending machine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub position: GeoPoint,
}

/// Route handed over by the directions collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<RouteStep>,
    pub destination: Destination,
    /// Total distance reported by the directions service, if any (meters)
    pub distance_m: Option<f64>,
    /// Total travel time reported by the directions service, if any (seconds)
    pub duration_s: Option<u64>,
}

impl Route {
    pub fn new(steps: Vec<RouteStep>, destination: Destination) -> Self {
        Self {
            steps,
            destination,
            distance_m: None,
            duration_s: None,
        }
    }

    pub fn with_distance(mut self, distance_m: f64) -> Self {
        self.distance_m = Some(distance_m);
        self
    }

    pub fn with_duration(mut self, duration_s: u64) -> Self {
        self.duration_s = Some(duration_s);
        self
    }

    /// Reported distance, or the summed step legs when the service gave none
    pub fn total_distance_m(&self) -> f64 {
        self.distance_m
            .unwrap_or_else(|| crate::algorithms::route_length_m(&self.steps))
    }

    /// Reported travel time, or a walking-pace estimate over the total distance
    pub fn estimated_duration_s(&self) -> u64 {
        self.duration_s.unwrap_or_else(|| {
            (self.total_distance_m() / super::constants::WALKING_SPEED_MPS).round() as u64
        })
    }
}

/// Badge grouping used by the profile screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeCategory {
    Orders,
    Social,
    Loyalty,
    Special,
}

/// Static catalog entry describing an achievement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: BadgeCategory,
    pub color: String,
    pub bg_color: String,
}

impl BadgeDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: BadgeCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            category,
            color: String::new(),
            bg_color: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_colors(mut self, color: impl Into<String>, bg_color: impl Into<String>) -> Self {
        self.color = color.into();
        self.bg_color = bg_color.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk() -> Route {
        let steps = vec![
            RouteStep::new(GeoPoint::new(41.2995, 69.2401), "Идите на север"),
            RouteStep::new(GeoPoint::new(41.3085, 69.2401), "Автомат справа"),
        ];
        let destination = Destination {
            name: "Автомат у метро".to_string(),
            position: GeoPoint::new(41.3085, 69.2401),
        };
        Route::new(steps, destination)
    }

    #[test]
    fn test_route_totals_fall_back_to_geometry() {
        let route = walk();
        let distance = route.total_distance_m();
        assert!((distance - 1000.0).abs() < 10.0);
        assert_eq!(route.estimated_duration_s(), (distance / 1.4).round() as u64);

        let reported = walk().with_distance(1200.0).with_duration(900);
        assert_eq!(reported.total_distance_m(), 1200.0);
        assert_eq!(reported.estimated_duration_s(), 900);
    }

    #[test]
    fn test_badge_category_serializes_lowercase() {
        let badge = BadgeDefinition::new("first_order", "Первый заказ", BadgeCategory::Orders);
        let json = serde_json::to_value(&badge).unwrap();
        assert_eq!(json["category"], "orders");
    }
}
