//! Great-circle distance, bearing and local-plane projection

use crate::core::{GeoPoint, RouteStep, EARTH_RADIUS_M};
use nalgebra::Vector2;

/// Great-circle distance between two WGS84 points (meters).
///
/// Standard haversine formula on a sphere of radius [`EARTH_RADIUS_M`].
/// Identical inputs give exactly `0.0` and the result is symmetric in its
/// two points.
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial bearing from `from` towards `to`, in degrees clockwise from north, in [0, 360)
pub fn initial_bearing_deg(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Project `point` onto a local east/north tangent plane centred on `reference` (meters).
///
/// Flat-earth approximation, accurate enough for the few hundred meters
/// separating a pedestrian from the next route step.
pub fn to_local_m(point: &GeoPoint, reference: &GeoPoint) -> Vector2<f64> {
    let lat_diff = (point.lat - reference.lat).to_radians();
    let lng_diff = (point.lng - reference.lng).to_radians();
    let ref_lat_rad = reference.lat.to_radians();

    let east = EARTH_RADIUS_M * lng_diff * ref_lat_rad.cos();
    let north = EARTH_RADIUS_M * lat_diff;

    Vector2::new(east, north)
}

/// Sum of consecutive step-to-step legs (meters)
pub fn route_length_m(steps: &[RouteStep]) -> f64 {
    steps
        .windows(2)
        .map(|pair| pair[0].position.distance_to(&pair[1].position))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASHKENT: GeoPoint = GeoPoint::new(41.2995, 69.2401);

    #[test]
    fn test_identical_points_are_zero() {
        for (lat, lng) in [(0.0, 0.0), (41.2995, 69.2401), (-33.86, 151.2), (89.9, -179.9)] {
            assert_eq!(haversine_meters(lat, lng, lat, lng), 0.0);
        }
    }

    #[test]
    fn test_symmetry() {
        let d1 = haversine_meters(41.2995, 69.2401, 41.3111, 69.2797);
        let d2 = haversine_meters(41.3111, 69.2797, 41.2995, 69.2401);
        assert_eq!(d1, d2);
    }

    #[test]
    fn test_one_kilometer_north() {
        let d = haversine_meters(41.2995, 69.2401, 41.3085, 69.2401);
        assert!((900.0..=1100.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_thirty_meter_offset() {
        let d = haversine_meters(41.2995, 69.2401, 41.2995 + 0.00027, 69.2401);
        assert!((25.0..=40.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let north = GeoPoint::new(TASHKENT.lat + 0.01, TASHKENT.lng);
        let east = GeoPoint::new(TASHKENT.lat, TASHKENT.lng + 0.01);
        let south = GeoPoint::new(TASHKENT.lat - 0.01, TASHKENT.lng);

        assert!(initial_bearing_deg(&TASHKENT, &north).abs() < 0.5);
        assert!((initial_bearing_deg(&TASHKENT, &east) - 90.0).abs() < 0.5);
        assert!((initial_bearing_deg(&TASHKENT, &south) - 180.0).abs() < 0.5);
    }

    #[test]
    fn test_local_projection_matches_haversine() {
        let p = GeoPoint::new(TASHKENT.lat + 0.001, TASHKENT.lng + 0.001);
        let local = to_local_m(&p, &TASHKENT);
        let hav = TASHKENT.distance_to(&p);

        assert!(local.x > 0.0 && local.y > 0.0);
        assert!((local.norm() - hav).abs() < 1.0);
    }

    #[test]
    fn test_route_length() {
        let steps = vec![
            RouteStep::new(TASHKENT, "a"),
            RouteStep::new(GeoPoint::new(41.3085, 69.2401), "b"),
            RouteStep::new(GeoPoint::new(41.3175, 69.2401), "c"),
        ];
        let len = route_length_m(&steps);
        assert!((1900.0..=2100.0).contains(&len));

        assert_eq!(route_length_m(&steps[..1]), 0.0);
        assert_eq!(route_length_m(&[]), 0.0);
    }
}
