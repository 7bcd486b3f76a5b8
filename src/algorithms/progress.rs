//! Route progress: which step the user is on and how far off the route they are

use crate::algorithms::distance::to_local_m;
use crate::core::{GeoPoint, RouteStep};
use nalgebra::Vector2;

/// Distances driving step resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityParams {
    /// A step within this distance counts as reached (meters)
    pub proximity_threshold_m: f64,
    /// The next step within this distance counts as approaching (meters)
    pub approaching_distance_m: f64,
}

/// Next step close enough to warn about
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    pub step_index: usize,
    pub distance_m: f64,
}

/// Outcome of resolving one position against a route
#[derive(Debug, Clone, PartialEq)]
pub struct StepResolution {
    /// Step that should become current, if any. Never below the scan start.
    pub candidate: Option<usize>,
    /// `true` if the candidate lies within the proximity threshold
    pub reached: bool,
    /// Distance to the candidate (meters)
    pub candidate_distance_m: f64,
    /// Step after the last confirmed one, when within the approaching distance
    pub approaching: Option<Approach>,
}

impl StepResolution {
    fn empty() -> Self {
        Self {
            candidate: None,
            reached: false,
            candidate_distance_m: f64::INFINITY,
            approaching: None,
        }
    }
}

/// Resolve which step `position` belongs to.
///
/// Scans forward from `max(last_confirmed, 0)`. The first step inside the
/// proximity threshold wins immediately, even if a later step is closer.
/// Otherwise the closest scanned step is returned as a provisional
/// candidate. Separately reports the step right after `last_confirmed`
/// when it is within the approaching distance.
pub fn resolve_step(
    position: &GeoPoint,
    steps: &[RouteStep],
    last_confirmed: i32,
    params: &ProximityParams,
) -> StepResolution {
    let mut resolution = StepResolution::empty();
    if steps.is_empty() {
        return resolution;
    }

    let start = last_confirmed.max(0) as usize;
    for (index, step) in steps.iter().enumerate().skip(start) {
        let distance = position.distance_to(&step.position);

        if distance <= params.proximity_threshold_m {
            resolution.candidate = Some(index);
            resolution.reached = true;
            resolution.candidate_distance_m = distance;
            break;
        }

        if distance < resolution.candidate_distance_m {
            resolution.candidate = Some(index);
            resolution.candidate_distance_m = distance;
        }
    }

    let next_index = (last_confirmed + 1).max(0) as usize;
    if let Some(next) = steps.get(next_index) {
        let distance = position.distance_to(&next.position);
        if distance <= params.approaching_distance_m {
            resolution.approaching = Some(Approach {
                step_index: next_index,
                distance_m: distance,
            });
        }
    }

    resolution
}

/// Shortest distance from `position` to the route polyline (meters).
///
/// Each leg is projected onto a tangent plane centred on `position`, so the
/// user sits at the origin and the answer is the norm of the closest point
/// on the clamped segment. A single-step route degenerates to the distance
/// to that step. Returns `None` for an empty route.
pub fn distance_to_route_m(position: &GeoPoint, steps: &[RouteStep]) -> Option<f64> {
    match steps {
        [] => None,
        [only] => Some(position.distance_to(&only.position)),
        _ => steps
            .windows(2)
            .map(|leg| {
                let a = to_local_m(&leg[0].position, position);
                let b = to_local_m(&leg[1].position, position);
                distance_origin_to_segment(&a, &b)
            })
            .reduce(f64::min),
    }
}

fn distance_origin_to_segment(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return a.norm();
    }

    let t = (-a.dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t).norm()
}
