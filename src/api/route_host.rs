//! Route screen composition
//!
//! [`RouteHost`] owns one route and the three collaborators working on it.
//! Tracker output drives the map marker, step highlighting and spoken
//! instructions; the host adds off-route and arrival detection on top.

use crate::algorithms::{distance_to_route_m, initial_bearing_deg};
use crate::api::formatting::{format_distance, format_duration};
use crate::api::tracker::LocationTracker;
use crate::api::types::{ApiError, ApiResult, StepChanged, TrackerEvent, VoiceEvent};
use crate::api::voice::VoiceAnnouncer;
use crate::core::{Destination, GeoPoint, LocationSample, Route};
use crate::platform::MapView;
use crate::utils::HostConfig;
use tracing::{debug, info, warn};

/// Minimum movement before the marker heading is derived from successive fixes (meters)
const MIN_BEARING_MOVE_M: f64 = 1.0;

/// Everything the route screen reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Tracker(TrackerEvent),
    Voice(VoiceEvent),
    /// The user left the route corridor
    OffRoute { distance_m: f64 },
    /// The user is back within the route corridor
    BackOnRoute,
    /// The destination was reached; emitted once per route
    Arrived { destination: Destination },
}

pub struct RouteHost {
    tracker: LocationTracker,
    announcer: VoiceAnnouncer,
    map: Box<dyn MapView + Send>,
    config: HostConfig,
    route: Option<Route>,
    last_spoken_step: Option<usize>,
    last_position: Option<GeoPoint>,
    last_heading: Option<f64>,
    off_route: bool,
    arrived: bool,
}

impl std::fmt::Debug for RouteHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteHost")
            .field("tracker", &self.tracker)
            .field("announcer", &self.announcer)
            .field("route_steps", &self.route.as_ref().map(|r| r.steps.len()))
            .field("off_route", &self.off_route)
            .field("arrived", &self.arrived)
            .finish()
    }
}

impl RouteHost {
    pub fn new(
        tracker: LocationTracker,
        announcer: VoiceAnnouncer,
        map: Box<dyn MapView + Send>,
        config: HostConfig,
    ) -> Self {
        Self {
            tracker,
            announcer,
            map,
            config,
            route: None,
            last_spoken_step: None,
            last_position: None,
            last_heading: None,
            off_route: false,
            arrived: false,
        }
    }

    pub fn tracker(&self) -> &LocationTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut LocationTracker {
        &mut self.tracker
    }

    pub fn announcer(&self) -> &VoiceAnnouncer {
        &self.announcer
    }

    pub fn announcer_mut(&mut self) -> &mut VoiceAnnouncer {
        &mut self.announcer
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn is_off_route(&self) -> bool {
        self.off_route
    }

    pub fn has_arrived(&self) -> bool {
        self.arrived
    }

    /// Show `route`, announce it and start tracking progress along it
    pub fn start_navigation(&mut self, route: Route) -> ApiResult<()> {
        if route.steps.is_empty() {
            return Err(ApiError::InvalidRoute {
                reason: "route has no steps".to_string(),
            });
        }

        info!(
            steps = route.steps.len(),
            destination = %route.destination.name,
            "navigation started"
        );
        self.reset_progress();
        self.tracker.set_route_steps(route.steps.clone());
        self.map.show_route(&route.steps);

        // The first fix normally lands on step 0, so its instruction rides along
        let first = &route.steps[0];
        if self.announcer.announce_route_start(
            &format_distance(route.total_distance_m()),
            &format_duration(route.estimated_duration_s()),
            Some(first.instruction.as_str()),
        ) {
            self.last_spoken_step = Some(0);
        }
        self.tracker.start_tracking();
        self.route = Some(route);
        Ok(())
    }

    /// Stop tracking and speech and clear the map
    pub fn cancel_navigation(&mut self) {
        if self.route.take().is_some() {
            info!("navigation cancelled");
        }
        self.tracker.stop_tracking();
        self.tracker.clear_route();
        self.announcer.stop();
        self.map.clear_route();
        self.map.remove_user_marker();
        self.reset_progress();
    }

    /// Run one event-loop turn over the tracker and the announcer.
    ///
    /// Speech is decided after the whole turn: only the newest step change
    /// is spoken, and the final step gives way to the arrival announcement
    /// when both happen on the same fix.
    pub fn process(&mut self) -> Vec<HostEvent> {
        let mut events = Vec::new();
        let mut moved = false;
        let mut newest_step = None;

        for event in self.tracker.process() {
            match &event {
                TrackerEvent::LocationUpdated(sample) => {
                    self.update_marker(sample);
                    moved = true;
                }
                TrackerEvent::StepChanged(change) => {
                    self.map.highlight_step(change.step_index);
                    newest_step = Some(change.clone());
                }
                TrackerEvent::ApproachingStep(_) | TrackerEvent::Error(_) => {}
            }
            events.push(HostEvent::Tracker(event));
        }

        let arrived_now = match (moved, self.last_position) {
            (true, Some(position)) => self.check_progress(&position, &mut events),
            _ => None,
        };

        if let Some(change) = newest_step {
            self.announce_step(&change, arrived_now.is_some());
        }
        if let Some(destination) = arrived_now {
            self.announcer.announce_arrival(&destination.name);
        }

        events.extend(self.announcer.process().into_iter().map(HostEvent::Voice));
        events
    }

    fn reset_progress(&mut self) {
        self.last_spoken_step = None;
        self.last_position = None;
        self.last_heading = None;
        self.off_route = false;
        self.arrived = false;
    }

    /// Platform heading first, then the bearing from the previous fix, then
    /// the last known heading while standing still
    fn update_marker(&mut self, sample: &LocationSample) {
        let heading = sample
            .heading_deg
            .or_else(|| {
                self.last_position
                    .filter(|previous| previous.distance_to(&sample.coords) >= MIN_BEARING_MOVE_M)
                    .map(|previous| initial_bearing_deg(&previous, &sample.coords))
            })
            .or(self.last_heading);

        self.map
            .set_user_marker(sample.coords, heading, sample.accuracy_m);
        self.last_position = Some(sample.coords);
        self.last_heading = heading;
    }

    fn announce_step(&mut self, change: &StepChanged, arrived_now: bool) {
        if self.last_spoken_step == Some(change.step_index) {
            debug!(step = change.step_index, "step already announced");
            return;
        }
        self.last_spoken_step = Some(change.step_index);

        let is_last = self
            .route
            .as_ref()
            .is_some_and(|route| change.step_index + 1 == route.steps.len());
        if is_last && arrived_now {
            debug!(step = change.step_index, "final step superseded by arrival");
            return;
        }
        self.announcer
            .speak_step(&change.step.instruction, Some(change.step_index));
    }

    /// Off-route bookkeeping plus arrival detection; returns the destination
    /// when it was reached by this position
    fn check_progress(&mut self, position: &GeoPoint, events: &mut Vec<HostEvent>) -> Option<Destination> {
        let route = self.route.as_ref()?;

        if let Some(distance_m) = distance_to_route_m(position, &route.steps) {
            let outside = distance_m > self.config.off_route_threshold_m;
            if outside && !self.off_route {
                warn!(distance_m, "user left the route");
                self.off_route = true;
                events.push(HostEvent::OffRoute { distance_m });
            } else if !outside && self.off_route {
                info!(distance_m, "user is back on the route");
                self.off_route = false;
                events.push(HostEvent::BackOnRoute);
            }
        }

        if !self.arrived
            && position.distance_to(&route.destination.position) <= self.config.arrival_radius_m
        {
            let destination = route.destination.clone();
            info!(destination = %destination.name, "destination reached");
            self.arrived = true;
            events.push(HostEvent::Arrived {
                destination: destination.clone(),
            });
            return Some(destination);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RouteStep;
    use crate::platform::{MapCall, MockGeolocation, MockMapView, MockSpeech};
    use crate::utils::{ManualClock, TrackerConfig, VoiceConfig};
    use std::sync::Arc;

    const BASE: GeoPoint = GeoPoint::new(41.2995, 69.2401);

    fn north(dlat: f64) -> GeoPoint {
        GeoPoint::new(BASE.lat + dlat, BASE.lng)
    }

    fn route() -> Route {
        let steps = vec![
            RouteStep::new(BASE, "Идите прямо"),
            RouteStep::new(north(0.001), "Поверните налево"),
            RouteStep::new(north(0.002), "Автомат справа"),
        ];
        let destination = Destination {
            name: "Автомат у метро".to_string(),
            position: north(0.002),
        };
        Route::new(steps, destination)
    }

    struct Harness {
        host: RouteHost,
        geo: MockGeolocation,
        speech: MockSpeech,
        map: MockMapView,
    }

    fn harness() -> Harness {
        let geo = MockGeolocation::new();
        let speech = MockSpeech::new();
        let map = MockMapView::new();

        let tracker = LocationTracker::new(Box::new(geo.clone()), TrackerConfig::default());
        let mut announcer = VoiceAnnouncer::new(
            Box::new(speech.clone()),
            VoiceConfig::default(),
            Arc::new(ManualClock::new(0)),
        );
        announcer.enable();
        let host = RouteHost::new(tracker, announcer, Box::new(map.clone()), HostConfig::default());

        Harness {
            host,
            geo,
            speech,
            map,
        }
    }

    #[test]
    fn test_rejects_empty_route() {
        let mut h = harness();
        let empty = Route::new(Vec::new(), route().destination);
        assert!(matches!(
            h.host.start_navigation(empty),
            Err(ApiError::InvalidRoute { .. })
        ));
        assert!(!h.host.tracker().is_tracking());
    }

    #[test]
    fn test_start_navigation() {
        let mut h = harness();
        h.host.start_navigation(route().with_duration(900)).unwrap();

        assert!(h.host.tracker().is_tracking());
        assert_eq!(h.geo.watches_opened(), 1);
        assert_eq!(h.map.calls(), vec![MapCall::ShowRoute(3)]);
        assert_eq!(
            h.speech.spoken_texts(),
            vec!["Маршрут построен. Расстояние: 222 м. Время в пути: 15 мин. Идите прямо"]
        );
    }

    #[test]
    fn test_walk_speaks_each_step_once_and_arrives() {
        let mut h = harness();
        h.host.start_navigation(route()).unwrap();

        let mut arrivals = 0;
        let fixes = [BASE, BASE, north(0.001), north(0.001), north(0.002), north(0.002)];
        for (i, position) in fixes.iter().enumerate() {
            h.geo.deliver_position(*position, 1000 * (i as u64 + 1));
            arrivals += h
                .host
                .process()
                .iter()
                .filter(|e| matches!(e, HostEvent::Arrived { .. }))
                .count();
        }

        assert_eq!(arrivals, 1);
        assert!(h.host.has_arrived());
        assert_eq!(h.host.tracker().state().current_step_index, 2);

        let spoken = h.speech.spoken_texts();
        assert_eq!(spoken.len(), 3);
        assert!(spoken[0].ends_with("Идите прямо"));
        assert_eq!(
            spoken[1..],
            [
                "Поверните налево",
                "Вы прибыли к месту назначения: Автомат у метро.",
            ]
        );

        let highlighted: Vec<usize> = h
            .map
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MapCall::HighlightStep(i) => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(highlighted, vec![0, 1, 2]);
    }

    #[test]
    fn test_route_start_and_arrival_are_heard_in_full() {
        let mut h = harness();
        h.host.start_navigation(route()).unwrap();

        let mut voice = Vec::new();
        let mut turn = |h: &mut Harness| {
            for event in h.host.process() {
                if let HostEvent::Voice(event) = event {
                    voice.push(event);
                }
            }
        };

        for (i, position) in [BASE, north(0.001), north(0.002)].iter().enumerate() {
            h.geo.deliver_position(*position, 1000 * (i as u64 + 1));
            turn(&mut h);
            if i < 2 {
                h.speech.finish_current();
                turn(&mut h);
            }
        }

        assert_eq!(
            voice,
            vec![
                VoiceEvent::UtteranceStarted { step_index: None },
                VoiceEvent::UtteranceFinished { step_index: None },
                VoiceEvent::UtteranceStarted { step_index: Some(1) },
                VoiceEvent::UtteranceFinished { step_index: Some(1) },
                VoiceEvent::UtteranceStarted { step_index: None },
            ]
        );
        assert!(h.speech.is_playing());
        assert_eq!(
            h.speech.spoken_texts().last().map(String::as_str),
            Some("Вы прибыли к месту назначения: Автомат у метро.")
        );
    }

    #[test]
    fn test_marker_keeps_heading_while_standing_still() {
        let mut h = harness();
        h.host.start_navigation(route()).unwrap();

        h.geo.deliver_position(BASE, 1000);
        h.host.process();
        h.geo.deliver_position(north(0.0005), 2000);
        h.host.process();
        h.geo.deliver_position(north(0.0005), 3000);
        h.host.process();

        h.host.cancel_navigation();
        h.host.start_navigation(route()).unwrap();
        h.geo.deliver_position(north(0.0005), 4000);
        h.host.process();

        let headings: Vec<Option<f64>> = h
            .map
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MapCall::UserMarker { heading_deg, .. } => Some(heading_deg),
                _ => None,
            })
            .collect();

        assert_eq!(headings.len(), 4);
        assert_eq!(headings[0], None);
        assert!(headings[1].is_some());
        assert_eq!(headings[2], headings[1]);
        assert_eq!(headings[3], None);
    }

    #[test]
    fn test_marker_heading_falls_back_to_bearing() {
        let mut h = harness();
        h.host.start_navigation(route()).unwrap();

        h.geo.deliver_position(BASE, 1000);
        h.host.process();
        h.geo.deliver_position(north(0.0005), 2000);
        h.host.process();
        h.geo
            .deliver_fix(LocationSample::new(north(0.0006), 3000).with_heading(270.0));
        h.host.process();

        let headings: Vec<Option<f64>> = h
            .map
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MapCall::UserMarker { heading_deg, .. } => Some(heading_deg),
                _ => None,
            })
            .collect();

        assert_eq!(headings.len(), 3);
        assert_eq!(headings[0], None);
        let bearing = headings[1].unwrap();
        assert!(bearing < 0.5 || bearing > 359.5);
        assert_eq!(headings[2], Some(270.0));
        assert_eq!(h.map.last_marker(), Some(north(0.0006)));
    }

    #[test]
    fn test_off_route_and_back() {
        let mut h = harness();
        h.host.start_navigation(route()).unwrap();
        let east = GeoPoint::new(BASE.lat + 0.0005, BASE.lng + 0.003);

        h.geo.deliver_position(BASE, 1000);
        h.host.process();
        assert!(!h.host.is_off_route());

        h.geo.deliver_position(east, 2000);
        let events = h.host.process();
        let distance = events.iter().find_map(|e| match e {
            HostEvent::OffRoute { distance_m } => Some(*distance_m),
            _ => None,
        });
        assert!((distance.unwrap() - 251.0).abs() < 5.0);

        h.geo.deliver_position(east, 3000);
        assert!(!h
            .host
            .process()
            .iter()
            .any(|e| matches!(e, HostEvent::OffRoute { .. })));

        h.geo.deliver_position(north(0.001), 4000);
        let events = h.host.process();
        assert!(events.contains(&HostEvent::BackOnRoute));
        assert!(!h.host.is_off_route());
    }

    #[test]
    fn test_tracker_events_are_forwarded() {
        let mut h = harness();
        h.host.start_navigation(route()).unwrap();
        h.geo.deliver_position(BASE, 1000);

        let events = h.host.process();
        assert!(matches!(
            events[0],
            HostEvent::Tracker(TrackerEvent::LocationUpdated(_))
        ));
        assert!(events.iter().any(|e| matches!(
            e,
            HostEvent::Tracker(TrackerEvent::StepChanged(StepChanged { step_index: 0, .. }))
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, HostEvent::Voice(VoiceEvent::UtteranceStarted { .. }))));
    }

    #[test]
    fn test_cancel_navigation() {
        let mut h = harness();
        h.host.start_navigation(route()).unwrap();
        let watch = h.geo.active_watches()[0];
        h.geo.deliver_position(BASE, 1000);
        h.host.process();

        h.host.cancel_navigation();

        assert!(!h.host.tracker().is_tracking());
        assert_eq!(h.host.tracker().state().current_step_index, -1);
        assert!(h.host.route().is_none());
        assert_eq!(h.geo.cleared_watches(), vec![watch]);
        assert!(!h.speech.is_playing());
        assert!(!h.host.announcer().state().is_speaking);

        let calls = h.map.calls();
        assert!(calls.ends_with(&[MapCall::ClearRoute, MapCall::RemoveUserMarker]));

        // Straggling delivery after cancel changes nothing
        h.geo.deliver_to_watch(watch, Ok(LocationSample::new(north(0.001), 2000)));
        assert!(h.host.process().iter().all(|e| !matches!(e, HostEvent::Tracker(_))));
    }
}
