//! Continuous location tracking with route step resolution
//!
//! [`LocationTracker`] holds at most one platform watch subscription, applies
//! every fix that belongs to the current tracking session and derives the
//! current route step from it. The step index only ever moves forward while
//! a route is active; GPS noise never rewinds the user to an earlier
//! instruction.

use crate::algorithms::{resolve_step, ProximityParams};
use crate::api::callback::{Callback, CallbackHandle, CallbackRegistry};
use crate::api::types::{
    ApiError, ApiResult, ApproachingStep, StepChanged, TrackerEvent, TrackingError,
    TrackingErrorKind, TrackingState,
};
use crate::core::{GeoPoint, LocationSample, RouteStep, NO_STEP};
use crate::platform::{
    GeolocationProvider, PositionError, PositionEvent, PositionOptions, PositionSource, RequestId,
    WatchId,
};
use crate::utils::TrackerConfig;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Outcome of [`LocationTracker::request_permission`].
///
/// Resolves exactly once: `true` when the platform produced a fix, `false`
/// on any failure or if the tracker went away before answering.
#[derive(Debug)]
pub struct PermissionFuture {
    rx: oneshot::Receiver<bool>,
    resolved: Option<bool>,
}

impl PermissionFuture {
    fn pending(rx: oneshot::Receiver<bool>) -> Self {
        Self { rx, resolved: None }
    }

    fn ready(granted: bool) -> Self {
        let (_, rx) = oneshot::channel();
        Self {
            rx,
            resolved: Some(granted),
        }
    }

    /// Non-blocking check for hosts without an async runtime
    pub fn try_resolve(&mut self) -> Option<bool> {
        if self.resolved.is_none() {
            self.resolved = match self.rx.try_recv() {
                Ok(granted) => Some(granted),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(false),
            };
        }
        self.resolved
    }
}

impl Future for PermissionFuture {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        if let Some(granted) = self.resolved {
            return Poll::Ready(granted);
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(result) => {
                let granted = result.unwrap_or(false);
                self.resolved = Some(granted);
                Poll::Ready(granted)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// GPS tracker deriving the current step of a route
pub struct LocationTracker {
    provider: Box<dyn GeolocationProvider + Send>,
    config: TrackerConfig,
    state: TrackingState,
    /// Subscription of the current tracking session
    watch: Option<WatchId>,
    /// Immediate fixes requested by the current tracking session
    session_fixes: HashSet<RequestId>,
    /// Outstanding permission requests
    permission_requests: HashMap<RequestId, oneshot::Sender<bool>>,
    steps: Vec<RouteStep>,
    /// Step indices already reported as approaching for this route
    announced_approaching: HashSet<usize>,
    step_callbacks: CallbackRegistry<StepChanged>,
    approaching_callbacks: CallbackRegistry<ApproachingStep>,
    error_callbacks: CallbackRegistry<TrackingError>,
}

impl std::fmt::Debug for LocationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationTracker")
            .field("state", &self.state)
            .field("watch", &self.watch)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl LocationTracker {
    /// Create a tracker. Missing platform support is detected here, once.
    pub fn new(provider: Box<dyn GeolocationProvider + Send>, config: TrackerConfig) -> Self {
        let mut state = TrackingState::default();
        if !provider.is_available() {
            warn!("geolocation is not available on this platform");
            state.is_supported = false;
            state.error = Some(TrackingErrorKind::Unsupported.into());
        }

        Self {
            provider,
            config,
            state,
            watch: None,
            session_fixes: HashSet::new(),
            permission_requests: HashMap::new(),
            steps: Vec::new(),
            announced_approaching: HashSet::new(),
            step_callbacks: CallbackRegistry::new(),
            approaching_callbacks: CallbackRegistry::new(),
            error_callbacks: CallbackRegistry::new(),
        }
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    /// Step the user is currently on, if any
    pub fn current_step(&self) -> Option<&RouteStep> {
        usize::try_from(self.state.current_step_index)
            .ok()
            .and_then(|index| self.steps.get(index))
    }

    /// Start tracking: one immediate fix plus a continuous watch. Idempotent.
    pub fn start_tracking(&mut self) {
        if !self.state.is_supported || self.state.is_tracking {
            return;
        }

        let fix = self
            .provider
            .get_current_position(&PositionOptions::one_shot(&self.config));
        self.session_fixes.insert(fix);
        let watch = self
            .provider
            .watch_position(&PositionOptions::watch(&self.config));
        self.watch = Some(watch);

        self.state.is_tracking = true;
        self.state.error = None;
        info!(watch = watch.0, "location tracking started");
    }

    /// Stop tracking and release the subscription. No-op when idle.
    pub fn stop_tracking(&mut self) {
        if !self.state.is_tracking {
            return;
        }

        self.release_watch();
        self.session_fixes.clear();
        self.state.is_tracking = false;
        info!("location tracking stopped");
    }

    pub fn toggle(&mut self) {
        if self.state.is_tracking {
            self.stop_tracking();
        } else {
            self.start_tracking();
        }
    }

    fn release_watch(&mut self) {
        if let Some(id) = self.watch.take() {
            self.provider.clear_watch(id);
        }
    }

    /// Ask the platform for one fix so it shows its permission prompt.
    ///
    /// Does not change whether tracking is active.
    pub fn request_permission(&mut self) -> PermissionFuture {
        if !self.state.is_supported {
            return PermissionFuture::ready(false);
        }

        let (tx, rx) = oneshot::channel();
        let id = self
            .provider
            .get_current_position(&PositionOptions::one_shot(&self.config));
        self.permission_requests.insert(id, tx);
        debug!(request = id.0, "permission request sent");
        PermissionFuture::pending(rx)
    }

    /// Replace the active route and forget all progress on the previous one
    pub fn set_route_steps(&mut self, steps: Vec<RouteStep>) {
        info!(steps = steps.len(), "route steps set");
        self.steps = steps;
        self.state.current_step_index = NO_STEP;
        self.announced_approaching.clear();
    }

    pub fn clear_route(&mut self) {
        self.set_route_steps(Vec::new());
    }

    pub fn on_step_change(&mut self, callback: Callback<StepChanged>) -> CallbackHandle {
        self.step_callbacks.register(callback)
    }

    pub fn on_approaching_step(&mut self, callback: Callback<ApproachingStep>) -> CallbackHandle {
        self.approaching_callbacks.register(callback)
    }

    pub fn on_error(&mut self, callback: Callback<TrackingError>) -> CallbackHandle {
        self.error_callbacks.register(callback)
    }

    pub fn unregister_callback(&mut self, handle: CallbackHandle) -> ApiResult<()> {
        let removed = self.step_callbacks.unregister(handle)
            || self.approaching_callbacks.unregister(handle)
            || self.error_callbacks.unregister(handle);

        if removed {
            Ok(())
        } else {
            Err(ApiError::InvalidCallbackHandle(handle.id()))
        }
    }

    /// Drain platform deliveries and apply them (call this from the event loop)
    pub fn process(&mut self) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.provider.poll_event() {
            self.handle_event(event, &mut events);
        }
        events
    }

    fn handle_event(&mut self, event: PositionEvent, events: &mut Vec<TrackerEvent>) {
        match event.source {
            PositionSource::OneShot(id) => {
                if let Some(tx) = self.permission_requests.remove(&id) {
                    self.resolve_permission(tx, &event.result);
                    return;
                }
                if !self.session_fixes.remove(&id) {
                    debug!(request = id.0, "dropping fix from a previous session");
                    return;
                }
            }
            PositionSource::Watch(id) => {
                if self.watch != Some(id) {
                    debug!(watch = id.0, "dropping delivery from a released watch");
                    return;
                }
            }
        }

        match event.result {
            Ok(sample) => self.apply_fix(sample, events),
            Err(error) => self.apply_error(&error, events),
        }
    }

    fn resolve_permission(
        &mut self,
        tx: oneshot::Sender<bool>,
        result: &Result<LocationSample, PositionError>,
    ) {
        let granted = match result {
            Ok(_) => {
                self.state.has_permission = true;
                true
            }
            Err(error) => {
                if TrackingErrorKind::from(error.code) == TrackingErrorKind::PermissionDenied {
                    self.state.has_permission = false;
                }
                false
            }
        };
        debug!(granted, "permission request answered");
        let _ = tx.send(granted);
    }

    fn apply_fix(&mut self, sample: LocationSample, events: &mut Vec<TrackerEvent>) {
        if let Some(current) = &self.state.current_location {
            if sample.timestamp_ms < current.timestamp_ms {
                debug!(
                    fix = sample.timestamp_ms,
                    current = current.timestamp_ms,
                    "ignoring out-of-order fix"
                );
                return;
            }
            if sample == *current {
                debug!(fix = sample.timestamp_ms, "ignoring repeated fix");
                return;
            }
        }

        let position = sample.coords;
        self.state.current_location = Some(sample.clone());
        self.state.has_permission = true;
        self.state.error = None;
        events.push(TrackerEvent::LocationUpdated(sample));

        self.update_step(&position, events);
    }

    fn update_step(&mut self, position: &GeoPoint, events: &mut Vec<TrackerEvent>) {
        if self.steps.is_empty() {
            return;
        }

        let last = self.state.current_step_index;
        let params = ProximityParams {
            proximity_threshold_m: self.config.proximity_threshold_m,
            approaching_distance_m: self.config.approaching_distance_m,
        };
        let resolution = resolve_step(position, &self.steps, last, &params);

        if let Some(approach) = resolution.approaching {
            if self.announced_approaching.insert(approach.step_index) {
                let event = ApproachingStep {
                    step_index: approach.step_index,
                    distance_m: approach.distance_m,
                };
                debug!(step = event.step_index, distance_m = event.distance_m, "approaching step");
                self.approaching_callbacks.emit(&event);
                events.push(TrackerEvent::ApproachingStep(event));
            }
        }

        let Some(candidate) = resolution.candidate else {
            return;
        };
        let candidate_index = candidate as i32;
        if candidate_index > last {
            self.state.current_step_index = candidate_index;
            let event = StepChanged {
                step_index: candidate,
                step: self.steps[candidate].clone(),
            };
            info!(
                step = candidate,
                reached = resolution.reached,
                distance_m = resolution.candidate_distance_m,
                "route step changed"
            );
            self.step_callbacks.emit(&event);
            events.push(TrackerEvent::StepChanged(event));
        }
    }

    fn apply_error(&mut self, error: &PositionError, events: &mut Vec<TrackerEvent>) {
        let kind = TrackingErrorKind::from(error.code);
        warn!(?kind, platform = %error.message, "geolocation error");

        if kind == TrackingErrorKind::PermissionDenied {
            self.state.has_permission = false;
        }
        let tracking_error = TrackingError::from(kind);
        self.state.error = Some(tracking_error.clone());
        self.error_callbacks.emit(&tracking_error);
        events.push(TrackerEvent::Error(tracking_error));
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        self.release_watch();
    }
}
