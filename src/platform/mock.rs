//! Scripted platform adapters for testing, previews and the demo binary
//!
//! Every mock is a cheap cloneable handle over shared state: hand one clone
//! to the component under test and keep another to script deliveries and
//! inspect the calls that were made.

use crate::core::{GeoPoint, LocationSample, RouteStep};
use crate::platform::geolocation::{
    GeolocationProvider, PositionError, PositionEvent, PositionOptions, PositionSource, RequestId,
    WatchId,
};
use crate::platform::map::MapView;
use crate::platform::speech::{
    SpeechEvent, SpeechEventKind, SpeechFailure, SpeechSynthesizer, Utterance, UtteranceId, Voice,
};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct GeoState {
    available: bool,
    next_id: u32,
    active_watches: BTreeSet<WatchId>,
    watches_opened: u32,
    cleared: Vec<WatchId>,
    pending_one_shots: Vec<RequestId>,
    last_options: Option<PositionOptions>,
    events: VecDeque<PositionEvent>,
}

/// Mock geolocation capability
#[derive(Debug, Clone)]
pub struct MockGeolocation {
    state: Arc<Mutex<GeoState>>,
}

impl Default for MockGeolocation {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGeolocation {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GeoState {
                available: true,
                ..Default::default()
            })),
        }
    }

    /// A platform without geolocation
    pub fn unavailable() -> Self {
        let mock = Self::new();
        lock(&mock.state).available = false;
        mock
    }

    /// Deliver a fix to every open subscription
    pub fn deliver_fix(&self, sample: LocationSample) {
        self.deliver_to_watches(Ok(sample));
    }

    /// Deliver a fix at `position` to every open subscription
    pub fn deliver_position(&self, position: GeoPoint, timestamp_ms: u64) {
        self.deliver_fix(LocationSample::new(position, timestamp_ms));
    }

    /// Deliver a failure to every open subscription
    pub fn deliver_error(&self, error: PositionError) {
        self.deliver_to_watches(Err(error));
    }

    fn deliver_to_watches(&self, result: Result<LocationSample, PositionError>) {
        let mut state = lock(&self.state);
        let watches: Vec<WatchId> = state.active_watches.iter().copied().collect();
        for id in watches {
            state.events.push_back(PositionEvent {
                source: PositionSource::Watch(id),
                result: result.clone(),
            });
        }
    }

    /// Deliver to a specific watch id, even one that was already cleared
    pub fn deliver_to_watch(&self, id: WatchId, result: Result<LocationSample, PositionError>) {
        lock(&self.state).events.push_back(PositionEvent {
            source: PositionSource::Watch(id),
            result,
        });
    }

    /// Answer a one-shot request
    pub fn respond_one_shot(&self, id: RequestId, result: Result<LocationSample, PositionError>) {
        let mut state = lock(&self.state);
        state.pending_one_shots.retain(|pending| *pending != id);
        state.events.push_back(PositionEvent {
            source: PositionSource::OneShot(id),
            result,
        });
    }

    /// Answer the oldest unanswered one-shot request, returning its id
    pub fn respond_next_one_shot(
        &self,
        result: Result<LocationSample, PositionError>,
    ) -> Option<RequestId> {
        let id = lock(&self.state).pending_one_shots.first().copied()?;
        self.respond_one_shot(id, result);
        Some(id)
    }

    pub fn pending_one_shots(&self) -> Vec<RequestId> {
        lock(&self.state).pending_one_shots.clone()
    }

    pub fn active_watches(&self) -> Vec<WatchId> {
        lock(&self.state).active_watches.iter().copied().collect()
    }

    pub fn watches_opened(&self) -> u32 {
        lock(&self.state).watches_opened
    }

    /// Every `clear_watch` call, including repeats
    pub fn cleared_watches(&self) -> Vec<WatchId> {
        lock(&self.state).cleared.clone()
    }

    pub fn last_options(&self) -> Option<PositionOptions> {
        lock(&self.state).last_options
    }
}

impl GeolocationProvider for MockGeolocation {
    fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    fn get_current_position(&mut self, options: &PositionOptions) -> RequestId {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = RequestId(state.next_id);
        state.pending_one_shots.push(id);
        state.last_options = Some(*options);
        id
    }

    fn watch_position(&mut self, options: &PositionOptions) -> WatchId {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = WatchId(state.next_id);
        state.active_watches.insert(id);
        state.watches_opened += 1;
        state.last_options = Some(*options);
        id
    }

    fn clear_watch(&mut self, id: WatchId) {
        let mut state = lock(&self.state);
        state.active_watches.remove(&id);
        state.cleared.push(id);
    }

    fn poll_event(&mut self) -> Option<PositionEvent> {
        lock(&self.state).events.pop_front()
    }
}

#[derive(Debug, Default)]
struct SpeechState {
    available: bool,
    voices: Vec<Voice>,
    next_id: u32,
    playing: Option<UtteranceId>,
    spoken: Vec<Utterance>,
    cancel_count: u32,
    events: VecDeque<SpeechEvent>,
}

/// Mock speech synthesizer.
///
/// `speak` starts playback immediately (a `Started` event is queued);
/// playback only ends when the test calls [`finish_current`](Self::finish_current)
/// or [`fail_current`](Self::fail_current). `cancel` fails the playing
/// utterance with [`SpeechFailure::Canceled`].
#[derive(Debug, Clone)]
pub struct MockSpeech {
    state: Arc<Mutex<SpeechState>>,
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpeech {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SpeechState {
                available: true,
                ..Default::default()
            })),
        }
    }

    /// A platform without speech synthesis
    pub fn unavailable() -> Self {
        let mock = Self::new();
        lock(&mock.state).available = false;
        mock
    }

    pub fn with_voices(self, voices: Vec<Voice>) -> Self {
        lock(&self.state).voices = voices;
        self
    }

    pub fn set_voices(&self, voices: Vec<Voice>) {
        lock(&self.state).voices = voices;
    }

    /// Let the playing utterance end naturally
    pub fn finish_current(&self) -> Option<UtteranceId> {
        let mut state = lock(&self.state);
        let id = state.playing.take()?;
        state.events.push_back(SpeechEvent {
            utterance: id,
            kind: SpeechEventKind::Ended,
        });
        Some(id)
    }

    /// Fail the playing utterance with a platform reason
    pub fn fail_current(&self, reason: &str) -> Option<UtteranceId> {
        let mut state = lock(&self.state);
        let id = state.playing.take()?;
        state.events.push_back(SpeechEvent {
            utterance: id,
            kind: SpeechEventKind::Failed(SpeechFailure::Other(reason.to_string())),
        });
        Some(id)
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing.is_some()
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        lock(&self.state).spoken.clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        lock(&self.state).spoken.iter().map(|u| u.text.clone()).collect()
    }

    pub fn cancel_count(&self) -> u32 {
        lock(&self.state).cancel_count
    }
}

impl SpeechSynthesizer for MockSpeech {
    fn is_available(&self) -> bool {
        lock(&self.state).available
    }

    fn voices(&self) -> Vec<Voice> {
        lock(&self.state).voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> UtteranceId {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = UtteranceId(state.next_id);
        state.spoken.push(utterance);
        state.playing = Some(id);
        state.events.push_back(SpeechEvent {
            utterance: id,
            kind: SpeechEventKind::Started,
        });
        id
    }

    fn cancel(&mut self) {
        let mut state = lock(&self.state);
        state.cancel_count += 1;
        if let Some(id) = state.playing.take() {
            state.events.push_back(SpeechEvent {
                utterance: id,
                kind: SpeechEventKind::Failed(SpeechFailure::Canceled),
            });
        }
    }

    fn poll_event(&mut self) -> Option<SpeechEvent> {
        lock(&self.state).events.pop_front()
    }
}

/// Calls recorded by [`MockMapView`]
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    ShowRoute(usize),
    ClearRoute,
    UserMarker {
        position: GeoPoint,
        heading_deg: Option<f64>,
    },
    RemoveUserMarker,
    HighlightStep(usize),
}

/// Mock map view recording every call
#[derive(Debug, Clone, Default)]
pub struct MockMapView {
    calls: Arc<Mutex<Vec<MapCall>>>,
}

impl MockMapView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MapCall> {
        lock(&self.calls).clone()
    }

    pub fn last_marker(&self) -> Option<GeoPoint> {
        lock(&self.calls).iter().rev().find_map(|call| match call {
            MapCall::UserMarker { position, .. } => Some(*position),
            _ => None,
        })
    }
}

impl MapView for MockMapView {
    fn show_route(&mut self, steps: &[RouteStep]) {
        lock(&self.calls).push(MapCall::ShowRoute(steps.len()));
    }

    fn clear_route(&mut self) {
        lock(&self.calls).push(MapCall::ClearRoute);
    }

    fn set_user_marker(&mut self, position: GeoPoint, heading_deg: Option<f64>, _accuracy_m: f64) {
        lock(&self.calls).push(MapCall::UserMarker {
            position,
            heading_deg,
        });
    }

    fn remove_user_marker(&mut self) {
        lock(&self.calls).push(MapCall::RemoveUserMarker);
    }

    fn highlight_step(&mut self, index: usize) {
        lock(&self.calls).push(MapCall::HighlightStep(index));
    }
}
