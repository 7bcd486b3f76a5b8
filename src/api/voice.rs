//! Voice guidance
//!
//! [`VoiceAnnouncer`] keeps at most one utterance in flight: every new
//! request cancels the current one first. Reading a whole route is a
//! sequence paced by a cancellable pause timer between items.

use crate::api::callback::{Callback, CallbackHandle, CallbackRegistry};
use crate::api::formatting::{arrival_text, route_start_text, speech_error_text};
use crate::api::types::{ApiError, ApiResult, SpeechError, VoiceEvent, VoiceState};
use crate::core::NO_STEP;
use crate::platform::{SpeechEvent, SpeechEventKind, SpeechSynthesizer, Utterance, UtteranceId, Voice};
use crate::utils::{Clock, Timer, VoiceConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Message stored when the platform has no speech synthesis
pub const SPEECH_UNSUPPORTED_MESSAGE: &str = "Синтез речи не поддерживается на этом устройстве";

#[derive(Debug, Clone, Copy)]
struct ActiveUtterance {
    id: UtteranceId,
    step_index: Option<usize>,
}

#[derive(Debug, Clone)]
struct Sequence {
    texts: Vec<String>,
    cursor: usize,
}

/// Text-to-speech announcer for route instructions
pub struct VoiceAnnouncer {
    synth: Box<dyn SpeechSynthesizer + Send>,
    config: VoiceConfig,
    clock: Arc<dyn Clock>,
    state: VoiceState,
    active: Option<ActiveUtterance>,
    sequence: Option<Sequence>,
    pause: Timer,
    voice: Option<Voice>,
    error_callbacks: CallbackRegistry<SpeechError>,
}

impl std::fmt::Debug for VoiceAnnouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceAnnouncer")
            .field("state", &self.state)
            .field("active", &self.active)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl VoiceAnnouncer {
    pub fn new(
        synth: Box<dyn SpeechSynthesizer + Send>,
        config: VoiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut state = VoiceState::default();
        if synth.is_available() {
            state.is_enabled = config.enabled_by_default;
        } else {
            warn!("speech synthesis is not available on this platform");
            state.is_supported = false;
            state.error = Some(SPEECH_UNSUPPORTED_MESSAGE.to_string());
        }

        Self {
            synth,
            config,
            clock,
            state,
            active: None,
            sequence: None,
            pause: Timer::new(),
            voice: None,
            error_callbacks: CallbackRegistry::new(),
        }
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled
    }

    pub fn enable(&mut self) {
        if !self.state.is_supported || self.state.is_enabled {
            return;
        }
        self.state.is_enabled = true;
        info!("voice guidance enabled");
    }

    /// Turn voice off, silencing anything in progress
    pub fn disable(&mut self) {
        self.state.is_enabled = false;
        self.stop();
        info!("voice guidance disabled");
    }

    pub fn toggle(&mut self) {
        if self.state.is_enabled {
            self.disable();
        } else {
            self.enable();
        }
    }

    /// Speak one instruction, replacing whatever is being spoken.
    ///
    /// Returns `false` without queueing anything when voice is off or unsupported.
    pub fn speak_step(&mut self, text: &str, step_index: Option<usize>) -> bool {
        if !self.can_speak() {
            return false;
        }

        self.sequence = None;
        self.pause.cancel();
        self.start_utterance(text, step_index);
        true
    }

    /// Read every instruction in order with a pause between them
    pub fn speak_all_steps(&mut self, texts: &[String]) -> bool {
        if !self.can_speak() || texts.is_empty() {
            return false;
        }

        self.pause.cancel();
        self.sequence = Some(Sequence {
            texts: texts.to_vec(),
            cursor: 0,
        });
        info!(steps = texts.len(), "reading full route");
        self.start_utterance(&texts[0], Some(0));
        true
    }

    /// Cancel speech and forget any queued sequence
    pub fn stop(&mut self) {
        self.synth.cancel();
        self.sequence = None;
        self.pause.cancel();
        self.active = None;
        self.state.is_speaking = false;
        self.state.current_step_index = NO_STEP;
    }

    /// Announce a freshly built route, optionally followed by its first instruction
    pub fn announce_route_start(
        &mut self,
        distance: &str,
        duration: &str,
        first_instruction: Option<&str>,
    ) -> bool {
        let mut text = route_start_text(distance, duration);
        if let Some(instruction) = first_instruction {
            text.push(' ');
            text.push_str(instruction);
        }
        self.speak_step(&text, None)
    }

    pub fn announce_arrival(&mut self, destination_name: &str) -> bool {
        self.speak_step(&arrival_text(destination_name), None)
    }

    pub fn on_error(&mut self, callback: Callback<SpeechError>) -> CallbackHandle {
        self.error_callbacks.register(callback)
    }

    pub fn unregister_callback(&mut self, handle: CallbackHandle) -> ApiResult<()> {
        if self.error_callbacks.unregister(handle) {
            Ok(())
        } else {
            Err(ApiError::InvalidCallbackHandle(handle.id()))
        }
    }

    /// Drain speech events and fire the pause timer (call this from the event loop)
    pub fn process(&mut self) -> Vec<VoiceEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.synth.poll_event() {
            self.handle_speech_event(event, &mut events);
        }

        if self.pause.fire_if_due(self.clock.now_ms()) {
            self.speak_next_in_sequence();
        }
        events
    }

    fn can_speak(&self) -> bool {
        self.state.is_supported && self.state.is_enabled
    }

    fn start_utterance(&mut self, text: &str, step_index: Option<usize>) {
        self.synth.cancel();

        let utterance = Utterance {
            text: text.to_string(),
            lang: self.config.language.clone(),
            rate: self.config.rate,
            pitch: self.config.pitch,
            volume: self.config.volume,
            voice: self.select_voice(),
        };
        let id = self.synth.speak(utterance);
        debug!(utterance = id.0, ?step_index, "utterance queued");
        self.active = Some(ActiveUtterance { id, step_index });
    }

    /// Voice matching the configured language, cached once found.
    ///
    /// An exact tag beats a primary-subtag match; within either group the
    /// platform default voice is preferred.
    fn select_voice(&mut self) -> Option<Voice> {
        if self.voice.is_none() {
            let wanted = self.config.language.to_lowercase();
            let primary = wanted.split('-').next().unwrap_or_default().to_string();
            let voices = self.synth.voices();

            let exact = |v: &&Voice| v.lang.to_lowercase() == wanted;
            let same_language =
                |v: &&Voice| v.lang.to_lowercase().split('-').next() == Some(primary.as_str());

            self.voice = pick_preferring_default(&voices, exact)
                .or_else(|| pick_preferring_default(&voices, same_language))
                .cloned();
        }
        self.voice.clone()
    }

    fn handle_speech_event(&mut self, event: SpeechEvent, events: &mut Vec<VoiceEvent>) {
        let Some(active) = self.active else {
            debug!(utterance = event.utterance.0, "speech event with nothing active");
            return;
        };
        if event.utterance != active.id {
            debug!(utterance = event.utterance.0, "dropping event of superseded utterance");
            return;
        }

        match event.kind {
            SpeechEventKind::Started => {
                self.state.is_speaking = true;
                self.state.error = None;
                if let Some(index) = active.step_index {
                    self.state.current_step_index = index as i32;
                }
                events.push(VoiceEvent::UtteranceStarted {
                    step_index: active.step_index,
                });
            }
            SpeechEventKind::Ended => {
                self.active = None;
                self.state.is_speaking = false;
                events.push(VoiceEvent::UtteranceFinished {
                    step_index: active.step_index,
                });
                self.advance_sequence(events);
            }
            SpeechEventKind::Failed(failure) => {
                self.active = None;
                self.state.is_speaking = false;
                if failure.is_self_inflicted() {
                    debug!(reason = failure.reason(), "utterance cancelled");
                } else {
                    let error = SpeechError {
                        message: speech_error_text(failure.reason()),
                    };
                    warn!(reason = failure.reason(), "utterance failed");
                    self.state.error = Some(error.message.clone());
                    self.error_callbacks.emit(&error);
                    events.push(VoiceEvent::Error(error));
                }
                self.advance_sequence(events);
            }
        }
    }

    fn advance_sequence(&mut self, events: &mut Vec<VoiceEvent>) {
        let Some(sequence) = self.sequence.as_mut() else {
            return;
        };

        sequence.cursor += 1;
        if sequence.cursor < sequence.texts.len() {
            self.pause.arm(self.clock.now_ms(), self.config.step_pause_ms);
        } else {
            self.sequence = None;
            self.state.current_step_index = NO_STEP;
            self.state.is_speaking = false;
            info!("full route read");
            events.push(VoiceEvent::SequenceFinished);
        }
    }

    fn speak_next_in_sequence(&mut self) {
        let next = self
            .sequence
            .as_ref()
            .and_then(|s| s.texts.get(s.cursor).map(|text| (text.clone(), s.cursor)));

        if let Some((text, index)) = next {
            debug!(step = index, "pause elapsed, speaking next step");
            self.start_utterance(&text, Some(index));
        }
    }
}

fn pick_preferring_default<'a>(
    voices: &'a [Voice],
    matches: impl Fn(&&'a Voice) -> bool,
) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|v| v.is_default && matches(v))
        .or_else(|| voices.iter().find(|v| matches(v)))
}

impl Drop for VoiceAnnouncer {
    fn drop(&mut self) {
        if self.active.is_some() {
            self.synth.cancel();
        }
    }
}
