//! Text-to-speech capability port

use serde::{Deserialize, Serialize};

/// A synthesizer voice from the platform catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. `ru-RU`
    pub lang: String,
    pub is_default: bool,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            is_default: false,
        }
    }

    /// Mark this voice as the platform default
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// One unit of speech handed to the synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<Voice>,
}

/// Identifies an utterance in later speech events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u32);

/// Why an utterance failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechFailure {
    /// Removed from the queue by `cancel()`
    Canceled,
    /// Cut off while playing by `cancel()`
    Interrupted,
    /// Any other platform reason
    Other(String),
}

impl SpeechFailure {
    /// Failures caused by our own `cancel()` calls
    pub fn is_self_inflicted(&self) -> bool {
        matches!(self, SpeechFailure::Canceled | SpeechFailure::Interrupted)
    }

    pub fn reason(&self) -> &str {
        match self {
            SpeechFailure::Canceled => "canceled",
            SpeechFailure::Interrupted => "interrupted",
            SpeechFailure::Other(reason) => reason,
        }
    }
}

/// Lifecycle notification for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEventKind {
    Started,
    Ended,
    Failed(SpeechFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub utterance: UtteranceId,
    pub kind: SpeechEventKind,
}

/// Platform speech synthesis abstraction
pub trait SpeechSynthesizer {
    /// Whether the platform offers speech synthesis at all
    fn is_available(&self) -> bool;

    /// Current voice catalog; may be empty until the platform loads it
    fn voices(&self) -> Vec<Voice>;

    /// Queue an utterance for playback
    fn speak(&mut self, utterance: Utterance) -> UtteranceId;

    /// Stop playback and drop everything queued
    fn cancel(&mut self);

    /// Next buffered lifecycle event, if any
    fn poll_event(&mut self) -> Option<SpeechEvent>;
}
