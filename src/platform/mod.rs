//! Platform capability ports and adapters
//!
//! The navigation components only talk to the device through these traits:
//! geolocation, speech synthesis, durable key-value storage and the map view.
//! Concrete stores and scripted mocks live alongside them.

pub mod geolocation;
pub mod speech;
pub mod storage;
pub mod map;
pub mod mock;
pub mod error;

pub use geolocation::{
    GeolocationProvider, PositionError, PositionErrorCode, PositionEvent, PositionOptions,
    PositionSource, RequestId, WatchId,
};
pub use speech::{
    SpeechEvent, SpeechEventKind, SpeechFailure, SpeechSynthesizer, Utterance, UtteranceId, Voice,
};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, SledStore};
pub use map::MapView;
pub use mock::{MapCall, MockGeolocation, MockMapView, MockSpeech};
pub use error::{StoreError, StoreResult};
