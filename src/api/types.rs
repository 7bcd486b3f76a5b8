//! Shared state, event and error types of the navigation components

use crate::core::{BadgeDefinition, LocationSample, RouteStep, NO_STEP};
use crate::platform::{PositionErrorCode, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned synchronously by component operations
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid route: {reason}")]
    InvalidRoute { reason: String },
    #[error("unknown callback handle {0}")]
    InvalidCallbackHandle(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Location tracking failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackingErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
    /// The platform has no geolocation; terminal
    Unsupported,
}

impl TrackingErrorKind {
    /// User-facing message
    pub fn message(&self) -> &'static str {
        match self {
            TrackingErrorKind::PermissionDenied => "Доступ к геолокации запрещён",
            TrackingErrorKind::PositionUnavailable => "Информация о местоположении недоступна",
            TrackingErrorKind::Timeout => "Превышено время ожидания геолокации",
            TrackingErrorKind::Unknown => "Неизвестная ошибка геолокации",
            TrackingErrorKind::Unsupported => "Геолокация не поддерживается вашим устройством",
        }
    }
}

impl From<PositionErrorCode> for TrackingErrorKind {
    fn from(code: PositionErrorCode) -> Self {
        match code {
            PositionErrorCode::PermissionDenied => TrackingErrorKind::PermissionDenied,
            PositionErrorCode::PositionUnavailable => TrackingErrorKind::PositionUnavailable,
            PositionErrorCode::Timeout => TrackingErrorKind::Timeout,
            PositionErrorCode::Unknown => TrackingErrorKind::Unknown,
        }
    }
}

/// Tracking error as stored in state and emitted to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingError {
    pub kind: TrackingErrorKind,
    pub message: String,
}

impl From<TrackingErrorKind> for TrackingError {
    fn from(kind: TrackingErrorKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
        }
    }
}

/// Observable state of the location tracker
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingState {
    pub is_supported: bool,
    pub is_tracking: bool,
    pub has_permission: bool,
    pub current_location: Option<LocationSample>,
    pub error: Option<TrackingError>,
    /// Index of the current route step, `-1` when none
    pub current_step_index: i32,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            is_supported: true,
            is_tracking: false,
            has_permission: false,
            current_location: None,
            error: None,
            current_step_index: NO_STEP,
        }
    }
}

/// The user moved on to a new route step
#[derive(Debug, Clone, PartialEq)]
pub struct StepChanged {
    pub step_index: usize,
    pub step: RouteStep,
}

/// The step after the current one is close
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachingStep {
    pub step_index: usize,
    pub distance_m: f64,
}

/// Everything the tracker emits while processing deliveries
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    LocationUpdated(LocationSample),
    StepChanged(StepChanged),
    ApproachingStep(ApproachingStep),
    Error(TrackingError),
}

/// Observable state of the voice announcer
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceState {
    pub is_supported: bool,
    pub is_enabled: bool,
    pub is_speaking: bool,
    /// Step whose instruction is being spoken, `-1` when none
    pub current_step_index: i32,
    pub error: Option<String>,
}

impl Default for VoiceState {
    fn default() -> Self {
        Self {
            is_supported: true,
            is_enabled: false,
            is_speaking: false,
            current_step_index: NO_STEP,
            error: None,
        }
    }
}

/// Speech failure surfaced to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechError {
    pub message: String,
}

/// Everything the announcer emits while processing speech events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    UtteranceStarted { step_index: Option<usize> },
    UtteranceFinished { step_index: Option<usize> },
    SequenceFinished,
    Error(SpeechError),
}

/// A badge is ready to be shown as a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementReady {
    pub badge: BadgeDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        let err: TrackingError = TrackingErrorKind::from(PositionErrorCode::from_code(1)).into();
        assert_eq!(err.kind, TrackingErrorKind::PermissionDenied);
        assert_eq!(err.message, "Доступ к геолокации запрещён");

        assert_eq!(
            TrackingErrorKind::from(PositionErrorCode::from_code(3)),
            TrackingErrorKind::Timeout
        );
        assert_eq!(
            TrackingErrorKind::from(PositionErrorCode::from_code(42)),
            TrackingErrorKind::Unknown
        );
    }

    #[test]
    fn test_default_states() {
        let tracking = TrackingState::default();
        assert_eq!(tracking.current_step_index, -1);
        assert!(!tracking.is_tracking);

        let voice = VoiceState::default();
        assert!(!voice.is_enabled);
        assert_eq!(voice.current_step_index, -1);
    }
}
