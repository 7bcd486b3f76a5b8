//! Geolocation capability port

use crate::core::LocationSample;
use crate::utils::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Options passed with every position request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u32,
    pub maximum_age_ms: u32,
}

impl PositionOptions {
    /// Options for the immediate fix: fresh position, short timeout
    pub fn one_shot(config: &TrackerConfig) -> Self {
        Self {
            enable_high_accuracy: config.enable_high_accuracy,
            timeout_ms: config.one_shot_timeout_ms,
            maximum_age_ms: 0,
        }
    }

    /// Options for the continuous watch
    pub fn watch(config: &TrackerConfig) -> Self {
        Self {
            enable_high_accuracy: config.enable_high_accuracy,
            timeout_ms: config.watch_timeout_ms,
            maximum_age_ms: config.update_interval_ms,
        }
    }
}

/// Handle of a continuous position subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u32);

/// Handle of a one-shot position request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u32);

/// Which request a delivery answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    OneShot(RequestId),
    Watch(WatchId),
}

/// Platform failure categories, numbered like the W3C geolocation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

impl PositionErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => PositionErrorCode::PermissionDenied,
            2 => PositionErrorCode::PositionUnavailable,
            3 => PositionErrorCode::Timeout,
            _ => PositionErrorCode::Unknown,
        }
    }
}

/// Raw failure reported by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct PositionError {
    pub code: PositionErrorCode,
    /// Platform diagnostic text, not shown to users
    pub message: String,
}

impl PositionError {
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_code(code: u16, message: impl Into<String>) -> Self {
        Self::new(PositionErrorCode::from_code(code), message)
    }
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for PositionError {}

/// One delivery from the platform: a fix or a failure
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEvent {
    pub source: PositionSource,
    pub result: Result<LocationSample, PositionError>,
}

/// Platform geolocation abstraction.
///
/// Requests return immediately with a handle; results are buffered by the
/// adapter and drained by the tracker through [`poll_event`](Self::poll_event)
/// on the application event loop.
pub trait GeolocationProvider {
    /// Whether the platform offers geolocation at all
    fn is_available(&self) -> bool;

    /// Request a single fix
    fn get_current_position(&mut self, options: &PositionOptions) -> RequestId;

    /// Open a continuous subscription
    fn watch_position(&mut self, options: &PositionOptions) -> WatchId;

    /// Release a subscription. Releasing an unknown or released id is a no-op.
    fn clear_watch(&mut self, id: WatchId);

    /// Next buffered delivery, if any
    fn poll_event(&mut self) -> Option<PositionEvent>;
}
