//! Core types and constants for in-app navigation

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
