use thiserror::Error;

use crate::types::{Direction, StreamState};

/// Errors surfaced synchronously by lifecycle and enumeration operations.
/// Overruns and underruns are not errors; they are reported through
/// [`crate::types::StreamMetrics`].
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("transport initialization failed: {0}")]
    TransportInit(String),

    #[error("{direction} device '{device}' not found")]
    DeviceNotFound { direction: Direction, device: String },

    #[error("device enumeration failed: {0}")]
    DeviceEnumeration(String),

    #[error("failed to open {direction} stream: {reason}")]
    StreamOpen { direction: Direction, reason: String },

    #[error("failed to start {direction} stream: {reason}")]
    StreamStart { direction: Direction, reason: String },

    #[error("failed to close {direction} stream: {reason}")]
    StreamClose { direction: Direction, reason: String },

    #[error("invalid transition: cannot {op} a {state} {direction} stream")]
    InvalidStateTransition {
        direction: Direction,
        op: &'static str,
        state: StreamState,
    },
}

pub type Result<T> = std::result::Result<T, AudioError>;
