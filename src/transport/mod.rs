//! Seam to the external audio transport.
//!
//! The transport owns the real-time threads and invokes the registered
//! callback once per period; this crate never spawns or schedules those
//! threads itself. The production backend lives in [`cpal_backend`]; tests
//! substitute their own implementations.

mod cpal_backend;

pub use cpal_backend::CpalTransport;

use crate::error::Result;
use crate::types::{DeviceDescriptor, DeviceId, StreamConfig};

/// Value a callback returns to the transport after each period.
///
/// Nothing in this crate emits `Complete`: an empty playback queue is an
/// underrun (silence), not end of stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Continue,
    Complete,
}

/// Invoked with one period of interleaved input samples.
pub type CaptureCallback = Box<dyn FnMut(&[f32]) -> CallbackStatus + Send + 'static>;

/// Invoked with one period of interleaved output samples to fill.
pub type PlaybackCallback = Box<dyn FnMut(&mut [f32]) -> CallbackStatus + Send + 'static>;

/// Device enumeration and stream construction primitives.
pub trait Transport: Send + Sync {
    /// Number of devices, or a negative backend error code (the underlying
    /// C transports report errors that way; the catalog maps negatives to
    /// an enumeration error).
    fn device_count(&self) -> i32;

    /// Snapshot of one device, `None` if the id does not resolve.
    fn device_descriptor(&self, id: DeviceId) -> Option<DeviceDescriptor>;

    fn default_input_device(&self) -> Option<DeviceId>;

    fn default_output_device(&self) -> Option<DeviceId>;

    /// Open a capture stream delivering periods to `callback`. The stream
    /// is created paused; callbacks begin after [`TransportStream::start`].
    fn open_capture(
        &self,
        config: &StreamConfig,
        callback: CaptureCallback,
    ) -> Result<Box<dyn TransportStream>>;

    /// Open a playback stream pulling periods from `callback`.
    fn open_playback(
        &self,
        config: &StreamConfig,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn TransportStream>>;
}

/// Handle to one open backend stream.
pub trait TransportStream: Send {
    fn start(&mut self) -> Result<()>;

    /// Cease callback invocations. Returns only once the backend guarantees
    /// no further invocation will be observed; an in-flight callback runs
    /// to completion first.
    fn stop(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
