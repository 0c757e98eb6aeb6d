//! Real-time audio capture and playback bridge.
//!
//! Hardware callback threads and the application thread exchange whole
//! frames of interleaved f32 samples through bounded, wait-free
//! single-producer/single-consumer queues. The callbacks never block,
//! never allocate, and never fail a stream over transient backpressure:
//! capture drops the newest period on overflow, playback emits silence on
//! underrun, and both conditions surface as counters rather than errors.
//!
//! [`AudioBridge`] is the entry point: enumerate devices, open a stream
//! per direction, start it, then poll captured frames and submit playback
//! frames at your own pace.
//!
//! ```no_run
//! use framelink::{AudioBridge, Direction};
//!
//! # fn main() -> framelink::Result<()> {
//! let mut bridge = AudioBridge::new()?;
//! for (id, device) in bridge.input_devices()? {
//!     println!("{id}: {}", device.name);
//! }
//! bridge.open_default_capture_stream()?;
//! bridge.start(Direction::Capture)?;
//! while let Some(frame) = bridge.poll_captured() {
//!     // use frame.samples() ...
//!     bridge.release_captured(frame);
//! }
//! bridge.stop(Direction::Capture)?;
//! bridge.close(Direction::Capture)?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod devices;
pub mod error;
pub mod frame;
pub mod queue;
mod stream;
pub mod transport;
pub mod types;

pub use bridge::AudioBridge;
pub use error::{AudioError, Result};
pub use frame::FrameBuffer;
pub use types::{
    DeviceDescriptor, DeviceId, Direction, StreamConfig, StreamMetrics, StreamState,
};
