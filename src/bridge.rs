use std::collections::BTreeMap;
use std::sync::Arc;

use crate::devices::DeviceCatalog;
use crate::error::{AudioError, Result};
use crate::frame::FrameBuffer;
use crate::stream::StreamSlot;
use crate::transport::{CpalTransport, Transport};
use crate::types::{
    DeviceDescriptor, DeviceId, Direction, StreamConfig, StreamMetrics, StreamState,
};

/// Application-facing surface: device queries, per-direction stream
/// lifecycle, and the non-real-time ends of the frame queues.
///
/// The capture and playback directions are independent state machines;
/// either can be open without the other. All methods here run on the
/// application thread at whatever pace it chooses; none of them block on
/// or are visible to the real-time callbacks beyond the wait-free queues.
pub struct AudioBridge {
    transport: Arc<dyn Transport>,
    capture: StreamSlot,
    playback: StreamSlot,
}

impl AudioBridge {
    /// Bridge over the process-wide cpal transport.
    pub fn new() -> Result<Self> {
        let transport = CpalTransport::acquire()?;
        Ok(Self::with_transport(transport))
    }

    /// Bridge over a caller-supplied transport (alternate backends, tests).
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            capture: StreamSlot::new(Direction::Capture),
            playback: StreamSlot::new(Direction::Playback),
        }
    }

    pub fn input_devices(&self) -> Result<BTreeMap<DeviceId, DeviceDescriptor>> {
        DeviceCatalog::new(self.transport.as_ref()).list_input_devices()
    }

    pub fn output_devices(&self) -> Result<BTreeMap<DeviceId, DeviceDescriptor>> {
        DeviceCatalog::new(self.transport.as_ref()).list_output_devices()
    }

    /// Open a capture stream on `device` with the derived configuration.
    pub fn open_capture_stream(&mut self, device: DeviceId) -> Result<()> {
        let config = self.stream_config(Direction::Capture, device)?;
        self.capture.open(self.transport.as_ref(), config)
    }

    /// Open a capture stream on the transport's default input device.
    pub fn open_default_capture_stream(&mut self) -> Result<()> {
        let device = self
            .transport
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound {
                direction: Direction::Capture,
                device: "default".to_string(),
            })?;
        self.open_capture_stream(device)
    }

    /// Open a capture stream with an explicit configuration, e.g. a larger
    /// queue capacity.
    pub fn open_capture_stream_with(&mut self, config: StreamConfig) -> Result<()> {
        self.capture.open(self.transport.as_ref(), config)
    }

    pub fn open_playback_stream(&mut self, device: DeviceId) -> Result<()> {
        let config = self.stream_config(Direction::Playback, device)?;
        self.playback.open(self.transport.as_ref(), config)
    }

    pub fn open_default_playback_stream(&mut self) -> Result<()> {
        let device = self
            .transport
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound {
                direction: Direction::Playback,
                device: "default".to_string(),
            })?;
        self.open_playback_stream(device)
    }

    pub fn open_playback_stream_with(&mut self, config: StreamConfig) -> Result<()> {
        self.playback.open(self.transport.as_ref(), config)
    }

    pub fn start(&mut self, direction: Direction) -> Result<()> {
        self.slot_mut(direction).start()
    }

    pub fn stop(&mut self, direction: Direction) -> Result<()> {
        self.slot_mut(direction).stop()
    }

    pub fn close(&mut self, direction: Direction) -> Result<()> {
        self.slot_mut(direction).close()
    }

    pub fn state(&self, direction: Direction) -> StreamState {
        self.slot(direction).state()
    }

    pub fn metrics(&self, direction: Direction) -> StreamMetrics {
        self.slot(direction).metrics()
    }

    pub fn config(&self, direction: Direction) -> Option<&StreamConfig> {
        self.slot(direction).config()
    }

    /// Take the oldest captured frame, if any. Never blocks. The caller
    /// owns the frame; handing it back via [`release_captured`] keeps the
    /// capture pool full, while dropping it shrinks the pool and will
    /// eventually show up as overruns.
    ///
    /// [`release_captured`]: AudioBridge::release_captured
    pub fn poll_captured(&mut self) -> Option<FrameBuffer> {
        self.capture.poll_captured()
    }

    /// Return a drained capture frame to its pool.
    pub fn release_captured(&mut self, frame: FrameBuffer) {
        self.capture.release_captured(frame)
    }

    /// Claim an empty frame from the playback pool to fill and submit.
    /// `None` means every frame is queued or in flight; try again after
    /// the stream has played some.
    pub fn next_playback_buffer(&mut self) -> Option<FrameBuffer> {
        self.playback.next_playback_buffer()
    }

    /// Queue a filled frame for playback. On a full queue the frame comes
    /// back so the caller can retry; backpressure is never visible to the
    /// real-time thread.
    pub fn submit_for_playback(
        &mut self,
        frame: FrameBuffer,
    ) -> std::result::Result<(), FrameBuffer> {
        self.playback.submit_for_playback(frame)
    }

    fn stream_config(&self, direction: Direction, device: DeviceId) -> Result<StreamConfig> {
        let catalog = DeviceCatalog::new(self.transport.as_ref());
        let devices = match direction {
            Direction::Capture => catalog.list_input_devices()?,
            Direction::Playback => catalog.list_output_devices()?,
        };
        let descriptor = devices
            .get(&device)
            .ok_or_else(|| AudioError::DeviceNotFound {
                direction,
                device: device.to_string(),
            })?;
        Ok(StreamConfig::for_device(descriptor, direction))
    }

    fn slot(&self, direction: Direction) -> &StreamSlot {
        match direction {
            Direction::Capture => &self.capture,
            Direction::Playback => &self.playback,
        }
    }

    fn slot_mut(&mut self, direction: Direction) -> &mut StreamSlot {
        match direction {
            Direction::Capture => &mut self.capture,
            Direction::Playback => &mut self.playback,
        }
    }
}
