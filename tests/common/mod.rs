//! Fake transport shared by the integration tests: captures the installed
//! callbacks so tests can inject periods as if they were the hardware
//! threads.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

/// Call at the top of a test to see crate logs under RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

use framelink::error::{AudioError, Result};
use framelink::transport::{
    CallbackStatus, CaptureCallback, PlaybackCallback, Transport, TransportStream,
};
use framelink::types::{DeviceDescriptor, DeviceId, Direction, StreamConfig};

#[derive(Default)]
struct Shared {
    capture_cb: Option<CaptureCallback>,
    playback_cb: Option<PlaybackCallback>,
    capture_running: bool,
    playback_running: bool,
}

pub struct FakeTransport {
    devices: Vec<DeviceDescriptor>,
    device_count_override: Option<i32>,
    fail_open: bool,
    fail_start: bool,
    shared: Arc<Mutex<Shared>>,
}

impl FakeTransport {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            devices,
            device_count_override: None,
            fail_open: false,
            fail_start: false,
            shared: Arc::default(),
        })
    }

    /// One duplex device: 2 input channels, 2 output channels.
    pub fn stereo_duplex() -> Arc<Self> {
        Self::new(vec![device(0, 2, 2)])
    }

    pub fn with_device_count(count: i32) -> Arc<Self> {
        Arc::new(Self {
            devices: Vec::new(),
            device_count_override: Some(count),
            fail_open: false,
            fail_start: false,
            shared: Arc::default(),
        })
    }

    pub fn failing_open() -> Arc<Self> {
        Arc::new(Self {
            devices: vec![device(0, 2, 2)],
            device_count_override: None,
            fail_open: true,
            fail_start: false,
            shared: Arc::default(),
        })
    }

    pub fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            devices: vec![device(0, 2, 2)],
            device_count_override: None,
            fail_open: false,
            fail_start: true,
            shared: Arc::default(),
        })
    }

    /// Invoke the capture callback as the hardware thread would.
    pub fn drive_capture(&self, input: &[f32]) -> CallbackStatus {
        let mut shared = self.shared.lock().unwrap();
        assert!(shared.capture_running, "capture stream is not running");
        let callback = shared.capture_cb.as_mut().expect("capture stream not open");
        callback(input)
    }

    pub fn drive_playback(&self, output: &mut [f32]) -> CallbackStatus {
        let mut shared = self.shared.lock().unwrap();
        assert!(shared.playback_running, "playback stream is not running");
        let callback = shared.playback_cb.as_mut().expect("playback stream not open");
        callback(output)
    }

    pub fn capture_running(&self) -> bool {
        self.shared.lock().unwrap().capture_running
    }

    pub fn playback_running(&self) -> bool {
        self.shared.lock().unwrap().playback_running
    }

    pub fn capture_open(&self) -> bool {
        self.shared.lock().unwrap().capture_cb.is_some()
    }
}

pub fn device(id: DeviceId, inputs: u16, outputs: u16) -> DeviceDescriptor {
    DeviceDescriptor {
        id,
        name: format!("Fake Device {id}"),
        max_input_channels: inputs,
        max_output_channels: outputs,
        default_latency: 0.01,
    }
}

impl Transport for FakeTransport {
    fn device_count(&self) -> i32 {
        self.device_count_override
            .unwrap_or(self.devices.len() as i32)
    }

    fn device_descriptor(&self, id: DeviceId) -> Option<DeviceDescriptor> {
        self.devices.get(id).cloned()
    }

    fn default_input_device(&self) -> Option<DeviceId> {
        self.devices.iter().position(|d| d.max_input_channels > 0)
    }

    fn default_output_device(&self) -> Option<DeviceId> {
        self.devices.iter().position(|d| d.max_output_channels > 0)
    }

    fn open_capture(
        &self,
        _config: &StreamConfig,
        callback: CaptureCallback,
    ) -> Result<Box<dyn TransportStream>> {
        if self.fail_open {
            return Err(AudioError::StreamOpen {
                direction: Direction::Capture,
                reason: "unsupported configuration".to_string(),
            });
        }
        let mut shared = self.shared.lock().unwrap();
        shared.capture_cb = Some(callback);
        Ok(Box::new(FakeStream {
            direction: Direction::Capture,
            shared: Arc::clone(&self.shared),
            fail_start: self.fail_start,
        }))
    }

    fn open_playback(
        &self,
        _config: &StreamConfig,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn TransportStream>> {
        if self.fail_open {
            return Err(AudioError::StreamOpen {
                direction: Direction::Playback,
                reason: "unsupported configuration".to_string(),
            });
        }
        let mut shared = self.shared.lock().unwrap();
        shared.playback_cb = Some(callback);
        Ok(Box::new(FakeStream {
            direction: Direction::Playback,
            shared: Arc::clone(&self.shared),
            fail_start: self.fail_start,
        }))
    }
}

struct FakeStream {
    direction: Direction,
    shared: Arc<Mutex<Shared>>,
    fail_start: bool,
}

impl FakeStream {
    fn set_running(&self, running: bool) {
        let mut shared = self.shared.lock().unwrap();
        match self.direction {
            Direction::Capture => shared.capture_running = running,
            Direction::Playback => shared.playback_running = running,
        }
    }
}

impl TransportStream for FakeStream {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(AudioError::StreamStart {
                direction: self.direction,
                reason: "device unavailable".to_string(),
            });
        }
        self.set_running(true);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.set_running(false);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.set_running(false);
        let mut shared = self.shared.lock().unwrap();
        match self.direction {
            Direction::Capture => shared.capture_cb = None,
            Direction::Playback => shared.playback_cb = None,
        }
        Ok(())
    }
}
