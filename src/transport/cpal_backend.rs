//! cpal-backed transport.
//!
//! `cpal::Stream` is not `Send`, so every stream is built, started, and
//! dropped on one dedicated stream-manager thread; handles talk to it over
//! a command channel and wait for the reply, which makes stop and close
//! synchronous with the backend.
//!
//! The transport itself is a process-wide resource: all live handles share
//! one instance, and the manager thread shuts down when the last handle
//! drops. Per-instance init/teardown of a global audio backend is unsafe
//! when several owners exist.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, LazyLock, Mutex, Weak};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

use crate::error::{AudioError, Result};
use crate::transport::{CaptureCallback, PlaybackCallback, Transport, TransportStream};
use crate::types::{DeviceDescriptor, DeviceId, Direction, StreamConfig};

type Reply<T> = mpsc::Sender<std::result::Result<T, String>>;

enum StreamCommand {
    OpenCapture {
        device: cpal::Device,
        config: cpal::StreamConfig,
        callback: CaptureCallback,
        reply: Reply<u64>,
    },
    OpenPlayback {
        device: cpal::Device,
        config: cpal::StreamConfig,
        callback: PlaybackCallback,
        reply: Reply<u64>,
    },
    Start { id: u64, reply: Reply<()> },
    Pause { id: u64, reply: Reply<()> },
    Close { id: u64, reply: Reply<()> },
}

static ACTIVE: LazyLock<Mutex<Weak<CpalTransport>>> =
    LazyLock::new(|| Mutex::new(Weak::new()));

/// Production [`Transport`] over the default cpal host.
pub struct CpalTransport {
    cmd_tx: mpsc::Sender<StreamCommand>,
}

impl CpalTransport {
    /// Acquire the process-wide transport, initializing it on first use.
    /// Every caller shares the same instance; teardown happens when the
    /// last `Arc` drops.
    pub fn acquire() -> Result<Arc<Self>> {
        let mut active = ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = active.upgrade() {
            return Ok(existing);
        }
        let transport = Arc::new(Self::initialize()?);
        *active = Arc::downgrade(&transport);
        Ok(transport)
    }

    fn initialize() -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        thread::Builder::new()
            .name("framelink-streams".into())
            .spawn(move || run_stream_manager(cmd_rx))
            .map_err(|e| AudioError::TransportInit(e.to_string()))?;
        info!("audio transport initialized");
        Ok(Self { cmd_tx })
    }

    fn resolve_device(&self, direction: Direction, id: DeviceId) -> Result<cpal::Device> {
        let devices = collect_devices().map_err(|e| AudioError::DeviceEnumeration(e.to_string()))?;
        devices
            .into_iter()
            .nth(id)
            .ok_or_else(|| AudioError::DeviceNotFound {
                direction,
                device: id.to_string(),
            })
    }
}

impl Drop for CpalTransport {
    fn drop(&mut self) {
        // Dropping cmd_tx disconnects the channel; the manager thread exits
        // and tears down any stream still alive.
        info!("audio transport shut down");
    }
}

impl Transport for CpalTransport {
    fn device_count(&self) -> i32 {
        match collect_devices() {
            Ok(devices) => devices.len() as i32,
            Err(err) => {
                warn!(%err, "device enumeration failed");
                -1
            }
        }
    }

    fn device_descriptor(&self, id: DeviceId) -> Option<DeviceDescriptor> {
        let devices = collect_devices().ok()?;
        devices.get(id).map(|device| describe(id, device))
    }

    fn default_input_device(&self) -> Option<DeviceId> {
        let default_name = cpal::default_host().default_input_device()?.name().ok()?;
        let devices = collect_devices().ok()?;
        devices
            .iter()
            .position(|d| d.name().ok().as_deref() == Some(default_name.as_str()))
    }

    fn default_output_device(&self) -> Option<DeviceId> {
        let default_name = cpal::default_host().default_output_device()?.name().ok()?;
        let devices = collect_devices().ok()?;
        devices
            .iter()
            .position(|d| d.name().ok().as_deref() == Some(default_name.as_str()))
    }

    fn open_capture(
        &self,
        config: &StreamConfig,
        callback: CaptureCallback,
    ) -> Result<Box<dyn TransportStream>> {
        let device = self.resolve_device(Direction::Capture, config.device_id)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(StreamCommand::OpenCapture {
                device,
                config: cpal_stream_config(config),
                callback,
                reply: reply_tx,
            })
            .map_err(|_| stream_manager_gone(Direction::Capture))?;
        let id = recv_reply(reply_rx).map_err(|reason| AudioError::StreamOpen {
            direction: Direction::Capture,
            reason,
        })?;
        info!(device = config.device_id, channels = config.channels, "opened capture stream");
        Ok(Box::new(CpalStream {
            id,
            direction: Direction::Capture,
            cmd_tx: self.cmd_tx.clone(),
            closed: false,
        }))
    }

    fn open_playback(
        &self,
        config: &StreamConfig,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn TransportStream>> {
        let device = self.resolve_device(Direction::Playback, config.device_id)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(StreamCommand::OpenPlayback {
                device,
                config: cpal_stream_config(config),
                callback,
                reply: reply_tx,
            })
            .map_err(|_| stream_manager_gone(Direction::Playback))?;
        let id = recv_reply(reply_rx).map_err(|reason| AudioError::StreamOpen {
            direction: Direction::Playback,
            reason,
        })?;
        info!(device = config.device_id, channels = config.channels, "opened playback stream");
        Ok(Box::new(CpalStream {
            id,
            direction: Direction::Playback,
            cmd_tx: self.cmd_tx.clone(),
            closed: false,
        }))
    }
}

struct CpalStream {
    id: u64,
    direction: Direction,
    cmd_tx: mpsc::Sender<StreamCommand>,
    closed: bool,
}

impl CpalStream {
    fn request(
        &self,
        make: impl FnOnce(Reply<()>) -> StreamCommand,
    ) -> std::result::Result<(), String> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .map_err(|_| "stream manager unavailable".to_string())?;
        recv_reply(reply_rx)
    }
}

impl TransportStream for CpalStream {
    fn start(&mut self) -> Result<()> {
        let id = self.id;
        self.request(|reply| StreamCommand::Start { id, reply })
            .map_err(|reason| AudioError::StreamStart {
                direction: self.direction,
                reason,
            })
    }

    fn stop(&mut self) -> Result<()> {
        // The reply arrives only after the backend pause returned on the
        // manager thread, so no callback can be observed past this point.
        let id = self.id;
        self.request(|reply| StreamCommand::Pause { id, reply })
            .map_err(|reason| AudioError::StreamClose {
                direction: self.direction,
                reason,
            })
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        let id = self.id;
        self.request(|reply| StreamCommand::Close { id, reply })
            .map_err(|reason| AudioError::StreamClose {
                direction: self.direction,
                reason,
            })
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        if !self.closed {
            let (reply_tx, _reply_rx) = mpsc::channel();
            let _ = self.cmd_tx.send(StreamCommand::Close {
                id: self.id,
                reply: reply_tx,
            });
        }
    }
}

fn run_stream_manager(cmd_rx: mpsc::Receiver<StreamCommand>) {
    let mut streams: HashMap<u64, cpal::Stream> = HashMap::new();
    let mut next_id = 0u64;
    debug!("stream manager thread started");

    while let Ok(command) = cmd_rx.recv() {
        match command {
            StreamCommand::OpenCapture { device, config, mut callback, reply } => {
                let result = device
                    .build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            let _ = callback(data);
                        },
                        |err| warn!(%err, "capture stream error"),
                        None,
                    )
                    .map_err(|e| e.to_string())
                    .and_then(|stream| {
                        // Some hosts start streams eagerly; Open means paused.
                        stream.pause().map_err(|e| e.to_string())?;
                        let id = next_id;
                        next_id += 1;
                        streams.insert(id, stream);
                        Ok(id)
                    });
                let _ = reply.send(result);
            }
            StreamCommand::OpenPlayback { device, config, mut callback, reply } => {
                let result = device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            let _ = callback(data);
                        },
                        |err| warn!(%err, "playback stream error"),
                        None,
                    )
                    .map_err(|e| e.to_string())
                    .and_then(|stream| {
                        stream.pause().map_err(|e| e.to_string())?;
                        let id = next_id;
                        next_id += 1;
                        streams.insert(id, stream);
                        Ok(id)
                    });
                let _ = reply.send(result);
            }
            StreamCommand::Start { id, reply } => {
                let result = match streams.get(&id) {
                    Some(stream) => stream.play().map_err(|e| e.to_string()),
                    None => Err(format!("unknown stream id {id}")),
                };
                let _ = reply.send(result);
            }
            StreamCommand::Pause { id, reply } => {
                let result = match streams.get(&id) {
                    Some(stream) => stream.pause().map_err(|e| e.to_string()),
                    None => Err(format!("unknown stream id {id}")),
                };
                let _ = reply.send(result);
            }
            StreamCommand::Close { id, reply } => {
                let result = match streams.remove(&id) {
                    Some(stream) => {
                        let _ = stream.pause();
                        drop(stream);
                        Ok(())
                    }
                    None => Err(format!("unknown stream id {id}")),
                };
                let _ = reply.send(result);
            }
        }
    }

    debug!(remaining = streams.len(), "stream manager thread stopped");
}

fn recv_reply<T>(
    rx: mpsc::Receiver<std::result::Result<T, String>>,
) -> std::result::Result<T, String> {
    rx.recv()
        .map_err(|_| "stream manager dropped the request".to_string())?
}

fn stream_manager_gone(direction: Direction) -> AudioError {
    AudioError::StreamOpen {
        direction,
        reason: "stream manager unavailable".to_string(),
    }
}

fn cpal_stream_config(config: &StreamConfig) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(config.frames_per_callback as u32),
    }
}

/// Collecting into a Vec first avoids CoreAudio iterator issues on macOS.
fn collect_devices() -> std::result::Result<Vec<cpal::Device>, cpal::DevicesError> {
    let host = cpal::default_host();
    Ok(host.devices()?.collect())
}

fn describe(id: DeviceId, device: &cpal::Device) -> DeviceDescriptor {
    let name = device
        .name()
        .unwrap_or_else(|_| format!("Device {id}"));
    let max_input_channels = device
        .supported_input_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0);
    let max_output_channels = device
        .supported_output_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0);
    DeviceDescriptor {
        id,
        name,
        max_input_channels,
        max_output_channels,
        default_latency: default_latency(device),
    }
}

/// cpal exposes no latency query; approximate one minimum period from the
/// default config, falling back to 10ms.
fn default_latency(device: &cpal::Device) -> f64 {
    let config = device
        .default_input_config()
        .or_else(|_| device.default_output_config());
    match config {
        Ok(config) => match config.buffer_size() {
            cpal::SupportedBufferSize::Range { min, .. } if *min > 0 => {
                f64::from(*min) / f64::from(config.sample_rate().0)
            }
            _ => 0.01,
        },
        Err(_) => 0.01,
    }
}
