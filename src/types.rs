use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transport device index, valid for one enumeration snapshot.
pub type DeviceId = usize;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_FRAMES_PER_CALLBACK: usize = 512;
/// Default transfer queue depth in callback periods. Bounds worst-case
/// latency and memory: larger queues absorb bursts, smaller ones drop sooner.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Stream direction relative to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Capture,
    Playback,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Capture => "capture",
            Direction::Playback => "playback",
        })
    }
}

/// Lifecycle state of one stream direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    Closed,
    Open,
    Running,
    Stopped,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamState::Closed => "closed",
            StreamState::Open => "open",
            StreamState::Running => "running",
            StreamState::Stopped => "stopped",
        })
    }
}

/// Immutable snapshot of one hardware endpoint taken at enumeration time.
/// Not guaranteed to stay valid if the hardware topology changes; callers
/// re-enumerate rather than cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub name: String,
    pub max_input_channels: u16,
    pub max_output_channels: u16,
    /// Suggested latency in seconds, roughly one default period.
    pub default_latency: f64,
}

/// Configuration for one stream direction. Sample format is always f32;
/// rate and frames-per-callback are fixed for the life of the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub device_id: DeviceId,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames_per_callback: usize,
    pub suggested_latency: f64,
    /// Transfer queue and frame pool depth in periods.
    pub queue_capacity: usize,
}

impl StreamConfig {
    /// Derive a configuration from a device snapshot. The channel count
    /// follows the device capability, capped at stereo.
    pub fn for_device(descriptor: &DeviceDescriptor, direction: Direction) -> Self {
        let channels = match direction {
            Direction::Capture => descriptor.max_input_channels,
            Direction::Playback => descriptor.max_output_channels,
        };
        Self {
            device_id: descriptor.id,
            channels: channels.clamp(1, 2),
            sample_rate: DEFAULT_SAMPLE_RATE,
            frames_per_callback: DEFAULT_FRAMES_PER_CALLBACK,
            suggested_latency: descriptor.default_latency,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Interleaved samples delivered per callback invocation.
    pub fn samples_per_callback(&self) -> usize {
        self.frames_per_callback * self.channels as usize
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 {
            return Err("channel count must be nonzero".into());
        }
        if self.sample_rate < 8_000 || self.sample_rate > 192_000 {
            return Err(format!(
                "invalid sample rate: {} (must be 8000-192000 Hz)",
                self.sample_rate
            ));
        }
        if self.frames_per_callback < 16 || self.frames_per_callback > 8_192 {
            return Err(format!(
                "invalid frames per callback: {} (must be 16-8192)",
                self.frames_per_callback
            ));
        }
        if self.queue_capacity == 0 {
            return Err("queue capacity must be nonzero".into());
        }
        Ok(())
    }
}

/// Counters shared between a callback adapter and the application side.
/// Overruns and underruns are expected-under-load conditions, reported
/// here instead of as errors; nothing may unwind out of a callback.
#[derive(Debug, Default)]
pub struct StreamCounters {
    callbacks: AtomicU64,
    overruns: AtomicU64,
    underruns: AtomicU64,
}

impl StreamCounters {
    pub(crate) fn record_callback(&self) {
        self.callbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StreamMetrics {
        StreamMetrics {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics for one stream direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamMetrics {
    pub callbacks: u64,
    pub overruns: u64,
    pub underruns: u64,
}
