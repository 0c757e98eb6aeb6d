//! Per-direction stream lifecycle and the real-time callback adapters.
//!
//! Each open stream owns two wait-free rings: the transfer queue carrying
//! full frames between the callback thread and the application, and a
//! pool ring carrying empty frames back the other way. Pool slots equal
//! transfer capacity, so a claimed frame can always be enqueued; the
//! adapters keep a spare slot anyway so a rejected frame is retained
//! instead of being freed on the real-time thread.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AudioError, Result};
use crate::frame::{frame_pool, FrameBuffer};
use crate::queue::{transfer_queue, FrameReceiver, FrameSender};
use crate::transport::{CallbackStatus, Transport, TransportStream};
use crate::types::{Direction, StreamConfig, StreamCounters, StreamMetrics, StreamState};

/// Application-side ring ends for one open stream.
enum Endpoints {
    Capture {
        /// Full frames arriving from the capture callback.
        inbound: FrameReceiver,
        /// Empty frames handed back for the callback to reuse.
        release: FrameSender,
    },
    Playback {
        /// Full frames headed for the playback callback.
        outbound: FrameSender,
        /// Empty frames the callback has finished with.
        claim: FrameReceiver,
    },
}

/// State machine for one direction: Closed → Open → Running → Stopped →
/// Closed. Illegal transitions error without mutating state.
pub(crate) struct StreamSlot {
    direction: Direction,
    state: StreamState,
    stream: Option<Box<dyn TransportStream>>,
    endpoints: Option<Endpoints>,
    counters: Arc<StreamCounters>,
    config: Option<StreamConfig>,
}

impl StreamSlot {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            state: StreamState::Closed,
            stream: None,
            endpoints: None,
            counters: Arc::new(StreamCounters::default()),
            config: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn metrics(&self) -> StreamMetrics {
        self.counters.snapshot()
    }

    pub fn config(&self) -> Option<&StreamConfig> {
        self.config.as_ref()
    }

    /// Closed → Open: allocate the rings and the frame pool, install the
    /// callback adapter, and open the backend stream.
    pub fn open(&mut self, transport: &dyn Transport, config: StreamConfig) -> Result<()> {
        if self.state != StreamState::Closed {
            return Err(self.invalid("open"));
        }
        config.validate().map_err(|reason| AudioError::StreamOpen {
            direction: self.direction,
            reason,
        })?;

        self.counters = Arc::new(StreamCounters::default());
        let (transfer_tx, transfer_rx) = transfer_queue(config.queue_capacity);
        let (pool_tx, pool_rx) = frame_pool(
            config.queue_capacity,
            config.frames_per_callback,
            config.channels,
        );

        let stream = match self.direction {
            Direction::Capture => {
                let mut adapter = CaptureAdapter {
                    outbound: transfer_tx,
                    pool: pool_rx,
                    spare: None,
                    counters: Arc::clone(&self.counters),
                };
                let stream = transport
                    .open_capture(&config, Box::new(move |input| adapter.on_frames(input)))?;
                self.endpoints = Some(Endpoints::Capture {
                    inbound: transfer_rx,
                    release: pool_tx,
                });
                stream
            }
            Direction::Playback => {
                let mut adapter = PlaybackAdapter {
                    inbound: transfer_rx,
                    recycle: pool_tx,
                    spare: None,
                    counters: Arc::clone(&self.counters),
                };
                let stream = transport
                    .open_playback(&config, Box::new(move |output| adapter.on_frames(output)))?;
                self.endpoints = Some(Endpoints::Playback {
                    outbound: transfer_tx,
                    claim: pool_rx,
                });
                stream
            }
        };

        self.stream = Some(stream);
        self.config = Some(config);
        self.state = StreamState::Open;
        info!(direction = %self.direction, "stream opened");
        Ok(())
    }

    /// Open → Running.
    pub fn start(&mut self) -> Result<()> {
        if self.state != StreamState::Open {
            return Err(self.invalid("start"));
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(self.invalid("start"));
        };
        stream.start()?;
        self.state = StreamState::Running;
        info!(direction = %self.direction, "stream started");
        Ok(())
    }

    /// Running → Stopped. Synchronous: once this returns, no further
    /// callback invocation will be observed.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != StreamState::Running {
            return Err(self.invalid("stop"));
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(self.invalid("stop"));
        };
        stream.stop()?;
        self.state = StreamState::Stopped;
        info!(direction = %self.direction, "stream stopped");
        Ok(())
    }

    /// Open or Stopped → Closed. Releases the backend stream and every
    /// frame still sitting in a ring.
    pub fn close(&mut self) -> Result<()> {
        if !matches!(self.state, StreamState::Open | StreamState::Stopped) {
            return Err(self.invalid("close"));
        }
        let close_result = match self.stream.take() {
            Some(mut stream) => stream.close(),
            None => Ok(()),
        };
        // The callback-side ends were dropped with the backend stream;
        // draining ours releases everything that was still queued.
        let drained = self.drain_endpoints();
        self.config = None;
        self.state = StreamState::Closed;
        debug!(direction = %self.direction, drained, "released queued frames");
        info!(direction = %self.direction, "stream closed");
        close_result
    }

    fn drain_endpoints(&mut self) -> usize {
        match self.endpoints.take() {
            Some(Endpoints::Capture { mut inbound, release }) => {
                let drained = inbound.drain();
                drop(release);
                drained
            }
            Some(Endpoints::Playback { outbound, mut claim }) => {
                let drained = claim.drain();
                drop(outbound);
                drained
            }
            None => 0,
        }
    }

    pub fn poll_captured(&mut self) -> Option<FrameBuffer> {
        match self.endpoints.as_mut() {
            Some(Endpoints::Capture { inbound, .. }) => inbound.try_dequeue(),
            _ => None,
        }
    }

    pub fn release_captured(&mut self, frame: FrameBuffer) {
        if let Some(Endpoints::Capture { release, .. }) = self.endpoints.as_mut() {
            // Pool full means the frame came from elsewhere; dropping it
            // here on the application thread is fine.
            let _ = release.try_enqueue(frame);
        }
    }

    pub fn next_playback_buffer(&mut self) -> Option<FrameBuffer> {
        match self.endpoints.as_mut() {
            Some(Endpoints::Playback { claim, .. }) => claim.try_dequeue(),
            _ => None,
        }
    }

    pub fn submit_for_playback(
        &mut self,
        frame: FrameBuffer,
    ) -> std::result::Result<(), FrameBuffer> {
        match self.endpoints.as_mut() {
            Some(Endpoints::Playback { outbound, .. }) => outbound.try_enqueue(frame),
            _ => Err(frame),
        }
    }

    fn invalid(&self, op: &'static str) -> AudioError {
        AudioError::InvalidStateTransition {
            direction: self.direction,
            op,
            state: self.state,
        }
    }
}

impl Drop for StreamSlot {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.state != StreamState::Running,
                "stream slot dropped while running; stop() and close() first"
            );
        }
    }
}

/// Runs on the transport's capture thread. Bounded time, no allocation,
/// no locks: claim a pooled frame, copy the period in, enqueue.
struct CaptureAdapter {
    outbound: FrameSender,
    pool: FrameReceiver,
    spare: Option<FrameBuffer>,
    counters: Arc<StreamCounters>,
}

impl CaptureAdapter {
    fn on_frames(&mut self, input: &[f32]) -> CallbackStatus {
        self.counters.record_callback();
        let mut frame = match self.spare.take().or_else(|| self.pool.try_dequeue()) {
            Some(frame) => frame,
            None => {
                // Every frame is queued or held by the application: reject
                // the newest period and keep the captured order intact.
                self.counters.record_overrun();
                return CallbackStatus::Continue;
            }
        };
        frame.copy_from_interleaved(input);
        if let Err(frame) = self.outbound.try_enqueue(frame) {
            self.counters.record_overrun();
            self.spare = Some(frame);
        }
        CallbackStatus::Continue
    }
}

/// Runs on the transport's playback thread. An empty queue is a transient
/// underrun: emit silence and keep going, never signal completion.
struct PlaybackAdapter {
    inbound: FrameReceiver,
    recycle: FrameSender,
    spare: Option<FrameBuffer>,
    counters: Arc<StreamCounters>,
}

impl PlaybackAdapter {
    fn on_frames(&mut self, output: &mut [f32]) -> CallbackStatus {
        self.counters.record_callback();
        if let Some(spare) = self.spare.take() {
            if let Err(spare) = self.recycle.try_enqueue(spare) {
                self.spare = Some(spare);
            }
        }
        match self.inbound.try_dequeue() {
            Some(frame) => {
                frame.copy_to_interleaved(output);
                if let Err(frame) = self.recycle.try_enqueue(frame) {
                    // Keeps the drop off the real-time thread.
                    self.spare = Some(frame);
                }
            }
            None => {
                output.fill(0.0);
                self.counters.record_underrun();
            }
        }
        CallbackStatus::Continue
    }
}
