//! Transfer queue: the bounded, ownership-transferring channel between a
//! real-time callback thread and the application thread.
//!
//! Built on an rtrb single-producer/single-consumer ring buffer, so both
//! ends are wait-free and constant-time. A blocking container here would
//! stall the hardware callback; rtrb is the only synchronization the
//! real-time threads ever touch.

use std::fmt;

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::frame::FrameBuffer;

/// Create a bounded transfer queue of frame ownership handles.
pub fn transfer_queue(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (FrameSender { inner: producer }, FrameReceiver { inner: consumer })
}

/// Producer end. Exactly one thread may hold it.
pub struct FrameSender {
    inner: Producer<FrameBuffer>,
}

impl FrameSender {
    /// Non-blocking enqueue. On a full queue the frame comes back to the
    /// caller, which keeps ownership; the queue never exceeds capacity.
    pub fn try_enqueue(&mut self, frame: FrameBuffer) -> Result<(), FrameBuffer> {
        match self.inner.push(frame) {
            Ok(()) => Ok(()),
            Err(PushError::Full(frame)) => Err(frame),
        }
    }

    /// Slots currently free for writing.
    pub fn free_slots(&self) -> usize {
        self.inner.slots()
    }
}

impl fmt::Debug for FrameSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSender")
            .field("free_slots", &self.free_slots())
            .finish()
    }
}

/// Consumer end. Exactly one thread may hold it.
pub struct FrameReceiver {
    inner: Consumer<FrameBuffer>,
}

impl FrameReceiver {
    /// Non-blocking dequeue in FIFO order.
    pub fn try_dequeue(&mut self) -> Option<FrameBuffer> {
        self.inner.pop().ok()
    }

    /// Frames currently queued.
    pub fn queued(&self) -> usize {
        self.inner.slots()
    }

    /// Dequeue and drop everything reachable, returning the count.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.try_dequeue().is_some() {
            drained += 1;
        }
        drained
    }
}

impl fmt::Debug for FrameReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameReceiver")
            .field("queued", &self.queued())
            .finish()
    }
}
