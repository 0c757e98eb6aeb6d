use std::fmt;

use crate::queue::{transfer_queue, FrameReceiver, FrameSender};

/// One callback period of interleaved f32 samples. A frame has exactly one
/// owner at any time: a producer, a queue slot, or a consumer. Ownership
/// moves through the transfer queues; dropping a frame releases it.
pub struct FrameBuffer {
    samples: Box<[f32]>,
}

impl FrameBuffer {
    /// A zero-filled buffer for `frames` frames of `channels` channels.
    pub fn silent(frames: usize, channels: u16) -> Self {
        Self {
            samples: vec![0.0; frames * channels as usize].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn fill_silence(&mut self) {
        self.samples.fill(0.0);
    }

    /// Copy interleaved samples in. A short source leaves silence in the
    /// tail; a long source is truncated to the frame length.
    pub fn copy_from_interleaved(&mut self, src: &[f32]) {
        let n = self.samples.len().min(src.len());
        self.samples[..n].copy_from_slice(&src[..n]);
        if n < self.samples.len() {
            self.samples[n..].fill(0.0);
        }
    }

    /// Copy interleaved samples out, zero-filling any destination tail
    /// beyond the frame length.
    pub fn copy_to_interleaved(&self, dst: &mut [f32]) {
        let n = self.samples.len().min(dst.len());
        dst[..n].copy_from_slice(&self.samples[..n]);
        if n < dst.len() {
            dst[n..].fill(0.0);
        }
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("samples", &self.samples.len())
            .finish()
    }
}

/// Pre-filled pool of frames for one stream direction, allocated at open
/// time so the callback adapters never allocate. The receiving end claims,
/// the sending end releases; both are the same wait-free ring as the
/// transfer queue, flowing the opposite way.
pub(crate) fn frame_pool(
    slots: usize,
    frames: usize,
    channels: u16,
) -> (FrameSender, FrameReceiver) {
    let (mut release, claim) = transfer_queue(slots);
    for _ in 0..slots {
        // Cannot fail: the ring was created with exactly `slots` capacity.
        let _ = release.try_enqueue(FrameBuffer::silent(frames, channels));
    }
    (release, claim)
}
