//! Audio Frames and the Capture/Processing Handoff
//!
//! `FrameBuffer` is the single-producer/single-consumer handoff between the
//! capture actor and the processing actor: a fixed ring of frame slots
//! under a lock held only for a few pointer moves per audio period.
//!
//! Overflow policy: capture must never stall, so `push_rotate` evicts the
//! *oldest* frame when the ring is full and hands it back for the caller to
//! count as an overrun. `try_push` is the strict variant that rejects the
//! incoming frame instead.

use parking_lot::Mutex;

/// One block of interleaved audio samples
///
/// Every frame in a stream has the same length and channel count for the
/// stream's lifetime; samples are bounded to [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Interleaved samples, `frame_len * channels` long
    pub samples: Vec<f32>,
    /// Stream time in seconds of the frame's first sample, derived from the
    /// capture frame counter (not wall clock)
    pub timestamp: f64,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, timestamp: f64) -> Self {
        Self { samples, timestamp }
    }

    /// An all-zero frame
    pub fn silence(len: usize, timestamp: f64) -> Self {
        Self {
            samples: vec![0.0; len],
            timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

struct Slots {
    slots: Vec<Option<AudioFrame>>,
    /// Index of the oldest stored frame
    head: usize,
    len: usize,
}

/// Fixed-capacity SPSC frame ring
///
/// Exactly one capture actor writes and exactly one processing actor reads.
/// The mutex guards slot bookkeeping only; neither side holds it while
/// touching sample data it already owns.
pub struct FrameBuffer {
    inner: Mutex<Slots>,
    capacity: usize,
}

impl FrameBuffer {
    /// Capacity is fixed at construction; >= 4 frames absorbs scheduling
    /// jitter between the actors
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "FrameBuffer capacity must be greater than zero");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            inner: Mutex::new(Slots {
                slots,
                head: 0,
                len: 0,
            }),
            capacity,
        }
    }

    /// Push a frame, rejecting it when no slot is free
    ///
    /// The frame is handed back in the error so nothing is silently lost.
    pub fn try_push(&self, frame: AudioFrame) -> Result<(), AudioFrame> {
        let mut inner = self.inner.lock();
        if inner.len == self.capacity {
            return Err(frame);
        }
        let idx = (inner.head + inner.len) % self.capacity;
        inner.slots[idx] = Some(frame);
        inner.len += 1;
        Ok(())
    }

    /// Push a frame, evicting the oldest when the ring is full
    ///
    /// Returns the evicted frame so the capture actor can log the overrun.
    /// This is the non-blocking policy the capture path runs on.
    pub fn push_rotate(&self, frame: AudioFrame) -> Option<AudioFrame> {
        let mut inner = self.inner.lock();
        if inner.len == self.capacity {
            let head = inner.head;
            let evicted = inner.slots[head].replace(frame);
            inner.head = (head + 1) % self.capacity;
            return evicted;
        }
        let idx = (inner.head + inner.len) % self.capacity;
        inner.slots[idx] = Some(frame);
        inner.len += 1;
        None
    }

    /// Take the oldest frame; `None` means no work this cycle
    pub fn pop(&self) -> Option<AudioFrame> {
        let mut inner = self.inner.lock();
        if inner.len == 0 {
            return None;
        }
        let head = inner.head;
        let frame = inner.slots[head].take();
        inner.head = (head + 1) % self.capacity;
        inner.len -= 1;
        frame
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        for slot in &mut inner.slots {
            *slot = None;
        }
        inner.head = 0;
        inner.len = 0;
    }
}
