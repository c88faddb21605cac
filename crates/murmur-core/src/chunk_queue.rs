//! Ordered hand-off buffer between the generation thread and the device callback.
//!
//! The queue is the only structure touched by both sides of the pipeline.
//! The generation side appends (and may block when a capacity bound is set),
//! the device side only ever calls [`ChunkQueue::try_take`], which never blocks.

use crate::error::{MurmurError, MurmurResult};
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// One block of mono samples produced by a single generation callback
#[derive(Debug, Clone, PartialEq)]
pub struct SampleChunk {
    samples: Box<[f32]>,
}

impl SampleChunk {
    /// Copy samples out of a buffer owned by the generation engine
    #[must_use]
    pub fn from_slice(samples: &[f32]) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// Number of samples in the chunk
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the chunk holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow the samples
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

impl From<Vec<f32>> for SampleChunk {
    fn from(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
        }
    }
}

/// How often a blocked append re-checks its interrupt signal
pub const APPEND_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of an append that may be abandoned while waiting for room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The chunk is visible to the consumer
    Queued,
    /// The interrupt signal fired first; the chunk was dropped
    Interrupted,
}

/// FIFO queue of pending chunks plus the one-way "producer finished" marker
#[derive(Debug)]
pub struct ChunkQueue {
    sender: Sender<SampleChunk>,
    receiver: Receiver<SampleChunk>,
    finished: AtomicBool,
    // Orders appends against the finish marker. Only the generation and
    // supervising threads take it; the device callback never does.
    producer_lock: Mutex<()>,
    capacity: Option<usize>,
}

impl ChunkQueue {
    /// Create an unbounded queue
    #[must_use]
    pub fn unbounded() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self::from_parts(sender, receiver, None)
    }

    /// Create a queue holding at most `capacity` chunks.
    ///
    /// Appending to a full queue blocks the generation thread until the
    /// device callback takes a chunk. A capacity of zero is treated as one.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self::from_parts(sender, receiver, Some(capacity))
    }

    /// Create a queue from an optional capacity bound
    #[must_use]
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        capacity.map_or_else(Self::unbounded, Self::bounded)
    }

    fn from_parts(
        sender: Sender<SampleChunk>,
        receiver: Receiver<SampleChunk>,
        capacity: Option<usize>,
    ) -> Self {
        Self {
            sender,
            receiver,
            finished: AtomicBool::new(false),
            producer_lock: Mutex::new(()),
            capacity,
        }
    }

    /// Make a chunk visible to the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::InvalidState`] if the producer was already
    /// marked finished. The chunk is not enqueued in that case.
    pub fn append(&self, chunk: SampleChunk) -> MurmurResult<()> {
        let _guard = self.producer_lock.lock();

        if self.finished.load(Ordering::Acquire) {
            return Err(MurmurError::invalid_state(
                "Cannot append a chunk after the producer was marked finished",
            ));
        }

        // Both endpoints live in `self`, so the channel cannot disconnect here.
        self.sender
            .send(chunk)
            .map_err(|_| MurmurError::invalid_state("Chunk queue receiver disconnected"))
    }

    /// Make a chunk visible to the consumer, giving up on a full queue.
    ///
    /// While the queue is full the wait is re-checked every
    /// [`APPEND_POLL_INTERVAL`]: the chunk is dropped as soon as
    /// `interrupted` returns true, and the append fails once `deadline`
    /// passes. Unbounded queues never wait.
    ///
    /// # Errors
    ///
    /// - [`MurmurError::InvalidState`] if the producer was already marked finished
    /// - [`MurmurError::TimeoutError`] if no room appeared before `deadline`
    pub fn append_interruptible<F>(
        &self,
        chunk: SampleChunk,
        deadline: Option<Instant>,
        interrupted: F,
    ) -> MurmurResult<AppendOutcome>
    where
        F: Fn() -> bool,
    {
        let _guard = self.producer_lock.lock();

        if self.finished.load(Ordering::Acquire) {
            return Err(MurmurError::invalid_state(
                "Cannot append a chunk after the producer was marked finished",
            ));
        }

        let mut pending = chunk;
        loop {
            if interrupted() {
                return Ok(AppendOutcome::Interrupted);
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(MurmurError::timeout(format!(
                            "Chunk queue stayed full ({} chunks) until the deadline",
                            self.receiver.len()
                        )));
                    }
                    APPEND_POLL_INTERVAL.min(deadline - now)
                }
                None => APPEND_POLL_INTERVAL,
            };

            match self.sender.send_timeout(pending, wait) {
                Ok(()) => return Ok(AppendOutcome::Queued),
                Err(SendTimeoutError::Timeout(chunk)) => pending = chunk,
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(MurmurError::invalid_state("Chunk queue receiver disconnected"))
                }
            }
        }
    }

    /// Take the oldest chunk without blocking
    #[must_use]
    pub fn try_take(&self) -> Option<SampleChunk> {
        match self.receiver.try_recv() {
            Ok(chunk) => Some(chunk),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the oldest chunk.
    ///
    /// For consumers off the real-time path only; the device callback must
    /// use [`ChunkQueue::try_take`].
    #[must_use]
    pub fn take_timeout(&self, timeout: Duration) -> Option<SampleChunk> {
        match self.receiver.recv_timeout(timeout) {
            Ok(chunk) => Some(chunk),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Declare that no more chunks will arrive. Idempotent.
    pub fn mark_producer_finished(&self) {
        let _guard = self.producer_lock.lock();
        if !self.finished.swap(true, Ordering::AcqRel) {
            debug!(pending = self.receiver.len(), "Producer marked finished");
        }
    }

    /// Whether the producer has been marked finished
    #[must_use]
    pub fn is_producer_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// True iff the producer is finished and no chunk remains queued
    #[must_use]
    pub fn is_finished_and_empty(&self) -> bool {
        // Every append completes before the flag flips, so once the flag is
        // observed the channel already holds every chunk that will ever exist.
        self.is_producer_finished() && self.receiver.is_empty()
    }

    /// Number of chunks currently queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no chunk is currently queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Capacity bound, `None` when unbounded
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for ChunkQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}
