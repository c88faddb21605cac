//! Generation-side adapter: turns per-chunk engine callbacks into queue appends.

use crate::chunk_queue::{AppendOutcome, ChunkQueue, SampleChunk};
use crate::error::MurmurError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Value returned to the generation engine after each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationControl {
    /// Keep generating
    Continue,
    /// Abort generation; no further chunks are wanted
    Stop,
}

impl GenerationControl {
    /// Raw callback value: `1` to continue, `0` to stop
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Continue => 1,
            Self::Stop => 0,
        }
    }

    /// Interpret a raw callback value; any non-zero value continues
    #[must_use]
    pub const fn from_raw(value: i32) -> Self {
        if value == 0 {
            Self::Stop
        } else {
            Self::Continue
        }
    }

    /// Whether the engine should keep generating
    #[must_use]
    pub const fn should_continue(self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// Cloneable request to stop generation at the next chunk boundary
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a handle that has not been cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// What the producer did over one generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSummary {
    /// Chunks enqueued
    pub chunks: u64,
    /// Samples enqueued
    pub samples: u64,
    /// Whether generation was cancelled through the [`CancelHandle`]
    pub aborted: bool,
    /// First queue error, if any. Fatal to the session.
    pub error: Option<MurmurError>,
}

/// Adapter invoked by the generation engine once per generated chunk
#[derive(Debug)]
pub struct ProducerAdapter {
    queue: Arc<ChunkQueue>,
    cancel: CancelHandle,
    append_timeout: Option<Duration>,
    chunks: u64,
    samples: u64,
    stopped: bool,
    cancelled: bool,
    error: Option<MurmurError>,
}

impl ProducerAdapter {
    /// Create an adapter feeding `queue`
    #[must_use]
    pub fn new(queue: Arc<ChunkQueue>, cancel: CancelHandle) -> Self {
        Self {
            queue,
            cancel,
            append_timeout: None,
            chunks: 0,
            samples: 0,
            stopped: false,
            cancelled: false,
            error: None,
        }
    }

    /// Fail a chunk that waits longer than `timeout` for room in a full queue
    #[must_use]
    pub fn with_append_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.append_timeout = timeout;
        self
    }

    /// Handle one chunk from the engine.
    ///
    /// The samples are copied, so the engine may reuse its buffer as soon as
    /// this returns. A bounded queue that stays full keeps this call waiting
    /// until room appears, the [`CancelHandle`] fires or the append timeout
    /// passes. Once `Stop` has been returned every later call is ignored and
    /// answered with `Stop` again.
    pub fn on_chunk(&mut self, samples: &[f32]) -> GenerationControl {
        if self.stopped {
            return GenerationControl::Stop;
        }

        let deadline = self
            .append_timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let cancel = &self.cancel;
        let outcome = self.queue.append_interruptible(
            SampleChunk::from_slice(samples),
            deadline,
            || cancel.is_cancelled(),
        );

        match outcome {
            Ok(AppendOutcome::Queued) => {}
            Ok(AppendOutcome::Interrupted) => {
                debug!(chunks = self.chunks, "Generation cancelled before chunk");
                return self.stop_cancelled();
            }
            Err(err) => {
                error!("Failed to enqueue generated chunk: {}", err);
                self.error = Some(err);
                self.stopped = true;
                return GenerationControl::Stop;
            }
        }

        self.chunks += 1;
        self.samples += samples.len() as u64;
        debug!(
            chunk = self.chunks,
            samples = samples.len(),
            queued = self.queue.len(),
            "Enqueued generated chunk"
        );

        if self.cancel.is_cancelled() {
            debug!(chunks = self.chunks, "Generation cancelled");
            return self.stop_cancelled();
        }

        GenerationControl::Continue
    }

    fn stop_cancelled(&mut self) -> GenerationControl {
        self.cancelled = true;
        self.stopped = true;
        GenerationControl::Stop
    }

    /// Raw form of [`ProducerAdapter::on_chunk`] for engines speaking `1`/`0`
    pub fn on_chunk_raw(&mut self, samples: &[f32]) -> i32 {
        self.on_chunk(samples).as_raw()
    }

    /// Chunks enqueued so far
    #[must_use]
    pub const fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Whether the adapter has told the engine to stop
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Consume the adapter and report what happened
    #[must_use]
    pub fn finish(self) -> ProducerSummary {
        ProducerSummary {
            chunks: self.chunks,
            samples: self.samples,
            aborted: self.cancelled,
            error: self.error,
        }
    }
}
