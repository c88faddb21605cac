//! Supervising side of one streaming playback session.
//!
//! A session wires a [`SpeechGenerator`] to an [`AudioSink`] through a fresh
//! [`ChunkQueue`], starts the device, runs generation on the calling thread,
//! then waits on the [`CompletionGate`] before releasing the stream.

use crate::audio_device::AudioSink;
use crate::chunk_queue::ChunkQueue;
use crate::config::PlaybackConfig;
use crate::consumer::{ConsumerAdapter, PlaybackStats};
use crate::error::{MurmurError, MurmurResult};
use crate::gate::CompletionGate;
use crate::generator::{SpeechGenerator, SynthesisRequest};
use crate::producer::{CancelHandle, ProducerAdapter};
use crate::waveform::{self, WavEncoding};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

/// Outcome of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Session identifier, also recorded on the tracing span
    pub session_id: Uuid,
    /// Sample rate reported by the generator
    pub sample_rate: u32,
    /// Chunks handed to the queue
    pub chunks_generated: u64,
    /// Samples handed to the queue
    pub samples_generated: u64,
    /// Real samples delivered to the device
    pub samples_played: u64,
    /// Frame requests that ran dry while generation was still running
    pub underruns: u64,
    /// Whether generation was stopped early
    pub aborted: bool,
    /// Where the full waveform was written, if it was
    pub saved_to: Option<PathBuf>,
    /// Wall time from device start to stream release
    pub elapsed: Duration,
}

/// One text-to-speech playback, from device start to stream release.
///
/// Every session owns its own queue, gate and counters, so sessions never
/// share state. [`PlaybackSession::play`] consumes the session.
#[derive(Debug)]
pub struct PlaybackSession {
    id: Uuid,
    config: PlaybackConfig,
    queue: Arc<ChunkQueue>,
    gate: Arc<CompletionGate>,
    stats: Arc<PlaybackStats>,
    cancel: CancelHandle,
}

impl PlaybackSession {
    /// Create a session
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: PlaybackConfig) -> MurmurResult<Self> {
        config.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            queue: Arc::new(ChunkQueue::with_capacity(config.queue_capacity)),
            gate: Arc::new(CompletionGate::new()),
            stats: Arc::new(PlaybackStats::new()),
            cancel: CancelHandle::new(),
            config,
        })
    }

    /// Session identifier
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Session configuration
    #[must_use]
    pub const fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Handle that stops generation at the next chunk boundary.
    ///
    /// Audio already queued still plays out before the session completes.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Completion signal, observable from any thread
    #[must_use]
    pub fn completion_gate(&self) -> Arc<CompletionGate> {
        Arc::clone(&self.gate)
    }

    /// Live playback counters
    #[must_use]
    pub fn stats(&self) -> Arc<PlaybackStats> {
        Arc::clone(&self.stats)
    }

    /// Speak `request` through `sink` while `generator` produces it.
    ///
    /// Blocks until everything generated has been played and the stream is
    /// released.
    ///
    /// # Errors
    ///
    /// - [`MurmurError::InvalidInput`] if the request is invalid
    /// - [`MurmurError::DeviceUnavailable`] if the sink has no device; nothing
    ///   is generated in that case
    /// - [`MurmurError::GenerationError`] if the generator fails
    /// - [`MurmurError::InvalidState`] if the queue rejects a chunk
    /// - [`MurmurError::TimeoutError`] if playback does not drain in time, or
    ///   a bounded queue stays full for longer than the drain timeout
    ///
    /// The stream is always stopped before an error is returned.
    pub fn play<G, S>(
        self,
        generator: &mut G,
        sink: &mut S,
        request: &SynthesisRequest,
    ) -> MurmurResult<PlaybackReport>
    where
        G: SpeechGenerator + ?Sized,
        S: AudioSink + ?Sized,
    {
        let span = info_span!("playback_session", id = %self.id);
        let _enter = span.enter();

        request.validate()?;
        let sample_rate = generator.sample_rate();
        if sample_rate == 0 {
            return Err(MurmurError::invalid_input(
                "Generator reported a sample rate of 0",
            ));
        }

        let consumer = ConsumerAdapter::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.gate),
            Arc::clone(&self.stats),
        );

        let started = Instant::now();
        sink.start(sample_rate, consumer)?;
        info!(
            sample_rate,
            text_len = request.text.len(),
            queue_capacity = ?self.queue.capacity(),
            "Playback started"
        );

        // A device that stops pulling frames must not wedge a full queue forever.
        let mut producer = ProducerAdapter::new(Arc::clone(&self.queue), self.cancel.clone())
            .with_append_timeout(self.config.drain_timeout());
        let generated = generator.generate(request, &mut |samples: &[f32]| {
            producer.on_chunk(samples)
        });

        // Runs on every path so the consumer can drain and complete.
        self.queue.mark_producer_finished();
        let summary = producer.finish();

        let waveform = match generated {
            Ok(waveform) => waveform,
            Err(err) => {
                error!("Generation failed: {}", err);
                Self::release(sink);
                return Err(err);
            }
        };

        if let Some(err) = summary.error {
            Self::release(sink);
            return Err(err);
        }

        if summary.aborted {
            warn!(chunks = summary.chunks, "Generation stopped early");
        }

        let saved_to = self.persist_waveform(&waveform, sample_rate);

        if !self
            .gate
            .wait(self.config.poll_interval(), self.config.drain_timeout())
        {
            Self::release(sink);
            return Err(MurmurError::timeout(format!(
                "Playback did not drain within {:?}",
                self.config.drain_timeout().unwrap_or_default()
            )));
        }

        sink.stop()?;

        let stats = self.stats.snapshot();
        let report = PlaybackReport {
            session_id: self.id,
            sample_rate,
            chunks_generated: summary.chunks,
            samples_generated: summary.samples,
            samples_played: stats.samples_played,
            underruns: stats.underruns,
            aborted: summary.aborted,
            saved_to,
            elapsed: started.elapsed(),
        };

        info!(
            chunks = report.chunks_generated,
            samples = report.samples_played,
            underruns = report.underruns,
            aborted = report.aborted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Playback finished"
        );

        Ok(report)
    }

    /// Run [`PlaybackSession::play`] on tokio's blocking pool.
    ///
    /// Output streams are often tied to the thread that opened them, so the
    /// sink is built inside the blocking task by `make_sink`.
    ///
    /// # Errors
    ///
    /// Returns any error from `make_sink` or [`PlaybackSession::play`]
    pub async fn play_async<G, S, F>(
        self,
        mut generator: G,
        make_sink: F,
        request: SynthesisRequest,
    ) -> MurmurResult<PlaybackReport>
    where
        G: SpeechGenerator + 'static,
        S: AudioSink,
        F: FnOnce() -> MurmurResult<S> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || {
            let mut sink = make_sink()?;
            self.play(&mut generator, &mut sink, &request)
        })
        .await
        .map_err(|e| MurmurError::generation(format!("Playback task failed: {e}")))?
    }

    fn persist_waveform(&self, waveform: &[f32], sample_rate: u32) -> Option<PathBuf> {
        let path = self.config.output_path.as_ref()?;

        if waveform.is_empty() {
            warn!("Nothing was generated; skipping {}", path.display());
            return None;
        }

        match waveform::save_wav(path, waveform, sample_rate, WavEncoding::Pcm16) {
            Ok(()) => Some(path.clone()),
            Err(err) => {
                error!("Failed to write {}: {}", path.display(), err);
                None
            }
        }
    }

    fn release<S: AudioSink + ?Sized>(sink: &mut S) {
        if let Err(err) = sink.stop() {
            error!("Failed to stop audio stream: {}", err);
        }
    }
}
