//! Device-side adapter: fills fixed-size output frames from queued chunks.
//!
//! Everything here runs on the audio driver's real-time thread. It never
//! blocks, never logs, and only allocates when dropping an exhausted chunk.

use crate::chunk_queue::ChunkQueue;
use crate::cursor::PlaybackCursor;
use crate::gate::CompletionGate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Answer given to the device after each frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// More audio may follow; the frame was filled (zero-padded if short)
    Continue,
    /// Everything has been played; the frame holds only silence
    Complete,
}

/// Lock-free counters updated from the device callback
#[derive(Debug, Default)]
pub struct PlaybackStats {
    callbacks: AtomicU64,
    samples_played: AtomicU64,
    silence_samples: AtomicU64,
    underruns: AtomicU64,
}

/// Point-in-time copy of [`PlaybackStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frame requests served
    pub callbacks: u64,
    /// Real samples delivered to the device
    pub samples_played: u64,
    /// Zero samples written to pad frames
    pub silence_samples: u64,
    /// Frame requests that ran dry while generation was still running
    pub underruns: u64,
}

impl PlaybackStats {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all counters
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            samples_played: self.samples_played.load(Ordering::Relaxed),
            silence_samples: self.silence_samples.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}

/// Adapter invoked by the playback device once per frame request
#[derive(Debug)]
pub struct ConsumerAdapter {
    queue: Arc<ChunkQueue>,
    cursor: PlaybackCursor,
    gate: Arc<CompletionGate>,
    stats: Arc<PlaybackStats>,
}

impl ConsumerAdapter {
    /// Create an adapter draining `queue` and reporting completion on `gate`
    #[must_use]
    pub fn new(
        queue: Arc<ChunkQueue>,
        gate: Arc<CompletionGate>,
        stats: Arc<PlaybackStats>,
    ) -> Self {
        Self {
            queue,
            cursor: PlaybackCursor::new(),
            gate,
            stats,
        }
    }

    /// Fill `out` with the next `out.len()` samples.
    ///
    /// `Complete` is only ever returned on a call that delivers no real
    /// samples: the call that plays the last sample answers `Continue`, and
    /// the following call observes the drained queue and completes. Once
    /// complete, later calls return `Complete` without touching the queue.
    pub fn fill(&mut self, out: &mut [f32]) -> StreamStatus {
        self.stats.callbacks.fetch_add(1, Ordering::Relaxed);

        if self.gate.is_complete() {
            out.fill(0.0);
            return StreamStatus::Complete;
        }

        if self.cursor.is_empty() && self.queue.is_finished_and_empty() {
            self.gate.open();
            out.fill(0.0);
            return StreamStatus::Complete;
        }

        let n = out.len();
        let mut i = 0;

        while i < n {
            if self.cursor.is_empty() {
                match self.queue.try_take() {
                    Some(chunk) => {
                        self.cursor.load(chunk);
                        continue;
                    }
                    None => break,
                }
            }

            i += self.cursor.drain_into(&mut out[i..]);
        }

        if i < n {
            out[i..].fill(0.0);
            self.stats
                .silence_samples
                .fetch_add((n - i) as u64, Ordering::Relaxed);
            if !self.queue.is_producer_finished() {
                self.stats.underruns.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.stats
            .samples_played
            .fetch_add(i as u64, Ordering::Relaxed);

        StreamStatus::Continue
    }

    /// Whether the adapter is holding a partially played chunk
    #[must_use]
    pub const fn has_pending_chunk(&self) -> bool {
        !self.cursor.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_queue::SampleChunk;
    use rstest::rstest;

    struct Harness {
        queue: Arc<ChunkQueue>,
        gate: Arc<CompletionGate>,
        stats: Arc<PlaybackStats>,
        consumer: ConsumerAdapter,
    }

    fn harness() -> Harness {
        let queue = Arc::new(ChunkQueue::unbounded());
        let gate = Arc::new(CompletionGate::new());
        let stats = Arc::new(PlaybackStats::new());
        let consumer =
            ConsumerAdapter::new(Arc::clone(&queue), Arc::clone(&gate), Arc::clone(&stats));
        Harness {
            queue,
            gate,
            stats,
            consumer,
        }
    }

    /// Enqueue chunks whose samples are their 1-based position in the stream
    fn enqueue_sizes(queue: &ChunkQueue, sizes: &[usize]) -> Vec<f32> {
        let mut next = 1.0_f32;
        let mut all = Vec::new();
        for &size in sizes {
            let chunk: Vec<f32> = (0..size)
                .map(|_| {
                    let v = next;
                    next += 1.0;
                    v
                })
                .collect();
            all.extend_from_slice(&chunk);
            queue.append(SampleChunk::from(chunk)).unwrap();
        }
        all
    }

    #[test]
    fn test_framing_for_10_3_20_with_frame_size_8() {
        let mut h = harness();
        enqueue_sizes(&h.queue, &[10, 3, 20]);
        h.queue.mark_producer_finished();

        let range = |a: u16, b: u16| (a..=b).map(f32::from).collect::<Vec<_>>();
        let mut frame = [0.0_f32; 8];

        // 1: first 8 samples of the 10-sample chunk
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame.to_vec(), range(1, 8));

        // 2: 2 left from chunk one, all 3 of chunk two, 3 from chunk three
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame.to_vec(), range(9, 16));

        // 3 and 4: straight out of the 20-sample chunk
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame.to_vec(), range(17, 24));
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame.to_vec(), range(25, 32));

        // 5: the last real sample, then zero padding
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame, [33.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(!h.gate.is_complete());

        // 6: nothing real left, report completion
        frame.fill(7.0);
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Complete);
        assert_eq!(frame, [0.0; 8]);
        assert!(h.gate.is_complete());

        let stats = h.stats.snapshot();
        assert_eq!(stats.samples_played, 33);
        assert_eq!(stats.callbacks, 6);
        assert_eq!(stats.underruns, 0);
    }

    #[test]
    fn test_exact_fill_of_last_frame_completes_on_next_call() {
        let mut h = harness();
        enqueue_sizes(&h.queue, &[4, 4]);
        h.queue.mark_producer_finished();

        let mut frame = [0.0_f32; 8];
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert!(!h.gate.is_complete());

        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Complete);
        assert_eq!(frame, [0.0; 8]);
    }

    #[test]
    fn test_underrun_zero_fills_and_continues() {
        let mut h = harness();
        enqueue_sizes(&h.queue, &[3]);

        let mut frame = [9.0_f32; 8];
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        // Nothing queued yet, producer still running: silence, not completion
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame, [0.0; 8]);
        assert!(!h.gate.is_complete());

        let stats = h.stats.snapshot();
        assert_eq!(stats.underruns, 2);
        assert_eq!(stats.silence_samples, 13);
    }

    #[test]
    fn test_complete_is_terminal_and_stops_reading() {
        let mut h = harness();
        h.queue.mark_producer_finished();

        let mut frame = [0.0_f32; 4];
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Complete);
        assert!(h.gate.is_complete());

        // Even if the queue were somehow repopulated, nothing is read again
        let before = h.stats.snapshot().samples_played;
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Complete);
        assert_eq!(h.stats.snapshot().samples_played, before);
    }

    #[test]
    fn test_pending_chunk_blocks_completion() {
        let mut h = harness();
        enqueue_sizes(&h.queue, &[12]);
        h.queue.mark_producer_finished();

        let mut frame = [0.0_f32; 8];
        h.consumer.fill(&mut frame);
        // Queue is finished and empty but the cursor still holds 4 samples
        assert!(h.queue.is_finished_and_empty());
        assert!(h.consumer.has_pending_chunk());

        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame, [9.0, 10.0, 11.0, 12.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Complete);
    }

    #[test]
    fn test_empty_chunks_are_skipped() {
        let mut h = harness();
        enqueue_sizes(&h.queue, &[0, 2, 0, 0, 1]);
        h.queue.mark_producer_finished();

        let mut frame = [0.0_f32; 4];
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Continue);
        assert_eq!(frame, [1.0, 2.0, 3.0, 0.0]);
        assert_eq!(h.consumer.fill(&mut frame), StreamStatus::Complete);
    }

    #[rstest]
    #[case(&[1, 1, 1, 1, 1], 2)]
    #[case(&[100], 7)]
    #[case(&[5, 17, 3, 64, 1], 16)]
    #[case(&[8, 8, 8], 8)]
    #[case(&[3], 1)]
    fn test_sample_conservation(#[case] sizes: &[usize], #[case] frame_size: usize) {
        let mut h = harness();
        let expected = enqueue_sizes(&h.queue, sizes);
        h.queue.mark_producer_finished();

        let mut delivered = Vec::new();
        let mut frame = vec![0.0_f32; frame_size];
        while h.consumer.fill(&mut frame) == StreamStatus::Continue {
            delivered.extend_from_slice(&frame);
        }

        let total = expected.len();
        let padded = total.div_ceil(frame_size) * frame_size;
        assert_eq!(delivered.len(), padded);
        assert_eq!(&delivered[..total], expected.as_slice());
        assert!(delivered[total..].iter().all(|&s| s == 0.0));
    }
}
