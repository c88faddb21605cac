//! Generation engine boundary.
//!
//! The speech model itself lives outside this crate. All the pipeline needs
//! from it is a sample rate and a blocking `generate` call that reports each
//! chunk through a callback and honors the callback's stop signal.

use crate::error::{MurmurError, MurmurResult};
use crate::producer::GenerationControl;
use std::time::Duration;
use tracing::debug;

/// Audio data type - 32-bit floating point mono samples
pub type AudioData = Vec<f32>;

/// Per-chunk callback handed to a [`SpeechGenerator`]
pub type ChunkCallback<'a> = dyn FnMut(&[f32]) -> GenerationControl + 'a;

/// One text-to-speech request
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Text to speak
    pub text: String,
    /// Speed multiplier (0.1 to 3.0)
    pub speed: f32,
    /// Speaker index for multi-speaker models
    pub speaker_id: u32,
}

impl SynthesisRequest {
    /// Create a request at normal speed for the first speaker
    #[must_use]
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            speed: 1.0,
            speaker_id: 0,
        }
    }

    /// Set speed multiplier
    ///
    /// # Errors
    ///
    /// Returns an error if speed is not in valid range (0.1 to 3.0)
    pub fn with_speed(mut self, speed: f32) -> MurmurResult<Self> {
        if !(0.1..=3.0).contains(&speed) {
            return Err(MurmurError::invalid_input(format!(
                "Speed must be between 0.1 and 3.0, got {speed}"
            )));
        }
        self.speed = speed;
        Ok(self)
    }

    /// Select a speaker
    #[must_use]
    pub fn with_speaker(mut self, speaker_id: u32) -> Self {
        self.speaker_id = speaker_id;
        self
    }

    /// Validate the request
    ///
    /// # Errors
    ///
    /// Returns an error if the text is blank or the speed is out of range
    pub fn validate(&self) -> MurmurResult<()> {
        if self.text.trim().is_empty() {
            return Err(MurmurError::invalid_input("Text cannot be empty"));
        }

        if self.text.len() > crate::MAX_TEXT_LENGTH {
            return Err(MurmurError::invalid_input(format!(
                "Text too long: {} characters (max: {})",
                self.text.len(),
                crate::MAX_TEXT_LENGTH
            )));
        }

        if !(0.1..=3.0).contains(&self.speed) {
            return Err(MurmurError::invalid_input(format!(
                "Speed must be between 0.1 and 3.0, got {}",
                self.speed
            )));
        }

        Ok(())
    }
}

/// A text-to-speech engine that emits audio incrementally
pub trait SpeechGenerator: Send {
    /// Sample rate of every chunk this engine produces
    fn sample_rate(&self) -> u32;

    /// Synthesize `request`, calling `on_chunk` once per generated chunk.
    ///
    /// Implementations must stop emitting as soon as `on_chunk` returns
    /// [`GenerationControl::Stop`], and return the full waveform generated
    /// up to that point.
    ///
    /// # Errors
    ///
    /// Returns an error if synthesis fails
    fn generate(
        &mut self,
        request: &SynthesisRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> MurmurResult<AudioData>;
}

/// Generator that replays a fixed list of chunks.
///
/// Stands in for a real model in tests, benchmarks and headless runs.
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    sample_rate: u32,
    chunks: Vec<AudioData>,
    chunk_delay: Duration,
    fail_after: Option<usize>,
}

impl ScriptedGenerator {
    /// Replay `chunks` in order
    #[must_use]
    pub fn new(sample_rate: u32, chunks: Vec<AudioData>) -> Self {
        Self {
            sample_rate,
            chunks,
            chunk_delay: Duration::ZERO,
            fail_after: None,
        }
    }

    /// Build chunks of the given sizes.
    ///
    /// Each sample's value is its 1-based position in the whole stream, so
    /// order and loss are easy to check on the playback side.
    #[must_use]
    pub fn from_sizes(sample_rate: u32, sizes: &[usize]) -> Self {
        let mut position = 0_u32;
        let chunks = sizes
            .iter()
            .map(|&size| {
                (0..size)
                    .map(|_| {
                        position += 1;
                        position as f32
                    })
                    .collect()
            })
            .collect();
        Self::new(sample_rate, chunks)
    }

    /// A sine tone of `duration`, split into `chunk_size`-sample chunks
    #[must_use]
    pub fn tone(sample_rate: u32, frequency: f32, duration: Duration, chunk_size: usize) -> Self {
        let total = (duration.as_secs_f64() * f64::from(sample_rate)) as usize;
        let step = std::f32::consts::TAU * frequency / sample_rate as f32;
        let samples: AudioData = (0..total).map(|i| (i as f32 * step).sin() * 0.3).collect();
        let chunks = samples.chunks(chunk_size.max(1)).map(<[f32]>::to_vec).collect();
        Self::new(sample_rate, chunks)
    }

    /// Sleep before emitting each chunk, simulating inference time
    #[must_use]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Fail with a generation error after emitting `chunks` chunks
    #[must_use]
    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    /// Total samples across all scripted chunks
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

impl SpeechGenerator for ScriptedGenerator {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn generate(
        &mut self,
        request: &SynthesisRequest,
        on_chunk: &mut ChunkCallback<'_>,
    ) -> MurmurResult<AudioData> {
        debug!(
            text_len = request.text.len(),
            chunks = self.chunks.len(),
            "Replaying scripted generation"
        );

        let mut waveform = Vec::with_capacity(self.total_samples());

        for (index, chunk) in self.chunks.iter().enumerate() {
            if self.fail_after == Some(index) {
                return Err(MurmurError::generation(format!(
                    "Scripted failure after {index} chunks"
                )));
            }

            if !self.chunk_delay.is_zero() {
                std::thread::sleep(self.chunk_delay);
            }

            waveform.extend_from_slice(chunk);
            if !on_chunk(chunk.as_slice()).should_continue() {
                debug!(emitted = index + 1, "Generation stopped by callback");
                break;
            }
        }

        Ok(waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = SynthesisRequest::new("Hello");
        assert_eq!(request.text, "Hello");
        assert_eq!(request.speed, 1.0);
        assert_eq!(request.speaker_id, 0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_speed_range() {
        assert!(SynthesisRequest::new("a").with_speed(0.05).is_err());
        assert!(SynthesisRequest::new("a").with_speed(3.5).is_err());
        let request = SynthesisRequest::new("a").with_speed(1.5).unwrap();
        assert_eq!(request.speed, 1.5);
    }

    #[test]
    fn test_request_rejects_blank_text() {
        let err = SynthesisRequest::new("   ").validate().unwrap_err();
        assert!(matches!(err, MurmurError::InvalidInput { .. }));
    }

    #[test]
    fn test_request_rejects_oversized_text() {
        let text = "a".repeat(crate::MAX_TEXT_LENGTH + 1);
        assert!(SynthesisRequest::new(text).validate().is_err());
    }

    #[test]
    fn test_request_with_speaker() {
        assert_eq!(SynthesisRequest::new("a").with_speaker(66).speaker_id, 66);
    }

    #[test]
    fn test_from_sizes_numbers_samples() {
        let generator = ScriptedGenerator::from_sizes(16_000, &[2, 0, 3]);
        assert_eq!(generator.chunks, vec![vec![1.0, 2.0], vec![], vec![3.0, 4.0, 5.0]]);
        assert_eq!(generator.total_samples(), 5);
    }

    #[test]
    fn test_tone_is_chunked() {
        let generator = ScriptedGenerator::tone(1_000, 50.0, Duration::from_millis(250), 100);
        assert_eq!(generator.total_samples(), 250);
        assert_eq!(generator.chunks.len(), 3);
        assert!(generator.chunks.iter().flatten().all(|s| s.abs() <= 0.3));
    }

    #[test]
    fn test_generate_emits_every_chunk() {
        let mut generator = ScriptedGenerator::from_sizes(16_000, &[2, 3]);
        let mut seen = Vec::new();
        let waveform = generator
            .generate(&SynthesisRequest::new("hi"), &mut |chunk: &[f32]| {
                seen.push(chunk.to_vec());
                GenerationControl::Continue
            })
            .unwrap();

        assert_eq!(seen, vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        assert_eq!(waveform, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_generate_honors_stop() {
        let mut generator = ScriptedGenerator::from_sizes(16_000, &[1, 1, 1, 1]);
        let mut calls = 0;
        let waveform = generator
            .generate(&SynthesisRequest::new("hi"), &mut |_: &[f32]| {
                calls += 1;
                if calls == 2 {
                    GenerationControl::Stop
                } else {
                    GenerationControl::Continue
                }
            })
            .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(waveform, vec![1.0, 2.0]);
    }

    #[test]
    fn test_generate_failure() {
        let mut generator = ScriptedGenerator::from_sizes(16_000, &[1, 1, 1]).failing_after(2);
        let mut calls = 0;
        let result = generator.generate(&SynthesisRequest::new("hi"), &mut |_: &[f32]| {
            calls += 1;
            GenerationControl::Continue
        });

        assert!(matches!(result, Err(MurmurError::GenerationError { .. })));
        assert_eq!(calls, 2);
    }
}
