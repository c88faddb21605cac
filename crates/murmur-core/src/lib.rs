//! # Murmur Core
//!
//! Streaming speech playback: audio starts playing while the text-to-speech
//! engine is still generating it.
//!
//! ## Pipeline
//!
//! - The generation thread hands irregular chunks to a [`ProducerAdapter`],
//!   which copies them into a [`ChunkQueue`]
//! - The device callback asks a [`ConsumerAdapter`] for fixed-size frames and
//!   gets queued samples in order, padded with silence
//! - Once generation has finished and every sample has been played, the
//!   [`CompletionGate`] opens and the [`PlaybackSession`] releases the stream
//!
//! ## Example
//!
//! ```rust,no_run
//! use murmur_core::{AudioDevice, PlaybackConfig, PlaybackSession, ScriptedGenerator, SynthesisRequest};
//! use std::time::Duration;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = PlaybackConfig::load_default()?;
//!     let mut device = AudioDevice::with_config(config.audio.clone())?;
//!     let mut generator = ScriptedGenerator::tone(24_000, 440.0, Duration::from_secs(1), 2_400);
//!
//!     let session = PlaybackSession::new(config)?;
//!     let report = session.play(&mut generator, &mut device, &SynthesisRequest::new("Hello, world!"))?;
//!     println!("played {} samples", report.samples_played);
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod audio_device;
pub mod chunk_queue;
pub mod config;
pub mod consumer;
pub mod cursor;
pub mod error;
pub mod gate;
pub mod generator;
pub mod producer;
pub mod session;
pub mod waveform;

// Re-export main types for convenience
pub use audio_device::{AudioDevice, AudioDeviceInfo, AudioSink, PlaybackState, SimulatedDevice};
pub use chunk_queue::{ChunkQueue, SampleChunk};
pub use config::{AudioConfig, PlaybackConfig};
pub use consumer::{ConsumerAdapter, PlaybackStats, StatsSnapshot, StreamStatus};
pub use cursor::PlaybackCursor;
pub use error::{MurmurError, MurmurResult};
pub use gate::CompletionGate;
pub use generator::{AudioData, ChunkCallback, ScriptedGenerator, SpeechGenerator, SynthesisRequest};
pub use producer::{CancelHandle, GenerationControl, ProducerAdapter, ProducerSummary};
pub use session::{PlaybackReport, PlaybackSession};
pub use waveform::{save_wav, WavEncoding};

/// Version information for the murmur-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of audio channels (mono)
pub const DEFAULT_CHANNELS: u16 = 1;

/// Default completion poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default frames per callback for simulated devices
pub const DEFAULT_BUFFER_FRAMES: usize = 1024;

/// Maximum text length for synthesis (to prevent memory issues)
pub const MAX_TEXT_LENGTH: usize = 100_000;
