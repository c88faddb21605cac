//! Audio output devices driving the [`ConsumerAdapter`].

use crate::config::AudioConfig;
use crate::consumer::{ConsumerAdapter, StreamStatus};
use crate::error::{MurmurError, MurmurResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Playback state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No stream is running
    Stopped,
    /// A stream is pulling frames from the consumer
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Playing => write!(f, "Playing"),
        }
    }
}

/// Audio device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    /// Human-readable device name
    pub name: String,
    /// Number of output channels in the default configuration
    pub channels: u16,
    /// Default sample rate
    pub default_sample_rate: u32,
    /// Whether this is the host's default output device
    pub is_default: bool,
}

/// Something that pulls fixed-size frames from a [`ConsumerAdapter`]
pub trait AudioSink {
    /// Start requesting frames at `sample_rate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be created or started
    fn start(&mut self, sample_rate: u32, consumer: ConsumerAdapter) -> MurmurResult<()>;

    /// Stop requesting frames and release the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream could not be shut down cleanly
    fn stop(&mut self) -> MurmurResult<()>;

    /// Current playback state
    fn state(&self) -> PlaybackState;
}

/// Default output device of the platform audio host
pub struct AudioDevice {
    config: AudioConfig,
    device: cpal::Device,
    name: String,
    stream: Option<cpal::Stream>,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice")
            .field("config", &self.config)
            .field("name", &self.name)
            .field("playing", &self.stream.is_some())
            .finish()
    }
}

impl AudioDevice {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::DeviceUnavailable`] if the host has no output device
    pub fn new() -> MurmurResult<Self> {
        Self::with_config(AudioConfig::default())
    }

    /// Open the output device named in `config`, or the default one
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::DeviceUnavailable`] if no matching device exists
    pub fn with_config(config: AudioConfig) -> MurmurResult<Self> {
        let host = cpal::default_host();

        let device = match config.device_name.as_deref() {
            None => host.default_output_device().ok_or_else(|| {
                MurmurError::device_unavailable("No default output device found")
            })?,
            Some(wanted) => host
                .output_devices()
                .map_err(|e| {
                    MurmurError::audio_device(format!("Failed to enumerate output devices: {e}"))
                })?
                .find(|d| d.name().is_ok_and(|name| name == wanted))
                .ok_or_else(|| {
                    MurmurError::device_unavailable(format!("Output device '{wanted}' not found"))
                })?,
        };

        let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        info!("Using output device {}", name);

        Ok(Self {
            config,
            device,
            name,
            stream: None,
        })
    }

    /// List the host's output devices
    ///
    /// # Errors
    ///
    /// Returns an error if the audio host cannot enumerate devices
    pub fn available_devices() -> MurmurResult<Vec<AudioDeviceInfo>> {
        let host = cpal::default_host();
        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let devices = host.output_devices().map_err(|e| {
            MurmurError::audio_device(format!("Failed to enumerate output devices: {e}"))
        })?;

        let mut infos = Vec::new();
        for device in devices {
            let Ok(name) = device.name() else {
                continue;
            };
            let (channels, default_sample_rate) = match device.default_output_config() {
                Ok(config) => (config.channels(), config.sample_rate().0),
                Err(e) => {
                    debug!("Skipping device {}: {}", name, e);
                    continue;
                }
            };
            infos.push(AudioDeviceInfo {
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                channels,
                default_sample_rate,
            });
        }

        Ok(infos)
    }

    /// Name of the opened device
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current audio configuration
    #[must_use]
    pub const fn config(&self) -> &AudioConfig {
        &self.config
    }
}

impl AudioSink for AudioDevice {
    fn start(&mut self, sample_rate: u32, mut consumer: ConsumerAdapter) -> MurmurResult<()> {
        if self.stream.is_some() {
            return Err(MurmurError::invalid_state("Audio stream already started"));
        }

        let stream_config = cpal::StreamConfig {
            channels: crate::DEFAULT_CHANNELS,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: self
                .config
                .buffer_frames
                .map_or(cpal::BufferSize::Default, cpal::BufferSize::Fixed),
        };

        // After completion the consumer keeps answering with silence until
        // the supervising thread stops the stream.
        let stream = self
            .device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let _ = consumer.fill(data);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| MurmurError::audio_device(format!("Failed to build audio stream: {e}")))?;

        stream
            .play()
            .map_err(|e| MurmurError::audio_device(format!("Failed to play audio stream: {e}")))?;

        debug!(sample_rate, device = %self.name, "Audio stream started");
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> MurmurResult<()> {
        if let Some(stream) = self.stream.take() {
            // Some hosts cannot pause; dropping the stream still closes it.
            if let Err(e) = stream.pause() {
                warn!("Failed to pause audio stream: {}", e);
            }
            debug!(device = %self.name, "Audio stream stopped");
        }
        Ok(())
    }

    fn state(&self) -> PlaybackState {
        if self.stream.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[derive(Debug, Default)]
struct Capture {
    frames: Vec<Vec<f32>>,
    completed: bool,
}

/// Clocked stand-in for a hardware device.
///
/// A worker thread requests `frames`-sample blocks every `period` and
/// records every block answered with `Continue`. It stops requesting once
/// the consumer reports `Complete`, as a real driver is allowed to.
#[derive(Debug)]
pub struct SimulatedDevice {
    frames: usize,
    period: Duration,
    available: bool,
    capture: Arc<Mutex<Capture>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SimulatedDevice {
    /// Device requesting `frames` samples every `period`
    #[must_use]
    pub fn new(frames: usize, period: Duration) -> Self {
        Self {
            frames: frames.max(1),
            period,
            available: true,
            capture: Arc::new(Mutex::new(Capture::default())),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Device that behaves as if no output hardware were present
    #[must_use]
    pub fn disconnected() -> Self {
        let mut device = Self::new(crate::DEFAULT_BUFFER_FRAMES, Duration::from_millis(1));
        device.available = false;
        device
    }

    /// Frames per request
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    /// Every frame delivered with `Continue`, in request order
    #[must_use]
    pub fn captured_frames(&self) -> Vec<Vec<f32>> {
        self.capture.lock().frames.clone()
    }

    /// All delivered samples concatenated
    #[must_use]
    pub fn captured_samples(&self) -> Vec<f32> {
        self.capture.lock().frames.concat()
    }

    /// Whether the consumer has reported `Complete`
    #[must_use]
    pub fn completed(&self) -> bool {
        self.capture.lock().completed
    }
}

impl AudioSink for SimulatedDevice {
    fn start(&mut self, _sample_rate: u32, mut consumer: ConsumerAdapter) -> MurmurResult<()> {
        if !self.available {
            return Err(MurmurError::device_unavailable(
                "Simulated device is disconnected",
            ));
        }
        if self.worker.is_some() {
            return Err(MurmurError::invalid_state("Simulated stream already started"));
        }

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let capture = Arc::clone(&self.capture);
        let frames = self.frames;
        let period = self.period;

        let worker = std::thread::Builder::new()
            .name("murmur-simulated-device".to_string())
            .spawn(move || {
                let mut buffer = vec![0.0_f32; frames];
                while running.load(Ordering::Acquire) {
                    match consumer.fill(&mut buffer) {
                        StreamStatus::Continue => capture.lock().frames.push(buffer.clone()),
                        StreamStatus::Complete => {
                            capture.lock().completed = true;
                            break;
                        }
                    }
                    std::thread::sleep(period);
                }
            })
            .map_err(|e| MurmurError::audio_device(format!("Failed to spawn device thread: {e}")))?;

        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) -> MurmurResult<()> {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| MurmurError::audio_device("Simulated device thread panicked"))?;
        }
        Ok(())
    }

    fn state(&self) -> PlaybackState {
        if self.worker.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
