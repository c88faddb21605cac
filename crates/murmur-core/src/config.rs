//! Playback configuration, loadable from TOML.

use crate::error::{MurmurError, MurmurResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Config file name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "murmur.toml";

/// Output device configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Target device name (None for the default output device)
    pub device_name: Option<String>,
    /// Frames per device callback (None lets the driver choose)
    pub buffer_frames: Option<u32>,
}

/// Settings for one streaming playback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How often the supervising thread re-checks for completion
    pub poll_interval_ms: u64,
    /// Maximum queued chunks before generation blocks (None for unbounded)
    pub queue_capacity: Option<usize>,
    /// Give up waiting for playback to drain after this many milliseconds
    pub drain_timeout_ms: Option<u64>,
    /// Write the full generated waveform here as WAV
    pub output_path: Option<PathBuf>,
    /// Output device settings
    pub audio: AudioConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: crate::DEFAULT_POLL_INTERVAL_MS,
            queue_capacity: None,
            drain_timeout_ms: None,
            output_path: None,
            audio: AudioConfig::default(),
        }
    }
}

impl PlaybackConfig {
    /// Parse configuration from a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or fails validation
    pub fn from_toml_str(content: &str) -> MurmurResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> MurmurResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MurmurError::file(format!("Failed to read config {}: {e}", path.display()))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Path of the per-user config file, if the platform has a config directory
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "murmur")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load the per-user config file, falling back to defaults when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid
    pub fn load_default() -> MurmurResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                info!("Using config file {}", path.display());
                Self::from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range
    pub fn validate(&self) -> MurmurResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(MurmurError::configuration(
                "poll_interval_ms must be greater than 0",
            ));
        }

        if self.drain_timeout_ms == Some(0) {
            return Err(MurmurError::configuration(
                "drain_timeout_ms must be greater than 0 when set",
            ));
        }

        if self.queue_capacity == Some(0) {
            return Err(MurmurError::configuration(
                "queue_capacity must be greater than 0 when set",
            ));
        }

        if self.audio.buffer_frames == Some(0) {
            return Err(MurmurError::configuration(
                "audio.buffer_frames must be greater than 0 when set",
            ));
        }

        Ok(())
    }

    /// Completion poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Completion wait limit
    #[must_use]
    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_ms.map(Duration::from_millis)
    }

    /// Bound the chunk queue
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Set the completion poll interval, rounded up to whole milliseconds
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = ceil_millis(interval);
        self
    }

    /// Limit how long to wait for playback to drain, rounded up to whole
    /// milliseconds
    #[must_use]
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout_ms = Some(ceil_millis(timeout));
        self
    }

    /// Save the generated waveform to `path`
    #[must_use]
    pub fn with_output_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

fn ceil_millis(duration: Duration) -> u64 {
    let millis = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}
