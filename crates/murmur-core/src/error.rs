//! Error types for the Murmur playback pipeline.

/// Result type alias for Murmur operations
pub type MurmurResult<T> = Result<T, MurmurError>;

/// Main error type for streaming playback sessions
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MurmurError {
    /// An operation was attempted in a state that forbids it
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message describing the violated state
        message: String,
    },

    /// No usable output device exists
    #[error("No audio output device: {message}")]
    DeviceUnavailable {
        /// Error message describing which device was looked for
        message: String,
    },

    /// Audio device error
    #[error("Audio device error: {message}")]
    AudioDeviceError {
        /// Error message describing the device issue
        message: String,
    },

    /// The generation engine failed
    #[error("Generation failed: {message}")]
    GenerationError {
        /// Error message describing the failure
        message: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// File I/O error
    #[error("File I/O error: {message}")]
    FileError {
        /// Error message describing the file operation failure
        message: String,
    },

    /// Timeout error
    #[error("Operation timed out: {message}")]
    TimeoutError {
        /// Error message describing the timeout
        message: String,
    },
}

impl MurmurError {
    /// Create a new invalid state error
    #[must_use]
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a new device unavailable error
    #[must_use]
    pub fn device_unavailable<S: Into<String>>(message: S) -> Self {
        Self::DeviceUnavailable {
            message: message.into(),
        }
    }

    /// Create a new audio device error
    #[must_use]
    pub fn audio_device<S: Into<String>>(message: S) -> Self {
        Self::AudioDeviceError {
            message: message.into(),
        }
    }

    /// Create a new generation error
    #[must_use]
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::GenerationError {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new file error
    #[must_use]
    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::FileError {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    #[must_use]
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::TimeoutError {
            message: message.into(),
        }
    }

    /// Whether the error ends the playback session.
    ///
    /// Every error that reaches a caller is fatal to the session it came
    /// from except bad input, which is rejected before anything starts.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidInput { .. } | Self::ConfigurationError { .. })
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::ConfigurationError { .. } | Self::DeviceUnavailable { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "invalid_state",
            Self::DeviceUnavailable { .. } => "device_unavailable",
            Self::AudioDeviceError { .. } => "audio_device",
            Self::GenerationError { .. } => "generation",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::FileError { .. } => "file",
            Self::TimeoutError { .. } => "timeout",
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for MurmurError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string())
    }
}

impl From<hound::Error> for MurmurError {
    fn from(err: hound::Error) -> Self {
        Self::file(format!("WAV encoding error: {err}"))
    }
}

impl From<toml::de::Error> for MurmurError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML: {err}"))
    }
}

impl From<tokio::time::error::Elapsed> for MurmurError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::timeout(format!("Operation timed out: {err}"))
    }
}

impl From<anyhow::Error> for MurmurError {
    fn from(err: anyhow::Error) -> Self {
        Self::generation(err.to_string())
    }
}
