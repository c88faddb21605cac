//! WAV persistence of the fully generated waveform.
//!
//! Runs on the supervising thread after generation returns and is
//! independent of the streaming path.

use crate::error::{MurmurError, MurmurResult};
use std::path::Path;
use tracing::info;

/// Sample encoding written to the WAV file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WavEncoding {
    /// 16-bit signed PCM
    #[default]
    Pcm16,
    /// 32-bit IEEE float
    Float32,
}

impl WavEncoding {
    fn spec(self, sample_rate: u32) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self {
            Self::Pcm16 => (16, hound::SampleFormat::Int),
            Self::Float32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels: crate::DEFAULT_CHANNELS,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Convert a float sample to 16-bit PCM, clamping out-of-range input
#[must_use]
pub fn to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Write mono samples to `path` as a WAV file.
///
/// Parent directories are created when missing.
///
/// # Errors
///
/// Returns an error if the waveform is empty, the sample rate is zero, or
/// the file cannot be written
pub fn save_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    encoding: WavEncoding,
) -> MurmurResult<()> {
    let path = path.as_ref();

    if samples.is_empty() {
        return Err(MurmurError::invalid_input("Audio data cannot be empty"));
    }
    if sample_rate == 0 {
        return Err(MurmurError::invalid_input("Sample rate must be greater than 0"));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MurmurError::file(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let mut writer = hound::WavWriter::create(path, encoding.spec(sample_rate))?;
    match encoding {
        WavEncoding::Pcm16 => {
            for &sample in samples {
                writer.write_sample(to_pcm16(sample))?;
            }
        }
        WavEncoding::Float32 => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
    }
    writer.finalize()?;

    info!(
        "Wrote {} samples ({:.2}s) to {}",
        samples.len(),
        samples.len() as f64 / f64::from(sample_rate),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pcm16_conversion() {
        assert_eq!(to_pcm16(0.0), 0);
        assert_eq!(to_pcm16(1.0), 32767);
        assert_eq!(to_pcm16(-1.0), -32767);
        assert_eq!(to_pcm16(4.0), 32767);
        assert_eq!(to_pcm16(-4.0), -32768);
    }

    #[test]
    fn test_save_pcm16() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("speech.wav");
        let samples = vec![0.0, 0.5, -0.5, 1.0];

        save_wav(&path, &samples, 22_050, WavEncoding::Pcm16).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22_050);
        assert_eq!(spec.bits_per_sample, 16);
        let read: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(read, vec![0, 16383, -16383, 32767]);
    }

    #[test]
    fn test_save_float32() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("speech.wav");
        let samples = vec![0.25, -0.75];

        save_wav(&path, &samples, 24_000, WavEncoding::Float32).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
        let read: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("out.wav");
        save_wav(&path, &[0.1], 16_000, WavEncoding::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_empty_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.wav");
        let err = save_wav(&path, &[], 16_000, WavEncoding::Pcm16).unwrap_err();
        assert!(matches!(err, MurmurError::InvalidInput { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_zero_sample_rate_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = save_wav(temp_dir.path().join("x.wav"), &[0.1], 0, WavEncoding::Pcm16)
            .unwrap_err();
        assert!(matches!(err, MurmurError::InvalidInput { .. }));
    }
}
