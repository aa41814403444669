//! # Media Normalization
//!
//! Converts an uploaded audio file into the canonical format the recognition
//! service requires: mono, 16kHz, 16-bit linear PCM WAV. The conversion is
//! delegated to an ffmpeg subprocess; nothing is decoded in-process.
//!
//! ## Lifecycle invariant:
//! Each call operates on scoped `NamedTempFile`s. The guards are dropped when
//! the call returns, so both temporary artifacts are removed on success *and*
//! on every failure path (bad input, ffmpeg failure, timeout, read error).

use crate::error::{AppError, AppResult};
use std::io::Write;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Upload container extensions accepted by `/speech-to-text`.
pub const SUPPORTED_FORMATS: &[&str] = &["wav", "webm", "mp4", "m4a"];

/// Canonical sample rate expected by the recognition service.
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// Normalizes uploaded audio via an external ffmpeg subprocess.
#[derive(Clone)]
pub struct MediaNormalizer {
    ffmpeg_path: String,
    conversion_timeout: Duration,
}

impl MediaNormalizer {
    pub fn new(ffmpeg_path: &str, conversion_timeout_secs: u64) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
            conversion_timeout: Duration::from_secs(conversion_timeout_secs),
        }
    }

    /// Whether the given extension (lowercase) is in the supported whitelist.
    pub fn is_supported(extension: &str) -> bool {
        SUPPORTED_FORMATS.contains(&extension)
    }

    /// Normalize `input` (audio bytes in a container named by `extension`)
    /// into canonical WAV bytes.
    ///
    /// Already-canonical WAV input is a byte-identity pass-through: no
    /// temporary files, no subprocess. Anything outside the whitelist fails
    /// with `UnsupportedFormat` before any resource is acquired.
    pub async fn normalize(&self, input: &[u8], extension: &str) -> AppResult<Vec<u8>> {
        let ext = extension.to_ascii_lowercase();

        if !Self::is_supported(&ext) {
            return Err(AppError::UnsupportedFormat(format!(
                "Unsupported file format: {}",
                ext
            )));
        }

        if ext == "wav" {
            debug!("Input already WAV, passing through {} bytes", input.len());
            return Ok(input.to_vec());
        }

        // Both guards delete their file on drop, whichever way we exit.
        let mut source = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{}", ext))
            .tempfile()
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;
        source
            .write_all(input)
            .and_then(|_| source.flush())
            .map_err(|e| AppError::Internal(format!("Failed to write temp file: {}", e)))?;

        let target = tempfile::Builder::new()
            .prefix("normalized-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;

        self.run_ffmpeg(source.path(), target.path()).await?;

        let wav_bytes = tokio::fs::read(target.path())
            .await
            .map_err(|e| AppError::Conversion(format!("Failed to read converted audio: {}", e)))?;

        debug!(
            "Converted {} bytes of {} into {} bytes of WAV",
            input.len(),
            ext,
            wav_bytes.len()
        );
        Ok(wav_bytes)
    }

    /// Invoke `ffmpeg -i <input> -ac 1 -ar 16000 -acodec pcm_s16le <output>`,
    /// bounded by the configured timeout.
    async fn run_ffmpeg(&self, input: &std::path::Path, output: &std::path::Path) -> AppResult<()> {
        let run = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-ac")
            .arg("1")
            .arg("-ar")
            .arg(CANONICAL_SAMPLE_RATE.to_string())
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-f")
            .arg("wav")
            .arg(output)
            .output();

        let result = tokio::time::timeout(self.conversion_timeout, run)
            .await
            .map_err(|_| {
                warn!("ffmpeg timed out after {:?}", self.conversion_timeout);
                AppError::Conversion("Audio conversion timed out".into())
            })?
            .map_err(|e| AppError::Conversion(format!("Failed to spawn ffmpeg: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            warn!("ffmpeg failed ({}): {}", result.status, stderr.trim());
            return Err(AppError::Conversion("Error converting audio".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> MediaNormalizer {
        MediaNormalizer::new("ffmpeg", 60)
    }

    #[test]
    fn whitelist_matches_contract() {
        for ext in ["wav", "webm", "mp4", "m4a"] {
            assert!(MediaNormalizer::is_supported(ext), "{} should be supported", ext);
        }
        for ext in ["ogg", "flac", "mp3", "txt", ""] {
            assert!(!MediaNormalizer::is_supported(ext), "{} should be rejected", ext);
        }
    }

    #[actix_web::test]
    async fn unsupported_extension_fails_without_transcoding() {
        // The binary path is bogus on purpose: if the whitelist check didn't
        // short-circuit, spawning would produce a Conversion error instead.
        let normalizer = MediaNormalizer::new("/nonexistent/ffmpeg", 60);
        let err = normalizer.normalize(b"xxxx", "ogg").await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[actix_web::test]
    async fn wav_input_is_byte_identity_pass_through() {
        // Same bogus-binary trick: a WAV upload must never reach ffmpeg.
        let normalizer = MediaNormalizer::new("/nonexistent/ffmpeg", 60);
        let payload = b"RIFF....WAVEfmt fake-but-irrelevant".to_vec();
        let out = normalizer.normalize(&payload, "wav").await.unwrap();
        assert_eq!(out, payload);
    }

    #[actix_web::test]
    async fn extension_comparison_is_case_insensitive() {
        let normalizer = MediaNormalizer::new("/nonexistent/ffmpeg", 60);
        let payload = b"RIFF".to_vec();
        assert!(normalizer.normalize(&payload, "WAV").await.is_ok());
    }

    #[actix_web::test]
    async fn missing_ffmpeg_surfaces_conversion_error() {
        let normalizer = MediaNormalizer::new("/nonexistent/ffmpeg", 5);
        let err = normalizer.normalize(b"not-audio", "webm").await.unwrap_err();
        assert!(matches!(err, AppError::Conversion(_)));
    }

    #[test]
    fn normalizer_is_cheap_to_clone() {
        let a = normalizer();
        let b = a.clone();
        assert_eq!(b.ffmpeg_path, "ffmpeg");
    }
}
