//! Speech-to-text gateway.
//!
//! Submits a full audio payload synchronously (no streaming) to the cloud
//! `speech:recognize` endpoint and returns the first result's first
//! alternative. The audio must already be canonical WAV — mono, 16kHz,
//! LINEAR16 — which is what the media normalizer produces.

use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Language tag used when the client does not provide one.
pub const DEFAULT_INPUT_LANGUAGE: &str = "en-US";

/// Returned when the service recognizes nothing in the audio.
pub const NO_TRANSCRIPTION_PLACEHOLDER: &str = "No transcription found";

#[derive(Debug, Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: String,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    /// Base64-encoded WAV bytes
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<SpeechResult>,
}

#[derive(Debug, Deserialize)]
struct SpeechResult {
    #[serde(default)]
    alternatives: Vec<SpeechAlternative>,
}

#[derive(Debug, Deserialize)]
struct SpeechAlternative {
    #[serde(default)]
    transcript: String,
}

/// Client for the cloud speech recognition service.
#[derive(Clone)]
pub struct SpeechGateway {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SpeechGateway {
    pub fn new(http: reqwest::Client, config: &GoogleConfig) -> Self {
        Self {
            http,
            endpoint: config.speech_endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Transcribe canonical WAV bytes in the given language.
    pub async fn transcribe(&self, wav_bytes: &[u8], language_code: &str) -> AppResult<String> {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: crate::media::CANONICAL_SAMPLE_RATE,
                language_code: language_code.to_string(),
            },
            audio: RecognitionAudio {
                content: BASE64.encode(wav_bytes),
            },
        };

        debug!(
            "Submitting {} bytes of audio for recognition ({})",
            wav_bytes.len(),
            language_code
        );

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Recognition(format!("Recognition request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Recognition service returned {}: {}", status, body);
            return Err(AppError::Recognition(format!(
                "Recognition service returned {}",
                status
            )));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Recognition(format!("Invalid recognition response: {}", e)))?;

        Ok(extract_transcript(parsed))
    }
}

/// First result's first alternative, or the literal placeholder.
fn extract_transcript(response: RecognizeResponse) -> String {
    response
        .results
        .into_iter()
        .next()
        .and_then(|result| result.alternatives.into_iter().next())
        .map(|alt| alt.transcript)
        .unwrap_or_else(|| NO_TRANSCRIPTION_PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_canonical_encoding() {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: 16000,
                language_code: "en-US".into(),
            },
            audio: RecognitionAudio {
                content: BASE64.encode(b"audio"),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["config"]["encoding"], "LINEAR16");
        assert_eq!(json["config"]["sampleRateHertz"], 16000);
        assert_eq!(json["config"]["languageCode"], "en-US");
        assert_eq!(json["audio"]["content"], BASE64.encode(b"audio"));
    }

    #[test]
    fn transcript_comes_from_first_alternative_of_first_result() {
        let response: RecognizeResponse = serde_json::from_value(serde_json::json!({
            "results": [
                {"alternatives": [
                    {"transcript": "hello world", "confidence": 0.93},
                    {"transcript": "hello word"}
                ]},
                {"alternatives": [{"transcript": "second result"}]}
            ]
        }))
        .unwrap();

        assert_eq!(extract_transcript(response), "hello world");
    }

    #[test]
    fn empty_results_yield_placeholder() {
        let response: RecognizeResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(extract_transcript(response), NO_TRANSCRIPTION_PLACEHOLDER);

        let response: RecognizeResponse =
            serde_json::from_value(serde_json::json!({"results": []})).unwrap();
        assert_eq!(extract_transcript(response), NO_TRANSCRIPTION_PLACEHOLDER);
    }

    #[test]
    fn result_without_alternatives_yields_placeholder() {
        let response: RecognizeResponse =
            serde_json::from_value(serde_json::json!({"results": [{}]})).unwrap();
        assert_eq!(extract_transcript(response), NO_TRANSCRIPTION_PLACEHOLDER);
    }
}
