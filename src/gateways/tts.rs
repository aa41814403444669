//! Text-to-speech gateway.
//!
//! Synchronous call to the cloud `text:synthesize` endpoint with a neutral
//! voice and MP3 output. The service already returns the audio base64-encoded
//! (`audioContent`), which is exactly what the HTTP response wants, so the
//! string is passed through untouched.

use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Voice locale used when the client does not provide one.
pub const DEFAULT_VOICE_LANGUAGE: &str = "es-US";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    /// Base64-encoded MP3 bytes
    audio_content: String,
}

/// Client for the cloud speech synthesis service.
#[derive(Clone)]
pub struct SynthesisGateway {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SynthesisGateway {
    pub fn new(http: reqwest::Client, config: &GoogleConfig) -> Self {
        Self {
            http,
            endpoint: config.tts_endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Synthesize `text` with the given voice locale; returns base64 MP3.
    pub async fn synthesize(&self, text: &str, language_code: &str) -> AppResult<String> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        debug!("Synthesizing {} chars with voice '{}'", text.len(), language_code);

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Synthesis(format!("Synthesis request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Synthesis service returned {}: {}", status, body);
            return Err(AppError::Synthesis(format!(
                "Synthesis service returned {}",
                status
            )));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Synthesis(format!("Invalid synthesis response: {}", e)))?;

        Ok(parsed.audio_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_neutral_mp3_voice() {
        let request = SynthesizeRequest {
            input: SynthesisInput { text: "hola mundo" },
            voice: VoiceSelection {
                language_code: DEFAULT_VOICE_LANGUAGE,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"]["text"], "hola mundo");
        assert_eq!(json["voice"]["languageCode"], "es-US");
        assert_eq!(json["voice"]["ssmlGender"], "NEUTRAL");
        assert_eq!(json["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn response_parsing_reads_audio_content() {
        let parsed: SynthesizeResponse = serde_json::from_value(serde_json::json!({
            "audioContent": "bXAzLWJ5dGVz"
        }))
        .unwrap();
        assert_eq!(parsed.audio_content, "bXAzLWJ5dGVz");
    }
}
