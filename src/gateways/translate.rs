//! Text translation gateway.
//!
//! Synchronous call to the cloud `translate/v2` endpoint. Used by both the
//! POST /translate handler and the realtime relay. No retry or backoff.

use crate::config::GoogleConfig;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Target language used when the client does not provide one.
pub const DEFAULT_TARGET_LANGUAGE: &str = "es";

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Client for the cloud translation service.
#[derive(Clone)]
pub struct TranslationGateway {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TranslationGateway {
    pub fn new(http: reqwest::Client, config: &GoogleConfig) -> Self {
        Self {
            http,
            endpoint: config.translate_endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Translate `text` into `target_language`.
    pub async fn translate(&self, text: &str, target_language: &str) -> AppResult<String> {
        let request = TranslateRequest {
            q: text,
            target: target_language,
            format: "text",
        };

        debug!("Translating {} chars into '{}'", text.len(), target_language);

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Translation(format!("Translation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Translation service returned {}: {}", status, body);
            return Err(AppError::Translation(format!(
                "Translation service returned {}",
                status
            )));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Translation(format!("Invalid translation response: {}", e)))?;

        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| AppError::Translation("Translation response was empty".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let request = TranslateRequest {
            q: "hello",
            target: "es",
            format: "text",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["q"], "hello");
        assert_eq!(json["target"], "es");
        assert_eq!(json["format"], "text");
    }

    #[test]
    fn response_parsing_takes_first_translation() {
        let parsed: TranslateResponse = serde_json::from_value(serde_json::json!({
            "data": {"translations": [
                {"translatedText": "hola", "detectedSourceLanguage": "en"},
                {"translatedText": "buenas"}
            ]}
        }))
        .unwrap();

        assert_eq!(parsed.data.translations[0].translated_text, "hola");
    }

    #[test]
    fn default_target_is_spanish() {
        assert_eq!(DEFAULT_TARGET_LANGUAGE, "es");
    }
}
