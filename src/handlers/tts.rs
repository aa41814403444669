//! `POST /text-to-speech` — synthesis endpoint.
//!
//! The response carries the MP3 audio base64-encoded under the `audio` key,
//! exactly as the synthesis gateway returns it.

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::gateways::tts::{SynthesisGateway, DEFAULT_VOICE_LANGUAGE};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    /// Voice locale; defaults to `es-US` when omitted
    pub language_code: Option<String>,
}

pub async fn text_to_speech(
    _user: AuthUser,
    synthesizer: web::Data<SynthesisGateway>,
    request: web::Json<SynthesizeRequest>,
) -> Result<HttpResponse, AppError> {
    let SynthesizeRequest {
        text,
        language_code,
    } = request.into_inner();

    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Field 'text' must not be empty".into()));
    }

    let voice = language_code
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_VOICE_LANGUAGE.to_string());

    let audio_base64 = synthesizer.synthesize(&text, &voice).await?;

    Ok(HttpResponse::Ok().json(json!({ "audio": audio_base64 })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_deserializes_with_and_without_voice() {
        let full: SynthesizeRequest =
            serde_json::from_str(r#"{"text": "hola", "language_code": "en-US"}"#).unwrap();
        assert_eq!(full.text, "hola");
        assert_eq!(full.language_code.as_deref(), Some("en-US"));

        let minimal: SynthesizeRequest = serde_json::from_str(r#"{"text": "hola"}"#).unwrap();
        assert!(minimal.language_code.is_none());
    }
}
