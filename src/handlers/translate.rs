//! `POST /translate` — text translation endpoint.

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::gateways::translate::{TranslationGateway, DEFAULT_TARGET_LANGUAGE};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    /// Defaults to `es` when omitted
    pub target_language: Option<String>,
}

pub async fn translate_text(
    _user: AuthUser,
    translator: web::Data<TranslationGateway>,
    request: web::Json<TranslateRequest>,
) -> Result<HttpResponse, AppError> {
    let TranslateRequest {
        text,
        target_language,
    } = request.into_inner();

    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Field 'text' must not be empty".into()));
    }

    let target = target_language
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TARGET_LANGUAGE.to_string());

    let translated_text = translator.translate(&text, &target).await?;

    Ok(HttpResponse::Ok().json(json!({ "translated_text": translated_text })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_deserializes_with_and_without_target() {
        let full: TranslateRequest =
            serde_json::from_str(r#"{"text": "hello", "target_language": "fr"}"#).unwrap();
        assert_eq!(full.text, "hello");
        assert_eq!(full.target_language.as_deref(), Some("fr"));

        let minimal: TranslateRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(minimal.target_language.is_none());
    }
}
