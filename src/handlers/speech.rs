//! `POST /speech-to-text` — multipart audio upload to transcript.
//!
//! ## Pipeline:
//! 1. Read the multipart form: a `file` part (required) and an optional
//!    `input_language` text field (default `en-US`).
//! 2. Normalize the audio to canonical WAV (whitelist check happens first;
//!    a bad extension never reaches the transcoder).
//! 3. Send the WAV bytes to the recognition gateway and return
//!    `{"transcript": ...}`.

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::gateways::speech::{SpeechGateway, DEFAULT_INPUT_LANGUAGE};
use crate::media::MediaNormalizer;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt as _;
use serde_json::json;
use tracing::info;

/// The uploaded form, after draining the multipart stream.
struct SpeechUpload {
    file_bytes: Vec<u8>,
    extension: String,
    input_language: String,
}

pub async fn speech_to_text(
    _user: AuthUser,
    state: web::Data<AppState>,
    normalizer: web::Data<MediaNormalizer>,
    speech: web::Data<SpeechGateway>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let max_upload_bytes = state.get_config().media.max_upload_bytes;
    let upload = read_upload(payload, max_upload_bytes).await?;

    let wav_bytes = normalizer
        .normalize(&upload.file_bytes, &upload.extension)
        .await?;

    let transcript = speech
        .transcribe(&wav_bytes, &upload.input_language)
        .await?;

    info!(
        "Transcribed {} byte upload (.{}, {}): {} chars",
        upload.file_bytes.len(),
        upload.extension,
        upload.input_language,
        transcript.len()
    );

    Ok(HttpResponse::Ok().json(json!({ "transcript": transcript })))
}

/// Drain the multipart stream into memory, enforcing the upload size cap.
async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<SpeechUpload, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut extension: Option<String> = None;
    let mut input_language = DEFAULT_INPUT_LANGUAGE.to_string();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .unwrap_or("")
            .to_string();

        match field_name.as_str() {
            "file" => {
                extension = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(extract_extension);

                let mut buf = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| AppError::BadRequest(format!("Upload read error: {}", e)))?;
                    if buf.len() + chunk.len() > max_bytes {
                        return Err(AppError::BadRequest(format!(
                            "Upload exceeds the {} byte limit",
                            max_bytes
                        )));
                    }
                    buf.extend_from_slice(&chunk);
                }
                file_bytes = Some(buf);
            }
            "input_language" => {
                let mut buf = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk
                        .map_err(|e| AppError::BadRequest(format!("Form read error: {}", e)))?;
                    buf.extend_from_slice(&chunk);
                }
                let value = String::from_utf8_lossy(&buf).trim().to_string();
                if !value.is_empty() {
                    input_language = value;
                }
            }
            // Unknown parts are drained and ignored
            _ => while field.next().await.is_some() {},
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    if file_bytes.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    let extension =
        extension.ok_or_else(|| AppError::BadRequest("Uploaded file has no filename".into()))?;

    Ok(SpeechUpload {
        file_bytes,
        extension,
        input_language,
    })
}

/// Lowercased extension of the uploaded filename. A name without a dot comes
/// back whole, which then fails the format whitelist.
fn extract_extension(filename: &str) -> String {
    let lowered = filename.to_lowercase();
    lowered
        .rsplit('.')
        .next()
        .unwrap_or(lowered.as_str())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_last_segment() {
        assert_eq!(extract_extension("Recording.WAV"), "wav");
        assert_eq!(extract_extension("voice.note.m4a"), "m4a");
        assert_eq!(extract_extension("clip.webm"), "webm");
    }

    #[test]
    fn filename_without_dot_fails_the_whitelist() {
        let ext = extract_extension("rawupload");
        assert_eq!(ext, "rawupload");
        assert!(!crate::media::MediaNormalizer::is_supported(&ext));
    }
}
