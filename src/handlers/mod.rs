//! # HTTP Request Handlers
//!
//! One module per endpoint group:
//! - **auth**: `POST /register`, `POST /login`
//! - **speech**: `POST /speech-to-text` (multipart upload)
//! - **translate**: `POST /translate`
//! - **tts**: `POST /text-to-speech`
//!
//! Handlers stay thin: validate input, call the injected dependency, shape
//! the JSON response. All failure paths go through `AppError`.

pub mod auth;
pub mod speech;
pub mod translate;
pub mod tts;

pub use auth::{login, register};
pub use speech::speech_to_text;
pub use translate::translate_text;
pub use tts::text_to_speech;
