//! # Cloud Service Gateways
//!
//! Each gateway adapts one request into the call signature of an external
//! managed service and adapts its response back — nothing more. The three
//! clients share a single `reqwest::Client` (connection pool + request
//! timeout) and are injected into handlers via `web::Data<T>`.
//!
//! There is deliberately no retry, backoff, or circuit breaking here: a
//! service failure surfaces directly to the caller as the matching
//! `AppError` variant.

pub mod speech;
pub mod translate;
pub mod tts;

pub use speech::SpeechGateway;
pub use translate::TranslationGateway;
pub use tts::SynthesisGateway;

use crate::config::GoogleConfig;
use std::time::Duration;

/// Build the shared outbound HTTP client used by all three gateways.
pub fn build_http_client(config: &GoogleConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;
    Ok(client)
}
