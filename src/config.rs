//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Platform environment variables (HOST, PORT, GOOGLE_API_KEY, JWT_SECRET,
//!    DATABASE_PATH)
//! 2. Environment variables with APP_ prefix (APP_SERVER__HOST, ...). The
//!    section/field separator is a double underscore so multi-word field
//!    names like `token_ttl_secs` stay addressable.
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! The Google API key and the token signing secret have no usable defaults;
//! `validate()` refuses an empty signing secret so a misconfigured deployment
//! fails at startup rather than issuing unverifiable tokens.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub google: GoogleConfig,
    pub media: MediaConfig,
    pub relay: RelayConfig,
}

/// Server-specific configuration settings.
///
/// `host = "127.0.0.1"` accepts local connections only; `host = "0.0.0.0"`
/// accepts connections from any address. The default port matches the
/// original deployment (5000).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Authentication and user-store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path of the SQLite database holding the users table
    pub database_path: String,
    /// Secret used to sign bearer tokens (HMAC-SHA256)
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub token_ttl_secs: u64,
    /// Whether the media endpoints (/speech-to-text, /translate,
    /// /text-to-speech) require a valid bearer token
    pub require_token: bool,
}

/// Credentials and endpoints for the three Google Cloud gateways.
///
/// The endpoint URLs are configurable so tests and on-prem proxies can point
/// the gateways somewhere else; production deployments leave the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub api_key: String,
    pub speech_endpoint: String,
    pub translate_endpoint: String,
    pub tts_endpoint: String,
    /// Per-request timeout for outbound service calls, in seconds
    pub request_timeout_secs: u64,
}

/// Media normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg_path: String,
    /// Upper bound on uploaded audio size, in bytes
    pub max_upload_bytes: usize,
    /// Hard limit on a single transcoding run, in seconds
    pub conversion_timeout_secs: u64,
}

/// Realtime relay (WebSocket) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Interval between server pings, in seconds
    pub heartbeat_interval_secs: u64,
    /// Close the connection after this long without a client heartbeat
    pub client_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            auth: AuthConfig {
                database_path: "users.db".to_string(),
                jwt_secret: "dev-only-signing-secret".to_string(),
                token_ttl_secs: 3600,
                require_token: true,
            },
            google: GoogleConfig {
                api_key: String::new(),
                speech_endpoint: "https://speech.googleapis.com/v1/speech:recognize".to_string(),
                translate_endpoint: "https://translation.googleapis.com/language/translate/v2"
                    .to_string(),
                tts_endpoint: "https://texttospeech.googleapis.com/v1/text:synthesize".to_string(),
                request_timeout_secs: 30,
            },
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                max_upload_bytes: 25 * 1024 * 1024,
                conversion_timeout_secs: 60,
            },
            relay: RelayConfig {
                heartbeat_interval_secs: 30,
                client_timeout_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml, and the environment.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`: override server host
    /// - `APP_AUTH__REQUIRE_TOKEN=false`: open up the media endpoints
    /// - `APP_AUTH__TOKEN_TTL_SECS=7200`: longer-lived bearer tokens
    /// - `HOST` / `PORT`: deployment-platform overrides
    /// - `GOOGLE_API_KEY`, `JWT_SECRET`, `DATABASE_PATH`: secrets that are
    ///   usually injected rather than committed to config.toml
    pub fn load() -> Result<Self> {
        // Double-underscore separator: `APP_AUTH__REQUIRE_TOKEN` addresses
        // `auth.require_token`. A single underscore would split multi-word
        // field names into nonexistent paths.
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        // Platform variables that don't follow the APP_ prefix convention
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }
        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }
        if let Ok(key) = env::var("GOOGLE_API_KEY") {
            settings = settings.set_override("google.api_key", key)?;
        }
        if let Ok(secret) = env::var("JWT_SECRET") {
            settings = settings.set_override("auth.jwt_secret", secret)?;
        }
        if let Ok(path) = env::var("DATABASE_PATH") {
            settings = settings.set_override("auth.database_path", path)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(anyhow::anyhow!("Token signing secret cannot be empty"));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(anyhow::anyhow!("Token TTL must be greater than 0"));
        }

        if self.media.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.relay.client_timeout_secs <= self.relay.heartbeat_interval_secs {
            return Err(anyhow::anyhow!(
                "Relay client timeout must be longer than the heartbeat interval"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert!(config.auth.require_token);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_empty_secret() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_port_zero() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_reaches_multi_word_fields() {
        std::env::set_var("APP_AUTH__REQUIRE_TOKEN", "false");
        std::env::set_var("APP_AUTH__TOKEN_TTL_SECS", "7200");

        let config = AppConfig::load().unwrap();

        std::env::remove_var("APP_AUTH__REQUIRE_TOKEN");
        std::env::remove_var("APP_AUTH__TOKEN_TTL_SECS");

        assert!(!config.auth.require_token);
        assert_eq!(config.auth.token_ttl_secs, 7200);
    }

    #[test]
    fn test_relay_timeouts_must_be_ordered() {
        let mut config = AppConfig::default();
        config.relay.client_timeout_secs = config.relay.heartbeat_interval_secs;
        assert!(config.validate().is_err());
    }
}
