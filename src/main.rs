//! # Speech Bridge Backend - Main Application Entry Point
//!
//! An actix-web façade in front of three external cloud services (speech
//! recognition, text translation, speech synthesis) plus a minimal
//! username/password user store and a WebSocket chat-translation relay.
//!
//! ## Application Architecture:
//! - **config**: TOML file + environment variable configuration
//! - **state**: shared configuration and request metrics
//! - **auth**: user store, bearer tokens, request guard
//! - **media**: ffmpeg-backed audio normalization
//! - **gateways**: the three cloud service clients
//! - **handlers**: HTTP request handlers
//! - **relay**: WebSocket broadcast relay
//! - **middleware / health / error**: telemetry and error surfaces
//!
//! Every dependency a handler needs — store, signer, normalizer, gateways,
//! relay server address — is constructed once here and injected via
//! `web::Data<T>`. There is no ambient global state.

mod auth;
mod config;
mod error;
mod gateways;
mod handlers;
mod health;
mod media;
mod middleware;
mod relay;
mod state;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer, middleware::Logger};
use anyhow::{Context, Result};
use config::AppConfig;
use state::AppState;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown signal, set by the SIGINT/SIGTERM handler.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting speech-bridge-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    if config.google.api_key.is_empty() {
        error!("GOOGLE_API_KEY is not set; cloud gateway calls will fail");
    }

    // Construct every injected dependency once, up front
    let app_state = web::Data::new(AppState::new(config.clone()));
    let user_store = web::Data::new(
        auth::UserStore::open(Path::new(&config.auth.database_path))
            .context("Failed to open the user database")?,
    );
    let token_signer = web::Data::new(auth::TokenSigner::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_secs,
    ));
    let normalizer = web::Data::new(media::MediaNormalizer::new(
        &config.media.ffmpeg_path,
        config.media.conversion_timeout_secs,
    ));

    let http_client = gateways::build_http_client(&config.google)?;
    let speech_gateway = web::Data::new(gateways::SpeechGateway::new(
        http_client.clone(),
        &config.google,
    ));
    let translation_gateway = web::Data::new(gateways::TranslationGateway::new(
        http_client.clone(),
        &config.google,
    ));
    let synthesis_gateway = web::Data::new(gateways::SynthesisGateway::new(
        http_client,
        &config.google,
    ));

    let relay_server = web::Data::new(relay::RelayServer::new().start());

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .app_data(user_store.clone())
            .app_data(token_signer.clone())
            .app_data(normalizer.clone())
            .app_data(speech_gateway.clone())
            .app_data(translation_gateway.clone())
            .app_data(synthesis_gateway.clone())
            .app_data(relay_server.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::Telemetry)
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics)),
            )
            .route("/health", web::get().to(health::health_check))
            .route("/register", web::post().to(handlers::register))
            .route("/login", web::post().to(handlers::login))
            .route("/speech-to-text", web::post().to(handlers::speech_to_text))
            .route("/translate", web::post().to(handlers::translate_text))
            .route("/text-to-speech", web::post().to(handlers::text_to_speech))
            .route("/ws/translate", web::get().to(relay::translate_relay))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Race the server against the shutdown signal
    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "speech_bridge_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM/SIGINT and flip the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
