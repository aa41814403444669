//! Registration and login endpoints.

use crate::auth::{TokenSigner, UserStore};
use crate::error::AppError;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Request body shared by `/register` and `/login`.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// `POST /register` — create a new user.
///
/// Responds 201 with `{"message": ...}`; 409 Conflict when the username is
/// already taken. Password hashing runs on the blocking pool — PBKDF2 is CPU
/// work that must not stall the async workers.
pub async fn register(
    store: web::Data<UserStore>,
    request: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, AppError> {
    let CredentialsRequest { username, password } = request.into_inner();

    let store = store.clone();
    let user = web::block(move || store.create_user(&username, &password)).await??;

    info!("Registered user '{}'", user.username);
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

/// `POST /login` — verify credentials and issue a bearer token.
///
/// Responds `{"token": ...}`; 401 when the username is unknown or the
/// password does not match (indistinguishable to the caller).
pub async fn login(
    store: web::Data<UserStore>,
    signer: web::Data<TokenSigner>,
    request: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, AppError> {
    let CredentialsRequest { username, password } = request.into_inner();

    let store = store.clone();
    let user = web::block(move || store.verify_credentials(&username, &password)).await??;

    let token = signer.issue(&user.username)?;
    info!("Issued token for user '{}'", user.username);

    Ok(HttpResponse::Ok().json(json!({ "token": token })))
}
