//! Request guard for the protected media endpoints.
//!
//! When `auth.require_token` is enabled (the default), handlers that take an
//! [`AuthUser`] parameter reject requests without a valid
//! `Authorization: Bearer <token>` header. Disabling the flag opens the
//! media endpoints up deliberately — an explicit configuration decision, not
//! an omission.

use crate::auth::token::TokenSigner;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// The caller's identity, as established by the bearer token.
///
/// `username` is `None` only when token enforcement is switched off.
#[derive(Debug)]
pub struct AuthUser {
    pub username: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("Application state not configured".into()))?;

    if !state.get_config().auth.require_token {
        return Ok(AuthUser { username: None });
    }

    let signer = req
        .app_data::<web::Data<TokenSigner>>()
        .ok_or_else(|| AppError::Internal("Token signer not configured".into()))?;

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authorization header must use the Bearer scheme".into()))?;

    let claims = signer.verify(token)?;
    Ok(AuthUser {
        username: Some(claims.sub),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use actix_web::test::TestRequest;

    fn state(require_token: bool) -> web::Data<AppState> {
        let mut config = AppConfig::default();
        config.auth.require_token = require_token;
        web::Data::new(AppState::new(config))
    }

    fn signer() -> web::Data<TokenSigner> {
        web::Data::new(TokenSigner::new("extractor-test-secret", 3600))
    }

    #[actix_web::test]
    async fn valid_bearer_token_is_accepted() {
        let signer = signer();
        let token = signer.issue("alice").unwrap();
        let req = TestRequest::default()
            .app_data(state(true))
            .app_data(signer)
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();

        let user = authenticate(&req).unwrap();
        assert_eq!(user.username.as_deref(), Some("alice"));
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(state(true))
            .app_data(signer())
            .to_http_request();

        assert!(matches!(
            authenticate(&req).unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[actix_web::test]
    async fn wrong_scheme_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(state(true))
            .app_data(signer())
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();

        assert!(matches!(
            authenticate(&req).unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[actix_web::test]
    async fn enforcement_can_be_disabled_explicitly() {
        let req = TestRequest::default()
            .app_data(state(false))
            .app_data(signer())
            .to_http_request();

        let user = authenticate(&req).unwrap();
        assert!(user.username.is_none());
    }
}
