//! Bearer-token issuance and verification.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256: `base64url(header) "."
//! base64url(claims) "." base64url(signature)`. The claims carry the
//! username as subject plus issued-at and expiry timestamps. Verification is
//! purely computational — no server-side session lookup.

use crate::error::{AppError, AppResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried inside an issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated username
    pub sub: String,
    /// Issued-at, Unix seconds
    pub iat: u64,
    /// Expiry, Unix seconds
    pub exp: u64,
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Issues and verifies signed bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    /// Issue a token whose subject claim is the given username.
    pub fn issue(&self, username: &str) -> AppResult<String> {
        let now = epoch_secs();
        let header = Header {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{}.{}", header_b64, claims_b64);

        let signature = self.sign(signing_input.as_bytes())?;
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify a token's signature and expiry, returning its claims.
    /// Every failure mode collapses into `Unauthorized`.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut parts = token.split('.');
        let (header_b64, claims_b64, sig_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(c), Some(s)) if parts.next().is_none() => (h, c, s),
            _ => return Err(AppError::Unauthorized("Malformed token".into())),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| AppError::Unauthorized("Malformed token".into()))?;

        let signing_input = format!("{}.{}", header_b64, claims_b64);
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("HMAC init failed: {}", e)))?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AppError::Unauthorized("Invalid token signature".into()))?;

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| AppError::Unauthorized("Malformed token".into()))?;
        let header: Header = serde_json::from_slice(&header_bytes)
            .map_err(|_| AppError::Unauthorized("Malformed token".into()))?;
        if header.alg != "HS256" {
            return Err(AppError::Unauthorized("Unsupported token algorithm".into()));
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| AppError::Unauthorized("Malformed token".into()))?;
        let claims: Claims = serde_json::from_slice(&claims_bytes)
            .map_err(|_| AppError::Unauthorized("Malformed token".into()))?;

        if claims.exp <= epoch_secs() {
            return Err(AppError::Unauthorized("Token expired".into()));
        }

        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> AppResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Internal(format!("HMAC init failed: {}", e)))?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_carries_username_as_subject() {
        let signer = TokenSigner::new("unit-test-secret", 3600);
        let token = signer.issue("alice").unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let signer = TokenSigner::new("unit-test-secret", 3600);
        let token = signer.issue("alice").unwrap();

        // Swap the subject claim without re-signing
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                sub: "mallory".into(),
                iat: 0,
                exp: u64::MAX,
            })
            .unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

        assert!(matches!(
            signer.verify(&forged).unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let signer = TokenSigner::new("secret-a", 3600);
        let other = TokenSigner::new("secret-b", 3600);
        let token = other.issue("alice").unwrap();

        assert!(signer.verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new("unit-test-secret", 0);
        let token = signer.issue("alice").unwrap();

        assert!(matches!(
            signer.verify(&token).unwrap_err(),
            AppError::Unauthorized(_)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let signer = TokenSigner::new("unit-test-secret", 3600);
        assert!(signer.verify("not-a-token").is_err());
        assert!(signer.verify("a.b.c").is_err());
        assert!(signer.verify("").is_err());
    }
}
