//! Token signing and verification.
//!
//! Tokens are standard three-segment HS256 JWTs: base64url(header) "." +
//! base64url(payload) "." base64url(HMAC-SHA256 signature), carrying the
//! user's email as the subject claim and an absolute expiry timestamp. The
//! crypto is pure and takes its secret explicitly; persistence and the
//! one-token-per-user rule live in [`authority`].
//!
//! Verification checks the expiry claim first, then recomputes the HMAC over
//! the first two segments and compares it byte-for-byte against the provided
//! signature segment. An elapsed expiry is an expired credential (401); a
//! mismatched signature is a forgery (403).

pub mod authority;
pub mod policy;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the owning user's email.
    pub sub: String,
    /// Absolute expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    pub fn new(subject: impl Into<String>, ttl_secs: i64) -> Self {
        Self {
            sub: subject.into(),
            exp: Utc::now().timestamp() + ttl_secs,
        }
    }
}

/// Mint a signed token string for the given claims.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, ApiError> {
    if secret.is_empty() {
        return Err(ApiError::internal("JWT secret is not configured"));
    }
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError::internal(format!("token generation failed: {}", e)))
}

/// Verify a token string and hand back its claims.
pub fn verify(token: &str, secret: &str) -> Result<Claims, ApiError> {
    if token.is_empty() {
        return Err(ApiError::unauthorized("Token is empty"));
    }

    let mut segments = token.split('.');
    let (header_seg, payload_seg, signature_seg) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(ApiError::unauthorized("Invalid token")),
        };

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_seg)
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;
    let claims: Claims = serde_json::from_slice(&payload_bytes)
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;

    // Expiry is checked before the signature; an expired token reads as a
    // lapsed credential even when it is also mangled.
    if claims.exp < Utc::now().timestamp() {
        return Err(ApiError::unauthorized("Token expired"));
    }

    let message = format!("{}.{}", header_seg, payload_seg);
    let expected = jsonwebtoken::crypto::sign(
        message.as_bytes(),
        &EncodingKey::from_secret(secret.as_bytes()),
        Algorithm::HS256,
    )
    .map_err(|e| ApiError::internal(format!("signature computation failed: {}", e)))?;

    if expected != signature_seg {
        return Err(ApiError::forbidden("Invalid signature"));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn fresh_token_verifies_and_keeps_its_subject() {
        let token = sign(&Claims::new("a@b.com", 3600), SECRET).unwrap();
        assert_eq!(token.split('.').count(), 3);
        let claims = verify(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "a@b.com");
    }

    #[test]
    fn elapsed_expiry_is_unauthorized() {
        let token = sign(&Claims { sub: "a@b.com".into(), exp: Utc::now().timestamp() - 10 }, SECRET)
            .unwrap();
        let err = verify(&token, SECRET).unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "Token expired");
    }

    #[test]
    fn tampered_signature_is_forbidden() {
        let token = sign(&Claims::new("a@b.com", 3600), SECRET).unwrap();
        let mut tampered: Vec<char> = token.chars().collect();
        let last = *tampered.last().unwrap();
        *tampered.last_mut().unwrap() = if last == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();
        let err = verify(&tampered, SECRET).unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "Invalid signature");
    }

    #[test]
    fn token_signed_with_another_secret_is_forbidden() {
        let token = sign(&Claims::new("a@b.com", 3600), "other-secret").unwrap();
        let err = verify(&token, SECRET).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn expired_and_tampered_reads_as_expired() {
        let token = sign(&Claims { sub: "a@b.com".into(), exp: Utc::now().timestamp() - 10 }, SECRET)
            .unwrap();
        let tampered = format!("{}x", token);
        assert_eq!(verify(&tampered, SECRET).unwrap_err().status_code(), 401);
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert_eq!(verify("definitely.not.a-jwt", SECRET).unwrap_err().status_code(), 401);
        assert_eq!(verify("two.segments", SECRET).unwrap_err().status_code(), 401);
        assert_eq!(verify("", SECRET).unwrap_err().status_code(), 401);
    }
}
