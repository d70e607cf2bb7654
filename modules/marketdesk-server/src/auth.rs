use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use regex::Regex;
use uuid::Uuid;

use crate::envelope::ApiError;
use crate::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Check a new password against the strength rules. Returns every failed
/// rule in one message so the user can fix them all at once.
pub fn validate_password_strength(password: &str) -> Result<(), ApiError> {
    let mut failures = Vec::new();

    if password.len() < MIN_PASSWORD_LENGTH {
        failures.push("at least 8 characters");
    }
    if !Regex::new(r"[A-Z]").expect("Invalid uppercase regex").is_match(password) {
        failures.push("an uppercase letter");
    }
    if !Regex::new(r"[a-z]").expect("Invalid lowercase regex").is_match(password) {
        failures.push("a lowercase letter");
    }
    if !Regex::new(r"\d").expect("Invalid digit regex").is_match(password) {
        failures.push("a number");
    }
    if !Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("Invalid special char regex").is_match(password) {
        failures.push("a special character");
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "Password must contain {}",
            failures.join(", ")
        )))
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Authenticated user. Extract this in handlers that require a Bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Auth("Missing authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Auth("Invalid authorization header".into()))?;

        let claims = state
            .jwt
            .verify_access_token(token)
            .map_err(|_| ApiError::Auth("Invalid or expired token".into()))?;

        let user_id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::Auth("Invalid token subject".into()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(validate_password_strength("Str0ng!pass").is_ok());
    }

    #[test]
    fn weak_passwords_report_every_failure() {
        let err = validate_password_strength("short").unwrap_err();
        let ApiError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("8 characters"));
        assert!(msg.contains("uppercase"));
        assert!(msg.contains("number"));
        assert!(msg.contains("special character"));
    }

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("Str0ng!pass").unwrap();
        assert!(verify_password("Str0ng!pass", &hash));
        assert!(!verify_password("Wr0ng!pass", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        let h1 = hash_password("Str0ng!pass").unwrap();
        let h2 = hash_password("Str0ng!pass").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
