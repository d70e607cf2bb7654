use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ISSUER: &str = "marketdesk";

/// Claims for a login access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub typ: String,
}

/// Claims for single-purpose tokens (email verification, password reset).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PurposeClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub typ: String,
}

/// What a purpose token is allowed to be used for. Checked on verify so a
/// verification mail token can never reset a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Verification,
    Reset,
}

impl TokenPurpose {
    fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Verification => "verification",
            TokenPurpose::Reset => "reset",
        }
    }
}

/// JWT service for creating and verifying tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_minutes: i64,
    purpose_ttl_hours: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_ttl_minutes: i64, purpose_ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_minutes,
            purpose_ttl_hours,
        }
    }

    pub fn create_access_token(&self, user_id: Uuid, email: &str) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (now + chrono::Duration::minutes(self.access_ttl_minutes)).timestamp(),
            iat: now.timestamp(),
            iss: ISSUER.to_string(),
            typ: "access".to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify an access token and return its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        let claims: AccessClaims = self.verify(token)?;
        if claims.typ != "access" {
            return Err(anyhow!("not an access token"));
        }
        Ok(claims)
    }

    pub fn create_purpose_token(&self, user_id: Uuid, purpose: TokenPurpose) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = PurposeClaims {
            sub: user_id.to_string(),
            exp: (now + chrono::Duration::hours(self.purpose_ttl_hours)).timestamp(),
            iat: now.timestamp(),
            iss: ISSUER.to_string(),
            typ: purpose.as_str().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify a purpose token of the expected kind and return the user id.
    pub fn verify_purpose_token(&self, token: &str, purpose: TokenPurpose) -> Result<Uuid> {
        let claims: PurposeClaims = self.verify(token)?;
        if claims.typ != purpose.as_str() {
            return Err(anyhow!(
                "invalid token type: expected {}",
                purpose.as_str()
            ));
        }
        claims.sub.parse().map_err(|_| anyhow!("invalid subject"))
    }

    fn verify<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new("test-secret-key", 60, 1)
    }

    #[test]
    fn roundtrip_access_token() {
        let svc = test_service();
        let user_id = Uuid::new_v4();
        let token = svc.create_access_token(user_id, "sam@example.com").unwrap();
        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "sam@example.com");
        assert_eq!(claims.iss, "marketdesk");
    }

    #[test]
    fn access_expiry_matches_configuration() {
        let svc = test_service();
        let token = svc
            .create_access_token(Uuid::new_v4(), "sam@example.com")
            .unwrap();
        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[test]
    fn purpose_tokens_are_not_interchangeable() {
        let svc = test_service();
        let user_id = Uuid::new_v4();
        let verify_token = svc
            .create_purpose_token(user_id, TokenPurpose::Verification)
            .unwrap();

        assert_eq!(
            svc.verify_purpose_token(&verify_token, TokenPurpose::Verification)
                .unwrap(),
            user_id
        );
        assert!(svc
            .verify_purpose_token(&verify_token, TokenPurpose::Reset)
            .is_err());
    }

    #[test]
    fn purpose_token_is_not_an_access_token() {
        let svc = test_service();
        let token = svc
            .create_purpose_token(Uuid::new_v4(), TokenPurpose::Reset)
            .unwrap();
        assert!(svc.verify_access_token(&token).is_err());
    }

    #[test]
    fn rejects_garbage_and_wrong_secret() {
        let svc = test_service();
        assert!(svc.verify_access_token("garbage").is_err());

        let other = JwtService::new("other-secret", 60, 1);
        let token = other
            .create_access_token(Uuid::new_v4(), "sam@example.com")
            .unwrap();
        assert!(svc.verify_access_token(&token).is_err());
    }
}
