//! services/api/src/web/tokens.rs
//!
//! Issues and validates the bearer access tokens handed out at login.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Failed to encode access token: {0}")]
    Encode(String),
    #[error("Invalid access token: {0}")]
    Invalid(String),
}

/// Claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

/// HMAC-signed JWT issuance and validation.
#[derive(Clone)]
pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
}

impl JwtService {
    pub fn new(secret: &str, algorithm: Algorithm, access_token_expiry_minutes: i64) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry_minutes,
        }
    }

    pub fn generate_access_token(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds, reported to clients as `expires_in`.
    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test-secret", Algorithm::HS256, 30)
    }

    #[test]
    fn issued_token_validates_and_carries_the_user() {
        let jwt = service();
        let user_id = Uuid::new_v4();
        let token = jwt.generate_access_token(user_id, "ana@example.com").unwrap();

        let claims = jwt.validate_access_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let other = JwtService::new("other-secret", Algorithm::HS256, 30);
        let token = other.generate_access_token(Uuid::new_v4(), "a@b.co").unwrap();
        assert!(service().validate_access_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = JwtService::new("test-secret", Algorithm::HS256, -10);
        let token = jwt.generate_access_token(Uuid::new_v4(), "a@b.co").unwrap();
        assert!(matches!(
            service().validate_access_token(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn algorithm_mismatch_is_rejected() {
        let hs512 = JwtService::new("test-secret", Algorithm::HS512, 30);
        let token = hs512.generate_access_token(Uuid::new_v4(), "a@b.co").unwrap();
        assert!(service().validate_access_token(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().validate_access_token("not-a-jwt").is_err());
    }
}
