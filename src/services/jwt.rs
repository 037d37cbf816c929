// JWT access tokens (HS256)

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::app_config::AppConfig;
use crate::models::auth::AccessTokenClaims;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Clock error: {0}")]
    ClockError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub access_token_expiry: u64,
    pub algorithm: Algorithm,
    pub audience: String,
    pub issuer: String,
    pub access_encoding_key: EncodingKey,
    pub access_decoding_key: DecodingKey,
    /// Sent as the `kid` header so keys can be rotated
    pub key_version: u32,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("access_encoding_key", &"<redacted>")
            .field("access_decoding_key", &"<redacted>")
            .field("key_version", &self.key_version)
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(
        access_secret: &str,
        access_expiry: u64,
        audience: String,
        issuer: String,
        key_version: u32,
    ) -> Self {
        JwtConfig {
            access_token_expiry: access_expiry,
            algorithm: Algorithm::HS256,
            audience,
            issuer,
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            key_version,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        let crate::app_config::JwtConfig {
            access_secret,
            access_expiry,
            audience,
            issuer,
            key_version,
        } = &config.jwt;

        Self::build_from_params(
            access_secret,
            *access_expiry,
            audience.clone(),
            issuer.clone(),
            *key_version,
        )
    }

    pub fn for_test() -> Self {
        Self::from_app_config(&AppConfig::for_test())
    }
}

pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    pub fn generate_access_token(&self, user_id: Uuid, email: &str) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| JwtError::ClockError(e.to_string()))?
            .as_secs();

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.access_token_expiry,
        };

        let mut header = Header::new(self.config.algorithm);
        header.kid = Some(self.config.key_version.to_string());

        encode(&header, &claims, &self.config.access_encoding_key).map_err(Into::into)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let token_data =
            decode::<AccessTokenClaims>(token, &self.config.access_decoding_key, &validation)?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip() {
        let service = JwtService::new(JwtConfig::for_test());
        let user_id = Uuid::new_v4();

        let token = service
            .generate_access_token(user_id, "driver@example.com")
            .expect("Failed to generate token");
        let claims = service
            .validate_access_token(&token)
            .expect("Failed to validate token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "driver@example.com");
        assert_eq!(claims.aud, "test.classifieds");
        assert_eq!(claims.exp - claims.iat, service.access_token_expiry());
    }

    #[test]
    fn test_rejects_token_from_other_secret() {
        let service = JwtService::new(JwtConfig::for_test());
        let other = JwtService::new(JwtConfig::build_from_params(
            "a-completely-different-secret-of-32-chars",
            3600,
            "test.classifieds".to_string(),
            "test.classifieds".to_string(),
            1,
        ));

        let token = other
            .generate_access_token(Uuid::new_v4(), "driver@example.com")
            .unwrap();
        assert!(matches!(
            service.validate_access_token(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        let service = JwtService::new(JwtConfig::for_test());
        assert!(service.validate_access_token("not.a.token").is_err());
    }
}
