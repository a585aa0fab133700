//! Login and bearer token checks
//!
//! Tokens are HS256 JWTs carrying the configured issuer and audience. The
//! single operator account comes from the config file.

use crate::config::AuthConfig;
use crate::error::ApiError;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(_) => ApiError::Internal(err.into()),
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "usuario")]
    pub username: String,
    #[serde(alias = "senha")]
    pub password: String,
}

pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);

        AuthService {
            encoding_key: EncodingKey::from_secret(config.key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.key.as_bytes()),
            validation,
            config,
        }
    }

    /// Check credentials and mint a token for the account
    pub fn login(&self, request: &LoginRequest) -> Result<String, AuthError> {
        if request.username != self.config.username || request.password != self.config.password {
            warn!("Rejected login for user '{}'", request.username);
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_token(&request.username)
    }

    pub fn issue_token(&self, username: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.token_ttl_hours)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                AuthError::InvalidToken(e.to_string())
            })
    }
}

/// Extractor for routes that require a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = auth.validate(token)?;
        Ok(AuthUser {
            username: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::default())
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_login_issues_valid_token() {
        let auth = service();
        let token = auth.login(&login("jp", "123")).unwrap();

        let claims = auth.validate(&token).unwrap();
        assert_eq!(claims.sub, "jp");
        assert_eq!(claims.iss, "radarmottu");
        assert_eq!(claims.aud, "radarmottu-clients");
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn test_wrong_password_rejected() {
        let auth = service();
        assert!(matches!(
            auth.login(&login("jp", "wrong")),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login(&login("someone", "123")),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_login_accepts_portuguese_field_names() {
        let request: LoginRequest = serde_json::from_str(r#"{"usuario":"jp","senha":"123"}"#).unwrap();
        assert!(service().login(&request).is_ok());
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let other = AuthService::new(AuthConfig {
            key: "another-key".to_string(),
            ..AuthConfig::default()
        });
        let token = other.issue_token("jp").unwrap();
        assert!(matches!(service().validate(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let other = AuthService::new(AuthConfig {
            audience: "someone-else".to_string(),
            ..AuthConfig::default()
        });
        let token = other.issue_token("jp").unwrap();
        assert!(service().validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = AuthService::new(AuthConfig {
            token_ttl_hours: -1,
            ..AuthConfig::default()
        });
        let token = expired.issue_token("jp").unwrap();
        assert!(service().validate(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(service().validate("not.a.token").is_err());
    }
}
