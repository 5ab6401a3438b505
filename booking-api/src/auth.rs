//! Bearer token authentication
//!
//! Handlers authenticate inside the executor's worker: the bearer token is
//! pulled from the `Authorization` header and handed to a [`TokenAuthority`].
//! A missing or malformed header is `INVALID_TOKEN`; a token the authority
//! rejects is `UNAUTHORIZED_ACCESS`. Both are 401.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::error::Error;
use crate::executor::{Cancelled, RequestContext, Rejection};

/// Code for a missing or malformed `Authorization` header
pub const INVALID_TOKEN: &str = "INVALID_TOKEN";

/// Code for a token that failed validation
pub const UNAUTHORIZED_ACCESS: &str = "UNAUTHORIZED_ACCESS";

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// ID of the user the token was issued to
    pub user_id: i64,
}

/// Token extraction or validation failure
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not a bearer token")]
    MalformedHeader,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token subject `{0}` is not a user id")]
    InvalidSubject(String),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Validates bearer tokens into identities
#[async_trait]
pub trait TokenAuthority: Send + Sync {
    /// Validate `token` within the request's deadline
    async fn validate(&self, ctx: &RequestContext, token: &str) -> Result<Identity, AuthError>;
}

/// Claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user ID, optionally prefixed with `user:`
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Numeric user ID from the subject
    pub fn user_id(&self) -> Option<i64> {
        self.sub
            .strip_prefix("user:")
            .unwrap_or(&self.sub)
            .parse()
            .ok()
    }
}

/// HS256 token authority backed by a shared secret
#[derive(Clone)]
pub struct JwtAuthority {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl JwtAuthority {
    /// Create an authority from the auth configuration
    pub fn new(config: &AuthConfig) -> Result<Self, Error> {
        if config.token_secret.is_empty() {
            return Err(Error::Auth(
                "auth.token_secret must be set (env: BOOKING_AUTH__TOKEN_SECRET)".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key: Arc::new(DecodingKey::from_secret(config.token_secret.as_bytes())),
            validation,
        })
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenAuthority for JwtAuthority {
    async fn validate(&self, ctx: &RequestContext, token: &str) -> Result<Identity, AuthError> {
        if ctx.is_done() {
            return Err(Cancelled.into());
        }

        let claims = self.decode_claims(token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthError::InvalidSubject(claims.sub.clone()))?;

        Ok(Identity { user_id })
    }
}

/// Extract the token from a `Bearer` authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Extract and validate the caller's token
///
/// Intended for use inside an executor worker; failures map straight to 401
/// rejections.
pub async fn authenticate<E>(
    ctx: &RequestContext,
    authority: &dyn TokenAuthority,
    headers: &HeaderMap,
    endpoint: &'static str,
) -> Result<Identity, Rejection<E>> {
    let token = extract_bearer_token(headers).map_err(|e| {
        tracing::debug!(endpoint, error = %e, "Rejected request credentials");
        Rejection::Unauthorized(INVALID_TOKEN)
    })?;

    authority.validate(ctx, &token).await.map_err(|e| {
        tracing::warn!(endpoint, error = %e, "Unauthorized error from token validation");
        Rejection::Unauthorized(UNAUTHORIZED_ACCESS)
    })
}
