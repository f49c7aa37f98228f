//! Toy JWT issuance and bearer-token validation.
//!
//! Tokens are HS256-signed with a shared secret. The default secret is a
//! hardcoded test value; never use it outside local testing.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::SharedIssuer;

pub const DEFAULT_SECRET: &str = "SECRET";
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_NAME: &str = "turanukimaru";

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub admin: bool,
    pub name: String,
    pub iat: u64,
    pub exp: u64,
}

/// Why a request was refused by `require_bearer`.
///
/// The display strings are the exact plaintext bodies sent with the 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Required authorization token not found")]
    Missing,

    #[error("Authorization header format must be Bearer {{token}}")]
    Malformed,

    #[error("Error parsing token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Error parsing token: Token used before issued")]
    UsedBeforeIssued,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, format!("{self}\n")).into_response()
    }
}

/// Signing a token failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to sign token: {0}")]
pub struct IssueError(#[from] jsonwebtoken::errors::Error);

impl IntoResponse for IssueError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{self}\n")).into_response()
    }
}

/// Mints and verifies HS256 tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    name: String,
    ttl: Duration,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            ttl,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Set the `name` claim placed in issued tokens.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Claims for a token issued now.
    pub fn claims(&self) -> Claims {
        let now = get_current_timestamp();
        Claims {
            admin: true,
            name: self.name.clone(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        }
    }

    pub fn issue(&self) -> Result<String, IssueError> {
        self.sign(&self.claims())
    }

    /// Sign arbitrary claims; tests use this to mint expired tokens.
    pub fn sign(&self, claims: &Claims) -> Result<String, IssueError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Verify signature, algorithm, expiry, and that `iat` is not in the
    /// future.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        if claims.iat > get_current_timestamp() {
            return Err(AuthError::UsedBeforeIssued);
        }
        Ok(claims)
    }
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET.as_bytes(), DEFAULT_TTL)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(value: &str) -> Result<&str, AuthError> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::Malformed),
    }
}

/// Reject requests without a valid bearer token; pass verified `Claims` on
/// to handlers through request extensions.
pub async fn require_bearer(
    State(issuer): State<SharedIssuer>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = match req.headers().get(AUTHORIZATION) {
        Some(value) => value.to_str().map_err(|_| AuthError::Malformed)?,
        None => "",
    };
    if header.is_empty() {
        tracing::debug!(path = %req.uri().path(), "rejected: no bearer token");
        return Err(AuthError::Missing);
    }

    let claims = bearer_token(header)
        .and_then(|token| issuer.validate(token))
        .inspect_err(|e| tracing::debug!(path = %req.uri().path(), error = %e, "rejected bearer token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// `GET|POST /auth`: issue a token as the literal response body.
pub async fn issue_token(State(issuer): State<SharedIssuer>) -> Result<String, IssueError> {
    let token = issuer.issue()?;
    tracing::info!("issued token");
    Ok(token)
}
