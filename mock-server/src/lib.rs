use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub mod auth;

pub use auth::{AuthError, Claims, TokenIssuer};

pub type SharedIssuer = Arc<TokenIssuer>;

/// Body of `GET /ping`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub res: String,
}

/// Body accepted and returned by `POST /echo`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EchoMessage {
    pub req: String,
    pub child: EchoContent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EchoContent {
    pub contents: String,
}

/// Body of `GET /private`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrivateResponse {
    pub title: String,
    pub tag: String,
}

pub const PRIVATE_TITLE: &str = "unreachable without a jwt token";
pub const PRIVATE_TAG: &str = "Rust";

pub fn app() -> Router {
    app_with_issuer(TokenIssuer::default())
}

pub fn app_with_issuer(issuer: TokenIssuer) -> Router {
    let issuer: SharedIssuer = Arc::new(issuer);
    Router::new()
        .route("/private", get(private))
        .route_layer(middleware::from_fn_with_state(issuer.clone(), auth::require_bearer))
        .route("/ping", get(pong))
        .route("/echo", post(echo))
        .route("/auth", get(auth::issue_token).post(auth::issue_token))
        .with_state(issuer)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_issuer(listener, TokenIssuer::default()).await
}

pub async fn run_with_issuer(listener: TcpListener, issuer: TokenIssuer) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "serving");
    }
    axum::serve(listener, app_with_issuer(issuer)).await
}

async fn pong() -> Json<Pong> {
    Json(Pong {
        res: "pong!".to_string(),
    })
}

// Reads the raw body so requests without a JSON content type are accepted.
async fn echo(body: Bytes) -> Result<Json<EchoMessage>, (StatusCode, String)> {
    let mut message: EchoMessage = serde_json::from_slice(&body)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid echo body: {e}\n")))?;
    message.req = format!("req={}", message.req);
    message.child.contents = format!("contents={}", message.child.contents);
    Ok(Json(message))
}

async fn private(Extension(claims): Extension<Claims>) -> Json<PrivateResponse> {
    tracing::debug!(name = %claims.name, admin = claims.admin, "private access");
    Json(PrivateResponse {
        title: PRIVATE_TITLE.to_string(),
        tag: PRIVATE_TAG.to_string(),
    })
}
