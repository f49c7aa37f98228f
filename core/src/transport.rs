//! Executes `HttpRequest` values over the network.
//!
//! A single process-wide `ureq::Agent` serves every `Knocker`. It is
//! configured so that 4xx/5xx statuses come back as responses rather than
//! errors, and no timeouts are set: a call blocks until the server answers or
//! the connection fails.

use std::sync::LazyLock;

use ureq::http::Request;
use ureq::Agent;

use crate::error::{KnockError, KnockResult};
use crate::http::{HttpRequest, HttpResponse};

static AGENT: LazyLock<Agent> = LazyLock::new(|| {
    Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
});

/// Perform the round-trip for `request` and drain the whole response body.
///
/// The response is owned by this function and dropped on every return path,
/// which hands the connection back to the agent (or closes it).
pub(crate) fn execute(request: HttpRequest) -> KnockResult<HttpResponse> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
    } = request;

    let mut builder = Request::builder().method(method.as_str()).uri(url.as_str());
    for (name, value) in &headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let result = match body {
        Some(bytes) => AGENT.run(builder.body(bytes)?),
        None => AGENT.run(builder.body(())?),
    };
    let mut response = result.map_err(|e| {
        tracing::warn!(%method, %url, error = %e, "transport failure");
        KnockError::Transport(e)
    })?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let bytes = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|e| {
            tracing::warn!(%method, %url, status, error = %e, "response body read failed");
            KnockError::BodyRead(e)
        })?;

    tracing::debug!(%method, %url, status, bytes = bytes.len(), "response received");

    Ok(HttpResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}
