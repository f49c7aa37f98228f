//! The `Knocker`: an HTTP client that remembers where to connect and which
//! bearer token to present.
//!
//! # Design
//! Every operation is split the same way: `build_request` produces a plain
//! `HttpRequest` (URL and headers, no I/O), the transport executes it, and
//! `knock_as` optionally decodes the drained body. `auth` is the only
//! operation that mutates the client, so it takes `&mut self`; a shared
//! `&Knocker` can knock from many threads but can never change the token.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{KnockError, KnockResult};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport;

/// A decoded response body together with the raw response it came from.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub response: HttpResponse,
    pub value: T,
}

/// HTTP client bound to `http://{host}:{port}` with an optional bearer token.
///
/// An empty token means "unauthenticated": no `Authorization` header is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct Knocker {
    host: String,
    port: u16,
    token: String,
}

impl Knocker {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_token(host, port, String::new())
    }

    /// Create a client that already holds `token`.
    pub fn with_token(host: impl Into<String>, port: u16, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            token: token.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The bearer token presented on every request; empty when unauthenticated.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Describe the request `knock` would send, without sending it.
    ///
    /// `path` is appended to the base URL as-is; it should start with `/` and
    /// already be escaped.
    pub fn build_request(&self, method: HttpMethod, path: &str, body: Option<&[u8]>) -> HttpRequest {
        let mut headers = Vec::new();
        if !self.token.is_empty() {
            headers.push(("authorization".to_string(), format!("Bearer {}", self.token)));
        }
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url()),
            headers,
            body: body.map(<[u8]>::to_vec),
        }
    }

    /// Send one request and return the response with its body fully read.
    ///
    /// Any status code is returned as `Ok`; only transport and body-read
    /// failures are errors.
    pub fn knock(&self, method: HttpMethod, path: &str, body: Option<&[u8]>) -> KnockResult<HttpResponse> {
        let request = self.build_request(method, path, body);
        tracing::debug!(
            %method,
            url = %request.url,
            authenticated = self.is_authenticated(),
            "knocking"
        );
        transport::execute(request)
    }

    /// Like `knock`, then decode the body as JSON into `T`.
    ///
    /// A body that does not decode fails the call with `KnockError::Decode`,
    /// even when the status was 2xx; the error still carries the response.
    pub fn knock_as<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&[u8]>,
    ) -> KnockResult<Decoded<T>> {
        let response = self.knock(method, path, body)?;
        decode(response)
    }

    /// Serialize `payload` as JSON and send it as the request body.
    pub fn knock_json<P: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: &P,
    ) -> KnockResult<HttpResponse> {
        let body = serde_json::to_vec(payload).map_err(KnockError::Encode)?;
        self.knock(method, path, Some(&body))
    }

    /// Knock and keep the raw response body as the new bearer token.
    ///
    /// The token is replaced whatever the outcome: a 401 body becomes the
    /// token just like a freshly issued one, and a failed call leaves the
    /// token empty. Check the returned status before relying on the token.
    pub fn auth(&mut self, method: HttpMethod, path: &str, body: Option<&[u8]>) -> KnockResult<HttpResponse> {
        let result = self.knock(method, path, body);
        self.token = match &result {
            Ok(response) => response.body.clone(),
            Err(_) => String::new(),
        };
        match &result {
            Ok(response) => tracing::info!(
                status = response.status,
                success = response.is_success(),
                authenticated = self.is_authenticated(),
                "bearer token replaced"
            ),
            Err(e) => tracing::warn!(error = %e, "authentication failed; bearer token cleared"),
        }
        result
    }
}

impl fmt::Debug for Knocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Knocker")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &token)
            .finish()
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> KnockResult<Decoded<T>> {
    match serde_json::from_str(&response.body) {
        Ok(value) => Ok(Decoded { response, value }),
        Err(source) => {
            tracing::warn!(status = response.status, error = %source, "response body did not decode");
            Err(KnockError::Decode {
                response: Box::new(response),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Pong {
        res: String,
    }

    fn knocker() -> Knocker {
        Knocker::new("127.0.0.1", 8080)
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn new_knocker_is_unauthenticated() {
        let k = knocker();
        assert_eq!(k.host(), "127.0.0.1");
        assert_eq!(k.port(), 8080);
        assert_eq!(k.token(), "");
        assert!(!k.is_authenticated());
    }

    #[test]
    fn build_request_formats_url() {
        let req = knocker().build_request(HttpMethod::Get, "/ping", None);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://127.0.0.1:8080/ping");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_does_not_escape_path() {
        let req = knocker().build_request(HttpMethod::Get, "/search?q=a b&x=%2F", None);
        assert_eq!(req.url, "http://127.0.0.1:8080/search?q=a b&x=%2F");
    }

    #[test]
    fn empty_token_sends_no_authorization_header() {
        let req = knocker().build_request(HttpMethod::Get, "/private", None);
        assert!(req.headers.is_empty());
        assert_eq!(req.header("Authorization"), None);
    }

    #[test]
    fn token_sends_exactly_one_bearer_header() {
        let k = Knocker::with_token("localhost", 3000, "abc.def.ghi");
        let req = k.build_request(HttpMethod::Post, "/private", Some(b"{}"));
        assert_eq!(
            req.headers,
            vec![("authorization".to_string(), "Bearer abc.def.ghi".to_string())]
        );
        assert_eq!(req.url, "http://localhost:3000/private");
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn body_bytes_are_copied_verbatim() {
        let payload = "{\"Req\":\"↑\"}".as_bytes();
        let req = knocker().build_request(HttpMethod::Post, "/echo", Some(payload));
        assert_eq!(req.body.as_deref(), Some(payload));
    }

    #[test]
    fn decode_keeps_raw_body() {
        let decoded: Decoded<Pong> = decode(response(200, r#"{"res":"pong!"}"#)).unwrap();
        assert_eq!(decoded.value.res, "pong!");
        assert_eq!(decoded.response.body, r#"{"res":"pong!"}"#);
        assert_eq!(decoded.response.status, 200);
    }

    #[test]
    fn decode_failure_on_success_status_is_an_error() {
        let err = decode::<Pong>(response(200, "eyJhbGciOi.not.json")).unwrap_err();
        match err {
            KnockError::Decode { response, .. } => {
                assert_eq!(response.status, 200);
                assert_eq!(response.body, "eyJhbGciOi.not.json");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn decode_failure_on_wrong_shape() {
        let err = decode::<Pong>(response(200, r#"{"other":1}"#)).unwrap_err();
        assert!(matches!(err, KnockError::Decode { .. }));
    }

    #[test]
    fn debug_redacts_token() {
        let k = Knocker::with_token("localhost", 3000, "secret-token");
        let printed = format!("{k:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn knocker_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Knocker>();
        assert_send_sync::<KnockError>();
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn knock_json_reports_encode_failure() {
        // Fails before any connection is attempted.
        let err = Knocker::new("127.0.0.1", 0)
            .knock_json(HttpMethod::Post, "/echo", &Unserializable)
            .unwrap_err();
        match err {
            KnockError::Encode(source) => assert!(source.to_string().contains("refusing to serialize")),
            other => panic!("expected encode error, got {other:?}"),
        }
    }

    #[test]
    fn auth_clears_token_on_transport_failure() {
        // Port 0 is never connectable.
        let mut k = Knocker::with_token("127.0.0.1", 0, "stale");
        assert!(k.auth(HttpMethod::Get, "/auth", None).is_err());
        assert_eq!(k.token(), "");
    }
}
