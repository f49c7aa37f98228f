//! Blocking HTTP client that keeps connection details and a bearer token.
//!
//! # Overview
//! A `Knocker` targets `http://{host}:{port}` and performs one round-trip per
//! call: build the request, attach `Authorization: Bearer <token>` when a
//! token is held, read the whole body, and optionally decode it as JSON.
//! `Knocker::auth` stores whatever body the server returned as the token for
//! later calls.
//!
//! # Design
//! - Requests are described as plain data (`HttpRequest`) before any I/O, so
//!   URL and header handling are testable without a server.
//! - One shared `ureq::Agent` executes every request; statuses are data,
//!   failures are `KnockError` variants that say which stage broke.
//! - `auth` takes `&mut self`; the token has a single writer.

pub mod client;
pub mod error;
pub mod http;
mod transport;

pub use client::{Decoded, Knocker};
pub use error::{KnockError, KnockResult};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
