//! Client SDK for the ssh.cx URL-shortening and file-hosting service.
//!
//! # Overview
//! `ApiClient` offers one blocking method per remote operation: create, list,
//! get and delete short URLs; upload, list, get and delete files; issue and
//! exchange demo tokens.
//!
//! # Design
//! - `SshcxClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network, so request construction and
//!   response normalization are deterministic and testable.
//! - `Transport` performs the round trip; `UreqTransport` is the production
//!   implementation. Tests substitute their own.
//! - Responses become typed `Reply` values. An empty body is
//!   `Reply::NoContent`, not an error.
//! - TLS verification is on by default (`ClientConfig::verify_tls`).

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use client::{short_code_from_url, Credential, SshcxClient};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use multipart::Upload;
pub use transport::{Transport, UreqTransport, MAX_RESPONSE_BYTES};
pub use types::{DemoGrant, FileRecord, Reference, Reply, Resource, UrlRecord};
