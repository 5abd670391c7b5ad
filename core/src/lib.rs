//! Synchronous API client for the MemoBase memory/profile service.
//!
//! # Overview
//! Insert blobs for a user, list a user's blob ids, and fetch the profile
//! the service derived from them. Every call is one HTTP round-trip that
//! returns a `{errno, errmsg, data}` envelope.
//!
//! # Design
//! - `MemoBaseClient` is stateless: `base_url` and `api_key`. It builds
//!   `HttpRequest` values and parses `HttpResponse` values without I/O.
//! - `Transport` performs the round-trip. `UreqTransport` (feature `ureq`,
//!   on by default) is the blocking implementation; closures work too.
//! - `ProjectClient` pairs the two; `ProjectClient::user` hands out a
//!   per-user `User` handle for `insert`, `get_all`, and `profile`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod project;
pub mod transport;
pub mod types;

pub use client::MemoBaseClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use project::{ProjectClient, User};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{Blob, BlobData, BlobType, ChatMessage, Envelope, UserData, UserProfile};
