//! Subscription conversion core library
//!
//! Converts between two ways of describing the same set of proxy endpoints:
//! a structured YAML document with a `proxies` list, and a subscription feed
//! (base64 of newline-separated `ss://`, `vmess://` and `trojan://` URIs).
//! Every conversion result is cached as an artifact under a stable id and
//! refreshed from its source in the background whenever it is served.
//!
//! # Architecture
//!
//! - [`proxy`] - Protocol-neutral proxy record
//! - [`codec`] - Per-protocol URI encoders and decoders
//! - [`document`] - Structured document parsing and synthesis
//! - [`classify`] - Content sniffing (document, feed or unknown)
//! - [`pipeline`] - Conversions between documents and feeds
//! - [`fingerprint`] / [`registry`] - Source deduplication
//! - [`store`] / [`db`] - Artifact persistence (SQLite or in-memory)
//! - [`fetch`] - Remote source fetching
//! - [`cache`] - Stale-while-revalidate artifact cache
//! - [`service`] - Caller-facing operations

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod cache;
pub mod classify;
pub mod codec;
pub mod db;
pub mod document;
pub mod fetch;
pub mod fingerprint;
pub mod pipeline;
pub mod proxy;
pub mod registry;
pub mod service;
pub mod source;
pub mod store;
pub mod user_agent;

// Re-export commonly used types
pub use artifact::{ArtifactId, ArtifactKind, ConversionArtifact};
pub use cache::{CacheOptions, CacheService, DEFAULT_REFRESH_CONCURRENCY};
pub use classify::{ContentKind, classify};
pub use codec::{DecodeError, decode_uri, encode_uri};
pub use db::{Database, DatabaseOptions, DbError};
pub use document::{DocumentError, StructuredDocument, parse_document, serialize_document};
pub use fetch::{DEFAULT_FETCH_TIMEOUT, FetchError, Fetcher, HttpFetcher};
pub use fingerprint::{Fingerprint, fingerprint};
pub use pipeline::{ConvertError, PipelineOutput, convert_to_feed, convert_to_structured};
pub use proxy::{Protocol, ProxyRecord};
pub use registry::FingerprintRegistry;
pub use service::{ConversionService, OpenError, ServiceOptions};
pub use source::Source;
pub use store::{ArtifactStore, MemoryStore, SqliteStore, StoreError};
