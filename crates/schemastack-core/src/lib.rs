//! Schemastack Core - shared plumbing for the schemastack JSON Schema compiler
//!
//! This crate holds everything the compiler and validator need that is not
//! specific to schema semantics:
//!
//! # Main Components
//!
//! - **Value boundary**: [`json::parse`] wraps `serde_json` and rejects duplicate keys
//! - **Exact decimals**: [`Decimal`] compares and divides JSON numbers without floating point
//! - **Document URIs**: [`DocumentUri`] normalizes and strips fragments for deduplication
//! - **Remote fetching**: [`FetchPolicy`] guardrails and the [`RemoteFetcher`] implementations
//!
//! # Example
//!
//! ```
//! use schemastack_core::{json, Decimal};
//!
//! let value = json::parse(r#"{"price": 9.99}"#).unwrap();
//! let price = Decimal::from_json(&value["price"]).unwrap();
//! let step = Decimal::parse("3.33").unwrap();
//! assert!(price.is_multiple_of(&step));
//! ```
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

pub mod decimal;
pub mod error;
pub mod fetch;
pub mod json;
pub mod uri;

pub use decimal::Decimal;
pub use error::{RemoteReason, RemoteResolutionError, RemoteResult};
pub use fetch::{
    CachingFetcher, DisallowedFetcher, FetchCache, FetchPolicy, FetchResult, FileFetcher,
    InMemoryFetcher, RemoteFetcher,
};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use json::{ParseError, ParseResult};
pub use uri::{DocumentUri, UriError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
