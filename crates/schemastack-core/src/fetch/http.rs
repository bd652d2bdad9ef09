//! HTTP(S) fetcher built on the blocking `reqwest` client
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::{parse_body, read_capped, FetchPolicy, FetchResult, RemoteFetcher};
use crate::error::{RemoteReason, RemoteResolutionError, RemoteResult};
use crate::uri::DocumentUri;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::redirect;
use std::time::Instant;

const ACCEPT_SCHEMA: &str = "application/schema+json, application/json";

/// Fetches `http:` and `https:` documents
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    user_agent: Option<String>,
}

impl HttpFetcher {
    /// Create a fetcher with reqwest's default user agent
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a custom `User-Agent`
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn client(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<Client> {
        let mut builder = Client::builder()
            .timeout(policy.timeout)
            .connect_timeout(policy.timeout)
            .redirect(redirect::Policy::limited(policy.max_redirects));
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        builder
            .build()
            .map_err(|e| RemoteResolutionError::network(uri.as_str(), e))
    }
}

/// Map a transport error onto a remote resolution reason
fn classify(uri: &DocumentUri, error: reqwest::Error) -> RemoteResolutionError {
    if error.is_timeout() {
        RemoteResolutionError::timeout(uri.as_str(), error.to_string()).with_source(error)
    } else if error.is_redirect() {
        RemoteResolutionError::policy_denied(uri.as_str(), "Too many redirects").with_source(error)
    } else {
        RemoteResolutionError::network(uri.as_str(), error)
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<FetchResult> {
        if !matches!(uri.scheme(), "http" | "https") {
            return Err(RemoteResolutionError::policy_denied(
                uri.as_str(),
                "HttpFetcher only handles http: and https: URIs",
            ));
        }

        let started = Instant::now();
        let client = self.client(uri, policy)?;
        tracing::debug!(uri = %uri, timeout = ?policy.timeout, "fetching remote schema");
        let response = client
            .get(uri.as_url().clone())
            .header(ACCEPT, ACCEPT_SCHEMA)
            .send()
            .map_err(|e| classify(uri, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteResolutionError::new(
                RemoteReason::NotFound,
                uri.as_str(),
                format!("HTTP {}", status.as_u16()),
            ));
        }
        if let Some(length) = response.content_length() {
            if length > policy.max_document_bytes {
                return Err(RemoteResolutionError::payload_too_large(
                    uri.as_str(),
                    policy.max_document_bytes,
                ));
            }
        }

        let body = read_capped(response, policy.max_document_bytes, uri)?;
        let elapsed = started.elapsed();
        if elapsed > policy.timeout {
            return Err(RemoteResolutionError::timeout(
                uri.as_str(),
                format!("Fetch took {:?}, limit {:?}", elapsed, policy.timeout),
            ));
        }
        let document = parse_body(&body, uri)?;
        tracing::debug!(uri = %uri, bytes = body.len(), ?elapsed, "fetched remote schema");
        Ok(FetchResult::new(document, body.len() as u64, Some(elapsed)))
    }
}
