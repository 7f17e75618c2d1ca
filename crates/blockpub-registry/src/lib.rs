//! Block registry API client for blockpub.
//!
//! This crate defines the [`BlockRegistry`] boundary the lifecycle engine
//! drives — create, update, major version, release, rollback, and branch
//! lookup — together with [`HttpRegistryClient`], the blocking HTTP
//! implementation used by the CLI.
//!
//! Failures are surfaced as [`RegistryError`] values that keep the
//! registry's own status code and message intact so callers can classify
//! them without re-parsing transport details.
//!
//! # Example
//!
//! ```no_run
//! use blockpub_registry::{BlockRegistry, HttpRegistryClient, NewBlock};
//!
//! let client = HttpRegistryClient::new("https://registry.blockpub.dev").unwrap();
//! let created = client.create_block(&NewBlock {
//!     display_name: "Widget".to_string(),
//!     published_name: "widget".to_string(),
//!     category: "layout".to_string(),
//!     code: "export default {}".to_string(),
//! }).unwrap();
//! println!("registry id: {}", created.id);
//! ```

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for API requests.
pub const USER_AGENT: &str = concat!("blockpub/", env!("CARGO_PKG_VERSION"));

/// Classification of a registry failure, derived from the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryErrorKind {
    /// The registry rejected the payload (400, 422).
    Validation,
    /// Missing or insufficient credentials (401, 403).
    Auth,
    /// The block or version is unknown to the registry (404).
    NotFound,
    /// The registry reported a conflicting concurrent change (409).
    Conflict,
    /// The request never produced an HTTP response.
    Transport,
    /// Any other status.
    Unexpected,
}

impl fmt::Display for RegistryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryErrorKind::Validation => write!(f, "validation"),
            RegistryErrorKind::Auth => write!(f, "auth"),
            RegistryErrorKind::NotFound => write!(f, "not_found"),
            RegistryErrorKind::Conflict => write!(f, "conflict"),
            RegistryErrorKind::Transport => write!(f, "transport"),
            RegistryErrorKind::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Classify an HTTP status into a [`RegistryErrorKind`].
pub fn classify_status(status: u16) -> RegistryErrorKind {
    match status {
        400 | 422 => RegistryErrorKind::Validation,
        401 | 403 => RegistryErrorKind::Auth,
        404 => RegistryErrorKind::NotFound,
        409 => RegistryErrorKind::Conflict,
        _ => RegistryErrorKind::Unexpected,
    }
}

/// A failed registry operation, preserving the registry's status and message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryError {
    pub kind: RegistryErrorKind,
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    /// The registry's message, or the transport error text.
    pub message: String,
}

impl RegistryError {
    /// Error for a request that never reached the registry.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: RegistryErrorKind::Transport,
            status: None,
            message: message.into(),
        }
    }

    /// Error for a non-success HTTP response, extracting the registry's
    /// message from the body when it sends one.
    pub fn from_status(status: u16, body: &str) -> Self {
        Self {
            kind: classify_status(status),
            status: Some(status),
            message: extract_message(body)
                .unwrap_or_else(|| format!("registry returned status {status}")),
        }
    }

    fn unexpected(message: impl Into<String>) -> Self {
        Self {
            kind: RegistryErrorKind::Unexpected,
            status: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({}, http {status})", self.message, self.kind),
            None => write!(f, "{} ({})", self.message, self.kind),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Error body shapes the registry is known to send.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

fn extract_message(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed
            .error
            .and_then(|detail| detail.message)
            .or(parsed.message);
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Payload for creating a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlock {
    pub display_name: String,
    pub published_name: String,
    pub category: String,
    pub code: String,
}

/// The registry's answer to a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedBlock {
    pub id: String,
}

/// Payload for revising the staged version in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRevision {
    pub display_name: String,
    pub published_name: String,
    pub code: String,
    pub is_public: bool,
    pub version: u32,
}

/// Payload for claiming a new major version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MajorVersion {
    pub code: String,
    pub version: u32,
}

#[derive(Debug, Serialize)]
struct ReleasePayload<'a> {
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RollbackPayload {
    version: u32,
}

#[derive(Debug, Deserialize)]
struct BranchesResponse {
    branches: Vec<String>,
}

/// The remote operations the lifecycle engine depends on.
///
/// Transport configuration (timeouts, auth headers) belongs to the
/// implementation, not this boundary.
pub trait BlockRegistry: Send + Sync {
    /// Create a block and return its registry identifier.
    fn create_block(&self, block: &NewBlock) -> Result<CreatedBlock, RegistryError>;

    /// Replace the staged code and visibility of an existing version.
    fn update_block(&self, id: &str, revision: &BlockRevision) -> Result<(), RegistryError>;

    /// Claim a new major version for the block.
    fn create_major_version(&self, id: &str, version: &MajorVersion) -> Result<(), RegistryError>;

    /// Promote the version to production.
    fn release_block(&self, id: &str, version: u32, note: Option<&str>)
    -> Result<(), RegistryError>;

    /// Revert production toward the previously released state.
    fn rollback_block(&self, id: &str, version: u32) -> Result<(), RegistryError>;

    /// Version branches the registry has recorded for the block.
    fn list_branches(&self, id: &str) -> Result<Vec<String>, RegistryError>;
}

/// Blocking HTTP implementation of [`BlockRegistry`].
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    base_url: String,
    http: Client,
}

impl HttpRegistryClient {
    /// Create a client for the given API base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    fn execute(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, RegistryError> {
        let response = request
            .send()
            .map_err(|e| RegistryError::transport(format!("registry request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let body = response.text().unwrap_or_default();
        Err(RegistryError::from_status(code, &body))
    }
}

impl BlockRegistry for HttpRegistryClient {
    fn create_block(&self, block: &NewBlock) -> Result<CreatedBlock, RegistryError> {
        let response = self.execute(self.http.post(self.url("blocks")).json(block))?;

        response
            .json::<CreatedBlock>()
            .map_err(|e| RegistryError::unexpected(format!("failed to parse create response: {e}")))
    }

    fn update_block(&self, id: &str, revision: &BlockRevision) -> Result<(), RegistryError> {
        self.execute(self.http.put(self.url(&format!("blocks/{id}"))).json(revision))?;
        Ok(())
    }

    fn create_major_version(&self, id: &str, version: &MajorVersion) -> Result<(), RegistryError> {
        self.execute(
            self.http
                .post(self.url(&format!("blocks/{id}/versions")))
                .json(version),
        )?;
        Ok(())
    }

    fn release_block(
        &self,
        id: &str,
        version: u32,
        note: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.execute(
            self.http
                .post(self.url(&format!("blocks/{id}/release")))
                .json(&ReleasePayload { version, note }),
        )?;
        Ok(())
    }

    fn rollback_block(&self, id: &str, version: u32) -> Result<(), RegistryError> {
        self.execute(
            self.http
                .post(self.url(&format!("blocks/{id}/rollback")))
                .json(&RollbackPayload { version }),
        )?;
        Ok(())
    }

    fn list_branches(&self, id: &str) -> Result<Vec<String>, RegistryError> {
        let response = self.execute(self.http.get(self.url(&format!("blocks/{id}/branches"))))?;

        let parsed: BranchesResponse = response.json().map_err(|e| {
            RegistryError::unexpected(format!("failed to parse branches response: {e}"))
        })?;
        Ok(parsed.branches)
    }
}
