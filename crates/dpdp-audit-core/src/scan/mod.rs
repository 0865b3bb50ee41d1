use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod controller;

/// Suffix appended to every user-facing failure message.
pub const FAILURE_HINT: &str = "Make sure repo is public.";

/// Body posted to the scanning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub repo_url: String,
}

impl ScanRequest {
    /// Build a request, rejecting blank repository URLs.
    pub fn new(repo_url: impl Into<String>) -> Result<Self, SubmitError> {
        let repo_url = repo_url.into();
        if repo_url.trim().is_empty() {
            return Err(SubmitError::EmptyUrl);
        }
        Ok(Self { repo_url })
    }
}

/// One discrete finding reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule identifier, e.g. `PII_LOGGED` (`type` on the wire).
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw severity label as sent by the service; see [`crate::present::SeverityClass`].
    pub severity: String,
    /// Suggested remediation.
    pub fix: String,
}

/// Payload returned by a successful scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Compliance score, nominally 0–100.
    pub score: i64,
    pub scan_method: String,
    pub summary: String,
    /// Findings in service order, which is also display order.
    pub violations: Vec<Violation>,
}

/// Lifecycle of the current scan as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Loading,
    Success(ScanResult),
    Failed(String),
}

impl ScanState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn result(&self) -> Option<&ScanResult> {
        match self {
            Self::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Reasons a scan request failed after it was issued.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The service answered with a non-success status. The status is kept for logs only.
    #[error("Scan failed")]
    Status { status: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("invalid scan response: {0}")]
    Decode(String),
    #[error("scan timed out after {}", format_timeout(.0))]
    Timeout(Duration),
    #[error("scan was cancelled")]
    Cancelled,
}

fn format_timeout(timeout: &Duration) -> String {
    humantime::format_duration(*timeout).to_string()
}

impl ScanError {
    /// Compose the banner shown for this failure.
    pub fn user_message(&self) -> String {
        format!("Error: {self}. {FAILURE_HINT}")
    }
}

/// Reasons a submission was refused before any request was issued.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("repository URL is required")]
    EmptyUrl,
    #[error("a scan is already in progress")]
    InFlight,
    #[error("the scan view has been closed")]
    TornDown,
}

/// Abstraction over the remote scanning service, so the controller can be
/// driven by HTTP or by in-memory fakes.
#[async_trait]
pub trait ScanTransport: Send + Sync {
    /// Issue exactly one scan request and decode its result.
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError>;
}
