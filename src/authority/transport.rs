use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A signed fiscal document ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedSubmission {
    pub document_number: String,
    pub environment: String,
    /// Serialized fiscal document, exactly as signed.
    pub payload: String,
    pub content_hash: String,
    pub signature: String,
}

/// Response of the authority to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityResponse {
    pub response_code: String,
    pub description: String,
    pub authorization_code: Option<String>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub control_number: Option<String>,
}

/// Authorization status as known to the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    Authorized,
    Rejected,
    Unknown,
}

/// Response of the authority to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub response_code: String,
    pub description: String,
    pub status: AuthorizationStatus,
    pub queried_at: DateTime<Utc>,
}

/// Errors raised while talking to the authority.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection failure or server-side error.
    #[error("network error: {0}")]
    Network(String),

    /// The authority answered with something that is not a valid response.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether the call may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Network(_))
    }
}

/// Wire access to a tax authority.
///
/// Implementations only move bytes; signing, retries and response
/// interpretation live in [`AuthorityGateway`](super::AuthorityGateway).
#[async_trait]
pub trait AuthorityTransport: Send + Sync {
    async fn submit(&self, submission: &SignedSubmission)
    -> Result<AuthorityResponse, TransportError>;

    async fn query_status(&self, authorization_code: &str)
    -> Result<StatusResponse, TransportError>;
}
