use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::transport::{
    AuthorityResponse, AuthorityTransport, AuthorizationStatus, SignedSubmission, StatusResponse,
    TransportError,
};
use crate::core::AuthorizationResult;

/// How the simulated authority answers submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedBehavior {
    /// Authorize every submission.
    Accept,
    /// Answer every submission with the given response code.
    Reject { code: String, description: String },
    /// Fail the first `times` submissions with a network error, then authorize.
    FailTransient { times: usize },
    /// Sleep before authorizing; used to exercise timeouts.
    Delay(Duration),
}

/// In-process stand-in for the tax authority.
///
/// Issues authorization codes of the form `A{millis}{9 chars}` and keeps
/// track of what it authorized so status queries can be answered.
#[derive(Debug)]
pub struct SimulatedAuthority {
    behavior: SimulatedBehavior,
    submissions: AtomicUsize,
    authorized: Mutex<HashSet<String>>,
    revoked: Mutex<HashSet<String>>,
}

impl Default for SimulatedAuthority {
    fn default() -> Self {
        Self::new(SimulatedBehavior::Accept)
    }
}

impl SimulatedAuthority {
    pub fn new(behavior: SimulatedBehavior) -> Self {
        Self {
            behavior,
            submissions: AtomicUsize::new(0),
            authorized: Mutex::new(HashSet::new()),
            revoked: Mutex::new(HashSet::new()),
        }
    }

    pub fn rejecting(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(SimulatedBehavior::Reject {
            code: code.into(),
            description: description.into(),
        })
    }

    /// Number of submissions received, including failed ones.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Mark an authorization as revoked; later status queries report it rejected.
    pub async fn revoke(&self, authorization_code: &str) {
        self.revoked.lock().await.insert(authorization_code.to_string());
    }

    async fn authorize(&self) -> AuthorityResponse {
        let now = Utc::now();
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(9)
            .collect::<String>()
            .to_uppercase();
        let code = format!("A{}{}", now.timestamp_millis(), suffix);
        self.authorized.lock().await.insert(code.clone());

        AuthorityResponse {
            response_code: AuthorizationResult::ACCEPTED.to_string(),
            description: "Documento procesado exitosamente".to_string(),
            authorization_code: Some(code),
            authorized_at: Some(now),
            control_number: Some(format!("NC{}", now.timestamp_millis())),
        }
    }
}

#[async_trait]
impl AuthorityTransport for SimulatedAuthority {
    async fn submit(
        &self,
        submission: &SignedSubmission,
    ) -> Result<AuthorityResponse, TransportError> {
        let seen = self.submissions.fetch_add(1, Ordering::SeqCst);
        debug!(
            document_number = %submission.document_number,
            attempt = seen + 1,
            "simulated authority received submission"
        );

        match &self.behavior {
            SimulatedBehavior::Accept => Ok(self.authorize().await),
            SimulatedBehavior::Reject { code, description } => Ok(AuthorityResponse {
                response_code: code.clone(),
                description: description.clone(),
                authorization_code: None,
                authorized_at: None,
                control_number: None,
            }),
            SimulatedBehavior::FailTransient { times } => {
                if seen < *times {
                    Err(TransportError::Network("connection reset by peer".into()))
                } else {
                    Ok(self.authorize().await)
                }
            }
            SimulatedBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(self.authorize().await)
            }
        }
    }

    async fn query_status(
        &self,
        authorization_code: &str,
    ) -> Result<StatusResponse, TransportError> {
        let status = if self.revoked.lock().await.contains(authorization_code) {
            AuthorizationStatus::Rejected
        } else if self.authorized.lock().await.contains(authorization_code) {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Unknown
        };

        let (response_code, description) = match status {
            AuthorizationStatus::Authorized => ("200", "Documento autorizado"),
            AuthorizationStatus::Rejected => ("400", "Documento invalidado"),
            AuthorizationStatus::Unknown => ("404", "Documento no encontrado"),
        };

        Ok(StatusResponse {
            response_code: response_code.to_string(),
            description: description.to_string(),
            status,
            queried_at: Utc::now(),
        })
    }
}
