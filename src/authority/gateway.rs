use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::config::AuthorityConfig;
use super::retry::{RetryExhausted, with_retry};
use super::signer::{HmacSigner, Signer};
use super::transport::{AuthorityTransport, SignedSubmission, StatusResponse, TransportError};
use crate::core::{AuthorizationResult, FacturaError, SubmissionFailure};
use crate::fiscal::{FiscalDocument, to_xml};

/// Response code reported when the authority's answer could not be understood.
pub const PROTOCOL_ERROR_CODE: &str = "protocol";

/// Signs fiscal documents and submits them to the tax authority.
///
/// Network errors and timeouts are retried according to the configured
/// [`RetryPolicy`](super::RetryPolicy); a response with a non-accepting code
/// is final and never retried.
#[derive(Clone)]
pub struct AuthorityGateway {
    transport: Arc<dyn AuthorityTransport>,
    signer: Arc<dyn Signer>,
    config: AuthorityConfig,
}

impl std::fmt::Debug for AuthorityGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityGateway")
            .field("url", &self.config.url)
            .field("environment", &self.config.environment)
            .field("signer", &self.signer.algorithm())
            .finish_non_exhaustive()
    }
}

impl AuthorityGateway {
    pub fn new(
        transport: Arc<dyn AuthorityTransport>,
        signer: Arc<dyn Signer>,
        config: AuthorityConfig,
    ) -> Result<Self, FacturaError> {
        config.validate()?;
        Ok(Self {
            transport,
            signer,
            config,
        })
    }

    /// Gateway using the HMAC placeholder signer keyed by `config.signing_secret`.
    pub fn with_hmac(
        transport: Arc<dyn AuthorityTransport>,
        config: AuthorityConfig,
    ) -> Result<Self, FacturaError> {
        let signer = HmacSigner::new(config.signing_secret.as_bytes())?;
        Self::new(transport, Arc::new(signer), config)
    }

    pub fn config(&self) -> &AuthorityConfig {
        &self.config
    }

    /// Serialize, sign and submit `document`.
    ///
    /// Returns the authority's result only when the document was accepted.
    #[instrument(skip_all, fields(document_number = %document.general.generation_code))]
    pub async fn submit(
        &self,
        document: &FiscalDocument,
    ) -> Result<AuthorizationResult, FacturaError> {
        let payload = to_xml(document)?;
        let signature = self.signer.sign(payload.as_bytes())?;
        let submission = SignedSubmission {
            document_number: document.general.generation_code.clone(),
            environment: self.config.environment.clone(),
            payload,
            content_hash: signature.content_hash,
            signature: signature.signature,
        };

        let timeout = self.config.timeout();
        let transport = &self.transport;
        let submission_ref = &submission;
        let response = with_retry(&self.config.retry, "submit", move |_| async move {
            match tokio::time::timeout(timeout, transport.submit(submission_ref)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            }
        })
        .await
        .map_err(submission_failed)?;

        let accepted = response.response_code == AuthorizationResult::ACCEPTED;
        let Some(authorization_code) = response.authorization_code.filter(|_| accepted) else {
            warn!(
                response_code = %response.response_code,
                description = %response.description,
                "authority rejected document"
            );
            return Err(FacturaError::AuthoritySubmissionFailed(
                SubmissionFailure::Rejected {
                    response_code: response.response_code,
                    description: response.description,
                },
            ));
        };

        info!(%authorization_code, "document authorized");
        Ok(AuthorizationResult {
            response_code: response.response_code,
            description: response.description,
            authorization_code: Some(authorization_code),
            authorized_at: response.authorized_at,
            control_number: response.control_number,
            environment: submission.environment,
            signed_payload: submission.payload,
            content_hash: submission.content_hash,
            signature: submission.signature,
        })
    }

    /// Ask the authority for the current status of an authorization.
    #[instrument(skip(self))]
    pub async fn query_status(
        &self,
        authorization_code: &str,
    ) -> Result<StatusResponse, FacturaError> {
        let timeout = self.config.timeout();
        let transport = &self.transport;
        with_retry(&self.config.retry, "query_status", move |_| async move {
            match tokio::time::timeout(timeout, transport.query_status(authorization_code)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            }
        })
        .await
        .map_err(|exhausted| FacturaError::StatusQueryFailed {
            attempts: exhausted.attempts,
            transient: exhausted.error.is_transient(),
            message: exhausted.error.to_string(),
        })
    }

    /// Verify that `result` carries a valid signature over its payload.
    pub fn verify(&self, result: &AuthorizationResult) -> Result<bool, FacturaError> {
        self.signer.verify(
            result.signed_payload.as_bytes(),
            &super::signer::DocumentSignature {
                content_hash: result.content_hash.clone(),
                signature: result.signature.clone(),
            },
        )
    }
}

/// Transport failures that survive the retry loop. Errors the authority
/// reported as malformed requests are final, like a rejection.
fn submission_failed(exhausted: RetryExhausted) -> FacturaError {
    let failure = match exhausted.error {
        TransportError::Protocol(description) => SubmissionFailure::Rejected {
            response_code: PROTOCOL_ERROR_CODE.into(),
            description,
        },
        error => SubmissionFailure::Transient {
            attempts: exhausted.attempts,
            message: error.to_string(),
        },
    };
    FacturaError::AuthoritySubmissionFailed(failure)
}
