use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::types::InvoiceState;

/// Errors that can occur while pricing, issuing or persisting invoices.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FacturaError {
    /// One or more input validation rules failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced customer, product, company or invoice does not exist within the tenant.
    #[error("{entity} {id} not found")]
    Reference { entity: &'static str, id: String },

    /// A referenced tax definition is unknown, belongs to another company, or is inactive.
    #[error("unknown tax definition {0}")]
    UnknownTaxDefinition(Uuid),

    /// Aggregation was attempted without line items.
    #[error("invoice must have at least one line item")]
    EmptyInvoice,

    /// The global discount exceeds the invoice subtotal.
    #[error("global discount {discount} exceeds subtotal {subtotal}")]
    InvalidDiscount { discount: Decimal, subtotal: Decimal },

    /// The requested lifecycle transition is not allowed from the current state.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: InvoiceState, to: InvoiceState },

    /// The invoice has already been voided.
    #[error("invoice is already voided")]
    AlreadyVoided,

    /// The invoice, company or customer lacks data the fiscal document requires.
    #[error("incomplete fiscal data: {0}")]
    IncompleteFiscalData(String),

    /// Submission to the tax authority did not produce an authorization.
    #[error("authority submission failed: {0}")]
    AuthoritySubmissionFailed(SubmissionFailure),

    /// A status query to the tax authority did not produce an answer.
    #[error("authority status query failed after {attempts} attempt(s): {message}")]
    StatusQueryFailed {
        attempts: u32,
        message: String,
        /// Whether repeating the query may succeed.
        transient: bool,
    },

    /// Another issuance of the same invoice is currently running.
    #[error("issuance already in progress for invoice {0}")]
    IssuanceInProgress(Uuid),

    /// A concurrent writer changed the invoice first.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A monetary or structural invariant does not hold. Never corrected silently.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Document number sequencing error.
    #[error("numbering error: {0}")]
    Numbering(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Why a submission to the tax authority failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// Network error or timeout; retried up to the configured bound.
    Transient { attempts: u32, message: String },
    /// The authority answered with a non-accepting response code. Not retried.
    Rejected {
        response_code: String,
        description: String,
    },
}

impl std::fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient { attempts, message } => {
                write!(f, "transient failure after {attempts} attempt(s): {message}")
            }
            Self::Rejected {
                response_code,
                description,
            } => write!(f, "rejected with code {response_code}: {description}"),
        }
    }
}

/// Machine-readable error category for callers mapping errors onto their own protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Reference,
    InvalidState,
    Conflict,
    FiscalData,
    Authority,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Reference => "reference",
            Self::InvalidState => "invalid_state",
            Self::Conflict => "conflict",
            Self::FiscalData => "fiscal_data",
            Self::Authority => "authority",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FacturaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::EmptyInvoice | Self::InvalidDiscount { .. } => {
                ErrorKind::Validation
            }
            Self::Reference { .. } | Self::UnknownTaxDefinition(_) => ErrorKind::Reference,
            Self::InvalidStateTransition { .. } | Self::AlreadyVoided => ErrorKind::InvalidState,
            Self::IssuanceInProgress(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::IncompleteFiscalData(_) => ErrorKind::FiscalData,
            Self::AuthoritySubmissionFailed(_) | Self::StatusQueryFailed { .. } => {
                ErrorKind::Authority
            }
            Self::Invariant(_)
            | Self::Numbering(_)
            | Self::Xml(_)
            | Self::Config(_)
            | Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AuthoritySubmissionFailed(SubmissionFailure::Transient { .. })
                | Self::StatusQueryFailed {
                    transient: true,
                    ..
                }
                | Self::IssuanceInProgress(_)
                | Self::Conflict(_)
        )
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::Reference {
            entity,
            id: id.to_string(),
        }
    }
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "lines[0].quantity").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Join collected validation errors into a single `Validation` error, or `Ok` if none.
pub(crate) fn into_result(errors: Vec<ValidationError>) -> Result<(), FacturaError> {
    if errors.is_empty() {
        return Ok(());
    }
    let msg = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(FacturaError::Validation(msg))
}
