//! Tax authority submission.
//!
//! The [`AuthorityGateway`] serializes a [`FiscalDocument`](crate::fiscal::FiscalDocument),
//! signs it, and sends it through an [`AuthorityTransport`] with a per-attempt
//! timeout and bounded exponential backoff. [`SimulatedAuthority`] stands in
//! for the real service; enable the `http` feature for [`HttpTransport`].

mod config;
mod gateway;
#[cfg(feature = "http")]
mod http;
mod retry;
mod signer;
mod simulated;
mod transport;

pub use config::{AuthorityConfig, ENV_PREFIX};
pub use gateway::{AuthorityGateway, PROTOCOL_ERROR_CODE};
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use retry::{RetryExhausted, RetryPolicy, with_retry};
pub use signer::{DocumentSignature, HmacSigner, Signer, content_hash};
pub use simulated::{SimulatedAuthority, SimulatedBehavior};
pub use transport::{
    AuthorityResponse, AuthorityTransport, AuthorizationStatus, SignedSubmission, StatusResponse,
    TransportError,
};
