//! Signing, submission, retry and status queries against the simulated authority.
//!
//! Run with: `cargo test --features authority --test authority_tests`

#![cfg(feature = "authority")]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use facturador::authority::*;
use facturador::core::*;
use facturador::fiscal::{self, FiscalDocument, FiscalOptions};
use rust_decimal_macros::dec;
use uuid::Uuid;

const COMPANY: Uuid = Uuid::from_u128(0x100);
const CUSTOMER: Uuid = Uuid::from_u128(0x200);

fn document() -> FiscalDocument {
    let vat = TaxDefinition::new(COMPANY, "20", "IVA 13%", dec!(13), TaxCategory::Vat);
    let vat_id = vat.id;
    let catalog = TaxCatalog::with_definitions(COMPANY, [vat]).unwrap();
    let invoice = InvoiceBuilder::new(COMPANY, CUSTOMER, Uuid::from_u128(0x300))
        .number("FAC00000001")
        .issue_date(Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap())
        .add_line(LineInput::new(dec!(2), dec!(25.99)).description("Consultoría").tax(vat_id))
        .build(&catalog)
        .unwrap();
    let company = Company {
        id: COMPANY,
        name: "Servicios Técnicos S.A.".into(),
        nit: "0614-150390-101-5".into(),
        establishment_code: None,
        activity_code: None,
        activity_description: "Consultoría".into(),
        address: "San Salvador".into(),
        phone: None,
        email: "dte@servicios.sv".into(),
        legal_representative: "Luis Rivas".into(),
        tax_regime: TaxRegime::General,
        active: true,
    };
    let customer = Customer {
        id: CUSTOMER,
        company_id: COMPANY,
        code: "C1".into(),
        kind: CustomerKind::LegalEntity,
        name: "Cliente S.A.".into(),
        last_name: None,
        nit: Some("0614-010180-102-3".into()),
        dui: None,
        address: "Santa Tecla".into(),
        phone: None,
        email: None,
        tax_exempt: false,
        active: true,
    };
    fiscal::build_fiscal_document(&invoice, &company, &customer, &FiscalOptions::default()).unwrap()
}

fn config(retry: RetryPolicy) -> AuthorityConfig {
    AuthorityConfig {
        timeout_ms: 1_000,
        retry,
        ..Default::default()
    }
}

fn gateway(authority: Arc<SimulatedAuthority>, retry: RetryPolicy) -> AuthorityGateway {
    AuthorityGateway::with_hmac(authority, config(retry)).unwrap()
}

#[tokio::test]
async fn accepted_submission_records_signed_payload() {
    let authority = Arc::new(SimulatedAuthority::default());
    let gateway = gateway(authority.clone(), RetryPolicy::quick(3));
    let doc = document();

    let result = gateway.submit(&doc).await.unwrap();

    assert!(result.is_accepted());
    assert_eq!(result.response_code, "200");
    assert!(result.authorization_code.as_deref().unwrap().starts_with('A'));
    assert!(result.authorized_at.is_some());
    assert_eq!(result.environment, "test");
    assert_eq!(result.signed_payload, fiscal::to_xml(&doc).unwrap());
    assert_eq!(result.content_hash, content_hash(result.signed_payload.as_bytes()));
    assert!(gateway.verify(&result).unwrap());
    assert_eq!(authority.submissions(), 1);
}

#[tokio::test]
async fn rejection_is_final_and_not_retried() {
    let authority = Arc::new(SimulatedAuthority::rejecting("400", "NIT del receptor inválido"));
    let gateway = gateway(authority.clone(), RetryPolicy::quick(5));

    let err = gateway.submit(&document()).await.unwrap_err();

    match err {
        FacturaError::AuthoritySubmissionFailed(SubmissionFailure::Rejected {
            response_code,
            description,
        }) => {
            assert_eq!(response_code, "400");
            assert_eq!(description, "NIT del receptor inválido");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(authority.submissions(), 1);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let authority = Arc::new(SimulatedAuthority::new(SimulatedBehavior::FailTransient {
        times: 2,
    }));
    let gateway = gateway(authority.clone(), RetryPolicy::quick(3));

    let result = gateway.submit(&document()).await.unwrap();
    assert!(result.is_accepted());
    assert_eq!(authority.submissions(), 3);
}

#[tokio::test]
async fn retry_budget_is_bounded() {
    let authority = Arc::new(SimulatedAuthority::new(SimulatedBehavior::FailTransient {
        times: 10,
    }));
    let gateway = gateway(authority.clone(), RetryPolicy::quick(2));

    let err = gateway.submit(&document()).await.unwrap_err();
    assert!(matches!(
        err,
        FacturaError::AuthoritySubmissionFailed(SubmissionFailure::Transient { attempts: 3, .. })
    ));
    assert!(err.is_retryable());
    assert_eq!(authority.submissions(), 3);
}

#[tokio::test]
async fn timeout_counts_as_transient_failure() {
    let authority = Arc::new(SimulatedAuthority::new(SimulatedBehavior::Delay(
        Duration::from_millis(500),
    )));
    let config = AuthorityConfig {
        timeout_ms: 20,
        retry: RetryPolicy::quick(1),
        ..Default::default()
    };
    let gateway = AuthorityGateway::with_hmac(authority.clone(), config).unwrap();

    let err = gateway.submit(&document()).await.unwrap_err();
    match err {
        FacturaError::AuthoritySubmissionFailed(SubmissionFailure::Transient {
            attempts,
            message,
        }) => {
            assert_eq!(attempts, 2);
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected transient failure, got {other:?}"),
    }
}

#[tokio::test]
async fn status_query_reflects_authority_state() {
    let authority = Arc::new(SimulatedAuthority::default());
    let gateway = gateway(authority.clone(), RetryPolicy::no_retry());

    let result = gateway.submit(&document()).await.unwrap();
    let code = result.authorization_code.unwrap();

    let status = gateway.query_status(&code).await.unwrap();
    assert_eq!(status.status, AuthorizationStatus::Authorized);

    authority.revoke(&code).await;
    let status = gateway.query_status(&code).await.unwrap();
    assert_eq!(status.status, AuthorizationStatus::Rejected);

    let status = gateway.query_status("A0000000000000XXXXXXXXX").await.unwrap();
    assert_eq!(status.status, AuthorizationStatus::Unknown);
}

/// An endpoint that answers every call with an unparseable body.
#[derive(Default)]
struct GarbledAuthority {
    calls: AtomicU32,
}

#[async_trait::async_trait]
impl AuthorityTransport for GarbledAuthority {
    async fn submit(
        &self,
        _submission: &SignedSubmission,
    ) -> Result<AuthorityResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Protocol("missing field `codigoMsg`".into()))
    }

    async fn query_status(&self, _code: &str) -> Result<StatusResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Protocol("empty body".into()))
    }
}

#[tokio::test]
async fn protocol_errors_are_final() {
    let authority = Arc::new(GarbledAuthority::default());
    let gateway = AuthorityGateway::with_hmac(authority.clone(), config(RetryPolicy::quick(3))).unwrap();

    let err = gateway.submit(&document()).await.unwrap_err();
    match &err {
        FacturaError::AuthoritySubmissionFailed(SubmissionFailure::Rejected {
            response_code,
            description,
        }) => {
            assert_eq!(response_code, PROTOCOL_ERROR_CODE);
            assert!(description.contains("codigoMsg"), "{description}");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(authority.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn garbled_status_answer_is_a_final_query_failure() {
    let authority = Arc::new(GarbledAuthority::default());
    let gateway = AuthorityGateway::with_hmac(authority.clone(), config(RetryPolicy::quick(3))).unwrap();

    let err = gateway.query_status("A0000000000000XXXXXXXXX").await.unwrap_err();
    assert!(
        matches!(
            &err,
            FacturaError::StatusQueryFailed { attempts: 1, transient: false, message }
                if message.contains("empty body")
        ),
        "{err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::Authority);
    assert!(!err.is_retryable());
    assert_eq!(authority.calls.load(Ordering::SeqCst), 1);
}

/// An endpoint that never answers a status query.
#[derive(Default)]
struct UnreachableAuthority {
    calls: AtomicU32,
}

#[async_trait::async_trait]
impl AuthorityTransport for UnreachableAuthority {
    async fn submit(
        &self,
        _submission: &SignedSubmission,
    ) -> Result<AuthorityResponse, TransportError> {
        Err(TransportError::Network("connection refused".into()))
    }

    async fn query_status(&self, _code: &str) -> Result<StatusResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Network("connection refused".into()))
    }
}

#[tokio::test]
async fn unreachable_status_endpoint_is_retryable() {
    let authority = Arc::new(UnreachableAuthority::default());
    let gateway = AuthorityGateway::with_hmac(authority.clone(), config(RetryPolicy::quick(2))).unwrap();

    let err = gateway.query_status("A0000000000000XXXXXXXXX").await.unwrap_err();
    assert!(
        matches!(err, FacturaError::StatusQueryFailed { attempts: 3, transient: true, .. }),
        "{err:?}"
    );
    assert!(err.is_retryable());
    assert_eq!(authority.calls.load(Ordering::SeqCst), 3);
}

/// A signer with a fixed output, standing in for a certificate-based scheme.
struct FixedSigner;

impl Signer for FixedSigner {
    fn algorithm(&self) -> &'static str {
        "fixed"
    }

    fn sign(&self, payload: &[u8]) -> Result<DocumentSignature, FacturaError> {
        Ok(DocumentSignature {
            content_hash: content_hash(payload),
            signature: "firma-fija".into(),
        })
    }

    fn verify(&self, _payload: &[u8], signature: &DocumentSignature) -> Result<bool, FacturaError> {
        Ok(signature.signature == "firma-fija")
    }
}

#[tokio::test]
async fn signer_is_pluggable() {
    let gateway = AuthorityGateway::new(
        Arc::new(SimulatedAuthority::default()),
        Arc::new(FixedSigner),
        config(RetryPolicy::no_retry()),
    )
    .unwrap();

    let result = gateway.submit(&document()).await.unwrap();
    assert_eq!(result.signature, "firma-fija");
    assert!(gateway.verify(&result).unwrap());
}

#[test]
fn invalid_config_is_rejected() {
    let config = AuthorityConfig {
        environment: "staging".into(),
        ..Default::default()
    };
    let err = AuthorityGateway::with_hmac(Arc::new(SimulatedAuthority::default()), config).unwrap_err();
    assert!(matches!(err, FacturaError::Config(_)));
}

#[test]
fn hmac_signature_detects_tampering() {
    let signer = HmacSigner::new("clave_simulada").unwrap();
    let xml = fiscal::to_xml(&document()).unwrap();
    let signature = signer.sign(xml.as_bytes()).unwrap();

    assert!(signer.verify(xml.as_bytes(), &signature).unwrap());
    let tampered = xml.replace("FAC00000001", "FAC00000002");
    assert!(!signer.verify(tampered.as_bytes(), &signature).unwrap());
}
