use std::sync::Arc;

use facturador::authority::{
    AuthorityConfig, AuthorityGateway, RetryPolicy, SimulatedAuthority, SimulatedBehavior,
};
use facturador::core::*;
use facturador::fiscal::FiscalOptions;
use facturador::service::{CreateInvoice, InvoiceService, InvoiceStore, MemoryStore, NewLine};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn report(label: &str, err: &FacturaError) {
    println!(
        "  {label}: [{}] {err}{}",
        err.kind(),
        if err.is_retryable() { " (retryable)" } else { "" }
    );
}

async fn service(behavior: SimulatedBehavior) -> (InvoiceService<MemoryStore>, Uuid, Uuid) {
    let store = Arc::new(MemoryStore::new());
    let company_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    store
        .insert_company(Company {
            id: company_id,
            name: "Panadería San José".into(),
            nit: "0614-150390-101-5".into(),
            establishment_code: None,
            activity_code: None,
            activity_description: "Panadería".into(),
            address: "Santa Ana".into(),
            phone: None,
            email: "dte@sanjose.sv".into(),
            legal_representative: "José Ramos".into(),
            tax_regime: TaxRegime::SmallTaxpayer,
            active: true,
        })
        .await;
    store
        .insert_customer(Customer {
            id: customer_id,
            company_id,
            code: "CF".into(),
            kind: CustomerKind::Individual,
            name: "Consumidor".into(),
            last_name: Some("Final".into()),
            nit: None,
            dui: Some("00000000-0".into()),
            address: "Santa Ana".into(),
            phone: None,
            email: None,
            tax_exempt: false,
            active: true,
        })
        .await;

    let config = AuthorityConfig {
        timeout_ms: 50,
        retry: RetryPolicy::quick(2),
        ..Default::default()
    };
    let gateway =
        AuthorityGateway::with_hmac(Arc::new(SimulatedAuthority::new(behavior)), config).unwrap();
    (
        InvoiceService::new(store, gateway, FiscalOptions::default()),
        company_id,
        customer_id,
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    // ── 1. Validation: bad line input ─────────────────────────────────
    println!("=== Validation ===");
    let (svc, company, customer) = service(SimulatedBehavior::Accept).await;
    let bad = CreateInvoice::new(company, customer, Uuid::new_v4())
        .line(NewLine::service("Pan francés", dec!(0), dec!(0.10)))
        .line(NewLine::service("Pan dulce", dec!(5), dec!(-0.25)));
    if let Err(e) = svc.create_invoice(bad).await {
        report("create", &e);
    }

    let empty = CreateInvoice::new(company, customer, Uuid::new_v4());
    if let Err(e) = svc.create_invoice(empty).await {
        report("empty invoice", &e);
    }

    let discount = CreateInvoice::new(company, customer, Uuid::new_v4())
        .line(NewLine::service("Pastel", dec!(1), dec!(12.00)))
        .global_discount(dec!(15.00));
    if let Err(e) = svc.create_invoice(discount).await {
        report("global discount", &e);
    }

    // ── 2. Reference: unknown customer ────────────────────────────────
    println!("\n=== Reference ===");
    let unknown = CreateInvoice::new(company, Uuid::new_v4(), Uuid::new_v4())
        .line(NewLine::service("Pan", dec!(1), dec!(1)));
    if let Err(e) = svc.create_invoice(unknown).await {
        report("create", &e);
    }

    // ── 3. State machine ──────────────────────────────────────────────
    println!("\n=== Invalid transitions ===");
    let draft = svc
        .create_invoice(
            CreateInvoice::new(company, customer, Uuid::new_v4())
                .line(NewLine::service("Pastel", dec!(1), dec!(12.00))),
        )
        .await
        .unwrap();
    if let Err(e) = svc.void_invoice(company, draft.id, "no aplica").await {
        report("void draft", &e);
    }
    svc.issue_invoice(company, draft.id).await.unwrap();
    svc.void_invoice(company, draft.id, "pedido cancelado").await.unwrap();
    if let Err(e) = svc.void_invoice(company, draft.id, "otra vez").await {
        report("void twice", &e);
    }

    // ── 4. Authority failures ─────────────────────────────────────────
    println!("\n=== Authority ===");
    for behavior in [
        SimulatedBehavior::Reject {
            code: "400".into(),
            description: "Documento no cumple esquema".into(),
        },
        SimulatedBehavior::FailTransient { times: 10 },
        SimulatedBehavior::Delay(std::time::Duration::from_millis(200)),
    ] {
        let label = format!("{behavior:?}");
        let (svc, company, customer) = service(behavior).await;
        let draft = svc
            .create_invoice(
                CreateInvoice::new(company, customer, Uuid::new_v4())
                    .line(NewLine::service("Pan", dec!(10), dec!(0.15))),
            )
            .await
            .unwrap();
        if let Err(e) = svc.issue_invoice(company, draft.id).await {
            report(&label, &e);
        }
        let stored = svc.get_invoice(company, draft.id).await.unwrap();
        println!("    invoice still {} with no fiscal document: {}", stored.state, stored.fiscal_document.is_none());
    }

    // ── 5. Store conflict ─────────────────────────────────────────────
    println!("\n=== Conflict ===");
    let mut stale = svc.get_invoice(company, draft.id).await.unwrap();
    stale.notes = Some("edición concurrente".into());
    if let Err(e) = svc.store().update_invoice(&stale, InvoiceState::Issued).await {
        report("update", &e);
    }
}
