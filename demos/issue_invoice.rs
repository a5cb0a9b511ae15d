use std::sync::Arc;

use chrono::Utc;
use facturador::authority::{AuthorityConfig, AuthorityGateway, SimulatedAuthority};
use facturador::core::*;
use facturador::fiscal::FiscalOptions;
use facturador::service::{CreateInvoice, InvoiceService, InvoiceStore, MemoryStore, NewLine};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), FacturaError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,facturador=debug".into()),
        )
        .init();

    // Optional authority.toml plus AUTHORITY__* environment overrides
    let config = AuthorityConfig::load()?;

    let store = Arc::new(MemoryStore::new());
    let company_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    store
        .insert_company(Company {
            id: company_id,
            name: "Ferretería La Palma S.A. de C.V.".into(),
            nit: "0614-150390-101-5".into(),
            establishment_code: Some("123456-7".into()),
            activity_code: Some("47520".into()),
            activity_description: "Venta de artículos de ferretería".into(),
            address: "Calle Principal, La Palma, Chalatenango".into(),
            phone: None,
            email: "dte@lapalma.sv".into(),
            legal_representative: "Roberto Flores".into(),
            tax_regime: TaxRegime::General,
            active: true,
        })
        .await;
    store
        .insert_customer(Customer {
            id: customer_id,
            company_id,
            code: "CLI001".into(),
            kind: CustomerKind::LegalEntity,
            name: "Constructora Santa Elena S.A.".into(),
            last_name: None,
            nit: Some("0614-010180-102-3".into()),
            dui: None,
            address: "Antiguo Cuscatlán".into(),
            phone: None,
            email: None,
            tax_exempt: false,
            active: true,
        })
        .await;
    store
        .save_tax_definition(
            TaxDefinition::new(company_id, "20", "IVA 13%", dec!(13), TaxCategory::Vat).as_default(),
        )
        .await?;

    let gateway = AuthorityGateway::with_hmac(Arc::new(SimulatedAuthority::default()), config)?;
    let service = InvoiceService::new(store, gateway, FiscalOptions::default());

    let draft = service
        .create_invoice(
            CreateInvoice::new(company_id, customer_id, Uuid::new_v4())
                .payment_method(PaymentMethod::Credit)
                .line(NewLine::service("Cemento gris 42.5kg", dec!(40), dec!(8.75)))
                .line(NewLine::service("Varilla corrugada 3/8", dec!(25), dec!(6.10)).discount(dec!(7.50)))
                .global_discount(dec!(12.00)),
        )
        .await?;
    println!("Draft {} total {}", draft.number, draft.totals.grand_total);

    let (issued, authorization) = service.issue_invoice(company_id, draft.id).await?;
    println!(
        "Issued {} with authorization {} (control {})",
        issued.number,
        authorization.authorization_code.as_deref().unwrap_or("-"),
        authorization.control_number.as_deref().unwrap_or("-"),
    );

    let status = service.authorization_status(company_id, issued.id).await?;
    println!("Authority status: {:?}", status.status);

    let paid = service
        .mark_paid(company_id, issued.id, Utc::now().date_naive())
        .await?;
    println!("Invoice {} is now {}", paid.number, paid.state);

    let stats = service.invoice_stats(company_id, DateRange::default()).await?;
    println!(
        "Stats: {} invoice(s), sales {}, average {}",
        stats.total, stats.total_sales, stats.average_sale
    );
    Ok(())
}
