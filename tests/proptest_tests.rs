//! Property-based tests for pricing invariants and the XML round-trip.
//!
//! Run with: `cargo test --features fiscal --test proptest_tests`

#![cfg(feature = "fiscal")]

use chrono::{TimeZone, Utc};
use facturador::core::*;
use facturador::fiscal::{self, FiscalOptions};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

const COMPANY: Uuid = Uuid::from_u128(0x100);
const CUSTOMER: Uuid = Uuid::from_u128(0x200);

const TAX_IDS: [Uuid; 3] = [
    Uuid::from_u128(0x501),
    Uuid::from_u128(0x502),
    Uuid::from_u128(0x503),
];

fn catalog() -> TaxCatalog {
    let definitions = [
        TaxDefinition::new(COMPANY, "IVA", "IVA 13%", dec!(13), TaxCategory::Vat),
        TaxDefinition::new(COMPANY, "FOV", "FOVIAL", dec!(0.2), TaxCategory::Excise),
        TaxDefinition::new(COMPANY, "CES", "CESC", dec!(5), TaxCategory::Consumption),
    ]
    .into_iter()
    .zip(TAX_IDS)
    .map(|(definition, id)| TaxDefinition { id, ..definition });
    TaxCatalog::with_definitions(COMPANY, definitions).unwrap()
}

fn company() -> Company {
    Company {
        id: COMPANY,
        name: "Comercial Prop & Hijos <Oriente> S.A.".into(),
        nit: "0614-150390-101-5".into(),
        establishment_code: None,
        activity_code: None,
        activity_description: "Comercio".into(),
        address: "San Salvador".into(),
        phone: None,
        email: "ventas@prop.sv".into(),
        legal_representative: "Rep".into(),
        tax_regime: TaxRegime::General,
        active: true,
    }
}

fn customer(exempt: bool) -> Customer {
    Customer {
        id: CUSTOMER,
        company_id: COMPANY,
        code: "C1".into(),
        kind: CustomerKind::LegalEntity,
        name: "Cliente Prop".into(),
        last_name: None,
        nit: None,
        dui: Some("01234567-8".into()),
        address: "Santa Ana".into(),
        phone: None,
        email: None,
        tax_exempt: exempt,
        active: true,
    }
}

// ── Proptest Strategies ─────────────────────────────────────────────────────

/// Generate a price (0.00 to 99999.99).
fn arb_price() -> impl Strategy<Value = Decimal> {
    (0u64..10_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Generate a quantity (0.01 to 1000.00).
fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1u32..=100_000u32).prop_map(|hundredths| Decimal::new(hundredths.into(), 2))
}

/// Generate a subset of the catalog's taxes, in catalog order.
fn arb_taxes() -> impl Strategy<Value = Vec<TaxDefinitionId>> {
    proptest::sample::subsequence(TAX_IDS.to_vec(), 0..=TAX_IDS.len())
}

/// Free text with markup characters, accents and padding at either end.
fn arb_description() -> impl Strategy<Value = String> {
    r#"[ \t]{0,2}[A-Za-z0-9&<>'"áéíóúñÑ€;/ ]{0,24}[A-Za-z0-9&<>ñ€][ \t]{0,2}"#
}

/// Defaults with every text option padded by whitespace.
fn padded_options() -> FiscalOptions {
    let pad = |s: &str| format!("  {s} ");
    let defaults = FiscalOptions::default();
    FiscalOptions {
        environment: pad(&defaults.environment),
        currency_code: pad(&defaults.currency_code),
        currency_singular: pad(&defaults.currency_singular),
        currency_plural: pad(&defaults.currency_plural),
        department: pad(&defaults.department),
        municipality: pad(&defaults.municipality),
        default_activity_code: pad(&defaults.default_activity_code),
        default_registration: pad(&defaults.default_registration),
        establishment_type: pad(&defaults.establishment_type),
        ..defaults
    }
}

/// Generate a valid line, with a discount of at most its gross amount.
fn arb_line() -> impl Strategy<Value = LineInput> {
    (
        arb_quantity(),
        arb_price(),
        arb_taxes(),
        0u32..=100u32,
        arb_description(),
    )
        .prop_map(|(qty, price, taxes, discount_pct, description)| {
            let gross = (qty * price).round_dp(2);
            let discount = (gross * Decimal::from(discount_pct) / dec!(100)).round_dp(2);
            let mut line = LineInput::new(qty, price)
                .discount(discount.min(gross))
                .description(description);
            line.taxes = taxes;
            line
        })
}

fn arb_lines() -> impl Strategy<Value = Vec<LineInput>> {
    prop::collection::vec(arb_line(), 1..=8)
}

fn build(
    lines: &[LineInput],
    global_discount: Decimal,
    catalog: &TaxCatalog,
) -> Result<Invoice, FacturaError> {
    InvoiceBuilder::new(COMPANY, CUSTOMER, Uuid::from_u128(0x300))
        .number("FAC00000001")
        .issue_date(Utc.with_ymd_and_hms(2024, 6, 15, 9, 45, 12).unwrap())
        .lines(lines.iter().cloned())
        .global_discount(global_discount)
        .build(catalog)
}

// ── Property Tests ──────────────────────────────────────────────────────────

proptest! {
    /// subtotal + tax_total == line_total, exactly.
    #[test]
    fn line_total_is_exact(line in arb_line()) {
        let priced = calculate_line(1, &line, &catalog()).unwrap();
        prop_assert_eq!(priced.subtotal + priced.tax_total, priced.line_total);
        prop_assert!(priced.subtotal >= Decimal::ZERO);
        prop_assert!(priced.line_total.scale() <= 2);
    }

    /// subtotal + total_taxes - global_discount == grand_total.
    #[test]
    fn invoice_totals_balance(lines in arb_lines(), pct in 0u32..=100u32) {
        let catalog = catalog();
        let priced = calculate_lines(&lines, &catalog).unwrap();
        let subtotal: Decimal = priced.iter().map(|l| l.subtotal).sum();
        let discount = (subtotal * Decimal::from(pct) / dec!(100)).round_dp(2).min(subtotal);

        let invoice = build(&lines, discount, &catalog).unwrap();
        let t = invoice.totals;
        prop_assert_eq!(t.subtotal + t.total_taxes - t.global_discount, t.grand_total);
        prop_assert!(verify_totals(&invoice.lines, &t).is_empty());
    }

    /// Re-running aggregation on the same lines yields the same totals.
    #[test]
    fn aggregation_is_idempotent(lines in arb_lines()) {
        let priced = calculate_lines(&lines, &catalog()).unwrap();
        let first = aggregate(&priced, Decimal::ZERO).unwrap();
        let second = aggregate(&priced, Decimal::ZERO).unwrap();
        prop_assert_eq!(first, second);
    }

    /// A global discount above the subtotal is always rejected.
    #[test]
    fn excessive_discount_rejected(lines in arb_lines(), extra in 1u64..100_000u64) {
        let catalog = catalog();
        let priced = calculate_lines(&lines, &catalog).unwrap();
        let subtotal: Decimal = priced.iter().map(|l| l.subtotal).sum();
        let discount = subtotal + Decimal::new(extra as i64, 2);
        let rejected = matches!(
            aggregate(&priced, discount),
            Err(FacturaError::InvalidDiscount { .. })
        );
        prop_assert!(rejected);
    }

    /// Non-positive quantities and negative prices are always rejected.
    #[test]
    fn invalid_inputs_rejected(qty in -100_000i64..=0, price in -100_000i64..0) {
        let catalog = catalog();
        let bad_qty = LineInput::new(Decimal::new(qty, 2), dec!(1));
        let bad_price = LineInput::new(dec!(1), Decimal::new(price, 2));
        prop_assert!(calculate_line(1, &bad_qty, &catalog).is_err());
        prop_assert!(calculate_line(1, &bad_price, &catalog).is_err());
    }

    /// document → XML → document is field-for-field equal.
    #[test]
    fn fiscal_xml_roundtrip(
        lines in arb_lines(),
        exempt in any::<bool>(),
        padded in any::<bool>(),
    ) {
        let catalog = catalog();
        let invoice = build(&lines, Decimal::ZERO, &catalog).unwrap();
        prop_assume!(invoice.totals.grand_total > Decimal::ZERO);

        let options = if padded { padded_options() } else { FiscalOptions::default() };
        let doc = fiscal::build_fiscal_document(
            &invoice,
            &company(),
            &customer(exempt),
            &options,
        )
        .unwrap();
        let xml = fiscal::to_xml(&doc).unwrap();
        let parsed = fiscal::from_xml(&xml).unwrap();
        prop_assert_eq!(parsed, doc);
    }
}
