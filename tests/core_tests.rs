use chrono::{NaiveDate, TimeZone, Utc};
use facturador::core::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

const COMPANY: Uuid = Uuid::from_u128(0x100);
const CUSTOMER: Uuid = Uuid::from_u128(0x200);
const USER: Uuid = Uuid::from_u128(0x300);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn catalog() -> (TaxCatalog, TaxDefinitionId) {
    let vat = TaxDefinition::new(COMPANY, "IVA", "IVA 13%", dec!(13), TaxCategory::Vat).as_default();
    let id = vat.id;
    (TaxCatalog::with_definitions(COMPANY, [vat]).unwrap(), id)
}

fn scenario_line(vat: TaxDefinitionId) -> LineInput {
    LineInput::new(dec!(2), dec!(25.99))
        .description("Servicio de consultoría")
        .tax(vat)
}

fn draft() -> Invoice {
    let (catalog, vat) = catalog();
    InvoiceBuilder::new(COMPANY, CUSTOMER, USER)
        .number("FAC00000001")
        .issue_date(Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap())
        .due_date(date(2024, 4, 14))
        .add_line(scenario_line(vat))
        .add_line(scenario_line(vat))
        .global_discount(dec!(10.00))
        .build(&catalog)
        .unwrap()
}

fn accepted() -> AuthorizationResult {
    AuthorizationResult {
        response_code: "200".into(),
        description: "Documento procesado exitosamente".into(),
        authorization_code: Some("A1710498600000ABCDEF123".into()),
        authorized_at: Some(Utc.with_ymd_and_hms(2024, 3, 15, 10, 31, 0).unwrap()),
        control_number: Some("NC1710498600000".into()),
        environment: "test".into(),
        signed_payload: "<DTE/>".into(),
        content_hash: "00".into(),
        signature: "sig".into(),
    }
}

fn issued() -> Invoice {
    let mut invoice = draft();
    invoice.issue("<DTE/>".into(), accepted()).unwrap();
    invoice
}

// --- Pricing ---

#[test]
fn scenario_a_single_line() {
    let (catalog, vat) = catalog();
    let line = calculate_line(1, &scenario_line(vat), &catalog).unwrap();

    assert_eq!(line.subtotal, dec!(51.98));
    assert_eq!(line.tax_total, dec!(6.76));
    assert_eq!(line.line_total, dec!(58.74));
    assert_eq!(line.subtotal + line.tax_total, line.line_total);
    assert_eq!(line.taxes.len(), 1);
    assert_eq!(line.taxes[0].base, dec!(51.98));
}

#[test]
fn scenario_b_two_lines_with_global_discount() {
    let invoice = draft();

    assert_eq!(invoice.totals.subtotal, dec!(103.96));
    assert_eq!(invoice.totals.total_taxes, dec!(13.52));
    assert_eq!(invoice.totals.global_discount, dec!(10.00));
    assert_eq!(invoice.totals.grand_total, dec!(107.48));
    assert_eq!(invoice.state, InvoiceState::Draft);
    assert!(verify_totals(&invoice.lines, &invoice.totals).is_empty());
    assert!(check_invariants(&invoice).is_ok());
}

#[test]
fn line_discount_reduces_taxable_base() {
    let (catalog, vat) = catalog();
    let input = LineInput::new(dec!(3), dec!(10)).discount(dec!(5)).tax(vat);
    let line = calculate_line(1, &input, &catalog).unwrap();

    assert_eq!(line.subtotal, dec!(25.00));
    assert_eq!(line.tax_total, dec!(3.25));
    assert_eq!(line.line_total, dec!(28.25));
}

#[test]
fn untaxed_line_has_no_assessments() {
    let (catalog, _) = catalog();
    let line = calculate_line(1, &LineInput::new(dec!(1), dec!(9.99)), &catalog).unwrap();
    assert!(line.taxes.is_empty());
    assert_eq!(line.tax_total, dec!(0));
    assert_eq!(line.line_total, dec!(9.99));
}

#[test]
fn invalid_quantities_and_prices_are_rejected() {
    let (catalog, vat) = catalog();
    for input in [
        LineInput::new(dec!(0), dec!(10)).tax(vat),
        LineInput::new(dec!(-1), dec!(10)).tax(vat),
        LineInput::new(dec!(1), dec!(-0.01)).tax(vat),
        LineInput::new(dec!(1), dec!(10)).discount(dec!(-1)),
    ] {
        let err = calculate_line(1, &input, &catalog).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{input:?}");
    }
}

#[test]
fn discount_larger_than_line_amount_is_rejected() {
    let (catalog, _) = catalog();
    let input = LineInput::new(dec!(1), dec!(10)).discount(dec!(10.01));
    assert!(calculate_line(1, &input, &catalog).is_err());
}

#[test]
fn tax_from_another_company_is_unknown() {
    let (catalog, _) = catalog();
    let foreign = TaxDefinition::new(Uuid::from_u128(9), "IVA", "IVA", dec!(13), TaxCategory::Vat);
    let input = LineInput::new(dec!(1), dec!(10)).tax(foreign.id);
    assert!(matches!(
        calculate_line(1, &input, &catalog),
        Err(FacturaError::UnknownTaxDefinition(id)) if id == foreign.id
    ));
}

// --- Aggregation ---

#[test]
fn global_discount_above_subtotal_is_rejected() {
    let (catalog, vat) = catalog();
    let result = InvoiceBuilder::new(COMPANY, CUSTOMER, USER)
        .number("FAC00000001")
        .add_line(scenario_line(vat))
        .global_discount(dec!(51.99))
        .build(&catalog);
    assert!(matches!(result, Err(FacturaError::InvalidDiscount { .. })));
}

#[test]
fn invoice_without_lines_is_rejected() {
    let (catalog, _) = catalog();
    let result = InvoiceBuilder::new(COMPANY, CUSTOMER, USER)
        .number("FAC00000001")
        .build(&catalog);
    assert!(matches!(result, Err(FacturaError::EmptyInvoice)));
}

#[test]
fn aggregation_is_idempotent() {
    let invoice = draft();
    let first = aggregate(&invoice.lines, dec!(10.00)).unwrap();
    let second = aggregate(&invoice.lines, dec!(10.00)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, invoice.totals);
}

#[test]
fn tax_breakdown_groups_by_code() {
    let breakdown = tax_breakdown(&draft().lines);
    assert_eq!(breakdown.len(), 1);
    assert_eq!(breakdown[0].code, "IVA");
    assert_eq!(breakdown[0].taxable_base, dec!(103.96));
    assert_eq!(breakdown[0].amount, dec!(13.52));
}

#[test]
fn header_errors_are_reported_together() {
    let (catalog, vat) = catalog();
    let err = InvoiceBuilder::new(COMPANY, Uuid::nil(), USER)
        .series("")
        .add_line(scenario_line(vat))
        .build(&catalog)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("number"), "{msg}");
    assert!(msg.contains("series"), "{msg}");
    assert!(msg.contains("customer"), "{msg}");
}

// --- Lifecycle ---

#[test]
fn draft_to_issued_to_void() {
    let mut invoice = issued();
    assert_eq!(invoice.state, InvoiceState::Issued);
    assert_eq!(invoice.fiscal_document.as_deref(), Some("<DTE/>"));
    assert_eq!(invoice.authorization_code.as_deref(), Some("A1710498600000ABCDEF123"));

    invoice.void("Cliente canceló el pedido").unwrap();
    assert_eq!(invoice.state, InvoiceState::Void);
    assert!(invoice.notes.as_deref().unwrap().contains("Cliente canceló el pedido"));
    // Totals are not reversed.
    assert_eq!(invoice.totals.grand_total, dec!(107.48));

    assert!(matches!(invoice.void("again"), Err(FacturaError::AlreadyVoided)));
}

#[test]
fn draft_cannot_be_paid_or_voided() {
    let mut invoice = draft();
    assert!(matches!(
        invoice.mark_paid(date(2024, 3, 20)),
        Err(FacturaError::InvalidStateTransition {
            from: InvoiceState::Draft,
            to: InvoiceState::Paid
        })
    ));
    assert!(matches!(
        invoice.void("reason"),
        Err(FacturaError::InvalidStateTransition { .. })
    ));
    assert_eq!(invoice.state, InvoiceState::Draft);
    assert!(invoice.notes.is_none());
}

#[test]
fn rejected_authorization_leaves_draft_untouched() {
    let mut invoice = draft();
    let before = invoice.clone();
    let rejection = AuthorizationResult {
        response_code: "400".into(),
        description: "NIT del receptor inválido".into(),
        authorization_code: None,
        ..accepted()
    };

    let err = invoice.issue("<DTE/>".into(), rejection).unwrap_err();
    assert!(matches!(
        err,
        FacturaError::AuthoritySubmissionFailed(SubmissionFailure::Rejected { ref response_code, .. })
            if response_code == "400"
    ));
    assert_eq!(invoice, before);
    assert!(invoice.fiscal_document.is_none());
}

#[test]
fn paid_and_expired_are_terminal() {
    let mut paid = issued();
    paid.mark_paid(date(2024, 3, 20)).unwrap();
    assert_eq!(paid.payment_date, Some(date(2024, 3, 20)));
    assert!(paid.void("late").is_err());
    assert!(paid.mark_paid(date(2024, 3, 21)).is_err());

    let mut expired = issued();
    assert!(!expired.is_overdue(date(2024, 4, 14)));
    assert!(expired.is_overdue(date(2024, 4, 15)));
    expired.expire(date(2024, 4, 15)).unwrap();
    assert_eq!(expired.state, InvoiceState::Expired);
    assert!(expired.mark_paid(date(2024, 4, 16)).is_err());
}

#[test]
fn payment_before_issue_date_is_rejected() {
    let mut invoice = issued();
    assert!(invoice.mark_paid(date(2024, 3, 14)).is_err());
    assert_eq!(invoice.state, InvoiceState::Issued);
}

#[test]
fn no_transition_reenters_draft() {
    for from in [
        InvoiceState::Issued,
        InvoiceState::Paid,
        InvoiceState::Void,
        InvoiceState::Expired,
    ] {
        assert!(!from.can_transition_to(InvoiceState::Draft), "{from}");
    }
}

#[test]
fn reprice_only_while_draft() {
    let (catalog, vat) = catalog();
    let mut invoice = draft();
    invoice
        .reprice(&[scenario_line(vat)], dec!(0), &catalog)
        .unwrap();
    assert_eq!(invoice.totals.grand_total, dec!(58.74));

    let mut issued = issued();
    let before = issued.clone();
    assert!(issued.reprice(&[scenario_line(vat)], dec!(0), &catalog).is_err());
    assert_eq!(issued, before);
}

// --- Numbering & statistics ---

#[test]
fn document_numbers_are_sequential() {
    let mut seq = DocumentNumberSequence::default();
    assert_eq!(seq.next_number().unwrap(), "FAC00000001");
    assert_eq!(seq.next_number().unwrap(), "FAC00000002");

    let resumed = DocumentNumberSequence::resume("FAC", ["FAC00000041", "FAC00000007"]);
    assert_eq!(resumed.peek(), "FAC00000042");
}

#[test]
fn stats_count_states_and_sales() {
    let mut voided = issued();
    voided.void("error").unwrap();
    let invoices = [draft(), issued(), voided];

    let stats = InvoiceStats::collect(&invoices, DateRange::default());
    assert_eq!(stats.total, 3);
    assert_eq!(stats.drafts, 1);
    assert_eq!(stats.issued, 1);
    assert_eq!(stats.voided, 1);
    assert_eq!(stats.issued_sales, dec!(107.48));
    assert_eq!(stats.total_sales, dec!(322.44));
    assert_eq!(stats.average_sale, dec!(107.48));

    let later = DateRange {
        from: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
        to: None,
    };
    assert_eq!(InvoiceStats::collect(&invoices, later).total, 0);
}

#[test]
fn error_kinds_are_machine_readable() {
    assert_eq!(FacturaError::EmptyInvoice.kind().as_str(), "validation");
    assert_eq!(FacturaError::AlreadyVoided.kind().as_str(), "invalid_state");
    assert_eq!(
        FacturaError::IncompleteFiscalData("nit".into()).kind(),
        ErrorKind::FiscalData
    );
    assert!(
        FacturaError::AuthoritySubmissionFailed(SubmissionFailure::Transient {
            attempts: 3,
            message: "timeout".into()
        })
        .is_retryable()
    );
    assert!(
        !FacturaError::AuthoritySubmissionFailed(SubmissionFailure::Rejected {
            response_code: "400".into(),
            description: "bad".into()
        })
        .is_retryable()
    );
}
