use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::aggregate::aggregate;
use super::error::{FacturaError, ValidationError, into_result};
use super::line::{LineInput, calculate_lines};
use super::tax::TaxCatalog;
use super::types::*;

/// Default series code when none is given.
pub const DEFAULT_SERIES: &str = "A";

const MAX_LINES: usize = 10_000;
const MAX_NUMBER_LEN: usize = 50;
const MAX_SERIES_LEN: usize = 10;
const MAX_NOTES_LEN: usize = 5_000;

/// Builder for draft invoices.
///
/// Prices every line against the company's tax catalog and aggregates the
/// totals before returning, so a built invoice always satisfies the
/// monetary invariants.
///
/// ```
/// use facturador::core::*;
/// use rust_decimal_macros::dec;
/// use uuid::Uuid;
///
/// let company = Uuid::new_v4();
/// let vat = TaxDefinition::new(company, "IVA", "IVA 13%", dec!(13), TaxCategory::Vat);
/// let vat_id = vat.id;
/// let catalog = TaxCatalog::with_definitions(company, [vat]).unwrap();
///
/// let invoice = InvoiceBuilder::new(company, Uuid::new_v4(), Uuid::new_v4())
///     .number("FAC00000001")
///     .add_line(LineInput::new(dec!(2), dec!(25.99)).description("Cable HDMI").tax(vat_id))
///     .build(&catalog)
///     .unwrap();
///
/// assert_eq!(invoice.totals.grand_total, dec!(58.74));
/// assert_eq!(invoice.state, InvoiceState::Draft);
/// ```
pub struct InvoiceBuilder {
    company_id: CompanyId,
    customer_id: CustomerId,
    issued_by: UserId,
    number: Option<String>,
    series: String,
    document_type: DocumentType,
    issue_date: Option<DateTime<Utc>>,
    due_date: Option<NaiveDate>,
    payment_method: PaymentMethod,
    notes: Option<String>,
    global_discount: Decimal,
    lines: Vec<LineInput>,
}

impl InvoiceBuilder {
    pub fn new(company_id: CompanyId, customer_id: CustomerId, issued_by: UserId) -> Self {
        Self {
            company_id,
            customer_id,
            issued_by,
            number: None,
            series: DEFAULT_SERIES.to_string(),
            document_type: DocumentType::Invoice,
            issue_date: None,
            due_date: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
            global_discount: Decimal::ZERO,
            lines: Vec::new(),
        }
    }

    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn series(mut self, series: impl Into<String>) -> Self {
        self.series = series.into();
        self
    }

    pub fn document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn issue_date(mut self, date: DateTime<Utc>) -> Self {
        self.issue_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn global_discount(mut self, discount: Decimal) -> Self {
        self.global_discount = discount;
        self
    }

    pub fn add_line(mut self, line: LineInput) -> Self {
        self.lines.push(line);
        self
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = LineInput>) -> Self {
        self.lines.extend(lines);
        self
    }

    /// Price the lines, aggregate totals and return a `Draft` invoice.
    /// Returns all header validation errors (not just the first).
    pub fn build(self, catalog: &TaxCatalog) -> Result<Invoice, FacturaError> {
        if catalog.company_id() != self.company_id {
            return Err(FacturaError::Validation(
                "tax catalog belongs to another company".into(),
            ));
        }

        let issue_date = self.issue_date.unwrap_or_else(Utc::now);
        let number = self.number.unwrap_or_default().trim().to_string();
        let series = self.series.trim().to_string();
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut errors = Vec::new();
        if number.is_empty() {
            errors.push(ValidationError::new("number", "invoice number is required"));
        } else if number.len() > MAX_NUMBER_LEN {
            errors.push(ValidationError::new(
                "number",
                format!("invoice number cannot exceed {MAX_NUMBER_LEN} characters"),
            ));
        }
        if series.is_empty() || series.len() > MAX_SERIES_LEN {
            errors.push(ValidationError::new(
                "series",
                format!("series must have 1 to {MAX_SERIES_LEN} characters"),
            ));
        }
        if notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
            errors.push(ValidationError::new(
                "notes",
                format!("notes cannot exceed {MAX_NOTES_LEN} characters"),
            ));
        }
        if self.lines.len() > MAX_LINES {
            errors.push(ValidationError::new(
                "lines",
                format!("invoice cannot have more than {MAX_LINES} line items"),
            ));
        }
        if self.customer_id.is_nil() {
            errors.push(ValidationError::new("customer_id", "customer is required"));
        }
        into_result(errors)?;

        let lines = calculate_lines(&self.lines, catalog)?;
        let totals = aggregate(&lines, self.global_discount)?;

        // Credit sales default to the payment term of the method.
        let due_date = self.due_date.or_else(|| {
            self.payment_method
                .term_days()
                .and_then(|days| issue_date.date_naive().checked_add_days(Days::new(days.into())))
        });

        Ok(Invoice {
            id: Uuid::new_v4(),
            company_id: self.company_id,
            customer_id: self.customer_id,
            issued_by: self.issued_by,
            number,
            series,
            document_type: self.document_type,
            issue_date,
            due_date,
            payment_date: None,
            state: InvoiceState::Draft,
            payment_method: self.payment_method,
            notes,
            lines,
            totals,
            fiscal_document: None,
            authority_response: None,
            authorization_code: None,
            authorized_at: None,
            revision: 0,
        })
    }
}

impl Invoice {
    /// Replace the lines and global discount of a draft and recompute its totals.
    ///
    /// Fails with `InvalidStateTransition` once the invoice has left `Draft`;
    /// on any error the invoice is left unchanged.
    pub fn reprice(
        &mut self,
        lines: &[LineInput],
        global_discount: Decimal,
        catalog: &TaxCatalog,
    ) -> Result<(), FacturaError> {
        if !self.state.is_editable() {
            return Err(FacturaError::InvalidStateTransition {
                from: self.state,
                to: InvoiceState::Draft,
            });
        }
        if catalog.company_id() != self.company_id {
            return Err(FacturaError::Validation(
                "tax catalog belongs to another company".into(),
            ));
        }
        if lines.len() > MAX_LINES {
            return Err(FacturaError::Validation(format!(
                "invoice cannot have more than {MAX_LINES} line items"
            )));
        }

        let priced = calculate_lines(lines, catalog)?;
        let totals = aggregate(&priced, global_discount)?;
        self.lines = priced;
        self.totals = totals;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn setup() -> (TaxCatalog, TaxDefinitionId) {
        let company = Uuid::from_u128(10);
        let vat = TaxDefinition::new(company, "IVA", "IVA 13%", dec!(13), TaxCategory::Vat);
        let id = vat.id;
        (TaxCatalog::with_definitions(company, [vat]).unwrap(), id)
    }

    fn builder() -> InvoiceBuilder {
        InvoiceBuilder::new(Uuid::from_u128(10), Uuid::from_u128(11), Uuid::from_u128(12))
            .number("FAC00000001")
    }

    #[test]
    fn builds_draft_with_totals() {
        let (catalog, vat) = setup();
        let line = LineInput::new(dec!(2), dec!(25.99)).tax(vat);
        let invoice = builder()
            .add_line(line.clone())
            .add_line(line)
            .global_discount(dec!(10.00))
            .build(&catalog)
            .unwrap();

        assert_eq!(invoice.state, InvoiceState::Draft);
        assert_eq!(invoice.series, "A");
        assert_eq!(invoice.totals.subtotal, dec!(103.96));
        assert_eq!(invoice.totals.total_taxes, dec!(13.52));
        assert_eq!(invoice.totals.grand_total, dec!(107.48));
        assert_eq!(invoice.lines[1].sequence, 2);
        assert!(invoice.fiscal_document.is_none());
    }

    #[test]
    fn header_errors_are_collected() {
        let (catalog, _) = setup();
        let err = InvoiceBuilder::new(Uuid::from_u128(10), Uuid::nil(), Uuid::from_u128(12))
            .series("TOO-LONG-SERIES")
            .add_line(LineInput::new(dec!(1), dec!(1)))
            .build(&catalog)
            .unwrap_err()
            .to_string();
        assert!(err.contains("number"));
        assert!(err.contains("series"));
        assert!(err.contains("customer_id"));
    }

    #[test]
    fn empty_invoice_rejected() {
        let (catalog, _) = setup();
        assert!(matches!(
            builder().build(&catalog),
            Err(FacturaError::EmptyInvoice)
        ));
    }

    #[test]
    fn foreign_catalog_rejected() {
        let catalog = TaxCatalog::new(Uuid::from_u128(99));
        assert!(builder()
            .add_line(LineInput::new(dec!(1), dec!(1)))
            .build(&catalog)
            .is_err());
    }

    #[test]
    fn credit_sale_gets_due_date() {
        let (catalog, _) = setup();
        let issued = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let invoice = builder()
            .issue_date(issued)
            .payment_method(PaymentMethod::Credit)
            .add_line(LineInput::new(dec!(1), dec!(1)))
            .build(&catalog)
            .unwrap();
        assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2025, 3, 31));
    }

    #[test]
    fn reprice_draft_only() {
        let (catalog, vat) = setup();
        let mut invoice = builder()
            .add_line(LineInput::new(dec!(1), dec!(10)).tax(vat))
            .build(&catalog)
            .unwrap();
        invoice
            .reprice(&[LineInput::new(dec!(2), dec!(25.99)).tax(vat)], dec!(0), &catalog)
            .unwrap();
        assert_eq!(invoice.totals.grand_total, dec!(58.74));

        let before = invoice.clone();
        assert!(invoice.reprice(&[], dec!(0), &catalog).is_err());
        assert_eq!(invoice, before);

        invoice.state = InvoiceState::Issued;
        assert!(matches!(
            invoice.reprice(&[LineInput::new(dec!(1), dec!(1))], dec!(0), &catalog),
            Err(FacturaError::InvalidStateTransition { .. })
        ));
    }
}
