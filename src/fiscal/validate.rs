use rust_decimal::Decimal;

use crate::core::{Company, Customer, FacturaError, Invoice, ValidationError};

/// Minimum length of the issuing company's tax identification number.
pub const MIN_NIT_LEN: usize = 10;

/// Check that an invoice and its related entities carry everything the
/// fiscal document requires.
///
/// Returns all problems found (not just the first).
pub fn validate_fiscal_data(
    invoice: &Invoice,
    company: &Company,
    customer: &Customer,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if company.id != invoice.company_id {
        errors.push(ValidationError::new(
            "company",
            "company does not own the invoice",
        ));
    }
    if customer.id != invoice.customer_id || customer.company_id != invoice.company_id {
        errors.push(ValidationError::new(
            "customer",
            "customer does not belong to the invoice",
        ));
    }

    if company.nit.trim().len() < MIN_NIT_LEN {
        errors.push(ValidationError::new(
            "company.nit",
            format!("company NIT must have at least {MIN_NIT_LEN} characters"),
        ));
    }
    if company.name.trim().is_empty() {
        errors.push(ValidationError::new("company.name", "company name is required"));
    }

    let has_id = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has_id(&customer.nit) && !has_id(&customer.dui) {
        errors.push(ValidationError::new(
            "customer.identification",
            "customer must have a NIT or DUI",
        ));
    }
    if customer.display_name().is_empty() {
        errors.push(ValidationError::new("customer.name", "customer name is required"));
    }

    if invoice.lines.is_empty() {
        errors.push(ValidationError::new(
            "lines",
            "invoice must have at least one line item",
        ));
    }
    for (i, line) in invoice.lines.iter().enumerate() {
        let described = line.product.is_some()
            || line
                .description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty());
        if !described {
            errors.push(ValidationError::new(
                format!("lines[{i}]"),
                "line needs a product or a description",
            ));
        }
    }

    if invoice.totals.grand_total <= Decimal::ZERO {
        errors.push(ValidationError::new(
            "totals.grand_total",
            "invoice total must be greater than zero",
        ));
    }

    errors
}

/// Like [`validate_fiscal_data`], failing with `IncompleteFiscalData` on any problem.
pub fn ensure_fiscal_data(
    invoice: &Invoice,
    company: &Company,
    customer: &Customer,
) -> Result<(), FacturaError> {
    let errors = validate_fiscal_data(invoice, company, customer);
    if errors.is_empty() {
        return Ok(());
    }
    let msg = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(FacturaError::IncompleteFiscalData(msg))
}
