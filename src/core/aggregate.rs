use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::{FacturaError, ValidationError};
use super::money::{self, MONEY_SCALE};
use super::types::*;

/// Fold priced lines into invoice totals.
///
/// Idempotent: the same lines and discount always produce the same totals.
pub fn aggregate(lines: &[LineItem], global_discount: Decimal) -> Result<Totals, FacturaError> {
    if lines.is_empty() {
        return Err(FacturaError::EmptyInvoice);
    }
    money::ensure_non_negative(global_discount, "global discount")?;
    if !money::has_scale_at_most(global_discount, MONEY_SCALE) {
        return Err(FacturaError::Validation(format!(
            "global discount allows at most {MONEY_SCALE} decimal places"
        )));
    }

    let subtotal = money::round_money(money::sum(lines.iter().map(|l| l.subtotal))?);
    let total_taxes = money::round_money(money::sum(lines.iter().map(|l| l.tax_total))?);

    if global_discount > subtotal {
        return Err(FacturaError::InvalidDiscount {
            discount: global_discount,
            subtotal,
        });
    }

    let gross = money::checked_add(subtotal, total_taxes, "grand total")?;
    let grand_total = money::round_money(money::checked_sub(gross, global_discount, "grand total")?);

    Ok(Totals {
        subtotal,
        total_taxes,
        global_discount: money::round_money(global_discount),
        grand_total,
    })
}

/// Check every line and invoice-level arithmetic identity.
///
/// Returns all violations found (not just the first).
pub fn verify_totals(lines: &[LineItem], totals: &Totals) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let prefix = format!("lines[{i}]");
        let expected_subtotal = money::round_money(line.quantity * line.unit_price) - line.discount;
        if line.subtotal != expected_subtotal {
            errors.push(ValidationError::new(
                format!("{prefix}.subtotal"),
                format!(
                    "subtotal {} does not match quantity * unit price - discount = {}",
                    line.subtotal, expected_subtotal
                ),
            ));
        }
        let tax_sum: Decimal = line.taxes.iter().map(|t| t.amount).sum();
        if line.tax_total != tax_sum {
            errors.push(ValidationError::new(
                format!("{prefix}.tax_total"),
                format!(
                    "tax total {} does not match sum of assessments {}",
                    line.tax_total, tax_sum
                ),
            ));
        }
        for (j, tax) in line.taxes.iter().enumerate() {
            let expected = money::round_money(tax.base * tax.percentage / Decimal::ONE_HUNDRED);
            if tax.amount != expected {
                errors.push(ValidationError::new(
                    format!("{prefix}.taxes[{j}].amount"),
                    format!("tax amount {} does not match {expected}", tax.amount),
                ));
            }
        }
        if line.line_total != line.subtotal + line.tax_total {
            errors.push(ValidationError::new(
                format!("{prefix}.line_total"),
                format!(
                    "line total {} does not match subtotal {} + tax {}",
                    line.line_total, line.subtotal, line.tax_total
                ),
            ));
        }
    }

    let subtotal: Decimal = lines.iter().map(|l| l.subtotal).sum();
    if totals.subtotal != subtotal {
        errors.push(ValidationError::new(
            "totals.subtotal",
            format!(
                "subtotal {} does not match sum of line subtotals {}",
                totals.subtotal, subtotal
            ),
        ));
    }

    let total_taxes: Decimal = lines.iter().map(|l| l.tax_total).sum();
    if totals.total_taxes != total_taxes {
        errors.push(ValidationError::new(
            "totals.total_taxes",
            format!(
                "total taxes {} does not match sum of line taxes {}",
                totals.total_taxes, total_taxes
            ),
        ));
    }

    if totals.global_discount > totals.subtotal {
        errors.push(ValidationError::new(
            "totals.global_discount",
            format!(
                "global discount {} exceeds subtotal {}",
                totals.global_discount, totals.subtotal
            ),
        ));
    }

    let expected_grand = totals.subtotal + totals.total_taxes - totals.global_discount;
    if totals.grand_total != expected_grand {
        errors.push(ValidationError::new(
            "totals.grand_total",
            format!(
                "grand total {} does not match subtotal {} + taxes {} - discount {}",
                totals.grand_total, totals.subtotal, totals.total_taxes, totals.global_discount
            ),
        ));
    }

    for (field, value) in [
        ("totals.subtotal", totals.subtotal),
        ("totals.total_taxes", totals.total_taxes),
        ("totals.global_discount", totals.global_discount),
        ("totals.grand_total", totals.grand_total),
    ] {
        if value.is_sign_negative() && !value.is_zero() {
            errors.push(ValidationError::new(field, "must not be negative"));
        }
    }

    errors
}

/// Fail with [`FacturaError::Invariant`] if the invoice's stored totals are inconsistent.
pub fn check_invariants(invoice: &Invoice) -> Result<(), FacturaError> {
    let errors = verify_totals(&invoice.lines, &invoice.totals);
    if errors.is_empty() {
        return Ok(());
    }
    let msg = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    error!(invoice = %invoice.id, number = %invoice.number, "monetary invariant violated: {msg}");
    Err(FacturaError::Invariant(msg))
}

/// Tax amounts of an invoice grouped per tax definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub tax_definition_id: TaxDefinitionId,
    pub code: String,
    pub name: String,
    pub percentage: Decimal,
    pub taxable_base: Decimal,
    pub amount: Decimal,
}

/// Group all line assessments by tax code. Output is sorted by code for deterministic documents.
pub fn tax_breakdown(lines: &[LineItem]) -> Vec<TaxBreakdown> {
    let mut groups: BTreeMap<&str, TaxBreakdown> = BTreeMap::new();

    for tax in lines.iter().flat_map(|l| l.taxes.iter()) {
        let entry = groups.entry(tax.tax_code.as_str()).or_insert_with(|| TaxBreakdown {
            tax_definition_id: tax.tax_definition_id,
            code: tax.tax_code.clone(),
            name: tax.tax_name.clone(),
            percentage: tax.percentage,
            taxable_base: Decimal::ZERO,
            amount: Decimal::ZERO,
        });
        entry.taxable_base += tax.base;
        entry.amount += tax.amount;
    }

    groups
        .into_values()
        .map(|mut b| {
            b.taxable_base = money::round_money(b.taxable_base);
            b.amount = money::round_money(b.amount);
            b
        })
        .collect()
}
