use chrono::Timelike;
use rust_decimal::Decimal;
use tracing::debug;

use super::document::*;
use super::options::FiscalOptions;
use super::validate::ensure_fiscal_data;
use super::words::amount_in_words;
use crate::core::{Company, Customer, FacturaError, Invoice, money, tax_breakdown};

const DEFAULT_ITEM_CODE: &str = "PROD001";
const DEFAULT_ITEM_DESCRIPTION: &str = "Producto/Servicio";
const DEFAULT_UNIT: &str = "UNI";

/// Map an aggregated invoice and its related entities onto the fiscal document.
///
/// Pure: the same inputs always produce the same document. Fails with
/// `IncompleteFiscalData` when the company, customer or lines lack required data.
pub fn build_fiscal_document(
    invoice: &Invoice,
    company: &Company,
    customer: &Customer,
    options: &FiscalOptions,
) -> Result<FiscalDocument, FacturaError> {
    ensure_fiscal_data(invoice, company, customer)?;

    let issued_at = invoice.issue_date;
    let issue_time = issued_at
        .time()
        .with_nanosecond(0)
        .ok_or_else(|| FacturaError::Invariant("issue time out of range".into()))?;

    let general = GeneralData {
        version: options.version,
        environment: text(&options.environment),
        document_type: invoice.document_type.code().to_string(),
        generation_code: text(&invoice.number),
        model_type: options.model_type,
        operation_type: options.operation_type,
        issue_date: issued_at.date_naive(),
        issue_time,
        currency: text(&options.currency_code),
    };

    let issuer = Issuer {
        nit: company.nit.trim().to_string(),
        nrc: non_empty(&company.establishment_code)
            .unwrap_or_else(|| text(&options.default_registration)),
        name: company.name.trim().to_string(),
        activity_code: non_empty(&company.activity_code)
            .unwrap_or_else(|| text(&options.default_activity_code)),
        activity_description: company.activity_description.trim().to_string(),
        trade_name: company.name.trim().to_string(),
        establishment_type: text(&options.establishment_type),
        address: address(&company.address, options),
        phone: non_empty(&company.phone),
        email: company.email.trim().to_string(),
    };

    let recipient = Recipient {
        nit: non_empty(&customer.nit),
        dui: non_empty(&customer.dui),
        name: customer.display_name(),
        activity_code: text(&options.default_activity_code),
        address: address(&customer.address, options),
        phone: non_empty(&customer.phone),
        email: non_empty(&customer.email),
    };

    let exempt = customer.tax_exempt;
    let mut lines: Vec<_> = invoice.lines.iter().collect();
    lines.sort_by_key(|l| l.sequence);

    let body: Vec<BodyItem> = lines
        .iter()
        .map(|line| {
            let (code, name, unit) = match &line.product {
                Some(p) => (
                    p.code.trim().to_string(),
                    p.name.trim().to_string(),
                    p.unit.trim().to_string(),
                ),
                None => (
                    DEFAULT_ITEM_CODE.to_string(),
                    DEFAULT_ITEM_DESCRIPTION.to_string(),
                    DEFAULT_UNIT.to_string(),
                ),
            };
            let description = match (&line.product, &line.description) {
                (None, Some(description)) => text(description),
                _ => name,
            };
            BodyItem {
                number: line.sequence,
                code,
                description,
                quantity: line.quantity,
                unit,
                unit_price: line.unit_price,
                discount: money::round_money(line.discount),
                non_subject_sale: money::round_money(Decimal::ZERO),
                exempt_sale: if exempt { line.subtotal } else { money::round_money(Decimal::ZERO) },
                taxable_sale: if exempt { money::round_money(Decimal::ZERO) } else { line.subtotal },
                taxes: line.taxes.iter().map(|t| text(&t.tax_code)).collect(),
            }
        })
        .collect();

    let totals = invoice.totals;
    let zero = money::round_money(Decimal::ZERO);
    let summary = Summary {
        total_non_subject: zero,
        total_exempt: if exempt { totals.subtotal } else { zero },
        total_taxable: if exempt { zero } else { totals.subtotal },
        sales_subtotal: totals.subtotal,
        taxable_discount: totals.global_discount,
        discount_percentage: money::percentage_of(totals.global_discount, totals.subtotal),
        total_discount: totals.global_discount,
        taxes: tax_breakdown(&invoice.lines)
            .into_iter()
            .map(|b| SummaryTax {
                code: text(&b.code),
                description: text(&b.name),
                amount: b.amount,
            })
            .collect(),
        subtotal: money::checked_sub(totals.subtotal, totals.global_discount, "summary subtotal")?,
        total_operation: totals.grand_total,
        total_to_pay: totals.grand_total,
        total_in_words: amount_in_words(
            totals.grand_total,
            options.currency_singular.trim(),
            options.currency_plural.trim(),
        ),
        total_taxes: totals.total_taxes,
        operation_condition: invoice.payment_method.operation_condition(),
        payments: vec![Payment {
            code: invoice.payment_method.payment_code().to_string(),
            amount: totals.grand_total,
            reference: text(&invoice.number),
            term: invoice.payment_method.term_days(),
            period: invoice.payment_method.term_days(),
        }],
    };

    let extension = Extension {
        delivered_by_name: customer.display_name(),
        delivered_by_document: non_empty(&customer.nit)
            .or_else(|| non_empty(&customer.dui))
            .unwrap_or_default(),
        received_by_name: company.legal_representative.trim().to_string(),
        received_by_document: company.nit.trim().to_string(),
        observations: invoice
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from),
    };

    debug!(
        invoice = %invoice.id,
        number = %invoice.number,
        items = body.len(),
        "fiscal document built"
    );

    Ok(FiscalDocument {
        general,
        issuer,
        recipient,
        body,
        summary,
        extension,
    })
}

fn address(complement: &str, options: &FiscalOptions) -> FiscalAddress {
    FiscalAddress {
        department: text(&options.department),
        municipality: text(&options.municipality),
        complement: text(complement),
    }
}

/// Every string goes into the document trimmed, as the XML reader trims text.
fn text(value: &str) -> String {
    value.trim().to_string()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
