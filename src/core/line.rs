use rust_decimal::Decimal;

use super::error::{FacturaError, ValidationError, into_result};
use super::money::{self, MONEY_SCALE, QUANTITY_SCALE};
use super::tax::{TaxCatalog, resolve_taxes};
use super::types::*;

/// Caller-supplied inputs for one invoice line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    pub product: Option<ProductRef>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub taxes: Vec<TaxDefinitionId>,
}

impl LineInput {
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product: None,
            description: None,
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            taxes: Vec::new(),
        }
    }

    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn tax(mut self, id: TaxDefinitionId) -> Self {
        self.taxes.push(id);
        self
    }

    pub fn product(mut self, product: ProductRef) -> Self {
        self.product = Some(product);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Price one line: subtotal, tax assessments, tax total and line total.
///
/// Pure over its inputs and the catalog. `sequence` is the 1-based position
/// of the line within its invoice.
pub fn calculate_line(
    sequence: u32,
    input: &LineInput,
    catalog: &TaxCatalog,
) -> Result<LineItem, FacturaError> {
    into_result(validate_input(input, &format!("lines[{}]", sequence.saturating_sub(1))))?;

    let gross = money::round_money(money::checked_mul(
        input.quantity,
        input.unit_price,
        "line amount",
    )?);
    money::ensure_within_limit(gross, "line amount")?;
    let subtotal = money::round_money(money::checked_sub(gross, input.discount, "line subtotal")?);

    let taxes = resolve_taxes(subtotal, &input.taxes, catalog)?;
    let tax_total = money::round_money(money::sum(taxes.iter().map(|t| t.amount))?);
    let line_total = money::round_money(money::checked_add(subtotal, tax_total, "line total")?);

    Ok(LineItem {
        sequence,
        product: input.product.clone(),
        description: input
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        quantity: input.quantity,
        unit_price: input.unit_price,
        discount: input.discount,
        subtotal,
        tax_total,
        line_total,
        taxes,
    })
}

/// Price a list of lines, numbering them 1..=n in order.
pub fn calculate_lines(
    inputs: &[LineInput],
    catalog: &TaxCatalog,
) -> Result<Vec<LineItem>, FacturaError> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| calculate_line(i as u32 + 1, input, catalog))
        .collect()
}

fn validate_input(input: &LineInput, prefix: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if input.quantity <= Decimal::ZERO {
        errors.push(ValidationError::new(
            format!("{prefix}.quantity"),
            format!("quantity must be greater than zero, got {}", input.quantity),
        ));
    } else if !money::has_scale_at_most(input.quantity, QUANTITY_SCALE) {
        errors.push(ValidationError::new(
            format!("{prefix}.quantity"),
            format!("quantity allows at most {QUANTITY_SCALE} decimal places"),
        ));
    }

    if input.unit_price.is_sign_negative() && !input.unit_price.is_zero() {
        errors.push(ValidationError::new(
            format!("{prefix}.unit_price"),
            format!("unit price must not be negative, got {}", input.unit_price),
        ));
    } else if !money::has_scale_at_most(input.unit_price, MONEY_SCALE) {
        errors.push(ValidationError::new(
            format!("{prefix}.unit_price"),
            format!("unit price allows at most {MONEY_SCALE} decimal places"),
        ));
    }

    if input.discount.is_sign_negative() && !input.discount.is_zero() {
        errors.push(ValidationError::new(
            format!("{prefix}.discount"),
            format!("discount must not be negative, got {}", input.discount),
        ));
    } else if !money::has_scale_at_most(input.discount, MONEY_SCALE) {
        errors.push(ValidationError::new(
            format!("{prefix}.discount"),
            format!("discount allows at most {MONEY_SCALE} decimal places"),
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn catalog() -> (TaxCatalog, TaxDefinitionId) {
        let company = Uuid::from_u128(7);
        let vat = TaxDefinition::new(company, "IVA", "IVA 13%", dec!(13), TaxCategory::Vat);
        let id = vat.id;
        (TaxCatalog::with_definitions(company, [vat]).unwrap(), id)
    }

    #[test]
    fn two_units_at_25_99_with_vat() {
        let (catalog, vat) = catalog();
        let line = calculate_line(1, &LineInput::new(dec!(2), dec!(25.99)).tax(vat), &catalog)
            .unwrap();

        assert_eq!(line.subtotal, dec!(51.98));
        assert_eq!(line.tax_total, dec!(6.76));
        assert_eq!(line.line_total, dec!(58.74));
        assert_eq!(line.taxes[0].base, dec!(51.98));
    }

    #[test]
    fn discount_reduces_taxable_base() {
        let (catalog, vat) = catalog();
        let input = LineInput::new(dec!(3), dec!(10)).discount(dec!(5)).tax(vat);
        let line = calculate_line(1, &input, &catalog).unwrap();

        assert_eq!(line.subtotal, dec!(25.00));
        assert_eq!(line.tax_total, dec!(3.25));
        assert_eq!(line.line_total, dec!(28.25));
    }

    #[test]
    fn line_without_taxes() {
        let (catalog, _) = catalog();
        let line = calculate_line(1, &LineInput::new(dec!(1.5), dec!(0.33)), &catalog).unwrap();
        // 1.5 * 0.33 = 0.495 -> 0.50
        assert_eq!(line.subtotal, dec!(0.50));
        assert_eq!(line.tax_total, dec!(0));
        assert_eq!(line.line_total, dec!(0.50));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let (catalog, _) = catalog();
        for qty in [dec!(0), dec!(-1)] {
            let err = calculate_line(1, &LineInput::new(qty, dec!(10)), &catalog).unwrap_err();
            assert!(err.to_string().contains("lines[0].quantity"), "{err}");
        }
    }

    #[test]
    fn rejects_negative_price_and_discount() {
        let (catalog, _) = catalog();
        let err = calculate_line(
            2,
            &LineInput::new(dec!(1), dec!(-0.01)).discount(dec!(-1)),
            &catalog,
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("lines[1].unit_price"));
        assert!(err.contains("lines[1].discount"));
    }

    #[test]
    fn rejects_discount_above_gross() {
        let (catalog, _) = catalog();
        let input = LineInput::new(dec!(1), dec!(10)).discount(dec!(10.01));
        assert!(matches!(
            calculate_line(1, &input, &catalog),
            Err(FacturaError::Validation(_))
        ));
    }

    #[test]
    fn rejects_excess_precision() {
        let (catalog, _) = catalog();
        assert!(calculate_line(1, &LineInput::new(dec!(1), dec!(0.001)), &catalog).is_err());
        assert!(calculate_line(1, &LineInput::new(dec!(1.005), dec!(1)), &catalog).is_err());
    }

    #[test]
    fn unknown_tax_is_a_reference_error() {
        let (catalog, _) = catalog();
        let input = LineInput::new(dec!(1), dec!(1)).tax(Uuid::from_u128(42));
        let err = calculate_line(1, &input, &catalog).unwrap_err();
        assert_eq!(err.kind(), crate::core::ErrorKind::Reference);
    }

    #[test]
    fn lines_are_numbered_in_order() {
        let (catalog, _) = catalog();
        let lines = calculate_lines(
            &[
                LineInput::new(dec!(1), dec!(1)).description("first"),
                LineInput::new(dec!(1), dec!(2)).description("  "),
            ],
            &catalog,
        )
        .unwrap();
        assert_eq!(lines[0].sequence, 1);
        assert_eq!(lines[1].sequence, 2);
        assert_eq!(lines[0].description.as_deref(), Some("first"));
        assert_eq!(lines[1].description, None);
    }
}
