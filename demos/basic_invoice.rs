use chrono::{TimeZone, Utc};
use facturador::core::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn main() {
    let company = Uuid::new_v4();

    // Tax catalog: IVA 13% as the default VAT, a 5% tourism contribution as an excise
    let vat = TaxDefinition::new(company, "IVA", "IVA 13%", dec!(13), TaxCategory::Vat).as_default();
    let tourism = TaxDefinition::new(company, "TUR", "Contribución turismo 5%", dec!(5), TaxCategory::Excise);
    let (vat_id, tourism_id) = (vat.id, tourism.id);
    let catalog = TaxCatalog::with_definitions(company, [vat, tourism]).unwrap();

    let mut numbers = DocumentNumberSequence::default();

    let invoice = InvoiceBuilder::new(company, Uuid::new_v4(), Uuid::new_v4())
        .number(numbers.next_number().unwrap())
        .issue_date(Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap())
        .payment_method(PaymentMethod::Credit)
        .add_line(
            LineInput::new(dec!(2), dec!(25.99))
                .description("Consultoría técnica")
                .tax(vat_id),
        )
        .add_line(
            LineInput::new(dec!(3), dec!(45.00))
                .discount(dec!(15.00))
                .description("Hospedaje (noches)")
                .tax(vat_id)
                .tax(tourism_id),
        )
        .global_discount(dec!(5.00))
        .build(&catalog)
        .unwrap();

    println!("Invoice {} ({})", invoice.number, invoice.state);
    println!("Due: {:?}", invoice.due_date);
    for line in &invoice.lines {
        println!(
            "  #{} {:<24} {:>6} x {:>8} - {:>6} = {:>8}  tax {:>6}  total {:>8}",
            line.sequence,
            line.description.as_deref().unwrap_or("-"),
            line.quantity,
            line.unit_price,
            line.discount,
            line.subtotal,
            line.tax_total,
            line.line_total,
        );
    }

    println!("\nTax breakdown:");
    for tax in tax_breakdown(&invoice.lines) {
        println!(
            "  {:<4} {:>6}% on {:>8} = {:>6}",
            tax.code, tax.percentage, tax.taxable_base, tax.amount
        );
    }

    let t = &invoice.totals;
    println!("\nSubtotal:        {:>10}", t.subtotal);
    println!("Taxes:           {:>10}", t.total_taxes);
    println!("Global discount: {:>10}", t.global_discount);
    println!("Grand total:     {:>10}", t.grand_total);
    assert!(check_invariants(&invoice).is_ok());
}
