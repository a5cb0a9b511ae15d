use chrono::{TimeZone, Utc};
use facturador::core::*;
use facturador::fiscal::{self, FiscalOptions};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn main() {
    let company = Company {
        id: Uuid::new_v4(),
        name: "Distribuidora Cuscatlán S.A. de C.V.".into(),
        nit: "0614-150390-101-5".into(),
        establishment_code: Some("123456-7".into()),
        activity_code: Some("46900".into()),
        activity_description: "Venta al por mayor de otros productos".into(),
        address: "Calle Arce #123, San Salvador".into(),
        phone: Some("2222-3333".into()),
        email: "dte@cuscatlan.sv".into(),
        legal_representative: "Ana Martínez".into(),
        tax_regime: TaxRegime::General,
        active: true,
    };
    let customer = Customer {
        id: Uuid::new_v4(),
        company_id: company.id,
        code: "CLI001".into(),
        kind: CustomerKind::Individual,
        name: "Juan".into(),
        last_name: Some("Pérez".into()),
        nit: None,
        dui: Some("04567890-1".into()),
        address: "Colonia Escalón, San Salvador".into(),
        phone: None,
        email: Some("juan.perez@correo.sv".into()),
        tax_exempt: false,
        active: true,
    };

    let vat = TaxDefinition::new(company.id, "20", "IVA 13%", dec!(13), TaxCategory::Vat);
    let vat_id = vat.id;
    let catalog = TaxCatalog::with_definitions(company.id, [vat]).unwrap();

    let invoice = InvoiceBuilder::new(company.id, customer.id, Uuid::new_v4())
        .number("FAC00000001")
        .issue_date(Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap())
        .notes("Entrega en bodega central")
        .add_line(LineInput::new(dec!(2), dec!(25.99)).description("Café molido 500g").tax(vat_id))
        .add_line(LineInput::new(dec!(2), dec!(25.99)).description("Azúcar 1kg").tax(vat_id))
        .global_discount(dec!(10.00))
        .build(&catalog)
        .unwrap();

    // Check first, so every problem is listed at once
    let problems = fiscal::validate_fiscal_data(&invoice, &company, &customer);
    if !problems.is_empty() {
        for p in &problems {
            eprintln!("  {p}");
        }
        return;
    }

    let doc = fiscal::build_fiscal_document(&invoice, &company, &customer, &FiscalOptions::default())
        .unwrap();
    println!("Total in words: {}", doc.summary.total_in_words);

    let xml = fiscal::to_xml(&doc).unwrap();
    println!("{xml}");

    let parsed = fiscal::from_xml(&xml).unwrap();
    assert_eq!(parsed, doc);
    println!("\nRound-trip OK ({} bytes)", xml.len());
}
