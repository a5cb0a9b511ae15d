use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical structured representation of an invoice as submitted to the
/// tax authority.
///
/// Field order here is the serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalDocument {
    pub general: GeneralData,
    pub issuer: Issuer,
    pub recipient: Recipient,
    /// Items in line sequence order.
    pub body: Vec<BodyItem>,
    pub summary: Summary,
    pub extension: Extension,
}

/// Document identification (`DatosGenerales`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralData {
    pub version: u32,
    pub environment: String,
    /// Two-digit document type code.
    pub document_type: String,
    /// Invoice number; unique per issuer.
    pub generation_code: String,
    pub model_type: u8,
    pub operation_type: u8,
    pub issue_date: NaiveDate,
    pub issue_time: NaiveTime,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalAddress {
    pub department: String,
    pub municipality: String,
    /// Street address text.
    pub complement: String,
}

/// Issuing company (`DatosEmisor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    pub nit: String,
    pub nrc: String,
    pub name: String,
    pub activity_code: String,
    pub activity_description: String,
    pub trade_name: String,
    pub establishment_type: String,
    pub address: FiscalAddress,
    pub phone: Option<String>,
    pub email: String,
}

/// Customer (`DatosReceptor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub nit: Option<String>,
    /// National identity document.
    pub dui: Option<String>,
    pub name: String,
    pub activity_code: String,
    pub address: FiscalAddress,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One item of `CuerpoDocumento`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyItem {
    /// 1-based item number.
    pub number: u32,
    pub code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub non_subject_sale: Decimal,
    pub exempt_sale: Decimal,
    pub taxable_sale: Decimal,
    /// Codes of the taxes applied to the item.
    pub taxes: Vec<String>,
}

/// Document totals (`Resumen`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_non_subject: Decimal,
    pub total_exempt: Decimal,
    pub total_taxable: Decimal,
    pub sales_subtotal: Decimal,
    pub taxable_discount: Decimal,
    /// Global discount as a percentage of the sales subtotal.
    pub discount_percentage: Decimal,
    pub total_discount: Decimal,
    pub taxes: Vec<SummaryTax>,
    /// Sales subtotal minus discounts.
    pub subtotal: Decimal,
    pub total_operation: Decimal,
    pub total_to_pay: Decimal,
    pub total_in_words: String,
    pub total_taxes: Decimal,
    /// 1 = cash sale, 2 = on credit.
    pub operation_condition: u8,
    pub payments: Vec<Payment>,
}

/// Per-tax total of the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTax {
    pub code: String,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub code: String,
    pub amount: Decimal,
    pub reference: String,
    /// Credit term in days.
    pub term: Option<u32>,
    pub period: Option<u32>,
}

/// Delivery and reception metadata (`Extension`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub delivered_by_name: String,
    pub delivered_by_document: String,
    pub received_by_name: String,
    pub received_by_document: String,
    pub observations: Option<String>,
}
