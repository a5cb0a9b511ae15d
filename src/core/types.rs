use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type InvoiceId = Uuid;
pub type CompanyId = Uuid;
pub type CustomerId = Uuid;
pub type ProductId = Uuid;
pub type UserId = Uuid;
pub type TaxDefinitionId = Uuid;

/// A sellable transaction owned by one company.
///
/// Totals are written only by the aggregator (while `Draft`) and are frozen
/// once the invoice leaves `Draft`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Owning tenant.
    pub company_id: CompanyId,
    pub customer_id: CustomerId,
    /// User who created the invoice.
    pub issued_by: UserId,
    /// Sequential document number, unique per company (e.g. "FAC00000001").
    pub number: String,
    /// Series code printed on the document.
    pub series: String,
    pub document_type: DocumentType,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub state: InvoiceState,
    pub payment_method: PaymentMethod,
    /// Free text; void reasons are appended here.
    pub notes: Option<String>,
    /// Ordered line items with their tax assessments.
    pub lines: Vec<LineItem>,
    pub totals: Totals,
    /// Serialized fiscal document, attached on issuance.
    pub fiscal_document: Option<String>,
    /// Full authority response, attached on issuance.
    pub authority_response: Option<AuthorizationResult>,
    pub authorization_code: Option<String>,
    pub authorized_at: Option<DateTime<Utc>>,
    /// Write counter, bumped by the store on every accepted update.
    #[serde(default)]
    pub revision: u64,
}

/// Invoice-level totals produced by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line subtotals.
    pub subtotal: Decimal,
    /// Sum of line tax totals.
    pub total_taxes: Decimal,
    pub global_discount: Decimal,
    /// `subtotal + total_taxes - global_discount`.
    pub grand_total: Decimal,
}

impl Totals {
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            total_taxes: Decimal::ZERO,
            global_discount: Decimal::ZERO,
            grand_total: Decimal::ZERO,
        }
    }
}

/// One priced row of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// 1-based position within the invoice; fixes document order.
    pub sequence: u32,
    /// Product snapshot taken when the line was priced.
    pub product: Option<ProductRef>,
    /// Free-text note / description.
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount: Decimal,
    /// `round(quantity * unit_price) - discount`.
    pub subtotal: Decimal,
    /// Sum of the tax assessment amounts.
    pub tax_total: Decimal,
    /// `subtotal + tax_total`.
    pub line_total: Decimal,
    pub taxes: Vec<TaxAssessment>,
}

/// One tax applied to one line item.
///
/// Rate, code and name are copied from the definition at pricing time so
/// later edits to the definition do not alter historical invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub tax_definition_id: TaxDefinitionId,
    pub tax_code: String,
    pub tax_name: String,
    /// Taxable base (the line subtotal).
    pub base: Decimal,
    /// Percentage rate, 0–100.
    pub percentage: Decimal,
    /// `round(base * percentage / 100, 2)`.
    pub amount: Decimal,
}

/// A named tax rate available to a company (e.g. VAT 13%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxDefinition {
    pub id: TaxDefinitionId,
    pub company_id: CompanyId,
    pub name: String,
    /// Unique per company.
    pub code: String,
    pub percentage: Decimal,
    pub category: TaxCategory,
    /// At most one default-applicable definition per (company, category).
    pub default_applicable: bool,
    pub active: bool,
}

impl TaxDefinition {
    pub fn new(
        company_id: CompanyId,
        code: impl Into<String>,
        name: impl Into<String>,
        percentage: Decimal,
        category: TaxCategory,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.into(),
            code: code.into(),
            percentage,
            category,
            default_applicable: false,
            active: true,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.default_applicable = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCategory {
    /// Value added tax.
    Vat,
    /// Selective consumption / excise tax.
    Excise,
    Consumption,
    Municipal,
}

impl TaxCategory {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Vat => "vat",
            Self::Excise => "excise",
            Self::Consumption => "consumption",
            Self::Municipal => "municipal",
        }
    }
}

/// Fiscal document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    TaxCreditNote,
    CreditNote,
    DebitNote,
}

impl DocumentType {
    /// Two-digit DTE type code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invoice => "01",
            Self::TaxCreditNote => "03",
            Self::CreditNote => "05",
            Self::DebitNote => "06",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "01" => Some(Self::Invoice),
            "03" => Some(Self::TaxCreditNote),
            "05" => Some(Self::CreditNote),
            "06" => Some(Self::DebitNote),
            _ => None,
        }
    }
}

/// Lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Draft,
    Issued,
    Paid,
    Void,
    Expired,
}

impl InvoiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::Void => "void",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for InvoiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Check,
    Credit,
}

impl PaymentMethod {
    /// Operation condition: 1 = cash sale, 2 = on credit.
    pub fn operation_condition(&self) -> u8 {
        match self {
            Self::Credit => 2,
            _ => 1,
        }
    }

    /// Payment code printed in the fiscal summary.
    pub fn payment_code(&self) -> &'static str {
        match self {
            Self::Credit => "02",
            _ => "01",
        }
    }

    /// Credit term in days, if the sale is on credit.
    pub fn term_days(&self) -> Option<u32> {
        match self {
            Self::Credit => Some(30),
            _ => None,
        }
    }
}

/// The issuing company (tenant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    /// Tax identification number.
    pub nit: String,
    /// Establishment / registration code (NRC).
    pub establishment_code: Option<String>,
    pub activity_code: Option<String>,
    pub activity_description: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: String,
    pub legal_representative: String,
    pub tax_regime: TaxRegime,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    General,
    Simplified,
    SmallTaxpayer,
}

/// A customer of a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub company_id: CompanyId,
    pub code: String,
    pub kind: CustomerKind,
    pub name: String,
    pub last_name: Option<String>,
    /// Tax identification number.
    pub nit: Option<String>,
    /// National identity document.
    pub dui: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Sales to exempt customers are reported in the exempt bucket.
    pub tax_exempt: bool,
    pub active: bool,
}

impl Customer {
    /// Legal entities are named as registered; individuals as "name last_name".
    pub fn display_name(&self) -> String {
        match (self.kind, &self.last_name) {
            (CustomerKind::Individual, Some(last)) => {
                format!("{} {}", self.name, last).trim().to_string()
            }
            _ => self.name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerKind {
    Individual,
    LegalEntity,
}

/// A product in a company's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub company_id: CompanyId,
    pub code: String,
    pub name: String,
    /// Unit of measure code (e.g. "UNI").
    pub unit: String,
    pub active: bool,
}

impl Product {
    pub fn snapshot(&self) -> ProductRef {
        ProductRef {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            unit: self.unit.clone(),
        }
    }
}

/// Product fields captured on a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub unit: String,
}

/// Outcome of a submission to the tax authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub response_code: String,
    pub description: String,
    /// Present only when the document was accepted.
    pub authorization_code: Option<String>,
    pub authorized_at: Option<DateTime<Utc>>,
    /// Authority-assigned control number, if any.
    pub control_number: Option<String>,
    /// Authority environment the document was sent to ("test" / "production").
    pub environment: String,
    /// Exact bytes that were signed and transmitted.
    pub signed_payload: String,
    /// Hex-encoded content hash of `signed_payload`.
    pub content_hash: String,
    pub signature: String,
}

impl AuthorizationResult {
    /// Response code meaning "accepted".
    pub const ACCEPTED: &'static str = "200";

    pub fn is_accepted(&self) -> bool {
        self.response_code == Self::ACCEPTED && self.authorization_code.is_some()
    }
}
