//! Fiscal document generation and XML serialization.
//!
//! An aggregated [`Invoice`](crate::core::Invoice) plus its company and
//! customer is mapped onto a [`FiscalDocument`] (issuer, recipient, body,
//! summary, extension), which serializes deterministically to the
//! electronic tax document XML and parses back field for field.
//!
//! # Example
//!
//! ```no_run
//! use facturador::core::*;
//! use facturador::fiscal::{self, FiscalOptions};
//!
//! # fn run(invoice: Invoice, company: Company, customer: Customer) -> Result<(), FacturaError> {
//! let doc = fiscal::build_fiscal_document(&invoice, &company, &customer, &FiscalOptions::default())?;
//! let xml = fiscal::to_xml(&doc)?;
//! assert_eq!(fiscal::from_xml(&xml)?, doc);
//! # Ok(())
//! # }
//! ```

mod builder;
mod document;
mod options;
mod validate;
mod words;
pub(crate) mod xml;

pub use builder::build_fiscal_document;
pub use document::*;
pub use options::FiscalOptions;
pub use validate::{MIN_NIT_LEN, ensure_fiscal_data, validate_fiscal_data};
pub use words::amount_in_words;
pub use xml::{DTE_NAMESPACE, format_decimal, from_xml, to_xml};
