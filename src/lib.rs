//! # facturador
//!
//! Multi-tenant invoicing core: tax-exact line and invoice totals, the
//! draft → issued → paid/void/expired lifecycle, electronic fiscal documents
//! (DTE) and their submission to the tax authority.
//!
//! All monetary values use [`rust_decimal::Decimal`] with two fractional
//! digits and half-up rounding, never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use facturador::core::*;
//! use rust_decimal_macros::dec;
//! use uuid::Uuid;
//!
//! let company = Uuid::new_v4();
//! let vat = TaxDefinition::new(company, "IVA", "IVA 13%", dec!(13), TaxCategory::Vat);
//! let vat_id = vat.id;
//! let catalog = TaxCatalog::with_definitions(company, [vat]).unwrap();
//!
//! let invoice = InvoiceBuilder::new(company, Uuid::new_v4(), Uuid::new_v4())
//!     .number("FAC00000001")
//!     .add_line(LineInput::new(dec!(2), dec!(25.99)).description("Consultoría").tax(vat_id))
//!     .add_line(LineInput::new(dec!(2), dec!(25.99)).description("Consultoría").tax(vat_id))
//!     .global_discount(dec!(10.00))
//!     .build(&catalog)
//!     .unwrap();
//!
//! assert_eq!(invoice.totals.subtotal, dec!(103.96));
//! assert_eq!(invoice.totals.total_taxes, dec!(13.52));
//! assert_eq!(invoice.totals.grand_total, dec!(107.48));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Data model, tax catalog, line pricing, aggregation, lifecycle, numbering, statistics |
//! | `fiscal` | Fiscal document model, amount in words, XML serialization & parsing |
//! | `authority` | Signing, retrying submission gateway, simulated authority, configuration |
//! | `http` | reqwest transport for a real authority endpoint |
//! | `service` | Store trait, in-memory store, invoice service |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "fiscal")]
pub mod fiscal;

#[cfg(feature = "authority")]
pub mod authority;

#[cfg(feature = "service")]
pub mod service;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
