//! Invoice service: persistence-backed create / issue / void / pay / expire.
//!
//! [`InvoiceService`] ties the pure core to an [`InvoiceStore`] and an
//! [`AuthorityGateway`](crate::authority::AuthorityGateway). Issuance of one
//! invoice is serialized: a per-invoice claim rejects a second concurrent
//! attempt, and the store only accepts the update if the invoice is still
//! `Draft`.

mod invoices;
mod store;

pub use invoices::{CreateInvoice, InvoiceService, NewLine};
pub use store::{InvoiceStore, IssuanceLease, MemoryStore};
