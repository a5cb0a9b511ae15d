//! Core invoice types, pricing, aggregation and lifecycle.
//!
//! Everything in this module is synchronous and side-effect free apart
//! from `tracing` events: line items are priced against a company's
//! [`TaxCatalog`], folded into [`Totals`], and moved through the
//! draft → issued → paid/void/expired state machine.

mod aggregate;
mod builder;
mod error;
mod lifecycle;
mod line;
pub mod money;
mod numbering;
mod stats;
mod tax;
mod types;

pub use aggregate::*;
pub use builder::*;
pub use error::*;
pub use lifecycle::*;
pub use line::*;
pub use numbering::*;
pub use stats::*;
pub use tax::*;
pub use types::*;
