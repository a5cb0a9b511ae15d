use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money;
use super::types::{Invoice, InvoiceState};

/// Issue-date window for statistics. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}

/// Per-company sales summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceStats {
    pub total: u64,
    pub drafts: u64,
    pub issued: u64,
    pub paid: u64,
    pub voided: u64,
    pub expired: u64,
    /// Sum of grand totals over all counted invoices.
    pub total_sales: Decimal,
    /// Sum of grand totals of invoices currently `Issued`.
    pub issued_sales: Decimal,
    /// `total_sales / total`, zero when there are no invoices.
    pub average_sale: Decimal,
}

impl InvoiceStats {
    /// Summarize the invoices whose issue date falls in `range`.
    pub fn collect<'a>(invoices: impl IntoIterator<Item = &'a Invoice>, range: DateRange) -> Self {
        let mut stats = Self {
            total: 0,
            drafts: 0,
            issued: 0,
            paid: 0,
            voided: 0,
            expired: 0,
            total_sales: Decimal::ZERO,
            issued_sales: Decimal::ZERO,
            average_sale: Decimal::ZERO,
        };

        for invoice in invoices.into_iter().filter(|i| range.contains(i.issue_date)) {
            stats.total += 1;
            stats.total_sales += invoice.totals.grand_total;
            match invoice.state {
                InvoiceState::Draft => stats.drafts += 1,
                InvoiceState::Issued => {
                    stats.issued += 1;
                    stats.issued_sales += invoice.totals.grand_total;
                }
                InvoiceState::Paid => stats.paid += 1,
                InvoiceState::Void => stats.voided += 1,
                InvoiceState::Expired => stats.expired += 1,
            }
        }

        stats.total_sales = money::round_money(stats.total_sales);
        stats.issued_sales = money::round_money(stats.issued_sales);
        stats.average_sale = if stats.total == 0 {
            money::round_money(Decimal::ZERO)
        } else {
            money::round_money(stats.total_sales / Decimal::from(stats.total))
        };
        stats
    }
}
