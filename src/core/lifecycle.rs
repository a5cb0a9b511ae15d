//! Invoice lifecycle state machine.
//!
//! ```text
//! Draft ──▶ Issued ──▶ Paid
//!              │
//!              ├──▶ Void
//!              │
//!              └──▶ Expired
//! ```
//!
//! `Paid`, `Void` and `Expired` are terminal. No transition re-enters
//! `Draft`. A failed transition leaves the invoice untouched.

use chrono::{NaiveDate, Utc};
use tracing::info;

use super::aggregate::check_invariants;
use super::error::{FacturaError, SubmissionFailure};
use super::types::*;

impl InvoiceState {
    /// Whether no further lifecycle transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Void | Self::Expired)
    }

    /// Whether lines, discount and totals may still change.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether `self -> to` is an edge of the state machine.
    pub fn can_transition_to(&self, to: InvoiceState) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Issued)
                | (Self::Issued, Self::Paid)
                | (Self::Issued, Self::Void)
                | (Self::Issued, Self::Expired)
        )
    }
}

/// Check that `from -> to` is allowed.
///
/// Voiding an already-voided invoice is reported as [`FacturaError::AlreadyVoided`]
/// rather than a generic transition error.
pub fn check_transition(from: InvoiceState, to: InvoiceState) -> Result<(), FacturaError> {
    if from == InvoiceState::Void && to == InvoiceState::Void {
        return Err(FacturaError::AlreadyVoided);
    }
    if !from.can_transition_to(to) {
        return Err(FacturaError::InvalidStateTransition { from, to });
    }
    Ok(())
}

impl Invoice {
    /// Complete `Draft -> Issued` with the generated fiscal document and an
    /// accepted authority response.
    ///
    /// A rejected response fails with `AuthoritySubmissionFailed` and leaves
    /// the invoice in `Draft` with nothing attached.
    pub fn issue(
        &mut self,
        fiscal_document: String,
        authorization: AuthorizationResult,
    ) -> Result<(), FacturaError> {
        check_transition(self.state, InvoiceState::Issued)?;
        if self.lines.is_empty() {
            return Err(FacturaError::EmptyInvoice);
        }
        check_invariants(self)?;
        if !authorization.is_accepted() {
            return Err(FacturaError::AuthoritySubmissionFailed(
                SubmissionFailure::Rejected {
                    response_code: authorization.response_code,
                    description: authorization.description,
                },
            ));
        }

        self.authorization_code = authorization.authorization_code.clone();
        self.authorized_at = Some(authorization.authorized_at.unwrap_or_else(Utc::now));
        self.fiscal_document = Some(fiscal_document);
        self.authority_response = Some(authorization);
        self.state = InvoiceState::Issued;
        info!(invoice = %self.id, number = %self.number, "invoice issued");
        Ok(())
    }

    /// `Issued -> Void`. The reason is appended to the notes; totals are kept.
    pub fn void(&mut self, reason: &str) -> Result<(), FacturaError> {
        check_transition(self.state, InvoiceState::Void)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(FacturaError::Validation("void reason must not be empty".into()));
        }

        let entry = format!("Voided: {reason}");
        self.notes = Some(match self.notes.take().filter(|n| !n.trim().is_empty()) {
            Some(existing) => format!("{existing}\n{entry}"),
            None => entry,
        });
        self.state = InvoiceState::Void;
        info!(invoice = %self.id, number = %self.number, reason, "invoice voided");
        Ok(())
    }

    /// `Issued -> Paid` once full payment is confirmed.
    pub fn mark_paid(&mut self, payment_date: NaiveDate) -> Result<(), FacturaError> {
        check_transition(self.state, InvoiceState::Paid)?;
        if payment_date < self.issue_date.date_naive() {
            return Err(FacturaError::Validation(format!(
                "payment date {payment_date} is before issue date {}",
                self.issue_date.date_naive()
            )));
        }
        self.payment_date = Some(payment_date);
        self.state = InvoiceState::Paid;
        info!(invoice = %self.id, number = %self.number, %payment_date, "invoice paid");
        Ok(())
    }

    /// `Issued -> Expired` for an invoice past its due date.
    pub fn expire(&mut self, today: NaiveDate) -> Result<(), FacturaError> {
        check_transition(self.state, InvoiceState::Expired)?;
        if !self.is_overdue(today) {
            return Err(FacturaError::Validation(format!(
                "invoice {} is not past its due date",
                self.number
            )));
        }
        self.state = InvoiceState::Expired;
        info!(invoice = %self.id, number = %self.number, "invoice expired");
        Ok(())
    }

    /// An issued invoice whose due date lies before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.state == InvoiceState::Issued && self.due_date.is_some_and(|due| due < today)
    }
}
