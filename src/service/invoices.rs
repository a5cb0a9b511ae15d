use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};

use super::store::InvoiceStore;
use crate::authority::{AuthorityGateway, StatusResponse};
use crate::core::{
    AuthorizationResult, Company, CompanyId, Customer, CustomerId, DateRange, DocumentType,
    FacturaError, Invoice, InvoiceBuilder, InvoiceId, InvoiceState, InvoiceStats, LineInput,
    PaymentMethod, ProductId, TaxCatalog, TaxDefinition, TaxDefinitionId, UserId,
    check_invariants,
};
use crate::fiscal::{FiscalOptions, build_fiscal_document};

/// One requested line of a new or repriced invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLine {
    pub product_id: Option<ProductId>,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount: Decimal,
    /// `None` applies the company's default taxes.
    pub taxes: Option<Vec<TaxDefinitionId>>,
}

impl NewLine {
    pub fn product(product_id: ProductId, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product_id: Some(product_id),
            description: None,
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            taxes: None,
        }
    }

    /// A free-text line without a catalog product.
    pub fn service(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            product_id: None,
            description: Some(description.into()),
            quantity,
            unit_price,
            discount: Decimal::ZERO,
            taxes: None,
        }
    }

    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn taxes(mut self, taxes: impl IntoIterator<Item = TaxDefinitionId>) -> Self {
        self.taxes = Some(taxes.into_iter().collect());
        self
    }

    pub fn untaxed(mut self) -> Self {
        self.taxes = Some(Vec::new());
        self
    }
}

/// Request to create a draft invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInvoice {
    pub company_id: CompanyId,
    pub customer_id: CustomerId,
    pub issued_by: UserId,
    pub document_type: DocumentType,
    pub payment_method: PaymentMethod,
    pub issue_date: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub global_discount: Decimal,
    pub lines: Vec<NewLine>,
}

impl CreateInvoice {
    pub fn new(company_id: CompanyId, customer_id: CustomerId, issued_by: UserId) -> Self {
        Self {
            company_id,
            customer_id,
            issued_by,
            document_type: DocumentType::Invoice,
            payment_method: PaymentMethod::Cash,
            issue_date: None,
            due_date: None,
            notes: None,
            global_discount: Decimal::ZERO,
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: NewLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn global_discount(mut self, discount: Decimal) -> Self {
        self.global_discount = discount;
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn issue_date(mut self, date: DateTime<Utc>) -> Self {
        self.issue_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Slack added to the longest possible submission when leasing a draft.
const LEASE_MARGIN: Duration = Duration::from_secs(30);

/// Invoice operations over a store and an authority gateway.
///
/// Every write goes through a compare-and-swap on the stored state and
/// revision, so two callers can never both move the same invoice out of a
/// given state. Issuance holds a store-level lease for the whole submission,
/// which also excludes services sharing the store.
pub struct InvoiceService<S> {
    store: Arc<S>,
    gateway: AuthorityGateway,
    options: FiscalOptions,
    issuance_lease: Duration,
}

impl<S: InvoiceStore> InvoiceService<S> {
    pub fn new(store: Arc<S>, gateway: AuthorityGateway, options: FiscalOptions) -> Self {
        let config = gateway.config();
        let issuance_lease = config.retry.max_elapsed(config.timeout()) + LEASE_MARGIN;
        Self {
            store,
            gateway,
            options,
            issuance_lease,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Price and persist a new draft invoice.
    ///
    /// References (company, customer, products, taxes) are resolved within
    /// the company; nothing is stored unless every line prices cleanly.
    #[instrument(skip_all, fields(company = %request.company_id, customer = %request.customer_id))]
    pub async fn create_invoice(&self, request: CreateInvoice) -> Result<Invoice, FacturaError> {
        let company = self.company(request.company_id).await?;
        if !company.active {
            return Err(FacturaError::Validation(format!(
                "company {} is inactive",
                company.id
            )));
        }
        let customer = self.customer(company.id, request.customer_id).await?;
        if !customer.active {
            return Err(FacturaError::Validation(format!(
                "customer {} is inactive",
                customer.id
            )));
        }

        let catalog = self.store.tax_catalog(company.id).await?;
        let lines = self.resolve_lines(company.id, &request.lines, &catalog).await?;

        let mut builder = InvoiceBuilder::new(company.id, customer.id, request.issued_by)
            .number(self.store.peek_number(company.id).await?)
            .document_type(request.document_type)
            .payment_method(request.payment_method)
            .global_discount(request.global_discount)
            .lines(lines);
        if let Some(date) = request.issue_date {
            builder = builder.issue_date(date);
        }
        if let Some(date) = request.due_date {
            builder = builder.due_date(date);
        }
        if let Some(notes) = request.notes {
            builder = builder.notes(notes);
        }
        let mut invoice = builder.build(&catalog)?;

        // The number is consumed only once the invoice is known to be valid.
        invoice.number = self.store.next_number(company.id).await?;
        self.store.insert_invoice(&invoice).await?;

        info!(
            invoice = %invoice.id,
            number = %invoice.number,
            grand_total = %invoice.totals.grand_total,
            "invoice created"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
    ) -> Result<Invoice, FacturaError> {
        self.store
            .find_invoice(company_id, id)
            .await?
            .ok_or_else(|| FacturaError::not_found("invoice", id))
    }

    /// `Draft -> Issued`: build the fiscal document, submit it and persist
    /// the authorization.
    ///
    /// On any failure the stored invoice stays `Draft` with no fiscal
    /// document or authorization data attached. While the submission runs,
    /// other issuances and edits of the same invoice fail with
    /// `IssuanceInProgress`.
    #[instrument(skip(self))]
    pub async fn issue_invoice(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
    ) -> Result<(Invoice, AuthorizationResult), FacturaError> {
        let (lease, invoice) = self
            .store
            .claim_issuance(company_id, id, self.issuance_lease)
            .await?;

        let (mut issued, authorization) = match self.authorize(invoice).await {
            Ok(authorized) => authorized,
            Err(e) => {
                if let Err(release) = self.store.release_issuance(&lease).await {
                    warn!(error = %release, "failed to release issuance lease");
                }
                return Err(e);
            }
        };

        issued.revision = self
            .store
            .complete_issuance(&lease, &issued)
            .await
            .inspect_err(|e| {
                error!(
                    error = %e,
                    authorization = ?authorization.authorization_code,
                    "authorized invoice could not be stored"
                );
            })?;
        Ok((issued, authorization))
    }

    async fn authorize(
        &self,
        invoice: Invoice,
    ) -> Result<(Invoice, AuthorizationResult), FacturaError> {
        if invoice.lines.is_empty() {
            return Err(FacturaError::EmptyInvoice);
        }
        check_invariants(&invoice)?;

        let company = self.company(invoice.company_id).await?;
        let customer = self.customer(invoice.company_id, invoice.customer_id).await?;
        let document = build_fiscal_document(&invoice, &company, &customer, &self.options)?;
        info!(number = %invoice.number, items = document.body.len(), "submitting fiscal document");

        let authorization = self.gateway.submit(&document).await?;

        let mut issued = invoice;
        issued.issue(authorization.signed_payload.clone(), authorization.clone())?;
        Ok((issued, authorization))
    }

    /// `Issued -> Void`, appending the reason to the notes.
    #[instrument(skip(self))]
    pub async fn void_invoice(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
        reason: &str,
    ) -> Result<Invoice, FacturaError> {
        let mut invoice = self.get_invoice(company_id, id).await?;
        let from = invoice.state;
        invoice.void(reason)?;
        invoice.revision = self.store.update_invoice(&invoice, from).await?;
        Ok(invoice)
    }

    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
        payment_date: NaiveDate,
    ) -> Result<Invoice, FacturaError> {
        let mut invoice = self.get_invoice(company_id, id).await?;
        let from = invoice.state;
        invoice.mark_paid(payment_date)?;
        invoice.revision = self.store.update_invoice(&invoice, from).await?;
        Ok(invoice)
    }

    /// Move every issued invoice whose due date is before `today` to `Expired`.
    ///
    /// Invoices changed concurrently are skipped. Returns the expired invoices.
    #[instrument(skip(self))]
    pub async fn expire_overdue(
        &self,
        company_id: CompanyId,
        today: NaiveDate,
    ) -> Result<Vec<Invoice>, FacturaError> {
        let mut expired = Vec::new();
        for mut invoice in self.store.list_invoices(company_id).await? {
            if !invoice.is_overdue(today) {
                continue;
            }
            invoice.expire(today)?;
            match self.store.update_invoice(&invoice, InvoiceState::Issued).await {
                Ok(revision) => {
                    invoice.revision = revision;
                    expired.push(invoice);
                }
                Err(FacturaError::Conflict(reason)) => {
                    warn!(invoice = %invoice.id, %reason, "skipping invoice changed concurrently");
                }
                Err(e) => return Err(e),
            }
        }
        info!(count = expired.len(), "overdue invoices expired");
        Ok(expired)
    }

    /// Replace the lines and global discount of a draft and recompute its totals.
    ///
    /// Fails with `IssuanceInProgress` while the draft is being issued and with
    /// `Conflict` if it changed since it was read.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reprice_draft(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
        lines: &[NewLine],
        global_discount: Decimal,
    ) -> Result<Invoice, FacturaError> {
        let mut invoice = self.get_invoice(company_id, id).await?;
        let catalog = self.store.tax_catalog(company_id).await?;
        let inputs = self.resolve_lines(company_id, lines, &catalog).await?;
        invoice.reprice(&inputs, global_discount, &catalog)?;
        invoice.revision = self
            .store
            .update_invoice(&invoice, InvoiceState::Draft)
            .await?;
        info!(invoice = %invoice.id, grand_total = %invoice.totals.grand_total, "draft repriced");
        Ok(invoice)
    }

    pub async fn invoice_stats(
        &self,
        company_id: CompanyId,
        range: DateRange,
    ) -> Result<InvoiceStats, FacturaError> {
        let invoices = self.store.list_invoices(company_id).await?;
        Ok(InvoiceStats::collect(&invoices, range))
    }

    /// Ask the authority for the current status of an issued invoice.
    #[instrument(skip(self))]
    pub async fn authorization_status(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
    ) -> Result<StatusResponse, FacturaError> {
        let invoice = self.get_invoice(company_id, id).await?;
        let code = invoice.authorization_code.as_deref().ok_or_else(|| {
            FacturaError::Validation(format!("invoice {} has no authorization code", invoice.number))
        })?;
        self.gateway.query_status(code).await
    }

    /// Insert or replace a tax definition of an existing company.
    #[instrument(skip_all, fields(company = %definition.company_id, code = %definition.code))]
    pub async fn upsert_tax_definition(
        &self,
        definition: TaxDefinition,
    ) -> Result<(), FacturaError> {
        self.company(definition.company_id).await?;
        self.store.save_tax_definition(definition).await
    }

    async fn company(&self, id: CompanyId) -> Result<Company, FacturaError> {
        self.store
            .find_company(id)
            .await?
            .ok_or_else(|| FacturaError::not_found("company", id))
    }

    async fn customer(
        &self,
        company_id: CompanyId,
        id: CustomerId,
    ) -> Result<Customer, FacturaError> {
        self.store
            .find_customer(company_id, id)
            .await?
            .ok_or_else(|| FacturaError::not_found("customer", id))
    }

    async fn resolve_lines(
        &self,
        company_id: CompanyId,
        lines: &[NewLine],
        catalog: &TaxCatalog,
    ) -> Result<Vec<LineInput>, FacturaError> {
        let defaults: Vec<TaxDefinitionId> = catalog.defaults().iter().map(|d| d.id).collect();
        let mut inputs = Vec::with_capacity(lines.len());

        for line in lines {
            let mut input = LineInput::new(line.quantity, line.unit_price).discount(line.discount);
            if let Some(product_id) = line.product_id {
                let product = self
                    .store
                    .find_product(company_id, product_id)
                    .await?
                    .filter(|p| p.active)
                    .ok_or_else(|| FacturaError::not_found("product", product_id))?;
                input = input.product(product.snapshot());
            }
            if let Some(description) = &line.description {
                input = input.description(description.clone());
            }
            input.taxes = line.taxes.clone().unwrap_or_else(|| defaults.clone());
            inputs.push(input);
        }
        Ok(inputs)
    }
}
