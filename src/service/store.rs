use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::core::{
    Company, CompanyId, Customer, CustomerId, DEFAULT_PREFIX, DocumentNumberSequence,
    FacturaError, Invoice, InvoiceId, InvoiceState, Product, ProductId, TaxCatalog, TaxDefinition,
    check_transition,
};

/// Exclusive right to issue one invoice, held until completed, released or expired.
///
/// While a lease is active no other writer can change the invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceLease {
    pub token: Uuid,
    pub company_id: CompanyId,
    pub invoice_id: InvoiceId,
    pub expires_at: DateTime<Utc>,
}

/// Persistence consumed by [`InvoiceService`](super::InvoiceService).
///
/// Every lookup is scoped to a company. Writes of an invoice are whole-record:
/// the invoice, its lines and their tax assessments become visible together
/// or not at all.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert a new invoice. Fails with `Conflict` if the id or the number is taken.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), FacturaError>;

    async fn find_invoice(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, FacturaError>;

    /// Replace a stored invoice, provided it is still in `expected` state and
    /// at the revision it was read at. Returns the new revision.
    ///
    /// Fails with `Conflict` when another writer changed the invoice first and
    /// with `IssuanceInProgress` while an issuance lease is held on it.
    async fn update_invoice(
        &self,
        invoice: &Invoice,
        expected: InvoiceState,
    ) -> Result<u64, FacturaError>;

    /// Lease a draft for issuance and return it as of the claim.
    ///
    /// Fails with `IssuanceInProgress` if an unexpired lease is held and with
    /// `InvalidStateTransition` if the invoice cannot be issued.
    async fn claim_issuance(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
        ttl: Duration,
    ) -> Result<(IssuanceLease, Invoice), FacturaError>;

    /// Store the issued invoice and drop the lease. Returns the new revision.
    ///
    /// Fails with `Conflict` if the lease was lost or the draft changed since the claim.
    async fn complete_issuance(
        &self,
        lease: &IssuanceLease,
        invoice: &Invoice,
    ) -> Result<u64, FacturaError>;

    /// Drop a lease without changing the invoice. A lease taken over by
    /// another claim is left alone.
    async fn release_issuance(&self, lease: &IssuanceLease) -> Result<(), FacturaError>;

    async fn list_invoices(&self, company_id: CompanyId) -> Result<Vec<Invoice>, FacturaError>;

    /// The number the next call to [`next_number`](Self::next_number) will return.
    async fn peek_number(&self, company_id: CompanyId) -> Result<String, FacturaError>;

    /// Consume and return the next document number of a company.
    async fn next_number(&self, company_id: CompanyId) -> Result<String, FacturaError>;

    /// All tax definitions of a company, active or not.
    async fn tax_catalog(&self, company_id: CompanyId) -> Result<TaxCatalog, FacturaError>;

    /// Insert or replace a tax definition, unsetting any other default of the
    /// same category in the same write.
    async fn save_tax_definition(&self, definition: TaxDefinition) -> Result<(), FacturaError>;

    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>, FacturaError>;

    async fn find_customer(
        &self,
        company_id: CompanyId,
        id: CustomerId,
    ) -> Result<Option<Customer>, FacturaError>;

    async fn find_product(
        &self,
        company_id: CompanyId,
        id: ProductId,
    ) -> Result<Option<Product>, FacturaError>;
}

#[derive(Debug, Default)]
struct Tables {
    companies: HashMap<CompanyId, Company>,
    customers: HashMap<CustomerId, Customer>,
    products: HashMap<ProductId, Product>,
    catalogs: HashMap<CompanyId, TaxCatalog>,
    invoices: HashMap<InvoiceId, Invoice>,
    sequences: HashMap<CompanyId, DocumentNumberSequence>,
    leases: HashMap<InvoiceId, IssuanceLease>,
}

impl Tables {
    fn active_lease(&self, id: InvoiceId, now: DateTime<Utc>) -> Option<&IssuanceLease> {
        self.leases.get(&id).filter(|lease| lease.expires_at > now)
    }

    fn invoice_mut(
        &mut self,
        company_id: CompanyId,
        id: InvoiceId,
    ) -> Result<&mut Invoice, FacturaError> {
        self.invoices
            .get_mut(&id)
            .filter(|i| i.company_id == company_id)
            .ok_or_else(|| FacturaError::not_found("invoice", id))
    }

    fn sequence(&mut self, company_id: CompanyId) -> &mut DocumentNumberSequence {
        let invoices = &self.invoices;
        self.sequences.entry(company_id).or_insert_with(|| {
            DocumentNumberSequence::resume(
                DEFAULT_PREFIX,
                invoices
                    .values()
                    .filter(|i| i.company_id == company_id)
                    .map(|i| i.number.as_str()),
            )
        })
    }
}

/// [`InvoiceStore`] kept in process memory. Each operation holds a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_company(&self, company: Company) {
        self.tables.write().await.companies.insert(company.id, company);
    }

    pub async fn insert_customer(&self, customer: Customer) {
        self.tables.write().await.customers.insert(customer.id, customer);
    }

    pub async fn insert_product(&self, product: Product) {
        self.tables.write().await.products.insert(product.id, product);
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), FacturaError> {
        let mut tables = self.tables.write().await;
        if tables.invoices.contains_key(&invoice.id) {
            return Err(FacturaError::Conflict(format!(
                "invoice {} already exists",
                invoice.id
            )));
        }
        if tables
            .invoices
            .values()
            .any(|i| i.company_id == invoice.company_id && i.number == invoice.number)
        {
            return Err(FacturaError::Conflict(format!(
                "invoice number {} is already used",
                invoice.number
            )));
        }
        tables.invoices.insert(invoice.id, invoice.clone());
        debug!(invoice = %invoice.id, lines = invoice.lines.len(), "invoice stored");
        Ok(())
    }

    async fn find_invoice(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, FacturaError> {
        let tables = self.tables.read().await;
        Ok(tables
            .invoices
            .get(&id)
            .filter(|i| i.company_id == company_id)
            .cloned())
    }

    async fn update_invoice(
        &self,
        invoice: &Invoice,
        expected: InvoiceState,
    ) -> Result<u64, FacturaError> {
        let mut tables = self.tables.write().await;
        if tables.active_lease(invoice.id, Utc::now()).is_some() {
            return Err(FacturaError::IssuanceInProgress(invoice.id));
        }
        let stored = tables.invoice_mut(invoice.company_id, invoice.id)?;
        if stored.state != expected {
            return Err(FacturaError::Conflict(format!(
                "invoice {} is {}, expected {}",
                invoice.id, stored.state, expected
            )));
        }
        if stored.revision != invoice.revision {
            return Err(FacturaError::Conflict(format!(
                "invoice {} is at revision {}, update was read at {}",
                invoice.id, stored.revision, invoice.revision
            )));
        }
        let revision = stored.revision + 1;
        *stored = Invoice {
            revision,
            ..invoice.clone()
        };
        Ok(revision)
    }

    async fn claim_issuance(
        &self,
        company_id: CompanyId,
        id: InvoiceId,
        ttl: Duration,
    ) -> Result<(IssuanceLease, Invoice), FacturaError> {
        let now = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| FacturaError::Config(format!("issuance lease of {ttl:?} is out of range")))?;

        let mut tables = self.tables.write().await;
        let invoice = tables.invoice_mut(company_id, id)?.clone();
        if tables.active_lease(id, now).is_some() {
            return Err(FacturaError::IssuanceInProgress(id));
        }
        check_transition(invoice.state, InvoiceState::Issued)?;

        let lease = IssuanceLease {
            token: Uuid::new_v4(),
            company_id,
            invoice_id: id,
            expires_at,
        };
        tables.leases.insert(id, lease.clone());
        debug!(invoice = %id, %expires_at, "issuance lease taken");
        Ok((lease, invoice))
    }

    async fn complete_issuance(
        &self,
        lease: &IssuanceLease,
        invoice: &Invoice,
    ) -> Result<u64, FacturaError> {
        let mut tables = self.tables.write().await;
        if tables
            .leases
            .get(&lease.invoice_id)
            .is_none_or(|held| held.token != lease.token)
        {
            return Err(FacturaError::Conflict(format!(
                "issuance lease on invoice {} was lost",
                lease.invoice_id
            )));
        }
        let stored = tables.invoice_mut(lease.company_id, lease.invoice_id)?;
        if stored.state != InvoiceState::Draft || stored.revision != invoice.revision {
            return Err(FacturaError::Conflict(format!(
                "invoice {} changed during issuance",
                lease.invoice_id
            )));
        }
        let revision = stored.revision + 1;
        *stored = Invoice {
            revision,
            ..invoice.clone()
        };
        tables.leases.remove(&lease.invoice_id);
        Ok(revision)
    }

    async fn release_issuance(&self, lease: &IssuanceLease) -> Result<(), FacturaError> {
        let mut tables = self.tables.write().await;
        if tables
            .leases
            .get(&lease.invoice_id)
            .is_some_and(|held| held.token == lease.token)
        {
            tables.leases.remove(&lease.invoice_id);
            debug!(invoice = %lease.invoice_id, "issuance lease released");
        }
        Ok(())
    }

    async fn list_invoices(&self, company_id: CompanyId) -> Result<Vec<Invoice>, FacturaError> {
        let tables = self.tables.read().await;
        let mut invoices: Vec<_> = tables
            .invoices
            .values()
            .filter(|i| i.company_id == company_id)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(invoices)
    }

    async fn peek_number(&self, company_id: CompanyId) -> Result<String, FacturaError> {
        Ok(self.tables.write().await.sequence(company_id).peek())
    }

    async fn next_number(&self, company_id: CompanyId) -> Result<String, FacturaError> {
        self.tables.write().await.sequence(company_id).next_number()
    }

    async fn tax_catalog(&self, company_id: CompanyId) -> Result<TaxCatalog, FacturaError> {
        let tables = self.tables.read().await;
        Ok(tables
            .catalogs
            .get(&company_id)
            .cloned()
            .unwrap_or_else(|| TaxCatalog::new(company_id)))
    }

    async fn save_tax_definition(&self, definition: TaxDefinition) -> Result<(), FacturaError> {
        let mut tables = self.tables.write().await;
        let company_id = definition.company_id;
        let mut catalog = tables
            .catalogs
            .get(&company_id)
            .cloned()
            .unwrap_or_else(|| TaxCatalog::new(company_id));
        catalog.upsert(definition)?;
        tables.catalogs.insert(company_id, catalog);
        Ok(())
    }

    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>, FacturaError> {
        Ok(self.tables.read().await.companies.get(&id).cloned())
    }

    async fn find_customer(
        &self,
        company_id: CompanyId,
        id: CustomerId,
    ) -> Result<Option<Customer>, FacturaError> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .get(&id)
            .filter(|c| c.company_id == company_id)
            .cloned())
    }

    async fn find_product(
        &self,
        company_id: CompanyId,
        id: ProductId,
    ) -> Result<Option<Product>, FacturaError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .get(&id)
            .filter(|p| p.company_id == company_id)
            .cloned())
    }
}
