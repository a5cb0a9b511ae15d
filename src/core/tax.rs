use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::error::{FacturaError, ValidationError, into_result};
use super::money::{self, RATE_SCALE};
use super::types::*;

/// The tax definitions of one company.
///
/// Writes go through [`TaxCatalog::upsert`], which keeps "at most one default
/// per category" true in the same operation that changes a definition.
#[derive(Debug, Clone)]
pub struct TaxCatalog {
    company_id: CompanyId,
    definitions: Vec<TaxDefinition>,
}

impl TaxCatalog {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            definitions: Vec::new(),
        }
    }

    /// Build a catalog from existing definitions, applying the same checks as `upsert`.
    pub fn with_definitions(
        company_id: CompanyId,
        definitions: impl IntoIterator<Item = TaxDefinition>,
    ) -> Result<Self, FacturaError> {
        let mut catalog = Self::new(company_id);
        for def in definitions {
            catalog.upsert(def)?;
        }
        Ok(catalog)
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Insert or replace a definition.
    ///
    /// When the definition is default-applicable, any other default of the
    /// same category is unset.
    pub fn upsert(&mut self, definition: TaxDefinition) -> Result<(), FacturaError> {
        into_result(self.check(&definition))?;

        if definition.default_applicable {
            for other in self
                .definitions
                .iter_mut()
                .filter(|d| d.id != definition.id && d.category == definition.category)
            {
                if other.default_applicable {
                    debug!(
                        code = %other.code,
                        category = definition.category.code(),
                        "unsetting previous default tax"
                    );
                    other.default_applicable = false;
                }
            }
        }

        match self.definitions.iter_mut().find(|d| d.id == definition.id) {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
        Ok(())
    }

    /// Mark a definition inactive. Inactive definitions cannot be applied to new lines.
    pub fn deactivate(&mut self, id: TaxDefinitionId) -> Result<(), FacturaError> {
        let def = self
            .definitions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(FacturaError::UnknownTaxDefinition(id))?;
        def.active = false;
        def.default_applicable = false;
        Ok(())
    }

    pub fn get(&self, id: TaxDefinitionId) -> Option<&TaxDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Look up a definition that may be applied to a new line.
    pub fn applicable(&self, id: TaxDefinitionId) -> Result<&TaxDefinition, FacturaError> {
        self.definitions
            .iter()
            .find(|d| d.id == id && d.company_id == self.company_id && d.active)
            .ok_or(FacturaError::UnknownTaxDefinition(id))
    }

    /// Active default-applicable definitions, ordered by code.
    pub fn defaults(&self) -> Vec<&TaxDefinition> {
        let mut defaults: Vec<_> = self
            .definitions
            .iter()
            .filter(|d| d.active && d.default_applicable)
            .collect();
        defaults.sort_by(|a, b| a.code.cmp(&b.code));
        defaults
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxDefinition> {
        self.definitions.iter()
    }

    fn check(&self, def: &TaxDefinition) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if def.company_id != self.company_id {
            errors.push(ValidationError::new(
                "company_id",
                "tax definition belongs to another company",
            ));
        }
        if def.name.trim().len() < 2 {
            errors.push(ValidationError::new(
                "name",
                "name must have at least 2 characters",
            ));
        }
        if def.code.trim().is_empty() {
            errors.push(ValidationError::new("code", "code must not be empty"));
        } else if self
            .definitions
            .iter()
            .any(|d| d.id != def.id && d.code == def.code)
        {
            errors.push(ValidationError::new(
                "code",
                format!("code '{}' is already used by another tax", def.code),
            ));
        }
        if def.percentage < Decimal::ZERO || def.percentage > dec!(100) {
            errors.push(ValidationError::new(
                "percentage",
                format!("percentage must be between 0 and 100, got {}", def.percentage),
            ));
        } else if !money::has_scale_at_most(def.percentage, RATE_SCALE) {
            errors.push(ValidationError::new(
                "percentage",
                format!("percentage allows at most {RATE_SCALE} decimal places"),
            ));
        }

        errors
    }
}

/// Compute one assessment: `round(base * percentage / 100, 2)`.
pub fn assess(base: Decimal, definition: &TaxDefinition) -> Result<TaxAssessment, FacturaError> {
    Ok(TaxAssessment {
        tax_definition_id: definition.id,
        tax_code: definition.code.clone(),
        tax_name: definition.name.clone(),
        base,
        percentage: definition.percentage,
        amount: money::apply_rate(base, definition.percentage)?,
    })
}

/// Resolve the requested tax ids against the catalog and assess each on `base`.
///
/// Order of the result follows the order of `requested`. Duplicate ids are rejected.
pub fn resolve_taxes(
    base: Decimal,
    requested: &[TaxDefinitionId],
    catalog: &TaxCatalog,
) -> Result<Vec<TaxAssessment>, FacturaError> {
    money::ensure_non_negative(base, "taxable base")?;

    let mut assessments: Vec<TaxAssessment> = Vec::with_capacity(requested.len());
    for id in requested {
        if assessments.iter().any(|a| a.tax_definition_id == *id) {
            return Err(FacturaError::Validation(format!(
                "tax {id} is applied more than once"
            )));
        }
        let definition = catalog.applicable(*id)?;
        assessments.push(assess(base, definition)?);
    }
    Ok(assessments)
}
