use serde::Deserialize;

/// Document-level defaults for fiscal document generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FiscalOptions {
    /// Authority environment written into the document ("test" / "production").
    pub environment: String,
    /// ISO 4217 code of the document currency.
    pub currency_code: String,
    /// Currency unit name used for the amount in words, singular.
    pub currency_singular: String,
    /// Currency unit name used for the amount in words, plural.
    pub currency_plural: String,
    /// Department code used when an address carries none.
    pub department: String,
    /// Municipality code used when an address carries none.
    pub municipality: String,
    /// Economic activity code used when the party has none.
    pub default_activity_code: String,
    /// Registration number used when the issuer has no establishment code.
    pub default_registration: String,
    pub establishment_type: String,
    pub version: u32,
    pub model_type: u8,
    pub operation_type: u8,
}

impl Default for FiscalOptions {
    fn default() -> Self {
        Self {
            environment: "test".into(),
            currency_code: "USD".into(),
            currency_singular: "dollar".into(),
            currency_plural: "dollars".into(),
            department: "06".into(),
            municipality: "01".into(),
            default_activity_code: "00000".into(),
            default_registration: "00000000".into(),
            establishment_type: "01".into(),
            version: 1,
            model_type: 1,
            operation_type: 1,
        }
    }
}

impl FiscalOptions {
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn currency(
        mut self,
        code: impl Into<String>,
        singular: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        self.currency_code = code.into();
        self.currency_singular = singular.into();
        self.currency_plural = plural.into();
        self
    }
}
