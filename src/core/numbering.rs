use super::error::FacturaError;

/// Default invoice number prefix.
pub const DEFAULT_PREFIX: &str = "FAC";

/// Default zero-padding width, so the first number is "FAC00000001".
pub const DEFAULT_PADDING: usize = 8;

/// Gapless document number sequence for one company.
///
/// Generates numbers in the format `{prefix}{sequential}`, e.g.
/// "FAC00000001", "FAC00000002". The counter never goes backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNumberSequence {
    prefix: String,
    next_number: u64,
    zero_pad: usize,
}

impl Default for DocumentNumberSequence {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl DocumentNumberSequence {
    /// Create a new sequence starting at 1.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_number: 1,
            zero_pad: DEFAULT_PADDING,
        }
    }

    /// Create a sequence continuing from a given number.
    pub fn starting_at(prefix: impl Into<String>, next_number: u64) -> Result<Self, FacturaError> {
        if next_number == 0 {
            return Err(FacturaError::Numbering(
                "sequence must start at 1 or later".into(),
            ));
        }
        Ok(Self {
            prefix: prefix.into(),
            next_number,
            zero_pad: DEFAULT_PADDING,
        })
    }

    /// Resume after the highest number already issued with this prefix.
    ///
    /// Numbers with a different prefix or a non-numeric suffix are ignored.
    pub fn resume<'a>(
        prefix: impl Into<String>,
        issued: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let prefix = prefix.into();
        let last = issued
            .into_iter()
            .filter_map(|n| n.strip_prefix(prefix.as_str()))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            prefix,
            next_number: last + 1,
            zero_pad: DEFAULT_PADDING,
        }
    }

    /// Set zero-padding width (default: 8).
    pub fn with_padding(mut self, width: usize) -> Self {
        self.zero_pad = width;
        self
    }

    /// Generate the next document number.
    pub fn next_number(&mut self) -> Result<String, FacturaError> {
        let formatted = self.peek();
        self.next_number = self
            .next_number
            .checked_add(1)
            .ok_or_else(|| FacturaError::Numbering("sequence exhausted".into()))?;
        Ok(formatted)
    }

    /// Preview the next number without consuming it.
    pub fn peek(&self) -> String {
        format!(
            "{}{:0>width$}",
            self.prefix,
            self.next_number,
            width = self.zero_pad
        )
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get the next number that will be issued (without prefix/formatting).
    pub fn next_raw(&self) -> u64 {
        self.next_number
    }
}
