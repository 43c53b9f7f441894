use cohost_core::error::ValidationError;

/// The fixed set of avatar animations the presentation layer knows.
#[derive(Clone, Debug)]
pub struct AnimationCatalog {
    names: Vec<String>,
}

impl AnimationCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.dedup();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Canonical catalog name for `raw`, compared trimmed and case-insensitively.
    pub fn validate(&self, raw: &str) -> Result<String, ValidationError> {
        let wanted = raw.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.');
        self.names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| ValidationError::UnknownAnimation { value: raw.to_string() })
    }
}
