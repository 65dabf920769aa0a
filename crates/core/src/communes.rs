use std::collections::BTreeSet;

/// Commune codes defining the spatial scope. Empty means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommuneAllowlist {
    codes: BTreeSet<String>,
}

impl CommuneAllowlist {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Self { codes }
    }

    /// No codes loaded; loaders keep every record.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whitespace around `code` is ignored.
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code.trim())
    }
}
