//! `Format:` headers and the CSV-with-tail data rows they describe.

use std::collections::HashMap;

/// Ordered field names parsed from a section's `Format:` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    fields: Vec<String>,
}

/// Field name → value, interpreted against a [`FormatSpec`].
pub type FieldMap = HashMap<String, String>;

impl FormatSpec {
    /// Parse a `Format:` line into its ordered field names.
    pub fn parse(line: &str) -> Option<FormatSpec> {
        let (_, rest) = line.split_once(':')?;
        let fields = rest.split(',').map(|f| f.trim().to_string()).collect();
        Some(FormatSpec { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Split a data row against this spec. The row is cut on the first `:`
    /// and then into at most `len()` comma-separated values, so the final
    /// field (typically `Text`) keeps any embedded commas. Missing fields
    /// default to the empty string.
    pub fn split_row(&self, line: &str) -> Option<FieldMap> {
        let (_, rest) = line.split_once(':')?;
        let mut values = rest.trim().splitn(self.fields.len(), ',');
        let mut map = FieldMap::with_capacity(self.fields.len());
        for name in &self.fields {
            let value = values.next().unwrap_or("");
            map.insert(name.clone(), value.trim().to_string());
        }
        Some(map)
    }
}
