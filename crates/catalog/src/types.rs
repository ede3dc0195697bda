//! Core domain types for the lab catalog.
//!
//! A catalog row has no fixed schema: the loader keeps whatever columns the
//! CSV header names. The request handler expects `Name`, `Link` and
//! `Summary` to be among them, but nothing here enforces that.

use serde::ser::{Serialize, SerializeMap, Serializer};

// =============================================================================
// Type Aliases
// =============================================================================

/// The full ordered collection of labs, in source row order.
///
/// Built once at startup and shared read-only (usually behind an `Arc`).
pub type Catalog = Vec<Record>;

/// Fallback label used when a record has none of the label fields
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Fields consulted, in order, when naming a record in log output
pub const LABEL_FIELDS: [&str; 3] = ["topic", "name", "Name"];

// =============================================================================
// Record
// =============================================================================

/// One lab entry: an ordered mapping from field name to field value.
///
/// Field names are unique. Inserting an existing name replaces the value but
/// keeps the field's original position, so iteration order always follows
/// the first time each column was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Insert or replace a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style insert, handy for fixtures
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a field value by exact (case-sensitive) name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Walk a fallback chain of field names and return the first one present
    ///
    /// ```
    /// use catalog::Record;
    ///
    /// let lab = Record::new().with("name", "S3 Basics");
    /// assert_eq!(lab.get_first(&["topic", "name"]), Some("S3 Basics"));
    /// assert_eq!(lab.get_first(&["topic"]), None);
    /// ```
    pub fn get_first(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Label for diagnostics: `topic`, then `name`, then `Name`, else "Unknown"
    pub fn label(&self) -> &str {
        self.get_first(&LABEL_FIELDS).unwrap_or(UNKNOWN_LABEL)
    }

    /// Iterate over `(name, value)` pairs in field order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Iterate over values in field order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

// Serialized as a JSON object with keys in field order
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
