//! Core traits for the recommender.
//!
//! The recommender never looks at field names. Anything that can produce
//! one searchable text blob and a label for logging can be ranked.

use catalog::Record;
use thiserror::Error;

/// Failure to build a record's search text.
///
/// The recommender skips the record and keeps ranking the rest.
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Field {field} cannot be rendered as text: {reason}")]
    Unrenderable { field: String, reason: String },
}

/// Something the recommender can score against a query.
///
/// ## Design Note
/// - `Send + Sync` so a shared catalog can be ranked from any request task
/// - `search_text` is fallible so one bad row cannot abort a whole ranking
pub trait Searchable: Send + Sync {
    /// Concatenated text of every field value, in field order
    fn search_text(&self) -> Result<String, ScoreError>;

    /// Short label for diagnostics
    fn label(&self) -> &str;
}

impl Searchable for Record {
    fn search_text(&self) -> Result<String, ScoreError> {
        Ok(self.values().collect::<Vec<_>>().join(" "))
    }

    fn label(&self) -> &str {
        Record::label(self)
    }
}
