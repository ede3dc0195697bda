//! Error types for the catalog crate.
//!
//! These never escape [`crate::load_catalog`]: the loader maps every variant
//! to an empty catalog. They exist so the fallible path
//! ([`crate::try_load_catalog`]) and its tests can tell failures apart.

use thiserror::Error;

/// Errors that can occur while fetching, decoding or parsing the lab catalog
#[derive(Error, Debug)]
pub enum CatalogLoadError {
    /// The store refused the read (HTTP 403, file permissions)
    #[error("Access denied to {location}")]
    AccessDenied { location: String },

    /// The object does not exist in the store
    #[error("Object not found: {location}")]
    NotFound { location: String },

    /// Any other failure talking to the remote store
    #[error("Remote store error for {location}: {reason}")]
    Remote { location: String, reason: String },

    /// Local I/O error while reading a catalog file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The fetched bytes are not valid UTF-8
    #[error("Catalog is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Malformed tabular text (e.g. an unterminated quote)
    #[error("Parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A row does not have the same number of columns as the header
    #[error("Expected {expected} fields but found {found} in line {line}")]
    FieldCountMismatch {
        expected: usize,
        found: usize,
        line: usize,
    },
}

impl CatalogLoadError {
    /// True for the permission / missing-object class of remote errors.
    ///
    /// The loader logs these as warnings; everything else is unexpected.
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            CatalogLoadError::AccessDenied { .. } | CatalogLoadError::NotFound { .. }
        )
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogLoadError>;
