//! # Catalog Crate
//!
//! This crate loads the CloudLab catalog: a CSV of lab exercises kept in an
//! S3 bucket, one row per lab.
//!
//! ## Main Components
//!
//! - **types**: `Record` (one lab, an ordered field map) and `Catalog`
//! - **parser**: header-delimited CSV into records
//! - **store**: where the bytes come from (S3, a custom endpoint, or a local dir)
//! - **loader**: the startup entry point that never fails
//! - **error**: error types for loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CatalogConfig, load_catalog_from_config};
//! use std::sync::Arc;
//!
//! let config = CatalogConfig::new("my-bucket", "us-east-1");
//! let catalog = Arc::new(load_catalog_from_config(&config));
//!
//! for lab in catalog.iter() {
//!     println!("{} -> {}", lab.label(), lab.get("Link").unwrap_or("-"));
//! }
//! ```

// Public modules
pub mod error;
pub mod loader;
pub mod parser;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CatalogLoadError, Result};
pub use loader::{
    CatalogConfig, DEFAULT_CATALOG_KEY, load_catalog, load_catalog_from_config, try_load_catalog,
};
pub use parser::parse_catalog;
pub use store::{HttpObjectStore, LocalFileStore, ObjectStore, S3ObjectStore};
pub use types::{Catalog, Record};
