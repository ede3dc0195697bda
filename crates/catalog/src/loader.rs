//! Catalog Loader: fetch, decode and parse the lab catalog once at startup.
//!
//! Loading is best-effort. Recommendations only enrich the prompt, so a
//! catalog that cannot be fetched or parsed becomes an empty catalog rather
//! than a startup failure. [`try_load_catalog`] keeps the error for callers
//! (and tests) that want to know why.

use crate::error::Result;
use crate::parser;
use crate::store::{HttpObjectStore, LocalFileStore, ObjectStore, S3ObjectStore};
use crate::types::Catalog;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Default object key of the catalog CSV
pub const DEFAULT_CATALOG_KEY: &str = "CloudLabs.csv";

/// Where the catalog lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub bucket: String,
    pub key: String,
    pub region: String,
    /// Custom S3-compatible endpoint; `None` means AWS
    pub endpoint: Option<String>,
    /// Read `{local_dir}/{key}` from disk instead of the remote store
    pub local_dir: Option<PathBuf>,
}

impl CatalogConfig {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: DEFAULT_CATALOG_KEY.to_string(),
            region: region.into(),
            endpoint: None,
            local_dir: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    /// Build the store this configuration points at: local dir, else the
    /// custom endpoint (unsigned), else AWS S3 with the default credentials
    pub fn store(&self) -> Result<Box<dyn ObjectStore>> {
        if let Some(dir) = &self.local_dir {
            return Ok(Box::new(LocalFileStore::new(dir.clone())));
        }
        match &self.endpoint {
            Some(endpoint) => Ok(Box::new(HttpObjectStore::new(endpoint.clone()))),
            None => Ok(Box::new(S3ObjectStore::new(self.region.clone())?)),
        }
    }
}

/// Fetch and parse the catalog, reporting why it failed
///
/// One read from `store`, UTF-8 decode, then an all-or-nothing CSV parse.
pub fn try_load_catalog(store: &dyn ObjectStore, config: &CatalogConfig) -> Result<Catalog> {
    let bytes = store.get_object(&config.bucket, &config.key)?;
    let text = String::from_utf8(bytes)?;
    parser::parse_catalog(&text)
}

/// Load the catalog, degrading every failure to an empty catalog
pub fn load_catalog(store: &dyn ObjectStore, config: &CatalogConfig) -> Catalog {
    let location = store.describe(&config.bucket, &config.key);
    info!("Loading lab catalog from {}", location);

    match try_load_catalog(store, config) {
        Ok(catalog) => {
            info!("Loaded {} labs from {}", catalog.len(), location);
            catalog
        }
        Err(e) if e.is_access_error() => {
            warn!("Catalog access failed: {}", e);
            Catalog::new()
        }
        Err(e) => {
            error!("Unexpected error loading catalog from {}: {}", location, e);
            Catalog::new()
        }
    }
}

/// [`load_catalog`] against the store described by `config`
pub fn load_catalog_from_config(config: &CatalogConfig) -> Catalog {
    match config.store() {
        Ok(store) => load_catalog(store.as_ref(), config),
        Err(e) => {
            error!("Could not create catalog store for {}: {}", config.bucket, e);
            Catalog::new()
        }
    }
}
