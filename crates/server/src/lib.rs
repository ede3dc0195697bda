//! Server crate for the CloudLab Assistant.
//!
//! This crate contains the configuration and the request handler that
//! coordinates the catalog, the recommender and the agent runtime.

pub mod config;
pub mod handler;

pub use config::{ConfigError, ServerConfig};
pub use handler::{
    AssistantHandler, AssistantSettings, InvokePayload, InvokeResponse, RequestContext,
    build_context,
};

use std::sync::Arc;

use anyhow::{Context, Result};
use catalog::Catalog;
use tracing::info;

/// Load the catalog on a blocking thread.
///
/// Never fails on catalog problems (those give an empty catalog); the only
/// error is the loader thread itself dying.
pub async fn load_catalog_blocking(config: &ServerConfig) -> Result<Arc<Catalog>> {
    let catalog_config = config.catalog.clone();
    let catalog = tokio::task::spawn_blocking(move || {
        catalog::load_catalog_from_config(&catalog_config)
    })
    .await
    .context("Catalog loader task panicked")?;

    info!("Labs loaded: {}", catalog.len());
    Ok(Arc::new(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_catalog_blocking_from_local_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("CloudLabs.csv"),
            "Name,Link,Summary\nS3 Basics,https://labs.example/s3,storage\n",
        )
        .unwrap();

        let config = ServerConfig::from_lookup(|name| match name {
            "CATALOG_LOCAL_DIR" => Some(dir.path().display().to_string()),
            _ => None,
        })
        .unwrap();

        let catalog = load_catalog_blocking(&config).await.unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_load_catalog_blocking_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::from_lookup(|name| match name {
            "CATALOG_LOCAL_DIR" => Some(dir.path().display().to_string()),
            _ => None,
        })
        .unwrap();

        let catalog = load_catalog_blocking(&config).await.unwrap();
        assert!(catalog.is_empty());
    }
}
