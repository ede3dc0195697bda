use catalog::{CatalogConfig, DEFAULT_CATALOG_KEY};
use std::path::PathBuf;

/// Model used when `MODEL_ID` is not set
pub const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_AGENT_ADDR: &str = "http://localhost:50051";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub catalog: CatalogConfig,
    pub region: String,
    pub memory_id: Option<String>,
    pub model_id: String,
    pub agent_addr: String,
}

impl ServerConfig {
    /// Loads configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    ///
    /// | variable                       | default                  |
    /// |--------------------------------|--------------------------|
    /// | `CATALOG_BUCKET` / `S3_BUCKET` | required unless local dir |
    /// | `CATALOG_KEY` / `S3_KEY`       | `CloudLabs.csv`          |
    /// | `CATALOG_ENDPOINT`             | AWS S3                   |
    /// | `CATALOG_LOCAL_DIR`            | unset                    |
    /// | `AWS_REGION`                   | `us-east-1`              |
    /// | `BEDROCK_AGENTCORE_MEMORY_ID`  | unset (no memory)        |
    /// | `MODEL_ID`                     | Claude 3.7 Sonnet        |
    /// | `AGENT_SERVICE_ADDR`           | `http://localhost:50051` |
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let region = var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        let local_dir = var("CATALOG_LOCAL_DIR").map(PathBuf::from);
        let bucket = match var("CATALOG_BUCKET").or_else(|| var("S3_BUCKET")) {
            Some(bucket) => bucket,
            None if local_dir.is_some() => "local".to_string(),
            None => return Err(ConfigError::MissingVar("CATALOG_BUCKET".to_string())),
        };
        let key = var("CATALOG_KEY")
            .or_else(|| var("S3_KEY"))
            .unwrap_or_else(|| DEFAULT_CATALOG_KEY.to_string());

        let mut catalog = CatalogConfig::new(bucket, region.clone()).with_key(key);
        if let Some(endpoint) = var("CATALOG_ENDPOINT") {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::InvalidValue(
                    "CATALOG_ENDPOINT".to_string(),
                    format!("'{}' is not an http(s) URL", endpoint),
                ));
            }
            catalog = catalog.with_endpoint(endpoint);
        }
        if let Some(dir) = local_dir {
            catalog = catalog.with_local_dir(dir);
        }

        let agent_addr =
            var("AGENT_SERVICE_ADDR").unwrap_or_else(|| DEFAULT_AGENT_ADDR.to_string());

        Ok(Self {
            catalog,
            region,
            memory_id: var("BEDROCK_AGENTCORE_MEMORY_ID"),
            model_id: var("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            agent_addr,
        })
    }
}
