//! Simple test harness for the assistant request handler.
//!
//! Loads the catalog and connects to the agent runtime using the same
//! environment configuration as a deployment, then answers one prompt
//! (taken from the command line) and prints the JSON response.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use agent_client::GrpcAgentClient;
use server::{AssistantHandler, AssistantSettings, InvokePayload, RequestContext, ServerConfig};

const DEFAULT_PROMPT: &str = "How do I get started with serverless compute on AWS?";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting CloudLab Assistant");
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    info!(
        "Region: {}, Model: {}, Memory ID: {}",
        config.region,
        config.model_id,
        config.memory_id.as_deref().unwrap_or("None")
    );

    let catalog = server::load_catalog_blocking(&config).await?;

    let agent = GrpcAgentClient::connect(config.agent_addr.clone()).await?;
    let handler = AssistantHandler::new(
        catalog,
        Arc::new(agent),
        AssistantSettings::from(&config),
    );

    let prompt = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = if prompt.trim().is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        prompt
    };

    let response = handler
        .invoke(InvokePayload::new(prompt), RequestContext::default())
        .await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
