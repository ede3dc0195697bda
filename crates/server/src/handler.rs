//! # Assistant Request Handler
//!
//! Handles one `invoke` call end to end:
//! 1. Open a memory session (only when a memory id is configured)
//! 2. Provision the code-interpreter tool
//! 3. Recommend labs for the prompt and format them as context
//! 4. Run the prompt + context through the model
//! 5. Return `{"response": ...}`, or `{"error": ...}` if the model call failed
//!
//! Steps 1-3 are optional enrichment: if any of them fails the request
//! carries on without it. Only a failed model call turns into an error
//! payload, and even that is a value, never an `Err` or a panic.

use std::sync::Arc;
use std::time::Instant;

use agent_client::{
    AgentClient, CodeInterpreter, ConverseInput, MemorySession, MemorySessionConfig,
    RetrievalSettings,
};
use anyhow::{Context, Result};
use catalog::{Catalog, Record};
use recommender::Recommender;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;

/// Actor every conversation is stored under
pub const DEFAULT_ACTOR_ID: &str = "cloudlab-user";

/// Session used when the caller does not supply one
pub const DEFAULT_SESSION_ID: &str = "default";

pub const SYSTEM_PROMPT: &str = "You are CloudLab Assistant, an AWS learning guide.\n\
When possible, recommend relevant CloudLabs as Markdown links.";

/// Characters of the reply echoed to the log
const PREVIEW_CHARS: usize = 150;

/// Incoming request body: `{"prompt": "..."}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvokePayload {
    #[serde(default)]
    pub prompt: String,
}

impl InvokePayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Per-request metadata supplied by the hosting runtime
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub session_id: Option<String>,
}

impl RequestContext {
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
        }
    }

    fn session_id(&self) -> &str {
        self.session_id.as_deref().unwrap_or(DEFAULT_SESSION_ID)
    }
}

/// Response body: `{"response": "..."}` or `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokeResponse {
    Response(String),
    Error(String),
}

/// Static settings for the handler
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantSettings {
    pub model_id: String,
    pub region: String,
    pub memory_id: Option<String>,
    pub actor_id: String,
    pub system_prompt: String,
    pub retrieval: RetrievalSettings,
}

impl AssistantSettings {
    pub fn new(model_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            region: region.into(),
            memory_id: None,
            actor_id: DEFAULT_ACTOR_ID.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            retrieval: knowledge_retrieval(DEFAULT_ACTOR_ID),
        }
    }

    pub fn with_memory_id(mut self, memory_id: impl Into<String>) -> Self {
        self.memory_id = Some(memory_id.into());
        self
    }
}

impl From<&ServerConfig> for AssistantSettings {
    fn from(config: &ServerConfig) -> Self {
        let settings = AssistantSettings::new(config.model_id.clone(), config.region.clone());
        match &config.memory_id {
            Some(id) => settings.with_memory_id(id.clone()),
            None => settings,
        }
    }
}

/// Long-term memory namespace holding what the actor has learned so far
fn knowledge_retrieval(actor_id: &str) -> RetrievalSettings {
    RetrievalSettings {
        namespace: format!("/users/{}/aws-knowledge", actor_id),
        top_k: 3,
        relevance_score: 0.5,
    }
}

/// Formats recommended labs as Markdown bullet links for the prompt.
///
/// One line per lab: `- [{Name}]({Link})({Summary})`. A missing field
/// renders as `None` so the model can still see the lab.
pub fn build_context(labs: &[&Record]) -> String {
    labs.iter()
        .map(|lab| {
            format!(
                "- [{}]({})({})\n",
                lab.get("Name").unwrap_or("None"),
                lab.get("Link").unwrap_or("None"),
                lab.get("Summary").unwrap_or("None"),
            )
        })
        .collect()
}

/// Coordinates catalog, recommender and agent runtime for each request
#[derive(Clone)]
pub struct AssistantHandler {
    catalog: Arc<Catalog>,
    agent: Arc<dyn AgentClient>,
    recommender: Recommender,
    settings: Arc<AssistantSettings>,
}

impl AssistantHandler {
    /// # Arguments
    /// * `catalog` - Loaded once at startup; may be empty
    /// * `agent` - Agent runtime client
    /// * `settings` - Model, region, memory and prompt settings
    pub fn new(
        catalog: Arc<Catalog>,
        agent: Arc<dyn AgentClient>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            catalog,
            agent,
            recommender: Recommender::new(),
            settings: Arc::new(settings),
        }
    }

    /// Main entry point: answer one prompt
    #[instrument(skip_all, fields(session_id = context.session_id()))]
    pub async fn invoke(&self, payload: InvokePayload, context: RequestContext) -> InvokeResponse {
        let start_time = Instant::now();
        info!("Invoking CloudLab Assistant");
        debug!("User prompt: {}", payload.prompt);

        match self.answer(&payload.prompt, context.session_id()).await {
            Ok(text) => {
                info!(
                    "Agent completed in {:.2?}; response preview: {}",
                    start_time.elapsed(),
                    preview(&text)
                );
                InvokeResponse::Response(text)
            }
            Err(e) => {
                error!("invoke failed: {:#}", e);
                InvokeResponse::Error(format!("{:#}", e))
            }
        }
    }

    async fn answer(&self, prompt: &str, session_id: &str) -> Result<String> {
        let memory_session = self.open_memory_session(session_id).await;
        let code_interpreter = self.open_code_interpreter(session_id).await;

        let labs = self.recommender.recommend(prompt, self.catalog.as_slice());
        let lab_context = build_context(&labs);

        let input = ConverseInput {
            model_id: self.settings.model_id.clone(),
            system_prompt: self.settings.system_prompt.clone(),
            prompt: format!("{}\n\n{}", prompt, lab_context),
            memory_session,
            tools: code_interpreter.into_iter().map(|c| c.tool_name).collect(),
        };

        info!("Running agent query");
        self.agent
            .converse(input)
            .await
            .context("Agent invocation failed")
    }

    /// Memory is opt-in; a failure here only costs conversation history
    async fn open_memory_session(&self, session_id: &str) -> Option<MemorySession> {
        let memory_id = self.settings.memory_id.as_ref()?;

        info!("Initializing memory session");
        let config = MemorySessionConfig {
            memory_id: memory_id.clone(),
            session_id: session_id.to_string(),
            actor_id: self.settings.actor_id.clone(),
            region: self.settings.region.clone(),
            retrieval: vec![self.settings.retrieval.clone()],
        };

        match self.agent.start_memory_session(&config).await {
            Ok(session) => {
                info!("Memory session ready");
                Some(session)
            }
            Err(e) => {
                warn!("Memory setup failed: {}", e);
                None
            }
        }
    }

    async fn open_code_interpreter(&self, session_id: &str) -> Option<CodeInterpreter> {
        info!("Initializing code interpreter");
        match self
            .agent
            .start_code_interpreter(&self.settings.region, session_id)
            .await
        {
            Ok(interpreter) => {
                info!("Code interpreter ready");
                Some(interpreter)
            }
            Err(e) => {
                warn!("Code interpreter failed: {}", e);
                None
            }
        }
    }
}

/// First few characters of `text`, on a char boundary
fn preview(text: &str) -> &str {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
