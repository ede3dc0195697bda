//! Client for the hosted agent runtime.
//!
//! The runtime is a gRPC service (see `proto/agent.proto`) that owns
//! everything heavy: the model, conversation memory, and the code-interpreter
//! sandbox. This crate handles:
//! - Connection management
//! - Converting between Rust types and protobuf messages
//! - Extracting the reply text from a model turn
//!
//! Callers depend on the [`AgentClient`] trait so the request handler can be
//! tested against an in-process fake.

use async_trait::async_trait;
use thiserror::Error;
use tonic::transport::Channel;
use tracing::{debug, error, info};

// Include the generated protobuf code
pub mod agentcore {
    tonic::include_proto!("agentcore");
}

use agentcore::{
    agent_runtime_client::AgentRuntimeClient, CodeInterpreterRequest, ConverseRequest,
    ConverseResponse, MemorySessionRequest, RetrievalConfig,
};

/// Errors that can occur when talking to the agent runtime
#[derive(Error, Debug)]
pub enum AgentClientError {
    #[error("Failed to connect to agent runtime: {0}")]
    Connection(String),

    #[error("Agent runtime call {call} failed: {reason}")]
    Rpc { call: &'static str, reason: String },

    #[error("Invalid response from agent runtime: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, AgentClientError>;

// =============================================================================
// Request / response types
// =============================================================================

/// Long-term memory retrieval for one namespace
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    pub namespace: String,
    pub top_k: u32,
    pub relevance_score: f32,
}

/// Parameters for opening a memory session
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySessionConfig {
    pub memory_id: String,
    pub session_id: String,
    pub actor_id: String,
    pub region: String,
    pub retrieval: Vec<RetrievalSettings>,
}

/// Handle to an open memory session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySession {
    pub handle: String,
}

/// A provisioned code-interpreter sandbox, exposed to the model as a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeInterpreter {
    pub tool_name: String,
}

/// One model turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverseInput {
    pub model_id: String,
    pub system_prompt: String,
    pub prompt: String,
    pub memory_session: Option<MemorySession>,
    pub tools: Vec<String>,
}

// =============================================================================
// Client trait
// =============================================================================

/// Everything the request handler needs from the agent runtime
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Open a memory session for `config.actor_id`
    async fn start_memory_session(&self, config: &MemorySessionConfig) -> Result<MemorySession>;

    /// Provision (or reuse) a code-interpreter sandbox named `session_name`
    async fn start_code_interpreter(
        &self,
        region: &str,
        session_name: &str,
    ) -> Result<CodeInterpreter>;

    /// Run a prompt through the model and return the reply text
    async fn converse(&self, input: ConverseInput) -> Result<String>;
}

/// gRPC implementation of [`AgentClient`].
///
/// Cloning is cheap: the underlying channel is shared.
#[derive(Clone, Debug)]
pub struct GrpcAgentClient {
    client: AgentRuntimeClient<Channel>,
    service_addr: String,
}

impl GrpcAgentClient {
    /// Connect to the agent runtime.
    ///
    /// # Arguments
    /// * `addr` - Address of the gRPC service (e.g., "http://localhost:50051")
    pub async fn connect(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        info!("Connecting to agent runtime at {}", addr);

        let channel = Channel::from_shared(addr.clone())
            .map_err(|e| AgentClientError::Connection(format!("Invalid address {}: {}", addr, e)))?
            .connect()
            .await
            .map_err(|e| AgentClientError::Connection(e.to_string()))?;

        Ok(Self {
            client: AgentRuntimeClient::new(channel),
            service_addr: addr,
        })
    }

    /// Get the address of the agent runtime this client is connected to.
    pub fn service_address(&self) -> &str {
        &self.service_addr
    }
}

fn rpc_error(call: &'static str, status: tonic::Status) -> AgentClientError {
    error!("gRPC error in {}: {}", call, status);
    AgentClientError::Rpc {
        call,
        reason: status.message().to_string(),
    }
}

#[async_trait]
impl AgentClient for GrpcAgentClient {
    async fn start_memory_session(&self, config: &MemorySessionConfig) -> Result<MemorySession> {
        debug!(
            "Starting memory session {} for actor {}",
            config.session_id, config.actor_id
        );
        let request = tonic::Request::new(MemorySessionRequest {
            memory_id: config.memory_id.clone(),
            session_id: config.session_id.clone(),
            actor_id: config.actor_id.clone(),
            region: config.region.clone(),
            retrieval: config
                .retrieval
                .iter()
                .map(|r| RetrievalConfig {
                    namespace: r.namespace.clone(),
                    top_k: r.top_k,
                    relevance_score: r.relevance_score,
                })
                .collect(),
        });

        let response = self
            .client
            .clone()
            .start_memory_session(request)
            .await
            .map_err(|e| rpc_error("StartMemorySession", e))?
            .into_inner();

        if response.session_handle.is_empty() {
            return Err(AgentClientError::InvalidResponse(
                "Empty memory session handle".into(),
            ));
        }
        Ok(MemorySession {
            handle: response.session_handle,
        })
    }

    async fn start_code_interpreter(
        &self,
        region: &str,
        session_name: &str,
    ) -> Result<CodeInterpreter> {
        debug!("Starting code interpreter for session {}", session_name);
        let request = tonic::Request::new(CodeInterpreterRequest {
            region: region.to_string(),
            session_name: session_name.to_string(),
            auto_create: true,
        });

        let response = self
            .client
            .clone()
            .start_code_interpreter(request)
            .await
            .map_err(|e| rpc_error("StartCodeInterpreter", e))?
            .into_inner();

        if response.tool_name.is_empty() {
            return Err(AgentClientError::InvalidResponse(
                "Code interpreter returned no tool name".into(),
            ));
        }
        Ok(CodeInterpreter {
            tool_name: response.tool_name,
        })
    }

    async fn converse(&self, input: ConverseInput) -> Result<String> {
        debug!(
            "Conversing with model {} ({} tools, memory: {})",
            input.model_id,
            input.tools.len(),
            input.memory_session.is_some()
        );
        let request = tonic::Request::new(ConverseRequest {
            model_id: input.model_id,
            system_prompt: input.system_prompt,
            prompt: input.prompt,
            memory_session_handle: input.memory_session.map(|m| m.handle),
            tools: input.tools,
        });

        let response = self
            .client
            .clone()
            .converse(request)
            .await
            .map_err(|e| rpc_error("Converse", e))?
            .into_inner();

        Ok(response_text(&response))
    }
}

/// Text of the first content block, or a debug rendering of the whole
/// response when the model returned no text
pub fn response_text(response: &ConverseResponse) -> String {
    response
        .content
        .first()
        .and_then(|block| block.text.clone())
        .unwrap_or_else(|| format!("{:?}", response))
}
