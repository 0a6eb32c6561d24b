//! The seam between crews and the model runtime

use anyhow::Result;
use async_trait::async_trait;

use super::spec::ToolKind;

/// One agent invocation: a fully rendered task prompt for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    /// Qualified task id, e.g. `outline.outline_task`
    pub task_id: String,
    /// Agent key from agents.yaml
    pub agent_name: String,
    pub system_prompt: String,
    pub prompt: String,
    pub tools: Vec<ToolKind>,
    pub max_turns: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentResponse {
    /// Final answer text
    pub text: String,
    /// Number of tool calls the agent made
    pub tool_calls: usize,
}

impl AgentResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: 0,
        }
    }
}

/// Runs agents to completion
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse>;
}
