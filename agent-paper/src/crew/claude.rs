//! Claude Code backend with stream handling and tool logging

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use claude_agent_sdk::types::{
    ClaudeAgentOptions, ContentBlock, McpServerConfig, McpServers, Message, SdkMcpServerMarker,
    ToolName,
};
use claude_agent_sdk::{query, ClaudeSDKClient, SystemPrompt};
use futures::{Stream, StreamExt};
use agent_paper_sdk::log_agent_message;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use super::backend::{AgentBackend, AgentRequest, AgentResponse};
use super::spec::ToolKind;
use crate::tools::{data_read_server, DATA_SERVER_NAME, DATA_TOOL_NAME};

/// Runs agents through the Claude Code CLI
#[derive(Debug, Clone)]
pub struct ClaudeBackend {
    /// Base directory for relative data file paths
    project_root: PathBuf,
}

impl ClaudeBackend {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    fn options(&self, request: &AgentRequest) -> ClaudeAgentOptions {
        let mut options = ClaudeAgentOptions {
            system_prompt: Some(SystemPrompt::String(request.system_prompt.clone())),
            allowed_tools: allowed_tools(&request.tools)
                .into_iter()
                .map(|name| ToolName::new(name.as_str()))
                .collect(),
            max_turns: request.max_turns,
            ..Default::default()
        };

        if request.tools.contains(&ToolKind::DataRead) {
            let mut mcp_servers = HashMap::new();
            mcp_servers.insert(
                DATA_SERVER_NAME.to_string(),
                McpServerConfig::Sdk(SdkMcpServerMarker {
                    name: DATA_SERVER_NAME.to_string(),
                    instance: Arc::new(data_read_server(self.project_root.clone())),
                }),
            );
            options.mcp_servers = McpServers::Dict(mcp_servers);
        }
        options
    }
}

#[async_trait]
impl AgentBackend for ClaudeBackend {
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse> {
        let options = self.options(&request);
        let mut collector = StreamCollector::new(&request.task_id, &request.agent_name);

        tracing::debug!(
            task_id = %request.task_id,
            agent = %request.agent_name,
            prompt_chars = request.prompt.len(),
            tools = ?request.tools,
            "starting agent"
        );

        if request.tools.contains(&ToolKind::DataRead) {
            // SDK MCP servers need the bidirectional client
            let mut client = ClaudeSDKClient::new(options, None)
                .await
                .context("Failed to start Claude client")?;
            let streamed = collect_client(&mut client, &request.prompt, &mut collector).await;
            // The client's Drop leaves the transport open
            close_after(streamed, client.close()).await?;
        } else {
            let stream = query(&request.prompt, Some(options))
                .await
                .context("Failed to query Claude")?;
            collector.drain(stream).await?;
        }

        Ok(collector.finish())
    }
}

async fn collect_client(
    client: &mut ClaudeSDKClient,
    prompt: &str,
    collector: &mut StreamCollector<'_>,
) -> Result<()> {
    client.send_message(prompt).await?;
    while let Some(message) = client.next_message().await {
        if collector.on_message(message?)? {
            break;
        }
    }
    Ok(())
}

/// Await `close` whatever `streamed` was, then report the stream error first
async fn close_after<E>(streamed: Result<()>, close: impl Future<Output = Result<(), E>>) -> Result<()>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let closed = close.await;
    streamed?;
    closed.context("Failed to close Claude client")
}

/// Claude Code tool names granted for each tool kind
fn allowed_tools(tools: &[ToolKind]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for tool in tools {
        let granted: &[&str] = match tool {
            ToolKind::DirectoryRead => &["Glob", "Read"],
            ToolKind::FileRead => &["Read"],
            ToolKind::DataRead => &[],
        };
        for name in granted {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if *tool == ToolKind::DataRead {
            names.push(format!("mcp__{}__{}", DATA_SERVER_NAME, DATA_TOOL_NAME));
        }
    }
    names
}

/// Collects the final answer from an agent's message stream
///
/// Text written before the agent's last tool call is narration, not the
/// answer, so the buffer restarts after every tool use.
struct StreamCollector<'a> {
    task_id: &'a str,
    agent_name: &'a str,
    answer: String,
    tool_calls: usize,
}

impl<'a> StreamCollector<'a> {
    fn new(task_id: &'a str, agent_name: &'a str) -> Self {
        Self {
            task_id,
            agent_name,
            answer: String::new(),
            tool_calls: 0,
        }
    }

    async fn drain(
        &mut self,
        stream: impl Stream<Item = claude_agent_sdk::error::Result<Message>>,
    ) -> Result<()> {
        let mut stream = Box::pin(stream);
        while let Some(message) = stream.next().await {
            if self.on_message(message?)? {
                break;
            }
        }
        Ok(())
    }

    /// Returns true once the run has finished
    fn on_message(&mut self, message: Message) -> Result<bool> {
        match message {
            Message::Assistant { message, .. } => {
                for block in &message.content {
                    match block {
                        ContentBlock::Text { text } => {
                            println!("{}", text);
                            log_agent_message!(self.task_id, self.agent_name, text);
                            if !self.answer.is_empty() {
                                self.answer.push('\n');
                            }
                            self.answer.push_str(text);
                        }
                        ContentBlock::ToolUse { name, input, .. } => {
                            self.tool_calls += 1;
                            self.answer.clear();
                            log_agent_message!(
                                self.task_id,
                                self.agent_name,
                                describe_tool_use(name, input)
                            );
                        }
                        ContentBlock::ToolResult { tool_use_id, .. } => {
                            tracing::trace!(task_id = self.task_id, tool_use_id = %tool_use_id, "tool result");
                        }
                        _ => {}
                    }
                }
                Ok(false)
            }
            Message::Result { is_error, .. } => {
                if is_error {
                    bail!("Agent '{}' finished with an error", self.agent_name);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn finish(self) -> AgentResponse {
        AgentResponse {
            text: self.answer.trim().to_string(),
            tool_calls: self.tool_calls,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// One-line description of a tool call for the event log
fn describe_tool_use(tool_name: &str, input: &serde_json::Value) -> String {
    let field = |key: &str| input.get(key).and_then(|v| v.as_str());

    match tool_name {
        "Read" => match field("file_path") {
            Some(path) => format!("📖 Reading: {}", path),
            None => "📖 Reading file".to_string(),
        },
        "Glob" => match field("pattern") {
            Some(pattern) => format!("📂 Finding: {}", pattern),
            None => "📂 Finding files".to_string(),
        },
        "Grep" => format!(
            "🔍 Searching: \"{}\" in {}",
            field("pattern").unwrap_or("?"),
            field("path").unwrap_or(".")
        ),
        name if name.ends_with(DATA_TOOL_NAME) && name.starts_with("mcp__") => {
            match field("file_path") {
                Some(path) => format!("📊 Loading data: {}", truncate(path, 80)),
                None => "📊 Loading data".to_string(),
            }
        }
        _ => format!("🔧 Using tool: {}", tool_name),
    }
}
