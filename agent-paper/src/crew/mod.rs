//! Crews: agents working through YAML-defined tasks in order
//!
//! A crew runs its tasks sequentially. Each task is rendered from its template
//! with the kickoff inputs, handed to the assigned agent together with the
//! output of earlier tasks, and optionally reviewed by a human before the next
//! task starts.

pub mod backend;
pub mod claude;
pub mod human;
pub mod spec;

use anyhow::{Context, Result};
use agent_paper_sdk::{
    log_agent_complete, log_agent_failed, log_agent_start, log_artifact, log_warning,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::Paths;
use crate::utils::parse_json;

pub use backend::{AgentBackend, AgentRequest, AgentResponse};
pub use claude::ClaudeBackend;
pub use human::{HumanFeedback, NoFeedback, StdinFeedback, MAX_FEEDBACK_ROUNDS};
pub use spec::{interpolate, load_crew_config, AgentSpec, CrewConfig, Inputs, TaskSpec, ToolKind};

/// Shared services every crew runs against
#[derive(Clone)]
pub struct CrewRuntime {
    pub backend: Arc<dyn AgentBackend>,
    pub feedback: Arc<dyn HumanFeedback>,
    pub paths: Paths,
}

impl CrewRuntime {
    pub fn new(
        backend: Arc<dyn AgentBackend>,
        feedback: Arc<dyn HumanFeedback>,
        paths: Paths,
    ) -> Self {
        Self {
            backend,
            feedback,
            paths,
        }
    }
}

/// Result of one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutput {
    pub name: String,
    pub agent: String,
    pub raw: String,
    /// Human feedback rounds that led to a revision
    pub revisions: usize,
}

/// Result of a crew kickoff
#[derive(Debug, Clone, PartialEq)]
pub struct CrewOutput {
    /// Answer of the last task
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
}

impl CrewOutput {
    /// Parse the final answer as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        parse_json(&self.raw)
    }

    pub fn task(&self, name: &str) -> Option<&TaskOutput> {
        self.tasks_output.iter().find(|t| t.name == name)
    }
}

pub struct Crew {
    name: String,
    phase: usize,
    config: CrewConfig,
    runtime: CrewRuntime,
}

impl Crew {
    pub fn new(name: impl Into<String>, config: CrewConfig, runtime: CrewRuntime) -> Self {
        Self {
            name: name.into(),
            phase: 0,
            config,
            runtime,
        }
    }

    /// Phase number used when logging written files
    pub fn with_phase(mut self, phase: usize) -> Self {
        self.phase = phase;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CrewConfig {
        &self.config
    }

    /// Run every task in order and return the last task's answer
    pub async fn kickoff(&self, inputs: &Inputs) -> Result<CrewOutput> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.config.tasks.len());

        for (task_name, task) in &self.config.tasks {
            let output = self
                .run_task(task_name, task, inputs, &outputs)
                .await
                .with_context(|| format!("Task '{}' of crew '{}' failed", task_name, self.name))?;
            outputs.push(output);
        }

        let raw = outputs
            .last()
            .map(|o| o.raw.clone())
            .context("Crew produced no task output")?;

        Ok(CrewOutput {
            raw,
            tasks_output: outputs,
        })
    }

    async fn run_task(
        &self,
        task_name: &str,
        task: &TaskSpec,
        inputs: &Inputs,
        previous: &[TaskOutput],
    ) -> Result<TaskOutput> {
        let agent = self
            .config
            .agent(&task.agent)
            .with_context(|| format!("Unknown agent '{}'", task.agent))?;

        let task_id = format!("{}.{}", self.name, task_name);
        let system_prompt = self.system_prompt(agent, inputs)?;
        let task_prompt = task_prompt(task, inputs, &select_context(task, previous))?;

        let mut request = AgentRequest {
            task_id: task_id.clone(),
            agent_name: task.agent.clone(),
            system_prompt,
            prompt: task_prompt.clone(),
            tools: agent.tools.clone(),
            max_turns: agent.max_turns,
        };

        let mut answer = self.invoke(&request).await?;
        let mut revisions = 0;

        if task.human_input {
            while revisions < MAX_FEEDBACK_ROUNDS {
                let Some(feedback) = self.runtime.feedback.review(task_name, &answer).await? else {
                    break;
                };
                revisions += 1;
                tracing::info!(task = %task_id, round = revisions, "revising answer from human feedback");
                request.prompt = revision_prompt(&task_prompt, &answer, &feedback);
                answer = self.invoke(&request).await?;
            }
            if revisions == MAX_FEEDBACK_ROUNDS {
                log_warning!(
                    "{} revision rounds used on {}; keeping the last answer",
                    MAX_FEEDBACK_ROUNDS,
                    task_id
                );
            }
        }

        if let Some(file) = &task.output_file {
            let path = self.runtime.paths.output_file(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, &answer)
                .with_context(|| format!("Failed to write task output: {}", path.display()))?;
            log_artifact!(
                self.phase,
                self.runtime.paths.display(&path),
                format!("Output of {}", task_id)
            );
        }

        Ok(TaskOutput {
            name: task_name.to_string(),
            agent: task.agent.clone(),
            raw: answer,
            revisions,
        })
    }

    async fn invoke(&self, request: &AgentRequest) -> Result<String> {
        log_agent_start!(&request.task_id, &request.agent_name, "Working on task");

        match self.runtime.backend.run(request.clone()).await {
            Ok(response) if response.text.trim().is_empty() => {
                log_agent_failed!(&request.task_id, &request.agent_name, "Empty answer");
                anyhow::bail!("Agent '{}' returned an empty answer", request.agent_name)
            }
            Ok(response) => {
                log_agent_complete!(
                    &request.task_id,
                    &request.agent_name,
                    format!("{} chars, {} tool calls", response.text.len(), response.tool_calls)
                );
                Ok(response.text)
            }
            Err(e) => {
                log_agent_failed!(&request.task_id, &request.agent_name, format!("{:#}", e));
                Err(e)
            }
        }
    }

    fn system_prompt(&self, agent: &AgentSpec, inputs: &Inputs) -> Result<String> {
        let mut prompt = format!(
            "You are {}.\n{}\n\nYour personal goal is: {}\n",
            interpolate(agent.role.trim(), inputs)?,
            interpolate(agent.backstory.trim(), inputs)?,
            interpolate(agent.goal.trim(), inputs)?,
        );

        if !agent.tools.is_empty() {
            prompt.push_str("\nTools available to you:\n");
            for tool in &agent.tools {
                prompt.push_str("- ");
                prompt.push_str(&tool_hint(*tool, &self.runtime.paths));
                prompt.push('\n');
            }
        }

        prompt.push_str(
            "\nDo not create, edit or delete any files. \
             Reply with your complete final answer as plain text.",
        );
        Ok(prompt)
    }
}

fn tool_hint(tool: ToolKind, paths: &Paths) -> String {
    match tool {
        ToolKind::DirectoryRead => format!(
            "Glob and Read: list and read the files in {}",
            paths.output_dir.display()
        ),
        ToolKind::FileRead => "Read: read any file by path".to_string(),
        ToolKind::DataRead => format!(
            "read_data: load a CSV, TSV or JSON data file (relative to {}) as a table preview",
            paths.root.display()
        ),
    }
}

/// Outputs of earlier tasks this task sees
fn select_context<'a>(task: &TaskSpec, previous: &'a [TaskOutput]) -> Vec<&'a TaskOutput> {
    match &task.context {
        Some(names) => previous
            .iter()
            .filter(|o| names.iter().any(|n| n == &o.name))
            .collect(),
        None => previous.iter().collect(),
    }
}

fn task_prompt(task: &TaskSpec, inputs: &Inputs, context: &[&TaskOutput]) -> Result<String> {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.\n",
        interpolate(task.description.trim(), inputs)?,
        interpolate(task.expected_output.trim(), inputs)?,
    );

    if !context.is_empty() {
        prompt.push_str("\nThis is the context you're working with:\n");
        for output in context {
            prompt.push_str(&format!("\n### {}\n{}\n", output.name, output.raw.trim()));
        }
    }
    Ok(prompt)
}

fn revision_prompt(task_prompt: &str, answer: &str, feedback: &str) -> String {
    format!(
        "{}\n\nYour previous answer:\n{}\n\nHuman feedback on that answer:\n{}\n\n\
         Revise your answer to address the feedback and return the complete revised answer.",
        task_prompt,
        answer.trim(),
        feedback.trim()
    )
}
