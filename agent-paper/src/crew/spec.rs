//! Agent and task definitions loaded from crew YAML

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::Paths;
use crate::utils::parse_yaml;

/// Values substituted into `{placeholder}`s of agent and task text
pub type Inputs = BTreeMap<String, String>;

const PLACEHOLDER: &str = r"\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Tools an agent may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// List and read files in the output directory
    DirectoryRead,
    /// Read any file by path
    FileRead,
    /// Load CSV/JSON data files as tables
    DataRead,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub tools: Vec<ToolKind>,
    /// Upper bound on agent turns for one task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub description: String,
    pub expected_output: String,
    /// Key of the agent in agents.yaml
    pub agent: String,
    /// Written under `output/` once the task finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// Ask the human to review the answer before moving on
    #[serde(default)]
    pub human_input: bool,
    /// Earlier tasks whose output is passed as context; all earlier tasks if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
}

/// Agents and tasks of one crew, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct CrewConfig {
    pub agents: Vec<(String, AgentSpec)>,
    pub tasks: Vec<(String, TaskSpec)>,
}

impl CrewConfig {
    /// Parse agents.yaml and tasks.yaml contents
    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str, source: &str) -> Result<Self> {
        let agents = ordered_entries(agents_yaml, &format!("{}/agents.yaml", source))?;
        let tasks = ordered_entries(tasks_yaml, &format!("{}/tasks.yaml", source))?;
        let config = Self { agents, tasks };
        config.validate(source)?;
        Ok(config)
    }

    pub fn agent(&self, key: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|(k, _)| k == key).map(|(_, a)| a)
    }

    fn validate(&self, source: &str) -> Result<()> {
        if self.tasks.is_empty() {
            bail!("Crew '{}' defines no tasks", source);
        }
        for (name, task) in &self.tasks {
            if self.agent(&task.agent).is_none() {
                bail!(
                    "Task '{}' in crew '{}' references unknown agent '{}'",
                    name,
                    source,
                    task.agent
                );
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for (name, task) in &self.tasks {
            for dep in task.context.iter().flatten() {
                if !seen.contains(&dep.as_str()) {
                    bail!(
                        "Task '{}' in crew '{}' uses '{}' as context, which is not an earlier task",
                        name,
                        source,
                        dep
                    );
                }
            }
            seen.push(name);
        }
        Ok(())
    }
}

/// Deserialize a top-level YAML mapping keeping key order
fn ordered_entries<T: serde::de::DeserializeOwned>(
    yaml: &str,
    source: &str,
) -> Result<Vec<(String, T)>> {
    let mapping: serde_yaml::Mapping = parse_yaml(yaml, source)?;
    mapping
        .into_iter()
        .map(|(key, value)| {
            let key = key
                .as_str()
                .map(str::to_string)
                .with_context(|| format!("Non-string key in {}", source))?;
            let spec = serde_yaml::from_value(value)
                .with_context(|| format!("Invalid entry '{}' in {}", key, source))?;
            Ok((key, spec))
        })
        .collect()
}

/// Load a crew's config, preferring `<root>/config/<crew>/*.yaml` over the built-ins
pub fn load_crew_config(
    crew: &str,
    default_agents: &str,
    default_tasks: &str,
    paths: &Paths,
) -> Result<CrewConfig> {
    let dir = paths.config_dir.join(crew);
    let agents = read_override(&dir.join("agents.yaml"))?;
    let tasks = read_override(&dir.join("tasks.yaml"))?;

    if agents.is_some() || tasks.is_some() {
        tracing::info!(crew, dir = %dir.display(), "using crew config override");
    }

    CrewConfig::from_yaml(
        agents.as_deref().unwrap_or(default_agents),
        tasks.as_deref().unwrap_or(default_tasks),
        crew,
    )
}

fn read_override(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read crew config: {}", path.display()))
}

/// Replace `{name}` placeholders with values from `inputs`
///
/// Braces that do not wrap an identifier (JSON examples, code) are left alone.
/// A placeholder without a matching input is an error.
pub fn interpolate(template: &str, inputs: &Inputs) -> Result<String> {
    let re = Regex::new(PLACEHOLDER)?;
    let mut missing = BTreeSet::new();

    let rendered = re.replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match inputs.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.insert(name.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        let names: Vec<String> = missing.into_iter().collect();
        bail!("Missing input(s) for template: {}", names.join(", "));
    }
    Ok(rendered.into_owned())
}
