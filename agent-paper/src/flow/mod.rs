//! Paper flow orchestration
//!
//! [`AgentPaperFlow::kickoff`] runs initialize → analysis → outline → sections →
//! assemble. Every step checks for its output under `output/` first and skips
//! the crew when the file is already there, so an interrupted run resumes where
//! it stopped. Steps left out of the phase selection still load what later
//! steps need from disk.

mod sections;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

use agent_paper_sdk::{
    log_artifact, log_file_saved, log_flow_finish, log_flow_start, log_info, log_phase_complete,
    log_phase_complete_console, log_phase_failed, log_phase_skipped, log_phase_start,
    log_phase_start_console,
};

use crate::config::Paths;
use crate::crew::{CrewRuntime, Inputs};
use crate::crews;
use crate::state::{load_outline, save_outline, AgentPaperState, OutlineStructure};
use crate::utils::{execute_task, TaskContext};

pub use sections::{compose_document, strip_leading_heading};

/// Topic placeholder when the user gave none
const UNSPECIFIED_TOPIC: &str = "(not specified; infer it from the writing guide and project files)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialize,
    Analysis,
    Outline,
    Sections,
    Assemble,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Initialize,
        Phase::Analysis,
        Phase::Outline,
        Phase::Sections,
        Phase::Assemble,
    ];

    pub fn number(self) -> usize {
        self as usize
    }

    pub fn from_number(n: usize) -> Option<Self> {
        Self::ALL.get(n).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Initialize => "initialize",
            Phase::Analysis => "analysis",
            Phase::Outline => "outline",
            Phase::Sections => "sections",
            Phase::Assemble => "assemble",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::Initialize => "Initialize",
            Phase::Analysis => "Analysis",
            Phase::Outline => "Outline",
            Phase::Sections => "Write Sections",
            Phase::Assemble => "Assemble",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::Initialize => "Agree on the writing guide",
            Phase::Analysis => "Analyse project data and summarise the findings",
            Phase::Outline => "Design the paper outline",
            Phase::Sections => "Write and review each section in order",
            Phase::Assemble => "Compose the final document",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = anyhow::Error;

    /// Accepts a phase number (`0`-`4`) or name (`outline`, `section_loop`, ...)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<usize>() {
            return Phase::from_number(n)
                .with_context(|| format!("Unknown phase number {} (expected 0-4)", n));
        }
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "initialize" | "init" => Ok(Phase::Initialize),
            "analysis" => Ok(Phase::Analysis),
            "outline" => Ok(Phase::Outline),
            "sections" | "section_loop" => Ok(Phase::Sections),
            "assemble" => Ok(Phase::Assemble),
            other => bail!(
                "Unknown phase '{}' (expected 0-4 or one of: initialize, analysis, outline, sections, assemble)",
                other
            ),
        }
    }
}

/// Where the flow goes after analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Outline,
}

impl Route {
    pub fn label(self) -> &'static str {
        match self {
            Route::Outline => "outline",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub paths: Paths,
    pub topic: Option<String>,
    /// Steps to run, in any order; execution order is fixed
    pub phases: Vec<Phase>,
    /// Re-run steps even when their output exists
    pub force: bool,
}

impl FlowConfig {
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            topic: None,
            phases: Phase::ALL.to_vec(),
            force: false,
        }
    }

    pub fn selected(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
}

/// What happened to each step of a kickoff
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowOutcome {
    pub ran: Vec<Phase>,
    /// Steps whose output already existed
    pub skipped: Vec<Phase>,
    /// Sections written by agents in this run (ids)
    pub written_sections: Vec<String>,
    /// Set when the assemble step ran
    pub document: Option<std::path::PathBuf>,
}

enum StepResult {
    Ran,
    Skipped(String),
}

pub struct AgentPaperFlow {
    config: FlowConfig,
    runtime: CrewRuntime,
    state: AgentPaperState,
    outcome: FlowOutcome,
}

impl AgentPaperFlow {
    /// Prepare the output directory and resume any saved state
    pub fn new(config: FlowConfig, runtime: CrewRuntime) -> Result<Self> {
        config.paths.ensure_output_dir()?;
        let state = AgentPaperState::load_or_new(&config.paths.state)?;
        tracing::debug!(id = ?state.id, completed = ?state.completed_phases, "flow state loaded");
        Ok(Self {
            config,
            runtime,
            state,
            outcome: FlowOutcome::default(),
        })
    }

    pub fn state(&self) -> &AgentPaperState {
        &self.state
    }

    fn paths(&self) -> &Paths {
        &self.config.paths
    }

    /// Run the selected steps in flow order
    pub async fn kickoff(&mut self) -> Result<FlowOutcome> {
        self.outcome = FlowOutcome::default();
        let run_id = self.state.id.clone().unwrap_or_default();
        log_flow_start!(
            &run_id,
            self.paths().root.display(),
            self.config.phases.iter().map(|p| p.number()).collect()
        );
        log_info!("Flow {} in {}", run_id, self.paths().root.display());

        if self.config.selected(Phase::Initialize) {
            let result = self.initialize().await;
            self.conclude(Phase::Initialize, result)?;
        }

        if self.config.selected(Phase::Analysis) {
            let result = self.analysis().await;
            self.conclude(Phase::Analysis, result)?;
        }

        match self.analysis_router() {
            Route::Outline => {
                if self.config.selected(Phase::Outline) {
                    let result = self.outline().await;
                    self.conclude(Phase::Outline, result)?;
                } else {
                    self.load_existing_outline()?;
                }
            }
        }

        if self.config.selected(Phase::Sections) {
            let result = self.section_loop().await;
            self.conclude(Phase::Sections, result)?;
        } else if self.config.selected(Phase::Assemble) {
            self.load_written_sections().await?;
        }

        if self.config.selected(Phase::Assemble) {
            let result = self.assemble().await;
            self.conclude(Phase::Assemble, result)?;
        }

        log_flow_finish!(
            self.outcome.ran.iter().map(|p| p.number()).collect(),
            self.outcome.skipped.iter().map(|p| p.number()).collect()
        );
        Ok(std::mem::take(&mut self.outcome))
    }

    fn begin(&self, phase: Phase) {
        log_phase_start!(phase.number(), phase.title(), Phase::ALL.len());
        log_phase_start_console!(phase.number(), phase.title(), phase.description());
    }

    /// Log the step result, record it in state and persist state
    fn conclude(&mut self, phase: Phase, result: Result<StepResult>) -> Result<()> {
        match result {
            Ok(step) => {
                match step {
                    StepResult::Ran => {
                        self.outcome.ran.push(phase);
                        log_phase_complete!(phase.number(), phase.title());
                        log_phase_complete_console!(phase.number());
                    }
                    StepResult::Skipped(reason) => {
                        self.outcome.skipped.push(phase);
                        log_phase_skipped!(phase.number(), phase.title(), &reason);
                        log_info!("Skipping {}: {}", phase.title(), reason);
                    }
                }
                self.state.mark_completed(phase);
                self.state.save(&self.paths().state)?;
                Ok(())
            }
            Err(e) => {
                log_phase_failed!(phase.number(), phase.title(), format!("{:#}", e));
                self.state.save(&self.paths().state)?;
                Err(e.context(format!("Phase {} ({}) failed", phase.number(), phase.name())))
            }
        }
    }

    /// Gate: true when `path` exists and reruns are not forced
    fn already_done(&self, path: &Path) -> bool {
        !self.config.force && path.exists()
    }

    fn skipped_because(&self, path: &Path) -> StepResult {
        StepResult::Skipped(format!("{} exists", self.paths().display(path)))
    }

    /// Inputs shared by every crew
    async fn base_inputs(&self) -> Result<Inputs> {
        let paths = self.paths();
        let topic = self
            .config
            .topic
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNSPECIFIED_TOPIC.to_string());

        let mut inputs = Inputs::new();
        inputs.insert("topic".to_string(), topic);
        inputs.insert("guide".to_string(), read_optional(&paths.guide).await?);
        inputs.insert("analysis".to_string(), read_optional(&paths.analysis).await?);
        inputs.insert("output_dir".to_string(), paths.output_dir.display().to_string());
        inputs.insert("project_root".to_string(), paths.root.display().to_string());
        Ok(inputs)
    }

    async fn write_artifact(&self, phase: Phase, path: &Path, content: &str, what: &str) -> Result<()> {
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}: {}", what, path.display()))?;
        let shown = self.paths().display(path);
        log_artifact!(phase.number(), &shown, what);
        log_file_saved!(&shown);
        Ok(())
    }

    async fn initialize(&mut self) -> Result<StepResult> {
        let guide = self.paths().guide.clone();
        if self.already_done(&guide) {
            return Ok(self.skipped_because(&guide));
        }
        self.begin(Phase::Initialize);

        let inputs = self.base_inputs().await?;
        let crew = crews::initialize(&self.runtime)?;
        let output = execute_task(
            "requirements",
            "Draft the writing guide",
            TaskContext::single(Phase::Initialize.number()),
            || async {
                let output = crew.kickoff(&inputs).await?;
                let summary = format!("{} chars", output.raw.len());
                Ok((output, summary))
            },
        )
        .await?;

        self.write_artifact(Phase::Initialize, &guide, &output.raw, "Writing guide")
            .await?;
        Ok(StepResult::Ran)
    }

    async fn analysis(&mut self) -> Result<StepResult> {
        let analysis = self.paths().analysis.clone();
        if self.already_done(&analysis) {
            return Ok(self.skipped_because(&analysis));
        }
        self.begin(Phase::Analysis);

        let inputs = self.base_inputs().await?;
        let crew = crews::analysis(&self.runtime)?;
        let output = execute_task(
            "analysis",
            "Analyse the project data and summarise",
            TaskContext::single(Phase::Analysis.number()),
            || async {
                let output = crew.kickoff(&inputs).await?;
                let summary = format!("{} tasks", output.tasks_output.len());
                Ok((output, summary))
            },
        )
        .await?;

        self.write_artifact(Phase::Analysis, &analysis, &output.raw, "Analysis summary")
            .await?;
        Ok(StepResult::Ran)
    }

    /// Decide the step after analysis
    pub fn analysis_router(&self) -> Route {
        let route = Route::Outline;
        tracing::debug!(route = route.label(), "analysis routed");
        route
    }

    async fn outline(&mut self) -> Result<StepResult> {
        let path = self.paths().outline.clone();
        if self.already_done(&path) {
            let outline = load_outline(&path)?;
            log_info!("Loaded outline with {} sections", outline.sections.len());
            self.state.outline = Some(outline);
            return Ok(self.skipped_because(&path));
        }
        self.begin(Phase::Outline);

        let inputs = self.base_inputs().await?;
        let crew = crews::outline(&self.runtime)?;
        let outline: OutlineStructure = execute_task(
            "outline",
            "Design the outline",
            TaskContext::single(Phase::Outline.number()),
            || async {
                let output = crew.kickoff(&inputs).await?;
                let outline: OutlineStructure = output
                    .json()
                    .context("Outline crew did not return a valid outline")?;
                let summary = format!(
                    "{} sections ({} including subsections)",
                    outline.sections.len(),
                    outline.section_count()
                );
                Ok((outline, summary))
            },
        )
        .await?;

        if outline.sections.is_empty() {
            bail!("Outline crew returned an outline without sections");
        }

        save_outline(&path, &outline)?;
        let shown = self.paths().display(&path);
        log_artifact!(Phase::Outline.number(), &shown, "Paper outline");
        log_file_saved!(&shown);
        self.state.outline = Some(outline);
        Ok(StepResult::Ran)
    }

    /// Outline from state or disk when the outline step is not selected
    fn load_existing_outline(&mut self) -> Result<()> {
        let path = self.paths().outline.clone();
        if path.exists() {
            self.state.outline = Some(load_outline(&path)?);
        }
        Ok(())
    }

    async fn assemble(&mut self) -> Result<StepResult> {
        self.begin(Phase::Assemble);
        let outline = self
            .state
            .outline
            .as_ref()
            .context("No outline available to assemble. Run the outline phase first")?;

        let document = compose_document(outline, self.config.topic.as_deref())?;
        let path = self.paths().document.clone();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        self.write_artifact(Phase::Assemble, &path, &document, "Assembled paper")
            .await?;
        self.outcome.document = Some(path);
        Ok(StepResult::Ran)
    }
}

/// File content, or an empty string when the file does not exist
async fn read_optional(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
