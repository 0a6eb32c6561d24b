//! CLI argument parsing for the paper flow

use anyhow::{Context, Result};
use clap::Parser;
use agent_paper_sdk::FlowDefinition;
use std::path::PathBuf;

use crate::config::Paths;
use crate::flow::{FlowConfig, Phase};

/// Agent Paper CLI Arguments
#[derive(Parser, Debug, Clone, FlowDefinition)]
#[command(name = "agent-paper", version, about = "Write a long-form paper with agent crews")]
#[flow(
    id = "agent_paper",
    name = "Agent Paper Flow",
    description = "Initialize guide → Analyse data → Outline → Write sections → Assemble paper"
)]
pub struct Args {
    /// Project directory holding output/ and config/ (default: current directory)
    #[arg(short, long)]
    #[field(
        label = "Project Root",
        description = "[PATH] Directory where output/ is written",
        type = "file_path"
    )]
    pub root: Option<PathBuf>,

    /// Topic of the paper
    #[arg(short, long)]
    #[field(
        label = "Topic",
        description = "[TEXT] What the paper is about",
        type = "text",
        required_for_phases = "0"
    )]
    pub topic: Option<String>,

    /// Comma-separated steps to run (0=initialize, 1=analysis, 2=outline, 3=sections, 4=assemble); names work too
    #[arg(long, default_value = "0,1,2,3,4")]
    #[field(
        label = "Phases to Run",
        description = "[PHASES] Select which steps to execute (0-4)",
        type = "phase_selector",
        total_phases = "5"
    )]
    pub phases: String,

    /// Re-run steps even if their output files exist
    #[arg(long)]
    #[field(
        label = "Force",
        description = "[BOOL] Ignore existing outputs and regenerate",
        type = "flag"
    )]
    pub force: bool,

    /// Model for every agent (default: AGENT_PAPER_MODEL or the runtime default)
    #[arg(short, long)]
    #[field(
        label = "Model",
        description = "[TEXT] Model name, e.g. claude-sonnet-4-5",
        type = "text"
    )]
    pub model: Option<String>,

    /// Accept every answer without asking for human feedback
    #[arg(long)]
    #[field(
        label = "Non-interactive",
        description = "[BOOL] Skip human review of task answers",
        type = "flag"
    )]
    pub non_interactive: bool,

    /// Path of the assembled paper (default: output/paper.md)
    #[arg(short, long)]
    #[field(
        label = "Output File",
        description = "[PATH] Where to write the final document",
        type = "file_path",
        pattern = "*.md"
    )]
    pub output: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(long)]
    #[field(label = "Debug", description = "[BOOL] Enable debug logging", type = "flag")]
    pub debug: bool,

    // Hidden metadata flag
    #[arg(long, hide = true)]
    pub flow_metadata: bool,
}

impl Args {
    /// Parse `--phases` into steps, rejecting unknown entries
    pub fn parse_phases(&self) -> Result<Vec<Phase>> {
        let mut phases = Vec::new();
        for part in self.phases.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let phase: Phase = part
                .parse()
                .with_context(|| format!("Invalid --phases value '{}'", self.phases))?;
            if !phases.contains(&phase) {
                phases.push(phase);
            }
        }
        if phases.is_empty() {
            anyhow::bail!("--phases selects no steps");
        }
        phases.sort();
        Ok(phases)
    }

    pub fn paths(&self) -> Result<Paths> {
        Ok(Paths::from_root_or_cwd(self.root.clone())?.with_document(self.output.clone()))
    }
}

impl TryFrom<Args> for FlowConfig {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        let phases = args.parse_phases()?;
        let paths = args.paths()?;
        Ok(FlowConfig {
            paths,
            topic: args.topic,
            phases,
            force: args.force,
        })
    }
}
