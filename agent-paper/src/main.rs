/*
┌─────────────────────────────────────────────────────────────────────────────┐
│                            AGENT PAPER FLOW                                  │
└─────────────────────────────────────────────────────────────────────────────┘

  Phase 0: INITIALIZE              (skipped if output/guide.md exists)
    └─> requirements_agent drafts the writing guide, human reviews

  Phase 1: ANALYSIS                (skipped if output/analysis.md exists)
    ├─> analysis_agent reads output/ and data files, human reviews
    └─> analysis_summary_agent condenses the findings

         ↓ analysis_router → "outline"

  Phase 2: OUTLINE                 (loads output/outline.json if present)
    ├─> outline_creator designs the structure
    └─> outline_describer adds why/how/data and returns JSON

  Phase 3: SECTIONS                (per section: skipped if its file exists)
    └─> for each top-level section, with all previous sections as context:
        ├─> content_writer drafts
        └─> content_reviewer finalizes → output/sections/NN_<id>.md

  Phase 4: ASSEMBLE
    └─> # title + ## section + content → output/paper.md
*/

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use agent_paper::config::{load_env, resolve_model, RUNTIME_MODEL_ENV};
use agent_paper::crew::{
    ClaudeBackend, CrewRuntime, HumanFeedback, NoFeedback, StdinFeedback,
};
use agent_paper::{AgentPaperFlow, Args, FlowConfig};
use agent_paper_sdk::{log_file_saved, log_info, FlowDefinition};

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "agent_paper=debug,claude_agent_sdk=info"
    } else {
        "agent_paper=warn"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle flow metadata flag
    if args.flow_metadata {
        args.print_metadata();
        return Ok(());
    }

    init_tracing(args.debug);

    let paths = args.paths()?;
    load_env(&paths.root);
    std::env::set_current_dir(&paths.root)?;

    if let Some(model) = resolve_model(args.model.clone()) {
        log_info!("Model: {}", model);
        std::env::set_var(RUNTIME_MODEL_ENV, model);
    }

    let feedback: Arc<dyn HumanFeedback> = if args.non_interactive {
        Arc::new(NoFeedback)
    } else {
        Arc::new(StdinFeedback::new())
    };
    let runtime = CrewRuntime::new(
        Arc::new(ClaudeBackend::new(paths.root.clone())),
        feedback,
        paths,
    );

    let config = FlowConfig::try_from(args)?;
    let mut flow = AgentPaperFlow::new(config, runtime)?;
    let outcome = flow.kickoff().await?;

    if let Some(document) = &outcome.document {
        log_file_saved!(document.display());
    }
    log_info!(
        "Done: {} steps ran, {} skipped, {} sections written",
        outcome.ran.len(),
        outcome.skipped.len(),
        outcome.written_sections.len()
    );
    Ok(())
}
