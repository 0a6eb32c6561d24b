//! The four crews of the paper flow, built from their YAML configs

use anyhow::Result;

use crate::crew::{load_crew_config, Crew, CrewRuntime};

/// Built-in `agents.yaml`/`tasks.yaml` of a crew
struct BuiltinConfig {
    name: &'static str,
    agents: &'static str,
    tasks: &'static str,
}

const INITIALIZE: BuiltinConfig = BuiltinConfig {
    name: "initialize",
    agents: include_str!("../../config/initialize/agents.yaml"),
    tasks: include_str!("../../config/initialize/tasks.yaml"),
};

const ANALYSIS: BuiltinConfig = BuiltinConfig {
    name: "analysis",
    agents: include_str!("../../config/analysis/agents.yaml"),
    tasks: include_str!("../../config/analysis/tasks.yaml"),
};

const OUTLINE: BuiltinConfig = BuiltinConfig {
    name: "outline",
    agents: include_str!("../../config/outline/agents.yaml"),
    tasks: include_str!("../../config/outline/tasks.yaml"),
};

const SECTION_LOOP: BuiltinConfig = BuiltinConfig {
    name: "section_loop",
    agents: include_str!("../../config/section_loop/agents.yaml"),
    tasks: include_str!("../../config/section_loop/tasks.yaml"),
};

fn build(config: &BuiltinConfig, phase: usize, runtime: &CrewRuntime) -> Result<Crew> {
    let crew_config = load_crew_config(config.name, config.agents, config.tasks, &runtime.paths)?;
    Ok(Crew::new(config.name, crew_config, runtime.clone()).with_phase(phase))
}

/// Requirements agent drafting the writing guide
pub fn initialize(runtime: &CrewRuntime) -> Result<Crew> {
    build(&INITIALIZE, 0, runtime)
}

/// Data analysis followed by a summary
pub fn analysis(runtime: &CrewRuntime) -> Result<Crew> {
    build(&ANALYSIS, 1, runtime)
}

/// Outline creation followed by section descriptions; answers with outline JSON
pub fn outline(runtime: &CrewRuntime) -> Result<Crew> {
    build(&OUTLINE, 2, runtime)
}

/// Writer and reviewer for one section at a time
pub fn section_loop(runtime: &CrewRuntime) -> Result<Crew> {
    build(&SECTION_LOOP, 3, runtime)
}
