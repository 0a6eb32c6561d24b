//! Long-form paper generation with a pipeline of agent crews
//!
//! The flow drafts a writing guide, analyses the project's data, designs an
//! outline, writes each section with the previous ones as context and assembles
//! the paper. Every artifact lands under `output/`, which is also what lets an
//! interrupted run resume.

pub mod cli;
pub mod config;
pub mod crew;
pub mod crews;
pub mod flow;
pub mod state;
pub mod tools;
pub mod utils;

pub use cli::Args;
pub use config::Paths;
pub use flow::{AgentPaperFlow, FlowConfig, FlowOutcome, Phase};
pub use state::{AgentPaperState, OutlineSection, OutlineStructure};
