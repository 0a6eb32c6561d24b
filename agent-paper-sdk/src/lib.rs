//! Event protocol and console output for agent-paper flows
//!
//! A running flow writes two streams. Stdout carries console lines for the
//! person watching the run ([`console`]). Stderr carries one JSON [`FlowLog`]
//! event per line behind [`EVENT_PREFIX`], which a supervisor can parse back
//! with [`FlowLog::parse_line`] while ignoring whatever else the agents print.
//!
//! The `log_*!` macros are the only way the flow emits either stream.

pub mod console;
mod events;
mod metadata;

pub use agent_paper_macros::FlowDefinition;
pub use events::{FlowLog, EVENT_PREFIX};
pub use metadata::{FieldSchema, FieldType, FlowDefinition, FlowMetadata, FullFlowMetadata};
