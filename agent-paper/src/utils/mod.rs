//! Shared helpers for flow steps
//!
//! - **extract**: pulling YAML/JSON payloads out of agent responses
//! - **task**: step execution wrapped in flow-event logging

pub mod extract;
pub mod task;

pub use extract::{extract_fenced, extract_json, parse_json, parse_yaml};
pub use task::{execute_task, TaskContext};
