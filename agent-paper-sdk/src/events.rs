use serde::{Deserialize, Serialize};
use std::io::Write;

/// Marks a structured event line on stderr
pub const EVENT_PREFIX: &str = "__FLOW_EVENT__:";

/// Structured event emitted while a flow runs
///
/// Phases are identified by number (0-based, flow order) and carry their
/// display name. Tasks and agents are identified by `task_id`, which is
/// `<crew>.<task>` for crew tasks and a step name for flow steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowLog {
    FlowStarted {
        run_id: String,
        root: String,
        phases: Vec<usize>,
    },
    FlowFinished {
        ran: Vec<usize>,
        skipped: Vec<usize>,
    },

    PhaseStarted {
        phase: usize,
        name: String,
        total_phases: usize,
    },
    PhaseCompleted {
        phase: usize,
        name: String,
    },
    /// Output already existed, nothing was run
    PhaseSkipped {
        phase: usize,
        name: String,
        reason: String,
    },
    PhaseFailed {
        phase: usize,
        name: String,
        error: String,
    },

    TaskStarted {
        phase: usize,
        task_id: String,
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_tasks: Option<usize>,
    },
    TaskCompleted {
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },

    AgentStarted {
        task_id: String,
        agent: String,
        description: String,
    },
    /// Streamed answer text or a tool call
    AgentMessage {
        task_id: String,
        agent: String,
        message: String,
    },
    AgentCompleted {
        task_id: String,
        agent: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    AgentFailed {
        task_id: String,
        agent: String,
        error: String,
    },

    /// A file under the project root was written
    ArtifactWritten {
        phase: usize,
        path: String,
        description: String,
    },
    /// 1-based position of a finished section in the outline
    SectionWritten {
        section_id: String,
        title: String,
        position: usize,
        total: usize,
    },
}

impl FlowLog {
    pub fn to_line(&self) -> Option<String> {
        let json = serde_json::to_string(self).ok()?;
        Some(format!("{}{}", EVENT_PREFIX, json))
    }

    /// `None` for anything that is not an event line
    pub fn parse_line(line: &str) -> Option<FlowLog> {
        let json = line.trim().strip_prefix(EVENT_PREFIX)?;
        serde_json::from_str(json).ok()
    }

    /// Write the event line to stderr
    pub fn emit(&self) {
        let Some(line) = self.to_line() else {
            return;
        };
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", line);
        let _ = stderr.flush();
    }
}

#[macro_export]
macro_rules! log_flow_start {
    ($run_id:expr, $root:expr, $phases:expr) => {
        $crate::FlowLog::FlowStarted { run_id: $run_id.to_string(), root: $root.to_string(), phases: $phases }.emit()
    };
}

#[macro_export]
macro_rules! log_flow_finish {
    ($ran:expr, $skipped:expr) => {
        $crate::FlowLog::FlowFinished { ran: $ran, skipped: $skipped }.emit()
    };
}

#[macro_export]
macro_rules! log_phase_start {
    ($phase:expr, $name:expr, $total:expr) => {
        $crate::FlowLog::PhaseStarted { phase: $phase, name: $name.to_string(), total_phases: $total }.emit()
    };
}

#[macro_export]
macro_rules! log_phase_complete {
    ($phase:expr, $name:expr) => {
        $crate::FlowLog::PhaseCompleted { phase: $phase, name: $name.to_string() }.emit()
    };
}

#[macro_export]
macro_rules! log_phase_skipped {
    ($phase:expr, $name:expr, $reason:expr) => {
        $crate::FlowLog::PhaseSkipped { phase: $phase, name: $name.to_string(), reason: $reason.to_string() }.emit()
    };
}

#[macro_export]
macro_rules! log_phase_failed {
    ($phase:expr, $name:expr, $error:expr) => {
        $crate::FlowLog::PhaseFailed { phase: $phase, name: $name.to_string(), error: $error.to_string() }.emit()
    };
}

#[macro_export]
macro_rules! log_task_start {
    ($phase:expr, $task_id:expr, $desc:expr, $total:expr) => {
        $crate::FlowLog::TaskStarted {
            phase: $phase,
            task_id: $task_id.to_string(),
            description: $desc.to_string(),
            total_tasks: Some($total),
        }
        .emit()
    };
}

#[macro_export]
macro_rules! log_task_complete {
    ($task_id:expr, $summary:expr) => {
        $crate::FlowLog::TaskCompleted { task_id: $task_id.to_string(), summary: Some($summary.to_string()) }.emit()
    };
}

#[macro_export]
macro_rules! log_task_failed {
    ($task_id:expr, $error:expr) => {
        $crate::FlowLog::TaskFailed { task_id: $task_id.to_string(), error: $error.to_string() }.emit()
    };
}

#[macro_export]
macro_rules! log_agent_start {
    ($task_id:expr, $agent:expr, $desc:expr) => {
        $crate::FlowLog::AgentStarted {
            task_id: $task_id.to_string(),
            agent: $agent.to_string(),
            description: $desc.to_string(),
        }
        .emit()
    };
}

#[macro_export]
macro_rules! log_agent_message {
    ($task_id:expr, $agent:expr, $message:expr) => {
        $crate::FlowLog::AgentMessage {
            task_id: $task_id.to_string(),
            agent: $agent.to_string(),
            message: $message.to_string(),
        }
        .emit()
    };
}

#[macro_export]
macro_rules! log_agent_complete {
    ($task_id:expr, $agent:expr, $summary:expr) => {
        $crate::FlowLog::AgentCompleted {
            task_id: $task_id.to_string(),
            agent: $agent.to_string(),
            summary: Some($summary.to_string()),
        }
        .emit()
    };
}

#[macro_export]
macro_rules! log_agent_failed {
    ($task_id:expr, $agent:expr, $error:expr) => {
        $crate::FlowLog::AgentFailed {
            task_id: $task_id.to_string(),
            agent: $agent.to_string(),
            error: $error.to_string(),
        }
        .emit()
    };
}

#[macro_export]
macro_rules! log_artifact {
    ($phase:expr, $path:expr, $desc:expr) => {
        $crate::FlowLog::ArtifactWritten { phase: $phase, path: $path.to_string(), description: $desc.to_string() }.emit()
    };
}

#[macro_export]
macro_rules! log_section_written {
    ($section_id:expr, $title:expr, $position:expr, $total:expr) => {
        $crate::FlowLog::SectionWritten {
            section_id: $section_id.to_string(),
            title: $title.to_string(),
            position: $position,
            total: $total,
        }
        .emit()
    };
}
