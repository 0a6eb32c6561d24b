//! Flow steps wrapped in task events

use anyhow::Result;
use agent_paper_sdk::{log_task_complete, log_task_failed, log_task_start};
use std::future::Future;
use std::time::Instant;

/// Where a task sits in its phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    pub phase: usize,
    /// 1-based
    pub task_number: usize,
    pub total_tasks: usize,
}

impl TaskContext {
    /// The only task of its phase
    pub fn single(phase: usize) -> Self {
        Self::nth(phase, 0, 1)
    }

    /// The `index`-th (0-based) of `total` tasks
    pub fn nth(phase: usize, index: usize, total: usize) -> Self {
        Self {
            phase,
            task_number: index + 1,
            total_tasks: total,
        }
    }
}

/// Run `executor` between a task-started and a task-completed (or failed) event.
///
/// The executor yields its result and a one-line summary for the completion
/// event. Errors are logged with their full context chain and returned as is.
pub async fn execute_task<F, Fut, R>(
    task_id: impl Into<String>,
    description: impl Into<String>,
    ctx: TaskContext,
    executor: F,
) -> Result<R>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(R, String)>>,
{
    let task_id = task_id.into();
    log_task_start!(ctx.phase, &task_id, description.into(), ctx.total_tasks);
    let started = Instant::now();

    let outcome = executor().await;
    let elapsed = started.elapsed();
    tracing::debug!(
        task_id = %task_id,
        task = ctx.task_number,
        total = ctx.total_tasks,
        elapsed_ms = elapsed.as_millis() as u64,
        ok = outcome.is_ok(),
        "task finished"
    );

    match outcome {
        Ok((result, summary)) => {
            log_task_complete!(&task_id, format!("{} ({:.1}s)", summary, elapsed.as_secs_f64()));
            Ok(result)
        }
        Err(e) => {
            log_task_failed!(&task_id, format!("{:#}", e));
            Err(e)
        }
    }
}
