//! Human review of task answers

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Upper bound on revise-and-review rounds for one task
pub const MAX_FEEDBACK_ROUNDS: usize = 5;

#[async_trait]
pub trait HumanFeedback: Send + Sync {
    /// Show `answer` for `task_name` and collect feedback.
    ///
    /// `Ok(None)` accepts the answer; `Ok(Some(text))` asks for a revision.
    async fn review(&self, task_name: &str, answer: &str) -> Result<Option<String>>;
}

/// Accepts every answer without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

#[async_trait]
impl HumanFeedback for NoFeedback {
    async fn review(&self, _task_name: &str, _answer: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Reads feedback from the terminal. An empty line ends the input;
/// an empty first line accepts the answer.
pub struct StdinFeedback {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinFeedback {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinFeedback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HumanFeedback for StdinFeedback {
    async fn review(&self, task_name: &str, answer: &str) -> Result<Option<String>> {
        println!("\n\x1b[1;35m─── Review: {} ───\x1b[0m", task_name);
        println!("{}", answer.trim());
        println!(
            "\x1b[35mProvide feedback to revise the answer, or press Enter to accept. \
             Finish feedback with an empty line.\x1b[0m"
        );

        let mut lines = self.lines.lock().await;
        let mut feedback = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read feedback from stdin")?
        {
            if line.trim().is_empty() {
                break;
            }
            feedback.push(line);
        }

        Ok(normalize_feedback(&feedback.join("\n")))
    }
}

/// Empty feedback means the answer is accepted
pub fn normalize_feedback(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
