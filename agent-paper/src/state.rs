//! Flow state: the paper outline and run bookkeeping

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::flow::Phase;

/// One section of the outline, possibly with nested subsections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub id: String,
    pub title: String,
    /// Why the section exists in the paper
    pub why: String,
    /// How the section should make its point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how: Option<String>,
    /// Data the section draws on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default)]
    pub subsections: Vec<OutlineSection>,
    /// Written text, filled in by the section loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl OutlineSection {
    /// Markdown brief of this section and its subsections for writer prompts
    pub fn render_brief(&self, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        let mut out = format!("{}- [{}] {}\n", indent, self.id, self.title);
        out.push_str(&format!("{}  why: {}\n", indent, self.why));
        if let Some(how) = &self.how {
            out.push_str(&format!("{}  how: {}\n", indent, how));
        }
        if let Some(data) = &self.data {
            out.push_str(&format!("{}  data: {}\n", indent, data));
        }
        for sub in &self.subsections {
            out.push_str(&sub.render_brief(depth + 1));
        }
        out
    }
}

/// Reviewer verdict attached to the outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineReview {
    pub topic_alignment: String,
    pub structure_coherence: String,
    pub completeness: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineStructure {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<OutlineSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<OutlineReview>,
}

impl OutlineStructure {
    /// Depth-first walk over every section, yielding `(depth, section)`
    pub fn walk(&self) -> Vec<(usize, &OutlineSection)> {
        fn visit<'a>(
            sections: &'a [OutlineSection],
            depth: usize,
            out: &mut Vec<(usize, &'a OutlineSection)>,
        ) {
            for section in sections {
                out.push((depth, section));
                visit(&section.subsections, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        visit(&self.sections, 0, &mut out);
        out
    }

    /// Number of sections at every depth
    pub fn section_count(&self) -> usize {
        self.walk().len()
    }

    /// Markdown table of contents
    pub fn render_toc(&self) -> String {
        self.walk()
            .iter()
            .map(|(depth, s)| format!("{}- {}\n", "  ".repeat(*depth), s.title))
            .collect()
    }
}

/// Read an outline from JSON
pub fn load_outline(path: &Path) -> Result<OutlineStructure> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read outline: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse outline JSON from: {}", path.display()))
}

/// Write an outline as pretty JSON
pub fn save_outline(path: &Path, outline: &OutlineStructure) -> Result<()> {
    let json = serde_json::to_string_pretty(outline)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write outline: {}", path.display()))
}

/// State carried through one flow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPaperState {
    /// Run identifier, assigned when the state is first created
    pub id: Option<String>,
    #[serde(default)]
    pub outline: Option<OutlineStructure>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_phases: Vec<Phase>,
}

impl AgentPaperState {
    pub fn new() -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            outline: None,
            started_at: Utc::now(),
            completed_phases: Vec::new(),
        }
    }

    /// Resume the state saved by a previous run, or start fresh
    pub fn load_or_new(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let mut state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
        if state.id.is_none() {
            state.id = Some(Uuid::new_v4().to_string());
        }
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write state file: {}", path.display()))
    }

    pub fn mark_completed(&mut self, phase: Phase) {
        if !self.completed_phases.contains(&phase) {
            self.completed_phases.push(phase);
        }
    }

    pub fn is_completed(&self, phase: Phase) -> bool {
        self.completed_phases.contains(&phase)
    }
}

impl Default for AgentPaperState {
    fn default() -> Self {
        Self::new()
    }
}
