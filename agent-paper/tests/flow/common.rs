//! Common utilities for flow tests: scripted agents, scripted reviewers and
//! temporary project roots

use agent_paper::crew::{
    AgentBackend, AgentRequest, AgentResponse, CrewRuntime, HumanFeedback, NoFeedback,
};
use agent_paper::{AgentPaperFlow, FlowConfig, Paths, Phase};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TOPIC: &str = "Peatland restoration";
pub const GUIDE: &str = "# Writing Guide\nAudience: land managers.";
pub const ANALYSIS_NOTES: &str = "Detailed notes: water table rose 12 cm.";
pub const ANALYSIS_SUMMARY: &str = "- Water table rose 12 cm after rewetting.";

pub const OUTLINE_JSON: &str = r#"{
  "title": "Peatland Restoration",
  "sections": [
    {"id": "1", "title": "Introduction", "why": "Context",
     "subsections": [{"id": "1.1", "title": "Background", "why": "History"}]},
    {"id": "2", "title": "Methods", "why": "Reproducibility", "how": "Field survey"},
    {"id": "3", "title": "Results", "why": "Evidence", "data": "Water table series"}
  ],
  "review": {"topic_alignment": "good", "structure_coherence": "good", "completeness": "good"}
}"#;

/// Answers every task with canned text and records each request
#[derive(Default)]
pub struct ScriptedBackend {
    requests: Mutex<Vec<AgentRequest>>,
    /// Task id that fails instead of answering
    fail_on: Option<String>,
    /// Replaces the outline JSON answer
    outline_answer: Option<String>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(task_id: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(task_id.to_string()),
            ..Self::default()
        })
    }

    pub fn with_outline_answer(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            outline_answer: Some(answer.to_string()),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.task_id).collect()
    }

    fn answer(&self, request: &AgentRequest) -> String {
        if request.prompt.contains("Human feedback on that answer") {
            return format!("Revised answer for {}", request.task_id);
        }
        match request.task_id.as_str() {
            "initialize.requirements_task" => GUIDE.to_string(),
            "analysis.analysis_task" => ANALYSIS_NOTES.to_string(),
            "analysis.analysis_summary_task" => ANALYSIS_SUMMARY.to_string(),
            "outline.outline_creation_task" => "1. Introduction\n2. Methods\n3. Results".to_string(),
            "outline.outline_description_task" => format!(
                "Here is the outline:\n```json\n{}\n```",
                self.outline_answer.as_deref().unwrap_or(OUTLINE_JSON)
            ),
            "section_loop.write_section_task" => {
                format!("Draft of {}", section_title(&request.prompt))
            }
            "section_loop.review_section_task" => {
                let title = section_title(&request.prompt);
                format!("## {}\n\n{} text.", title, title)
            }
            other => format!("Answer for {}", other),
        }
    }
}

/// Section title quoted in the section crew's prompts
pub fn section_title(prompt: &str) -> String {
    for marker in ["Write the section \"", "Review the draft of \""] {
        if let Some(start) = prompt.find(marker) {
            let rest = &prompt[start + marker.len()..];
            if let Some(end) = rest.find('"') {
                return rest[..end].to_string();
            }
        }
    }
    "unknown".to_string()
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_on.as_deref() == Some(request.task_id.as_str()) {
            anyhow::bail!("scripted failure for {}", request.task_id);
        }
        Ok(AgentResponse::text(self.answer(&request)))
    }
}

/// Replays a fixed list of reviews, then accepts everything
pub struct ScriptedFeedback {
    replies: Mutex<VecDeque<Option<String>>>,
    pub reviewed: Mutex<Vec<String>>,
}

impl ScriptedFeedback {
    pub fn new(replies: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            reviewed: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HumanFeedback for ScriptedFeedback {
    async fn review(&self, task_name: &str, _answer: &str) -> Result<Option<String>> {
        self.reviewed.lock().unwrap().push(task_name.to_string());
        Ok(self.replies.lock().unwrap().pop_front().flatten())
    }
}

/// Temporary project root with helpers to seed `output/`
pub struct Project {
    pub dir: TempDir,
    pub paths: Paths,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        paths.ensure_output_dir().unwrap();
        Self { dir, paths }
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.dir.path().join(relative).exists()
    }

    /// Seed the guide, analysis and outline so only sections remain
    pub fn seed_until_outline(&self) {
        self.write("output/guide.md", GUIDE);
        self.write("output/analysis.md", ANALYSIS_SUMMARY);
        self.write("output/outline.json", OUTLINE_JSON);
    }

    pub fn config(&self, phases: &[Phase]) -> FlowConfig {
        FlowConfig {
            paths: self.paths.clone(),
            topic: Some(TOPIC.to_string()),
            phases: phases.to_vec(),
            force: false,
        }
    }

    pub fn flow(&self, config: FlowConfig, backend: Arc<ScriptedBackend>) -> AgentPaperFlow {
        self.flow_with_feedback(config, backend, Arc::new(NoFeedback))
    }

    pub fn flow_with_feedback(
        &self,
        config: FlowConfig,
        backend: Arc<ScriptedBackend>,
        feedback: Arc<dyn HumanFeedback>,
    ) -> AgentPaperFlow {
        let runtime = CrewRuntime::new(backend, feedback, self.paths.clone());
        AgentPaperFlow::new(config, runtime).unwrap()
    }
}
