//! Project paths and environment
//!
//! Every artifact the flow produces lives under `<root>/output`. The existence
//! of these files is what lets a rerun pick up where the previous run stopped.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable holding the default model for all agents
pub const MODEL_ENV: &str = "AGENT_PAPER_MODEL";

/// Environment variable read by the Claude Code CLI
pub const RUNTIME_MODEL_ENV: &str = "ANTHROPIC_MODEL";

/// Resolved locations of every flow artifact
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    /// Requirements guide written by the initialize crew
    pub guide: PathBuf,
    /// Data analysis summary written by the analysis crew
    pub analysis: PathBuf,
    /// Outline (and section contents once written)
    pub outline: PathBuf,
    pub sections_dir: PathBuf,
    pub state: PathBuf,
    /// Final assembled document
    pub document: PathBuf,
    /// Directory checked for crew YAML overrides
    pub config_dir: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let output_dir = root.join("output");
        Self {
            guide: output_dir.join("guide.md"),
            analysis: output_dir.join("analysis.md"),
            outline: output_dir.join("outline.json"),
            sections_dir: output_dir.join("sections"),
            state: output_dir.join("state.json"),
            document: output_dir.join("paper.md"),
            config_dir: root.join("config"),
            output_dir,
            root,
        }
    }

    /// Use `root` if given, otherwise the current directory
    pub fn from_root_or_cwd(root: Option<PathBuf>) -> Result<Self> {
        let root = match root {
            Some(dir) => dir
                .canonicalize()
                .with_context(|| format!("Invalid project root '{}'", dir.display()))?,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };
        Ok(Self::new(root))
    }

    /// Replace the final document location
    pub fn with_document(mut self, document: Option<PathBuf>) -> Self {
        if let Some(path) = document {
            self.document = if path.is_absolute() {
                path
            } else {
                self.root.join(path)
            };
        }
        self
    }

    /// Create the output and sections directories if missing
    pub fn ensure_output_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.sections_dir).with_context(|| {
            format!("Failed to create {}", self.sections_dir.display())
        })
    }

    /// Resolve a crew-relative output file (e.g. `guide.md`) under `output/`
    pub fn output_file(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path.strip_prefix("output").unwrap_or(path))
        }
    }

    /// Path of the written section file for the `index`-th (0-based) section
    pub fn section_file(&self, index: usize, section_id: &str) -> PathBuf {
        let slug: String = section_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.sections_dir.join(format!("{:02}_{}.md", index + 1, slug))
    }

    /// Path relative to the project root, for display
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Load `<root>/.env` when present
pub fn load_env(root: &Path) {
    let env_file = root.join(".env");
    if env_file.is_file() {
        match dotenv::from_path(&env_file) {
            Ok(()) => tracing::debug!(path = %env_file.display(), "loaded environment file"),
            Err(e) => tracing::warn!(path = %env_file.display(), error = %e, "failed to load environment file"),
        }
    }
}

/// Model from the CLI flag, else from `AGENT_PAPER_MODEL`
pub fn resolve_model(cli_model: Option<String>) -> Option<String> {
    cli_model
        .or_else(|| std::env::var(MODEL_ENV).ok())
        .filter(|m| !m.trim().is_empty())
}
