//! Section loop and document assembly

use anyhow::{bail, Context, Result};
use tokio::fs;

use agent_paper_sdk::{log_artifact, log_info, log_progress, log_section_written};

use super::{AgentPaperFlow, Phase, StepResult};
use crate::state::{load_outline, save_outline, OutlineStructure};
use crate::utils::{execute_task, TaskContext};

const NO_PREVIOUS_SECTIONS: &str = "None yet; this is the first section.";

impl AgentPaperFlow {
    /// Outline held in state, else the one saved on disk
    fn current_outline(&self) -> Result<OutlineStructure> {
        if let Some(outline) = &self.state.outline {
            return Ok(outline.clone());
        }
        let path = &self.paths().outline;
        if path.exists() {
            return load_outline(path);
        }
        bail!(
            "No outline available. Run the outline phase first or provide {}",
            self.paths().display(path)
        )
    }

    /// Write every top-level section in order, each one seeing the full text of
    /// the sections before it
    pub(super) async fn section_loop(&mut self) -> Result<StepResult> {
        let mut outline = self.current_outline()?;
        let total = outline.sections.len();
        if total == 0 {
            bail!("The outline has no sections to write");
        }

        let files: Vec<_> = outline
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| self.paths().section_file(i, &s.id))
            .collect();
        let pending = files.iter().filter(|f| !self.already_done(f)).count();

        if pending == 0 {
            for (section, file) in outline.sections.iter_mut().zip(&files) {
                section.content = Some(read_section(file).await?);
            }
            save_outline(&self.paths().outline, &outline)?;
            self.state.outline = Some(outline);
            return Ok(StepResult::Skipped(format!(
                "all {} section files exist",
                total
            )));
        }

        self.begin(Phase::Sections);
        log_info!("{} of {} sections to write", pending, total);

        let crew = crate::crews::section_loop(&self.runtime)?;
        let base_inputs = self.base_inputs().await?;
        let paper_title = if outline.title.trim().is_empty() {
            base_inputs.get("topic").cloned().unwrap_or_default()
        } else {
            outline.title.clone()
        };
        let toc = outline.render_toc();
        let mut previous = String::new();

        for (index, file) in files.iter().enumerate() {
            let (id, title, brief) = {
                let section = &outline.sections[index];
                (section.id.clone(), section.title.clone(), section.render_brief(0))
            };

            let content = if self.already_done(file) {
                log_info!("Section {} already written: {}", id, self.paths().display(file));
                read_section(file).await?
            } else {
                let mut inputs = base_inputs.clone();
                inputs.insert("paper_title".to_string(), paper_title.clone());
                inputs.insert("outline_toc".to_string(), toc.clone());
                inputs.insert("section_id".to_string(), id.clone());
                inputs.insert("section_title".to_string(), title.clone());
                inputs.insert("section_brief".to_string(), brief);
                inputs.insert("section_number".to_string(), (index + 1).to_string());
                inputs.insert("section_total".to_string(), total.to_string());
                inputs.insert(
                    "previous_sections".to_string(),
                    if previous.is_empty() {
                        NO_PREVIOUS_SECTIONS.to_string()
                    } else {
                        previous.clone()
                    },
                );

                let ctx = TaskContext::nth(Phase::Sections.number(), index, total);
                let raw = execute_task(
                    format!("section_{}", id),
                    format!("Write section {}: {}", id, title),
                    ctx,
                    || async {
                        let output = crew.kickoff(&inputs).await?;
                        let summary = format!("{} chars", output.raw.len());
                        Ok((output.raw, summary))
                    },
                )
                .await?;

                let content = strip_leading_heading(&raw, &title);
                fs::write(file, &content)
                    .await
                    .with_context(|| format!("Failed to write section: {}", file.display()))?;
                log_artifact!(
                    Phase::Sections.number(),
                    self.paths().display(file),
                    format!("Section {}: {}", id, title)
                );
                log_section_written!(&id, &title, index + 1, total);
                self.outcome.written_sections.push(id.clone());
                content
            };

            previous.push_str(&format!("## {}\n\n{}\n\n", title, content.trim()));
            outline.sections[index].content = Some(content);

            save_outline(&self.paths().outline, &outline)?;
            self.state.outline = Some(outline.clone());
            self.state.save(&self.paths().state)?;
            log_progress!(index + 1, total, "sections");
        }

        Ok(StepResult::Ran)
    }

    /// Fill section contents from their files when the section loop is not run.
    /// A section file always wins over the copy stored in the outline.
    pub(super) async fn load_written_sections(&mut self) -> Result<()> {
        let Some(mut outline) = self.state.outline.take() else {
            return Ok(());
        };
        for (index, section) in outline.sections.iter_mut().enumerate() {
            let file = self.paths().section_file(index, &section.id);
            if file.exists() {
                section.content = Some(read_section(&file).await?);
            }
        }
        self.state.outline = Some(outline);
        Ok(())
    }
}

async fn read_section(path: &std::path::Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read section: {}", path.display()))
}

/// Drop a first-line heading that repeats the section title
pub fn strip_leading_heading(content: &str, title: &str) -> String {
    let content = content.trim();
    let title = title.trim().to_lowercase();
    let (first, rest) = content.split_once('\n').unwrap_or((content, ""));
    if first.starts_with('#') && !title.is_empty() {
        let heading = first.trim_start_matches('#').trim().to_lowercase();
        if heading.contains(&title) {
            return rest.trim().to_string();
        }
    }
    content.to_string()
}

/// `# title` followed by `## section` and its content for every top-level section
pub fn compose_document(outline: &OutlineStructure, topic: Option<&str>) -> Result<String> {
    let title = [Some(outline.title.as_str()), topic]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or("Untitled");

    let mut document = format!("# {}\n\n", title);
    for section in &outline.sections {
        let content = section
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .with_context(|| {
                format!(
                    "Section '{}' ({}) has no content. Run the sections phase first",
                    section.title, section.id
                )
            })?;
        document.push_str(&format!("## {}\n\n{}\n\n", section.title, content));
    }

    Ok(format!("{}\n", document.trim_end()))
}
