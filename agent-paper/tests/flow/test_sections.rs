//! The section loop: ordering, accumulated context and per-section gates

use agent_paper::state::load_outline;
use agent_paper::Phase;

use super::common::{Project, ScriptedBackend};

fn write_prompts(backend: &ScriptedBackend) -> Vec<String> {
    backend
        .requests()
        .into_iter()
        .filter(|r| r.task_id == "section_loop.write_section_task")
        .map(|r| r.prompt)
        .collect()
}

#[tokio::test]
async fn test_each_section_sees_all_previous_sections() {
    let project = Project::new();
    project.seed_until_outline();
    let backend = ScriptedBackend::new();

    project
        .flow(project.config(&[Phase::Sections]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    let prompts = write_prompts(&backend);
    assert_eq!(prompts.len(), 3);

    assert!(prompts[0].contains("None yet; this is the first section."));
    assert!(prompts[1].contains("## Introduction\n\nIntroduction text."));
    assert!(!prompts[1].contains("## Methods"));
    assert!(prompts[2].contains("## Introduction\n\nIntroduction text.\n\n## Methods\n\nMethods text."));
}

#[tokio::test]
async fn test_section_prompt_carries_brief_and_outline() {
    let project = Project::new();
    project.seed_until_outline();
    let backend = ScriptedBackend::new();

    project
        .flow(project.config(&[Phase::Sections]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    let first = &write_prompts(&backend)[0];
    assert!(first.contains("- [1] Introduction"));
    assert!(first.contains("  - [1.1] Background"));
    // table of contents of the whole outline
    assert!(first.contains("- Results"));

    let requests = backend.requests();
    assert!(requests[0].system_prompt.contains("section 1 of 3 of \"Peatland Restoration\""));
}

#[tokio::test]
async fn test_existing_section_file_is_reused() {
    let project = Project::new();
    project.seed_until_outline();
    project.write("output/sections/02_2.md", "Existing methods.");
    let backend = ScriptedBackend::new();

    let outcome = project
        .flow(project.config(&[Phase::Sections]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    assert_eq!(outcome.written_sections, vec!["1", "3"]);
    let prompts = write_prompts(&backend);
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("## Methods\n\nExisting methods."));
    assert_eq!(project.read("output/sections/02_2.md"), "Existing methods.");
}

#[tokio::test]
async fn test_outline_json_gains_section_content() {
    let project = Project::new();
    project.seed_until_outline();

    project
        .flow(project.config(&[Phase::Sections]), ScriptedBackend::new())
        .kickoff()
        .await
        .unwrap();

    let outline = load_outline(&project.paths.outline).unwrap();
    let contents: Vec<&str> = outline
        .sections
        .iter()
        .map(|s| s.content.as_deref().unwrap())
        .collect();
    assert_eq!(contents, vec!["Introduction text.", "Methods text.", "Results text."]);
    // subsections are written as part of their parent
    assert!(outline.sections[0].subsections[0].content.is_none());
}

#[tokio::test]
async fn test_failed_section_keeps_earlier_sections() {
    let project = Project::new();
    project.seed_until_outline();
    project.write("output/sections/01_1.md", "Intro already done.");
    let backend = ScriptedBackend::failing_on("section_loop.review_section_task");

    let err = project
        .flow(project.config(&[Phase::Sections]), backend)
        .kickoff()
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("scripted failure"));
    assert!(project.exists("output/sections/01_1.md"));
    assert!(!project.exists("output/sections/02_2.md"));

    let outline = load_outline(&project.paths.outline).unwrap();
    assert_eq!(outline.sections[0].content.as_deref(), Some("Intro already done."));
}
