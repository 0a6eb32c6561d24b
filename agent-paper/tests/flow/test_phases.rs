//! Phase selection, preconditions and failures

use agent_paper::Phase;

use super::common::{Project, ScriptedBackend, OUTLINE_JSON};

#[tokio::test]
async fn test_assemble_only_reads_section_files() {
    let project = Project::new();
    project.write("output/outline.json", OUTLINE_JSON);
    project.write("output/sections/01_1.md", "One.");
    project.write("output/sections/02_2.md", "Two.");
    project.write("output/sections/03_3.md", "Three.");
    let backend = ScriptedBackend::new();

    let outcome = project
        .flow(project.config(&[Phase::Assemble]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    assert!(backend.requests().is_empty());
    assert_eq!(outcome.document, Some(project.paths.document.clone()));
    assert_eq!(
        project.read("output/paper.md"),
        "# Peatland Restoration\n\n## Introduction\n\nOne.\n\n## Methods\n\nTwo.\n\n## Results\n\nThree.\n"
    );
}

#[tokio::test]
async fn test_reassemble_picks_up_edited_section_file() {
    let project = Project::new();
    project
        .flow(project.config(&Phase::ALL), ScriptedBackend::new())
        .kickoff()
        .await
        .unwrap();
    assert!(project.read("output/outline.json").contains("Methods text."));

    project.write("output/sections/02_2.md", "Edited methods.");
    let backend = ScriptedBackend::new();
    project
        .flow(project.config(&[Phase::Assemble]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    assert!(backend.requests().is_empty());
    let paper = project.read("output/paper.md");
    assert!(paper.contains("## Methods\n\nEdited methods.\n"));
    assert!(!paper.contains("Methods text."));
}

#[tokio::test]
async fn test_assemble_fails_on_missing_section() {
    let project = Project::new();
    project.write("output/outline.json", OUTLINE_JSON);
    project.write("output/sections/01_1.md", "One.");

    let err = project
        .flow(project.config(&[Phase::Assemble]), ScriptedBackend::new())
        .kickoff()
        .await
        .unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("Phase 4 (assemble) failed"));
    assert!(message.contains("Section 'Methods' (2) has no content"));
    assert!(!project.exists("output/paper.md"));
}

#[tokio::test]
async fn test_sections_require_an_outline() {
    let project = Project::new();

    let err = project
        .flow(project.config(&[Phase::Sections]), ScriptedBackend::new())
        .kickoff()
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("No outline available"));
}

#[tokio::test]
async fn test_invalid_outline_answer_is_an_error() {
    let project = Project::new();
    let backend = ScriptedBackend::with_outline_answer("not json at all");

    let err = project
        .flow(project.config(&[Phase::Outline]), backend)
        .kickoff()
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("did not return a valid outline"));
    assert!(!project.exists("output/outline.json"));
}

#[tokio::test]
async fn test_outline_without_sections_is_rejected() {
    let project = Project::new();
    let backend = ScriptedBackend::with_outline_answer(r#"{"title": "Empty", "sections": []}"#);

    let err = project
        .flow(project.config(&[Phase::Outline]), backend)
        .kickoff()
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("without sections"));
}

#[tokio::test]
async fn test_failed_phase_is_not_marked_completed() {
    let project = Project::new();
    let backend = ScriptedBackend::failing_on("analysis.analysis_summary_task");

    let mut flow = project.flow(
        project.config(&[Phase::Initialize, Phase::Analysis]),
        backend,
    );
    assert!(flow.kickoff().await.is_err());

    assert!(flow.state().is_completed(Phase::Initialize));
    assert!(!flow.state().is_completed(Phase::Analysis));
    assert!(project.exists("output/guide.md"));
    // the first analysis task finished and wrote its own output file
    assert!(project.exists("output/analysis_notes.md"));
    assert!(!project.exists("output/analysis.md"));
}
