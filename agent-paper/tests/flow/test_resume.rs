//! Full runs and the skip-if-output-exists gates

use agent_paper::{AgentPaperState, Phase};

use super::common::{Project, ScriptedBackend, ANALYSIS_NOTES, ANALYSIS_SUMMARY, GUIDE};

#[tokio::test]
async fn test_full_run_writes_every_artifact() {
    let project = Project::new();
    let backend = ScriptedBackend::new();
    let mut flow = project.flow(project.config(&Phase::ALL), backend.clone());

    let outcome = flow.kickoff().await.unwrap();

    assert_eq!(outcome.ran, Phase::ALL.to_vec());
    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.written_sections, vec!["1", "2", "3"]);

    assert_eq!(project.read("output/guide.md"), GUIDE);
    assert_eq!(project.read("output/analysis_notes.md"), ANALYSIS_NOTES);
    assert_eq!(project.read("output/analysis.md"), ANALYSIS_SUMMARY);
    assert!(project.exists("output/outline.json"));
    assert_eq!(project.read("output/sections/01_1.md"), "Introduction text.");
    assert!(project.exists("output/report.md"));

    let paper = project.read("output/paper.md");
    assert!(paper.starts_with("# Peatland Restoration\n\n## Introduction\n\nIntroduction text.\n\n"));
    assert!(paper.ends_with("## Results\n\nResults text.\n"));

    assert_eq!(
        backend.task_ids(),
        vec![
            "initialize.requirements_task",
            "analysis.analysis_task",
            "analysis.analysis_summary_task",
            "outline.outline_creation_task",
            "outline.outline_description_task",
            "section_loop.write_section_task",
            "section_loop.review_section_task",
            "section_loop.write_section_task",
            "section_loop.review_section_task",
            "section_loop.write_section_task",
            "section_loop.review_section_task",
        ]
    );
}

#[tokio::test]
async fn test_second_run_skips_every_agent() {
    let project = Project::new();
    project
        .flow(project.config(&Phase::ALL), ScriptedBackend::new())
        .kickoff()
        .await
        .unwrap();

    let backend = ScriptedBackend::new();
    let outcome = project
        .flow(project.config(&Phase::ALL), backend.clone())
        .kickoff()
        .await
        .unwrap();

    assert!(backend.requests().is_empty());
    assert_eq!(
        outcome.skipped,
        vec![Phase::Initialize, Phase::Analysis, Phase::Outline, Phase::Sections]
    );
    assert_eq!(outcome.ran, vec![Phase::Assemble]);
    assert!(project.read("output/paper.md").contains("## Methods\n\nMethods text."));
}

#[tokio::test]
async fn test_existing_guide_and_analysis_are_used_as_inputs() {
    let project = Project::new();
    project.write("output/guide.md", "Custom guide: cite APA.");
    project.write("output/analysis.md", "Custom analysis: 40 sites.");
    let backend = ScriptedBackend::new();

    let outcome = project
        .flow(project.config(&[Phase::Initialize, Phase::Analysis, Phase::Outline]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    assert_eq!(outcome.skipped, vec![Phase::Initialize, Phase::Analysis]);
    let requests = backend.requests();
    assert_eq!(requests[0].task_id, "outline.outline_creation_task");
    assert!(requests[0].prompt.contains("Custom guide: cite APA."));
    assert!(requests[0].prompt.contains("Custom analysis: 40 sites."));
}

#[tokio::test]
async fn test_force_reruns_existing_steps() {
    let project = Project::new();
    project.write("output/guide.md", "stale guide");
    let backend = ScriptedBackend::new();

    let mut config = project.config(&[Phase::Initialize]);
    config.force = true;
    let outcome = project.flow(config, backend.clone()).kickoff().await.unwrap();

    assert_eq!(outcome.ran, vec![Phase::Initialize]);
    assert_eq!(project.read("output/guide.md"), GUIDE);
}

#[tokio::test]
async fn test_state_records_completed_phases_and_outline() {
    let project = Project::new();
    let mut flow = project.flow(project.config(&Phase::ALL), ScriptedBackend::new());
    flow.kickoff().await.unwrap();

    let state = AgentPaperState::load_or_new(&project.paths.state).unwrap();
    assert_eq!(state.id, flow.state().id);
    assert_eq!(state.completed_phases, Phase::ALL.to_vec());

    let outline = state.outline.unwrap();
    assert_eq!(outline.sections.len(), 3);
    assert!(outline.sections.iter().all(|s| s.content.is_some()));
}
