//! Crew configuration overrides, human review and agent tool grants

use agent_paper::crew::ToolKind;
use agent_paper::Phase;

use super::common::{
    Project, ScriptedBackend, ScriptedFeedback, ANALYSIS_NOTES, ANALYSIS_SUMMARY, GUIDE,
};

#[tokio::test]
async fn test_project_config_overrides_builtin_tasks() {
    let project = Project::new();
    project.write(
        "config/initialize/tasks.yaml",
        r#"
custom_task:
  description: Write a one-page guide about {topic}.
  expected_output: A short guide.
  agent: requirements_agent
"#,
    );
    let backend = ScriptedBackend::new();

    project
        .flow(project.config(&[Phase::Initialize]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    assert_eq!(backend.task_ids(), vec!["initialize.custom_task"]);
    let prompt = &backend.requests()[0].prompt;
    assert!(prompt.contains("Write a one-page guide about Peatland restoration."));
    assert_eq!(project.read("output/guide.md"), "Answer for initialize.custom_task");
}

#[tokio::test]
async fn test_broken_override_fails_the_phase() {
    let project = Project::new();
    project.write(
        "config/initialize/tasks.yaml",
        "custom_task:\n  description: x\n  expected_output: y\n  agent: nobody\n",
    );

    let err = project
        .flow(project.config(&[Phase::Initialize]), ScriptedBackend::new())
        .kickoff()
        .await
        .unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("Phase 0 (initialize) failed"));
    assert!(message.contains("nobody"));
    assert!(!project.exists("output/guide.md"));
}

#[tokio::test]
async fn test_human_feedback_revises_the_guide() {
    let project = Project::new();
    let backend = ScriptedBackend::new();
    let feedback = ScriptedFeedback::new(vec![Some("Add a section on tone.")]);

    project
        .flow_with_feedback(
            project.config(&[Phase::Initialize]),
            backend.clone(),
            feedback.clone(),
        )
        .kickoff()
        .await
        .unwrap();

    assert_eq!(
        project.read("output/guide.md"),
        "Revised answer for initialize.requirements_task"
    );
    // reviewed once with feedback, then accepted
    assert_eq!(
        *feedback.reviewed.lock().unwrap(),
        vec!["requirements_task", "requirements_task"]
    );

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].prompt.contains(&format!("Your previous answer:\n{}", GUIDE.trim())));
    assert!(requests[1].prompt.contains("Human feedback on that answer:\nAdd a section on tone."));
}

#[tokio::test]
async fn test_only_human_input_tasks_are_reviewed() {
    let project = Project::new();
    project.write("output/guide.md", GUIDE);
    let feedback = ScriptedFeedback::new(vec![]);

    project
        .flow_with_feedback(
            project.config(&[Phase::Analysis]),
            ScriptedBackend::new(),
            feedback.clone(),
        )
        .kickoff()
        .await
        .unwrap();

    assert_eq!(*feedback.reviewed.lock().unwrap(), vec!["analysis_task"]);
}

#[tokio::test]
async fn test_analysis_agents_get_their_tools() {
    let project = Project::new();
    let backend = ScriptedBackend::new();

    project
        .flow(project.config(&[Phase::Analysis]), backend.clone())
        .kickoff()
        .await
        .unwrap();

    let requests = backend.requests();
    assert_eq!(requests[0].task_id, "analysis.analysis_task");
    assert!(requests[0].tools.contains(&ToolKind::DataRead));
    assert!(requests[0].tools.contains(&ToolKind::DirectoryRead));
    assert_eq!(requests[0].max_turns, Some(30));

    // the summary only sees the analysis notes
    assert!(requests[1]
        .prompt
        .contains(&format!("### analysis_task\n{}", ANALYSIS_NOTES)));
    assert_eq!(project.read("output/analysis.md"), ANALYSIS_SUMMARY);
}
