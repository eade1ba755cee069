//! End-to-end runs of the orchestration graph against throw-away skill trees.

use async_trait::async_trait;
use serde_json::json;
use skillflow_core::graph::{nodes, prompts, GraphNode, NextAction, PipelineError, PipelineState, SkillGraph};
use skillflow_core::llm::{ChatMessage, ChatModel, ChatResponse, LlmError, ScriptedChatModel};
use skillflow_core::skills::{handler_fn, PluginLoader, SkillExecutor, SkillRegistry, SkillStatus};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_skill(root: &Path, name: &str, triggers: &[&str]) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let triggers = triggers
        .iter()
        .map(|t| format!("  - \"{}\"", t))
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(
        dir.join("skill.yaml"),
        format!("name: {}\ndescription: {} skill\ntriggers:\n{}\nversion: 1.0.0\n", name, name, triggers),
    )
    .unwrap();
}

/// report_generator (with docs and schema) and email_composer
fn skill_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_skill(temp.path(), "report_generator", &["report", "sales report"]);
    write_skill(temp.path(), "email_composer", &["email", "compose"]);

    let report = temp.path().join("report_generator");
    fs::write(report.join("SKILL.md"), "# Report Generator\nCreates PDF sales reports.").unwrap();
    fs::write(
        report.join("schema.json"),
        r#"{"type": "object", "properties": {"period": {"type": "string"}}}"#,
    )
    .unwrap();
    temp
}

fn report_loader() -> PluginLoader {
    PluginLoader::new().with_builtin(
        "report_generator",
        handler_fn(|params| {
            let period = params["period"].as_str().unwrap_or("unspecified").to_string();
            Ok(json!({"status": "success", "period": period, "report_path": "/reports/sales.pdf"}))
        }),
    )
}

fn graph_for(root: &Path, loader: PluginLoader, model: Arc<dyn ChatModel>) -> SkillGraph {
    let registry = Arc::new(SkillRegistry::load(root));
    let executor = Arc::new(SkillExecutor::with_loader(registry, Arc::new(loader)));
    SkillGraph::new(executor, model)
}

#[tokio::test]
async fn test_sales_report_runs_every_node() {
    let temp = skill_tree();
    let model = Arc::new(ScriptedChatModel::new([
        r#"["report_generator"]"#,
        r#"{"period": "Q4"}"#,
        "Your Q4 sales report is ready at /reports/sales.pdf.",
    ]));
    let graph = graph_for(temp.path(), report_loader(), model.clone());

    let run = graph
        .run_with_trace(PipelineState::from_user_message("Create a Q4 sales report"))
        .await
        .unwrap();

    assert_eq!(
        run.path,
        vec![
            GraphNode::Analyze,
            GraphNode::Select,
            GraphNode::LoadContext,
            GraphNode::Execute,
            GraphNode::Respond,
        ]
    );
    let state = run.state;
    assert_eq!(state.available_skills.len(), 1);
    assert_eq!(state.available_skills[0].name, "report_generator");
    assert_eq!(state.selected_skills, vec!["report_generator"]);
    assert_eq!(state.execution_results["report_generator"]["period"], "Q4");
    assert_eq!(state.reply(), Some("Your Q4 sales report is ready at /reports/sales.pdf."));
    assert!(state.next_action.is_none());

    // parameter extraction saw the documentation and schema
    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[1][1].content.contains("Creates PDF sales reports."));
    assert!(requests[1][1].content.contains("\"period\""));
    assert!(requests[2][1].content.contains("--- report_generator result ---"));
}

#[tokio::test]
async fn test_hello_goes_straight_to_respond() {
    let temp = skill_tree();
    let model = Arc::new(ScriptedChatModel::new(["Hello! How can I help?"]));
    let graph = graph_for(temp.path(), report_loader(), model.clone());

    let mut analyzed = PipelineState::from_user_message("hello");
    nodes::analyze(&mut analyzed, graph.registry());
    assert!(analyzed.available_skills.is_empty());
    assert_eq!(analyzed.next_action, Some(NextAction::Respond));

    let run = graph
        .run_with_trace(PipelineState::from_user_message("hello"))
        .await
        .unwrap();

    assert_eq!(run.path, vec![GraphNode::Analyze, GraphNode::Respond]);
    assert_eq!(run.state.messages.len(), 2);
    assert_eq!(run.state.reply(), Some("Hello! How can I help?"));
    assert!(run.state.execution_results.is_empty());
    assert_eq!(model.call_count(), 1);
    assert!(model.requests()[0][1].content.ends_with(prompts::NO_SKILL_RESULTS));
}

#[tokio::test]
async fn test_non_json_selection_responds_without_skills() {
    let temp = skill_tree();
    let model = Arc::new(ScriptedChatModel::new(["not json", "I could not pick a skill."]));
    let graph = graph_for(temp.path(), report_loader(), model);

    let run = graph
        .run_with_trace(PipelineState::from_user_message("Create a Q4 sales report"))
        .await
        .unwrap();

    assert_eq!(run.path, vec![GraphNode::Analyze, GraphNode::Select, GraphNode::Respond]);
    assert!(run.state.selected_skills.is_empty());
    assert!(run.state.execution_results.is_empty());
}

#[tokio::test]
async fn test_unparseable_params_still_invoke_skill() {
    let temp = skill_tree();
    let model = Arc::new(ScriptedChatModel::new([
        r#"["report_generator"]"#,
        "period is Q4",
        "done",
    ]));
    let state = graph_for(temp.path(), report_loader(), model)
        .run(PipelineState::from_user_message("sales report please"))
        .await
        .unwrap();

    assert_eq!(state.execution_results["report_generator"]["period"], "unspecified");
}

#[tokio::test]
async fn test_failing_skill_still_reaches_respond() {
    let temp = skill_tree();
    let loader = PluginLoader::new().with_builtin(
        "report_generator",
        handler_fn(|_| Err(anyhow::anyhow!("sales database unreachable"))),
    );
    let model = Arc::new(ScriptedChatModel::new([
        r#"["report_generator"]"#,
        "{}",
        "Sorry, the report could not be generated.",
    ]));
    let graph = graph_for(temp.path(), loader, model.clone());

    let run = graph
        .run_with_trace(PipelineState::from_user_message("Create a Q4 sales report"))
        .await
        .unwrap();

    assert_eq!(run.path.last(), Some(&GraphNode::Respond));
    assert_eq!(
        run.state.execution_results["report_generator"],
        json!({"error": "sales database unreachable"})
    );
    assert!(model.requests()[2][1].content.contains("sales database unreachable"));
}

#[tokio::test]
async fn test_skill_without_entry_point_reports_error() {
    let temp = skill_tree();
    let model = Arc::new(ScriptedChatModel::new([r#"["email_composer"]"#, "{}", "ok"]));

    let state = graph_for(temp.path(), report_loader(), model)
        .run(PipelineState::from_user_message("compose an email to the team"))
        .await
        .unwrap();

    let error = state.execution_results["email_composer"]["error"].as_str().unwrap();
    assert!(error.starts_with("Entry point not found: "));
}

#[tokio::test]
async fn test_model_failure_aborts_with_partial_state() {
    let temp = skill_tree();
    let model = Arc::new(
        ScriptedChatModel::new([r#"["report_generator"]"#]).then_fail("upstream timeout"),
    );
    let graph = graph_for(temp.path(), report_loader(), model);

    let err = graph
        .run(PipelineState::from_user_message("Create a Q4 sales report"))
        .await
        .unwrap_err();

    match err {
        PipelineError::Model { node, source, state } => {
            assert_eq!(node, GraphNode::Execute);
            assert!(source.to_string().contains("upstream timeout"));
            assert_eq!(state.selected_skills, vec!["report_generator"]);
            assert!(state.skill_contexts.contains_key("report_generator"));
            assert!(state.execution_results.is_empty());
            assert_eq!(state.messages.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_context_is_still_executed() {
    let temp = skill_tree();
    let registry = Arc::new(SkillRegistry::load(temp.path()));
    let executor = SkillExecutor::with_loader(registry, Arc::new(report_loader()));
    let model = ScriptedChatModel::new([r#"{"anything": true}"#]);

    let mut state = PipelineState::from_user_message("run the retired skill");
    state.selected_skills = vec!["retired_skill".to_string()];

    nodes::load_context(&mut state, &executor).await;
    assert_eq!(
        state.skill_contexts["retired_skill"].error(),
        Some("Skill 'retired_skill' not found")
    );
    assert_eq!(state.next_action, Some(NextAction::ExecuteSkills));

    nodes::execute_skills(&mut state, &executor, &model).await.unwrap();
    assert_eq!(model.call_count(), 1);
    assert!(model.requests()[0][1].content.contains(prompts::NO_DOCUMENTATION));
    assert_eq!(
        state.execution_results["retired_skill"],
        json!({"error": "Skill 'retired_skill' not found"})
    );
    assert_eq!(state.next_action, Some(NextAction::Respond));
}

#[tokio::test]
async fn test_history_uses_latest_user_turn() {
    let temp = skill_tree();
    let model = Arc::new(ScriptedChatModel::new(["Hi again!"]));
    let graph = graph_for(temp.path(), report_loader(), model);

    let state = PipelineState::with_history(
        vec![
            ChatMessage::user("Create a Q4 sales report"),
            ChatMessage::assistant("Done."),
        ],
        "thanks, bye",
    );
    let run = graph.run_with_trace(state).await.unwrap();

    assert_eq!(run.path, vec![GraphNode::Analyze, GraphNode::Respond]);
    assert_eq!(run.state.messages.len(), 4);
}

#[tokio::test]
async fn test_finished_state_cannot_be_rerun() {
    let temp = skill_tree();
    let model = Arc::new(ScriptedChatModel::new(["Hi!"]));
    let graph = graph_for(temp.path(), report_loader(), model.clone());

    let mut state = PipelineState::from_user_message("hello");
    state.selected_skills = vec!["report_generator".to_string()];
    state.execution_results.insert(
        "report_generator".to_string(),
        json!({"status": "success", "old": true}),
    );

    let err = graph.run(state).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidState(_)));
    assert!(err.to_string().contains("selected_skills"));
    assert_eq!(model.call_count(), 0);

    // carrying only the conversation forward is a valid next turn
    let next = PipelineState::with_history(
        vec![ChatMessage::user("Create a Q4 sales report"), ChatMessage::assistant("Done.")],
        "hello",
    );
    let state = graph.run(next).await.unwrap();
    assert_eq!(state.reply(), Some("Hi!"));
    assert!(state.selected_skills.is_empty());
    assert!(state.execution_results.is_empty());
}

/// Answers by prompt so concurrent runs cannot steal each other's replies
struct PromptRoutedModel;

#[async_trait]
impl ChatModel for PromptRoutedModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or_default();
        let reply = if system == prompts::SELECT {
            r#"["report_generator"]"#
        } else if system == prompts::PARAMETERS {
            r#"{"period": "Q1"}"#
        } else {
            "done"
        };
        Ok(ChatResponse::new(reply))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_share_registry() {
    let temp = skill_tree();
    let graph = Arc::new(graph_for(temp.path(), report_loader(), Arc::new(PromptRoutedModel)));

    let mut handles = Vec::new();
    for i in 0..8 {
        let graph = Arc::clone(&graph);
        let query = if i % 2 == 0 { "Create a Q1 sales report" } else { "hello" };
        handles.push(tokio::spawn(async move {
            graph.run(PipelineState::from_user_message(query)).await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let state = handle.await.unwrap().unwrap();
        assert_eq!(state.reply(), Some("done"));
        if i % 2 == 0 {
            let result = &state.execution_results["report_generator"];
            assert_eq!(skillflow_core::skills::skill_status(result), Some(SkillStatus::Success));
        } else {
            assert!(state.execution_results.is_empty());
        }
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_executable_entry_point_runs_as_process() {
    use std::os::unix::fs::PermissionsExt;

    let temp = skill_tree();
    let entry = temp.path().join("email_composer").join("main");
    fs::write(
        &entry,
        "#!/bin/sh\nread request\necho '{\"status\": \"success\", \"draft\": \"Hello team\"}'\n",
    )
    .unwrap();
    fs::set_permissions(&entry, fs::Permissions::from_mode(0o755)).unwrap();

    let model = Arc::new(ScriptedChatModel::new([r#"["email_composer"]"#, r#"{"to": "team"}"#, "Drafted."]));
    let state = graph_for(temp.path(), PluginLoader::new(), model)
        .run(PipelineState::from_user_message("compose an email"))
        .await
        .unwrap();

    assert_eq!(state.execution_results["email_composer"]["draft"], "Hello team");
}
