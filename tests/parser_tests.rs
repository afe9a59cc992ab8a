// ABOUTME: Integration tests for the workflow parser and job definition store
// ABOUTME: Covers file loading, overload merging and cycle detection across inheritance chains

use serde_json::json;
use tempfile::TempDir;
use tokio::fs;

use recognizer::parser::{
    JobKind, JobType, Next, ParserError, SystemAction, WorkflowManager, WorkflowParser,
};

mod common;
use common::{TestEnvironment, TestWorkflowBuilder};

#[tokio::test]
async fn test_parse_workflow_file() {
    let env = TestEnvironment::new();
    let builder = TestWorkflowBuilder::new("start")
        .with_global("debug", json!(true))
        .with_global("logLevel", json!("WARNING"))
        .add_log("start", "hello")
        .add_calculate("sum", json!({"x": "1 + 2"}), json!({"total": "x"}));
    let path = env.create_workflow_file("basic", &builder).await;

    let workflow = WorkflowParser::new().parse_file(&path).await.unwrap();
    assert_eq!(workflow.begin, "start");
    assert_eq!(workflow.job_names(), vec!["start", "sum"]);
    assert!(workflow.globals.debug);

    let mut manager = WorkflowManager::from_workflow(workflow);
    let job = manager.get_job("start").unwrap().unwrap();
    match &job.kind {
        JobKind::System(payload) => assert_eq!(payload.action, SystemAction::Log),
        other => panic!("unexpected kind {:?}", other),
    }
}

#[tokio::test]
async fn test_rejects_wrong_extension_and_bad_json() {
    let temp_dir = TempDir::new().unwrap();
    let yaml = temp_dir.path().join("flow.yaml");
    fs::write(&yaml, "{}").await.unwrap();
    assert!(matches!(
        WorkflowParser::new().parse_file(&yaml).await,
        Err(ParserError::InvalidFormat(_))
    ));

    let broken = temp_dir.path().join("flow.json");
    fs::write(&broken, "{ not json").await.unwrap();
    assert!(matches!(
        WorkflowParser::new().parse_file(&broken).await,
        Err(ParserError::Json(_))
    ));
}

#[test]
fn test_job_without_type_is_rejected() {
    let result = WorkflowManager::from_json(r#"{"begin": "a", "jobs": {"a": {"next": "b"}}}"#);
    assert!(matches!(result, Err(ParserError::MissingField { .. })));
}

#[test]
fn test_overload_merges_nested_fields() {
    let mut manager = TestWorkflowBuilder::new("child")
        .with_job(
            "base",
            json!({
                "type": "System",
                "description": "base",
                "limits": {"maxCount": 3, "exit": "base"},
                "system": {"type": "Log", "log": {"message": "from base", "levels": ["INFO"]}}
            }),
        )
        .with_job(
            "child",
            json!({
                "type": "Overload",
                "overload": "base",
                "limits": {"maxCount": 5},
                "next": "base"
            }),
        )
        .manager();

    let child = manager.get_job("child").unwrap().unwrap();
    assert_eq!(child.job_type(), JobType::System);
    assert_eq!(child.description, "base");
    assert_eq!(child.limits.max_count, 5);
    assert_eq!(child.limits.exit_target(), Some("base"));
    assert_eq!(child.next, Next::Name("base".to_string()));

    let base = manager.get_job("base").unwrap().unwrap();
    assert_eq!(base.limits.max_count, 3);
    assert_eq!(base.next, Next::default());
}

#[test]
fn test_overload_resolution_is_idempotent() {
    let builder = TestWorkflowBuilder::new("c")
        .add_calculate("a", json!({"x": "1"}), json!({}))
        .with_job("b", json!({"type": "Overload", "overload": "a", "description": "b"}))
        .with_job("c", json!({"type": "Overload", "overload": "b"}));

    let mut manager = builder.manager();
    let first = manager.get_job("c").unwrap().unwrap();
    let second = manager.get_job("c").unwrap().unwrap();
    assert_eq!(*first, *second);

    let mut fresh = builder.manager();
    assert_eq!(*fresh.get_job("c").unwrap().unwrap(), *first);
    assert_eq!(first.description, "b");
    assert_eq!(first.job_type(), JobType::Calculate);
}

#[test]
fn test_pre_resolved_links_give_same_result() {
    let builder = TestWorkflowBuilder::new("d")
        .with_job(
            "a",
            json!({
                "type": "System",
                "description": "a",
                "delay": {"pre": 5},
                "system": {"type": "Log", "log": {"message": "from a", "levels": ["INFO"]}}
            }),
        )
        .with_job(
            "b",
            json!({
                "type": "Overload",
                "overload": "a",
                "system": {"log": {"message": "from b"}},
                "limits": {"maxCount": 2}
            }),
        )
        .with_job(
            "c",
            json!({"type": "Overload", "overload": "b", "delay": {"post": 7}}),
        )
        .with_job("d", json!({"type": "Overload", "overload": "c", "next": "a"}));

    let mut eager = builder.manager();
    for link in ["a", "b", "c"] {
        eager.get_job(link).unwrap().unwrap();
    }
    let eager_d = eager.get_job("d").unwrap().unwrap();

    let mut lazy = builder.manager();
    let lazy_d = lazy.get_job("d").unwrap().unwrap();

    assert_eq!(*eager_d, *lazy_d);
    assert_eq!(lazy_d.job_type(), JobType::System);
    assert_eq!(lazy_d.limits.max_count, 2);
    assert_eq!(lazy_d.next, Next::Name("a".to_string()));
    match &lazy_d.kind {
        JobKind::System(payload) => {
            assert_eq!(payload.log.as_ref().unwrap().message, "from b")
        }
        other => panic!("unexpected kind {:?}", other),
    }
}

#[test]
fn test_self_overload_is_recursive() {
    let mut manager = TestWorkflowBuilder::new("a")
        .with_job("a", json!({"type": "Overload", "overload": "a"}))
        .manager();
    match manager.get_job("a") {
        Err(ParserError::RecursiveOverload { chain, .. }) => assert_eq!(chain, vec!["a", "a"]),
        other => panic!("expected recursion, got {:?}", other),
    }
}

#[test]
fn test_mutual_overload_is_recursive() {
    let mut manager = TestWorkflowBuilder::new("a")
        .with_job("a", json!({"type": "Overload", "overload": "b"}))
        .with_job("b", json!({"type": "Overload", "overload": "a"}))
        .manager();
    match manager.get_job("a") {
        Err(ParserError::RecursiveOverload { chain, .. }) => {
            assert_eq!(chain.len(), 3);
            assert_eq!(chain.first(), chain.last());
            assert!(chain.contains(&"a".to_string()));
            assert!(chain.contains(&"b".to_string()));
        }
        other => panic!("expected recursion, got {:?}", other),
    }
}

#[test]
fn test_cycle_behind_the_start_terminates() {
    let mut manager = TestWorkflowBuilder::new("start")
        .with_job("start", json!({"type": "Overload", "overload": "x"}))
        .with_job("x", json!({"type": "Overload", "overload": "y"}))
        .with_job("y", json!({"type": "Overload", "overload": "x"}))
        .manager();
    assert!(matches!(
        manager.get_job("start"),
        Err(ParserError::RecursiveOverload { .. })
    ));
}

#[test]
fn test_missing_overload_target() {
    let mut manager = TestWorkflowBuilder::new("a")
        .with_job("a", json!({"type": "Overload", "overload": "ghost"}))
        .manager();
    match manager.get_job("a") {
        Err(ParserError::OverloadTarget { target, .. }) => assert_eq!(target, "ghost"),
        other => panic!("expected missing target, got {:?}", other),
    }
}

#[test]
fn test_missing_payload_is_reported() {
    let mut manager = TestWorkflowBuilder::new("a")
        .with_job("a", json!({"type": "Calculate"}))
        .with_job("b", json!({"type": "System", "system": {"type": "Command"}}))
        .manager();
    match manager.get_job("a") {
        Err(ParserError::MissingField { field, .. }) => assert_eq!(field, "calculate"),
        other => panic!("expected missing field, got {:?}", other),
    }
    match manager.get_job("b") {
        Err(ParserError::MissingField { field, .. }) => assert_eq!(field, "system.command"),
        other => panic!("expected missing field, got {:?}", other),
    }
}

#[test]
fn test_branching_targets() {
    let mut manager = TestWorkflowBuilder::new("a")
        .with_job(
            "a",
            json!({"type": "OCR", "next": {"success": "b", "failure": ""}}),
        )
        .with_job("b", json!({"type": "OCR", "next": "a"}))
        .manager();

    assert_eq!(manager.get_next("a", true).unwrap(), Some("b".to_string()));
    assert_eq!(manager.get_next("a", false).unwrap(), None);
    assert_eq!(manager.get_next("b", false).unwrap(), Some("a".to_string()));
    assert_eq!(manager.get_begin().unwrap(), "a");
}
