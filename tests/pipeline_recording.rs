//! Pipeline behavior over the in-memory engine
//!
//! These tests verify stage ordering, failure propagation and the published
//! address without a container host.

use regex::Regex;
use symfony_pipeline::engine::{
    Container, Directory, Engine, EngineError, RecordedAction, RecordingEngine, ScriptedResponse,
};
use symfony_pipeline::pipeline::{PublishTarget, SymfonyApp};
use tempfile::TempDir;

fn create_app(dir: &TempDir) -> SymfonyApp {
    std::fs::write(dir.path().join("composer.json"), "{}").expect("Failed to write composer.json");
    std::fs::create_dir_all(dir.path().join(".dagger")).expect("Failed to create .dagger");
    SymfonyApp::new(Directory::new(dir.path()))
}

#[tokio::test]
async fn test_stage_outputs_are_returned() {
    let dir = TempDir::new().unwrap();
    let app = create_app(&dir);
    let engine = RecordingEngine::new();
    engine.add_responses([
        ScriptedResponse::output("Symfony CLI installed\n"),
        ScriptedResponse::output("OK (42 tests, 97 assertions)\n[OK] No errors\n"),
        ScriptedResponse::output("Found 0 of 31 files that can be fixed\n"),
    ]);

    assert_eq!(app.build_env(&engine).await.unwrap(), "Symfony CLI installed\n");
    assert!(app.test(&engine).await.unwrap().contains("42 tests"));
    assert!(app.lint(&engine).await.unwrap().contains("0 of 31"));

    let calls = engine.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].container, app.env());
    assert_eq!(calls[1].container, app.test_container());
    assert_eq!(calls[2].container, app.lint_container());
    assert!(calls.iter().all(|c| c.action == RecordedAction::Stdout));
}

#[tokio::test]
async fn test_publish_runs_lint_then_test_then_publish() {
    let dir = TempDir::new().unwrap();
    let app = create_app(&dir);
    let engine = RecordingEngine::new();

    let reference = app.publish(&engine).await.unwrap();

    let calls = engine.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].container, app.lint_container());
    assert_eq!(calls[1].container, app.test_container());

    let address = match &calls[2].action {
        RecordedAction::Publish { address } => address.clone(),
        other => panic!("Expected publish, got {:?}", other),
    };
    assert_eq!(calls[2].container, app.publish_container());

    let pattern = Regex::new(r"^ttl\.sh/symfony-sample-app-(\d+)$").unwrap();
    let captures = pattern.captures(&address).expect("address matches pattern");
    let suffix: u32 = captures[1].parse().unwrap();
    assert!(suffix <= 100_000);

    assert_eq!(
        reference,
        format!("{}@sha256:{}", address, app.publish_container().digest())
    );
}

#[tokio::test]
async fn test_publish_aborts_when_lint_fails() {
    let dir = TempDir::new().unwrap();
    let app = create_app(&dir);
    let engine = RecordingEngine::new();
    engine.add_response(ScriptedResponse::failure("3 files need fixing"));

    let err = app.publish(&engine).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Lint stage failed"));
    assert!(message.contains("3 files need fixing"));

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls
        .iter()
        .any(|c| matches!(c.action, RecordedAction::Publish { .. })));
}

#[tokio::test]
async fn test_publish_aborts_when_tests_fail() {
    let dir = TempDir::new().unwrap();
    let app = create_app(&dir);
    let engine = RecordingEngine::new();
    engine.add_responses([
        ScriptedResponse::output(""),
        ScriptedResponse::failure("FAILURES! Tests: 42, Failures: 1"),
    ]);

    let err = app.publish(&engine).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Test stage failed"));
    assert_eq!(engine.calls().len(), 2);
}

#[tokio::test]
async fn test_publish_to_custom_target() {
    let dir = TempDir::new().unwrap();
    let app = create_app(&dir).with_publish_target(PublishTarget {
        registry: "registry.example.com/team".to_string(),
        image_name: "shop".to_string(),
    });
    let engine = RecordingEngine::new();
    engine.add_responses([
        ScriptedResponse::output(""),
        ScriptedResponse::output(""),
        ScriptedResponse::output("registry.example.com/team/shop-7@sha256:abc"),
    ]);

    let reference = app
        .publish_to(&engine, "registry.example.com/team/shop-7")
        .await
        .unwrap();
    assert_eq!(reference, "registry.example.com/team/shop-7@sha256:abc");

    let random = app.publish_target().random_address();
    assert!(random.starts_with("registry.example.com/team/shop-"));
}

#[tokio::test]
async fn test_invalid_publish_address_rejected() {
    let dir = TempDir::new().unwrap();
    let app = create_app(&dir);
    let engine = RecordingEngine::new();

    let err = app
        .publish_to(&engine, "ttl.sh/app@sha256:deadbeef")
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to publish"));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_registry_rejected_before_any_stage_runs() {
    let dir = TempDir::new().unwrap();
    let app = create_app(&dir).with_publish_target(PublishTarget {
        registry: "ttl.sh/Team".to_string(),
        image_name: "shop".to_string(),
    });
    let engine = RecordingEngine::new();

    let err = app.publish(&engine).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid image reference"));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_container_without_base_image_fails_evaluation() {
    let engine = RecordingEngine::new();
    let container = Container::new().with_exec(["composer", "install"]);

    let err = engine.stdout(&container).await.unwrap_err();
    assert!(matches!(err, EngineError::MissingBaseImage));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_empty_command_fails_evaluation() {
    let engine = RecordingEngine::new();
    let container = Container::new()
        .from("php:8.3-cli")
        .with_exec(Vec::<String>::new());

    let err = engine.stdout(&container).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyCommand { step: 1 }));
}

#[test]
fn test_descriptions_are_deterministic() {
    let dir = TempDir::new().unwrap();
    let first = create_app(&dir);
    let second = SymfonyApp::new(Directory::new(dir.path()));

    assert_eq!(first.test_container().digest(), second.test_container().digest());
    assert_ne!(
        first.test_container().digest(),
        first.with_version("8.2").test_container().digest()
    );
}

#[test]
fn test_source_upload_excludes_pipeline_directory() {
    let dir = TempDir::new().unwrap();
    create_app(&dir);
    std::fs::write(dir.path().join(".dagger/main.php"), "<?php").unwrap();

    let source = Directory::new(dir.path()).without_directory(".dagger");
    let entries = source.entries().unwrap();
    assert_eq!(entries, vec![std::path::PathBuf::from("composer.json")]);
}
