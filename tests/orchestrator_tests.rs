mod common;

use common::{FakeForge, FakeStore, RecordingNotifier, commit, context};
use release_action::artifacts::{ArtifactDescriptor, short_hash};
use release_action::config::{ActionInputs, ReleaseSettings, Setting};
use release_action::error::{ConfigError, ForgeError, ReleaseError};
use release_action::orchestrator::ReleaseOrchestrator;
use release_action::state::{STATE_KEY, StateConfig};
use release_action::tag::TagPolicy;
use std::path::Path;

const HEAD: &str = "fedcba9876543210";

fn inputs(files: Vec<ArtifactDescriptor>) -> ActionInputs {
    ActionInputs {
        tag: TagPolicy::default(),
        release: ReleaseSettings::default(),
        files,
    }
}

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_release_continues_numbering_from_branch_state() {
    let dir = tempfile::tempdir().unwrap();
    let jar = write_file(dir.path(), "build/widgets.jar", "jar bytes");

    let store = FakeStore::with_value(STATE_KEY, r#"{"main":{"c":"abc123","t":"41"}}"#);
    let forge = FakeForge::new().with_history(
        "abc123",
        HEAD,
        vec![
            commit("1111111aaaa", "Fix crash on start", "alice"),
            commit(HEAD, "Add widgets\n\nCo-authored-by: Bob <bob@x>", "carol"),
        ],
    );
    let notifier = RecordingNotifier::default();

    let outcome = ReleaseOrchestrator::new(
        &store,
        &forge,
        &notifier,
        context("main", HEAD, "main"),
        inputs(vec![ArtifactDescriptor::new("jar", &jar)]),
    )
    .run()
    .await
    .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.tag.base(), "42");
    assert_eq!(outcome.tag.name(), "main-42");
    assert_eq!(outcome.name, "Build 42 (main)");
    assert!(!outcome.prerelease);
    assert_eq!(forge.compares(), vec![("abc123".to_string(), HEAD.to_string())]);

    let releases = forge.releases();
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].tag_name, "main-42");
    assert_eq!(releases[0].target_commitish, HEAD);
    assert_eq!(releases[0].make_latest.as_deref(), Some("true"));
    assert!(releases[0].body.starts_with("### [Changes](https://github.com/octo/widgets/compare/1111111^...fedcba9):"));
    assert!(releases[0].body.contains("Add widgets by @carol & @Bob"));

    assert_eq!(forge.upload_names(), vec!["widgets.jar", "release.json"]);
    let (_, info) = forge.uploads().pop().unwrap();
    let info: serde_json::Value = serde_json::from_slice(&info).unwrap();
    assert_eq!(info["build"], 42);
    assert_eq!(info["tag"], "main-42");
    assert_eq!(info["changes"].as_array().unwrap().len(), 2);
    assert_eq!(info["changes"][1]["coauthors"][0], "Bob");
    assert_eq!(info["downloads"]["jar"]["name"], "widgets.jar");
    assert_eq!(info["downloads"]["jar"]["sha256"].as_str().unwrap().len(), 64);
    assert_eq!(info["downloads"]["jar"]["id"], "1001");
    assert_eq!(info["changes"][0]["timestamp"], "");
    assert_eq!(info["id"], "1");

    assert_eq!(
        store.committed_json(STATE_KEY),
        serde_json::json!({"main": {"c": HEAD, "t": "42"}})
    );

    let outputs = outcome.outputs();
    assert_eq!(outputs.get("tag"), Some("main-42"));
    assert_eq!(outputs.get("tagBase"), Some("42"));
    assert_eq!(outputs.get("releaseID"), Some("1"));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].assets, vec!["widgets.jar".to_string()]);
}

#[tokio::test]
async fn test_first_release_on_feature_branch() {
    let store = FakeStore::new();
    let forge = FakeForge::new()
        .with_history("main", "feature", vec![commit("f1", "Start", "dev")])
        .with_history("f1^", HEAD, vec![commit("f1", "Start", "dev")]);

    let outcome = ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("feature", HEAD, "main"),
        inputs(vec![]),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(outcome.tag.name(), "feature-1");
    assert!(outcome.prerelease);
    assert_eq!(forge.releases()[0].make_latest.as_deref(), Some("false"));
    assert_eq!(outcome.changes.len(), 1);
    assert_eq!(store.creates(), 1);
    assert_eq!(
        store.committed_json(STATE_KEY),
        serde_json::json!({"feature": {"c": HEAD, "t": "1"}})
    );
}

#[tokio::test]
async fn test_changelog_failure_does_not_block_release() {
    let store = FakeStore::with_value(STATE_KEY, r#"{"main":{"c":"vanished","t":"3"}}"#);
    let forge = FakeForge::new();

    let outcome = ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("main", HEAD, "main"),
        inputs(vec![]),
    )
    .run()
    .await
    .unwrap();

    assert!(outcome.changes.is_empty());
    assert!(outcome.change_diagnostic.is_some());
    assert_eq!(forge.releases()[0].body, "");
    assert_eq!(outcome.tag.base(), "4");
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_existing_tag_aborts_before_state_is_written() {
    let store = FakeStore::with_value(STATE_KEY, r#"{"main":{"c":"abc123","t":"41"}}"#);
    let forge = FakeForge::new()
        .with_history("abc123", HEAD, vec![])
        .with_existing_tag("main-42");

    let err = ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("main", HEAD, "main"),
        inputs(vec![]),
    )
    .run()
    .await
    .unwrap_err();

    match err {
        ReleaseError::Forge(ForgeError::ReleaseExists { tag }) => assert_eq!(tag, "main-42"),
        other => panic!("expected existing release, got {:?}", other),
    }
    assert_eq!(store.updates(), 0);
    assert!(forge.uploads().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unverified_state_is_reported_not_fatal() {
    let store = FakeStore::with_value(STATE_KEY, "{}").frozen();
    let forge = FakeForge::new().with_history(&format!("{}^", HEAD), HEAD, vec![]);

    let outcome = ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("main", HEAD, "main"),
        inputs(vec![]),
    )
    .with_state_config(StateConfig::default())
    .run()
    .await
    .unwrap();

    assert!(!outcome.is_success());
    assert!(outcome.release.is_some());
    assert!(outcome.state.is_none());
    assert!(matches!(
        outcome.state_error,
        Some(ReleaseError::State(release_action::error::StateError::VerificationFailed { attempts: 10, .. }))
    ));
    assert_eq!(store.updates(), 10);
}

#[tokio::test]
async fn test_disabled_release_still_saves_metadata_and_state() {
    let dir = tempfile::tempdir().unwrap();
    let jar = write_file(dir.path(), "a.jar", "a");
    let metadata_path = dir.path().join("metadata.json");

    let store = FakeStore::with_value(STATE_KEY, r#"{"main":{"c":"abc123","t":"9"}}"#);
    let forge = FakeForge::new().with_history("abc123", HEAD, vec![commit(HEAD, "Tweak", "dev")]);

    let mut action_inputs = inputs(vec![ArtifactDescriptor::new("jar", &jar)]);
    action_inputs.release.enabled = false;
    action_inputs.release.save_metadata = true;
    action_inputs.release.metadata_path = metadata_path.clone();
    action_inputs.release.version = Setting::Literal("1.4.0".to_string());

    let outcome = ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("main", HEAD, "main"),
        action_inputs,
    )
    .run()
    .await
    .unwrap();

    assert!(outcome.release.is_none());
    assert!(forge.releases().is_empty());
    assert!(forge.uploads().is_empty());
    assert_eq!(outcome.metadata_path.as_deref(), Some(metadata_path.as_path()));
    assert_eq!(outcome.outputs().get("releaseID"), None);

    let metadata: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&metadata_path).unwrap()).unwrap();
    assert_eq!(metadata["project"], "widgets");
    assert_eq!(metadata["repo"], "widgets");
    assert_eq!(metadata["version"], "1.4.0");
    assert_eq!(metadata["number"], 10);
    assert_eq!(metadata["changes"][0]["summary"], "Tweak");
    assert_eq!(metadata["downloads"]["jar"]["name"], "a.jar");

    assert_eq!(
        store.committed_json(STATE_KEY),
        serde_json::json!({"main": {"c": HEAD, "t": "10"}})
    );
}

#[tokio::test]
async fn test_duplicate_labels_and_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let fabric = write_file(dir.path(), "fabric/mod-fabric.jar", "f");
    let forge_jar = write_file(dir.path(), "forge/mod-forge.jar", "g");
    let missing = dir.path().join("missing.jar");

    let metadata_path = dir.path().join("metadata.json");

    let store = FakeStore::with_value(STATE_KEY, "{}");
    let forge = FakeForge::new().with_history(&format!("{}^", HEAD), HEAD, vec![]);

    let mut action_inputs = inputs(vec![
        ArtifactDescriptor::new("jar", &fabric),
        ArtifactDescriptor::new("jar", &forge_jar),
        ArtifactDescriptor::new("extra", &missing),
    ]);
    action_inputs.release.save_metadata = true;
    action_inputs.release.metadata_path = metadata_path.clone();

    let outcome = ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("main", HEAD, "main"),
        action_inputs,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(
        forge.upload_names(),
        vec!["mod-fabric.jar", "mod-forge.jar", "release.json"]
    );
    assert_eq!(outcome.downloads.len(), 3);
    assert_eq!(outcome.downloads["jar"].name, "mod-forge.jar");
    assert_eq!(
        outcome.downloads[&format!("jar-{}", short_hash(&fabric))].name,
        "mod-fabric.jar"
    );
    assert!(!outcome.downloads.contains_key("extra"));

    let metadata: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&metadata_path).unwrap()).unwrap();
    let snapshot_keys: Vec<&String> = metadata["downloads"].as_object().unwrap().keys().collect();
    assert_eq!(snapshot_keys, vec!["jar"]);
    assert_eq!(metadata["downloads"]["jar"]["name"], "mod-forge.jar");
}

#[tokio::test]
async fn test_literal_tag_and_failed_notification() {
    let store = FakeStore::with_value(STATE_KEY, r#"{"main":{"c":"abc123","t":"41"}}"#);
    let forge = FakeForge::new().with_history("abc123", HEAD, vec![]);
    let notifier = RecordingNotifier::failing();

    let mut action_inputs = inputs(vec![]);
    action_inputs.tag.base = Setting::Literal("release".to_string());
    action_inputs.tag.prefix = Setting::Literal("v".to_string());
    action_inputs.tag.separator = "/".to_string();
    action_inputs.release.include_info = false;
    action_inputs.release.name = Setting::Literal("${tagPrefix}${tagSeparator}${tagBase}".to_string());

    let outcome = ReleaseOrchestrator::new(
        &store,
        &forge,
        &notifier,
        context("main", HEAD, "main"),
        action_inputs,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(outcome.tag.name(), "v/release");
    assert_eq!(outcome.name, "v/release");
    assert!(forge.uploads().is_empty());
    assert_eq!(notifier.sent().len(), 1);
    assert!(outcome.is_success());
    assert_eq!(
        store.committed_json(STATE_KEY),
        serde_json::json!({"main": {"c": HEAD, "t": "release"}})
    );
}

#[tokio::test]
async fn test_body_file_overrides_changelog() {
    let dir = tempfile::tempdir().unwrap();
    let body = write_file(dir.path(), "NOTES.md", "Hand-written notes");

    let store = FakeStore::with_value(STATE_KEY, r#"{"main":{"c":"abc123","t":"1"}}"#);
    let forge = FakeForge::new().with_history("abc123", HEAD, vec![commit(HEAD, "x", "dev")]);

    let mut action_inputs = inputs(vec![]);
    action_inputs.release.body_path = Some(body);

    ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("main", HEAD, "main"),
        action_inputs,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(forge.releases()[0].body, "Hand-written notes");
}

#[tokio::test]
async fn test_unreadable_body_file_aborts_before_release() {
    let dir = tempfile::tempdir().unwrap();

    let store = FakeStore::with_value(STATE_KEY, r#"{"main":{"c":"abc123","t":"1"}}"#);
    let forge = FakeForge::new().with_history("abc123", HEAD, vec![]);

    let mut action_inputs = inputs(vec![]);
    action_inputs.release.body_path = Some(dir.path().to_path_buf());

    let err = ReleaseOrchestrator::new(
        &store,
        &forge,
        &RecordingNotifier::default(),
        context("main", HEAD, "main"),
        action_inputs,
    )
    .run()
    .await
    .unwrap_err();

    match err {
        ReleaseError::Config(ConfigError::BodyUnreadable { path, .. }) => assert_eq!(path, dir.path()),
        other => panic!("expected unreadable body, got {:?}", other),
    }
    assert!(forge.releases().is_empty());
    assert_eq!(store.updates(), 0);
}
