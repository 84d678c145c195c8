mod common;

use std::path::Path;

use common::{Calls, FakeVcs, TOKEN};
use shipyard::git::{secret_forms, sync_repository};
use shipyard::{DeploymentRequest, Redactor, Secret, SessionLog};

fn request(key: &Path) -> DeploymentRequest {
    DeploymentRequest {
        repo_url: "https://example.com/org/app.git".into(),
        branch: "main".into(),
        credential: Secret::new(TOKEN),
        ssh_user: "deploy".into(),
        server_address: "203.0.113.5".parse().unwrap(),
        ssh_key_path: key.to_path_buf(),
        app_port: 5000,
    }
}

fn redacted_log(harness: &common::Harness) -> SessionLog {
    let redactor = Redactor::new();
    for form in secret_forms(&Secret::new(TOKEN)) {
        redactor.register(&form);
    }
    SessionLog::quiet(harness.log_path(), redactor).unwrap()
}

#[test]
fn first_sync_clones_second_fetches() {
    let harness = common::Harness::new();
    let calls = Calls::default();
    let vcs = FakeVcs::new(calls.clone());
    let log = redacted_log(&harness);
    let req = request(&harness.key);

    let first = sync_repository(&vcs, &req, &harness.workdir(), &log).unwrap();
    let second = sync_repository(&vcs, &req, &harness.workdir(), &log).unwrap();

    assert_eq!(first, harness.workdir().join("app"));
    assert_eq!(first, second);
    assert_eq!(calls.all(), vec!["clone main", "fetch main"]);
    assert!(first.join("Dockerfile").is_file());
}

#[test]
fn sync_log_never_contains_the_token() {
    let harness = common::Harness::new();
    let vcs = FakeVcs::new(Calls::default());
    let log = redacted_log(&harness);
    let req = request(&harness.key);

    sync_repository(&vcs, &req, &harness.workdir(), &log).unwrap();
    sync_repository(&vcs, &req, &harness.workdir(), &log).unwrap();

    let text = harness.log_text();
    assert!(text.contains("example.com/org/app.git"));
    assert!(!text.contains(TOKEN), "token leaked:\n{text}");
}

#[test]
fn failed_clone_maps_to_repo_sync() {
    let harness = common::Harness::new();
    let vcs = FakeVcs::new(Calls::default()).failing(128);
    let log = redacted_log(&harness);

    let err = sync_repository(&vcs, &request(&harness.key), &harness.workdir(), &log).unwrap_err();

    assert_eq!(err.exit_code(), 17);
    assert!(err.to_string().contains("128"));
    assert!(!harness.log_text().contains(TOKEN));
}

#[test]
fn non_repository_directory_is_not_overwritten() {
    let harness = common::Harness::new();
    let calls = Calls::default();
    let vcs = FakeVcs::new(calls.clone());
    let log = redacted_log(&harness);
    std::fs::create_dir_all(harness.workdir().join("app")).unwrap();

    let err = sync_repository(&vcs, &request(&harness.key), &harness.workdir(), &log).unwrap_err();

    assert_eq!(err.exit_code(), 17);
    assert!(calls.is_empty());
}
