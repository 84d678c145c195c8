use shipyard::error::{DeployError, INTERRUPTED_EXIT};

#[test]
fn display_invalid_url() {
    let err = DeployError::InvalidUrl("ftp://example.com/app".into());
    assert_eq!(
        err.to_string(),
        "invalid repository URL: ftp://example.com/app (expected http:// or https://)"
    );
}

#[test]
fn display_ssh_failed() {
    let err = DeployError::SshFailed("timeout".into());
    assert_eq!(err.to_string(), "SSH connection failed: timeout");
}

#[test]
fn display_prerequisite_missing() {
    let err = DeployError::PrerequisiteMissing("rsync".into());
    assert_eq!(err.to_string(), "prerequisite missing: rsync");
}

#[test]
fn display_container_not_running() {
    let err = DeployError::ContainerNotRunning("app".into());
    assert_eq!(err.to_string(), "container 'app' is not running");
}

#[test]
fn display_external_probe() {
    let err = DeployError::ExternalProbeFailed {
        url: "http://203.0.113.5/".into(),
        reason: "HTTP 502".into(),
    };
    assert_eq!(
        err.to_string(),
        "external HTTP probe to http://203.0.113.5/ failed: HTTP 502"
    );
}

#[test]
fn display_other() {
    let err = DeployError::Other("custom error".into());
    assert_eq!(err.to_string(), "custom error");
}

#[test]
fn input_errors_map_to_their_field_codes() {
    let cases = [
        (DeployError::InvalidUrl(String::new()), 10),
        (DeployError::EmptyCredential, 11),
        (DeployError::EmptySshUser, 12),
        (DeployError::InvalidAddress(String::new()), 13),
        (DeployError::KeyNotFound(String::new()), 14),
        (DeployError::InvalidPort(String::new()), 15),
    ];
    for (err, code) in cases {
        assert_eq!(err.exit_code(), code, "{err}");
    }
}

#[test]
fn step_errors_map_to_their_codes() {
    let cases = [
        (DeployError::BuildDescriptorMissing(String::new()), 16),
        (
            DeployError::InvalidCompose {
                file: "compose.yml".into(),
                reason: "no services".into(),
            },
            16,
        ),
        (DeployError::RepoSync(String::new()), 17),
        (DeployError::SshFailed(String::new()), 18),
        (DeployError::ProvisionFailed(100), 19),
        (DeployError::MirrorFailed(12), 21),
        (DeployError::DeployFailed(String::new()), 22),
        (DeployError::ProxyConfigFailed(1), 23),
    ];
    for (err, code) in cases {
        assert_eq!(err.exit_code(), code, "{err}");
    }
}

#[test]
fn validation_errors_map_to_their_codes() {
    let cases = [
        (DeployError::EngineNotRunning, 31),
        (DeployError::ContainerNotRunning(String::new()), 32),
        (DeployError::ProxyNotRunning, 33),
        (DeployError::InternalProbeFailed, 34),
        (
            DeployError::ExternalProbeFailed {
                url: String::new(),
                reason: String::new(),
            },
            35,
        ),
        (DeployError::ValidationBatchFailed(7), 36),
    ];
    for (err, code) in cases {
        assert_eq!(err.exit_code(), code, "{err}");
    }
}

#[test]
fn generic_errors_exit_with_one() {
    assert_eq!(DeployError::Other("x".into()).exit_code(), 1);
    assert_eq!(DeployError::Input("x".into()).exit_code(), 1);
    assert_eq!(DeployError::CommandNotFound("git".into()).exit_code(), 9);
    assert_eq!(INTERRUPTED_EXIT, 130);
}

#[test]
fn from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err: DeployError = io_err.into();
    assert!(matches!(err, DeployError::Io(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn from_json_error() {
    let json_err = serde_json::from_str::<Vec<u64>>("invalid").unwrap_err();
    let err: DeployError = json_err.into();
    assert!(matches!(err, DeployError::Json(_)));
}
