pub type DeployResult<T> = Result<T, DeployError>;

/// Exit code after Ctrl+C (128 + SIGINT).
pub const INTERRUPTED_EXIT: i32 = 130;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid repository URL: {0} (expected http:// or https://)")]
    InvalidUrl(String),

    #[error("credential must not be empty")]
    EmptyCredential,

    #[error("SSH username must not be empty")]
    EmptySshUser,

    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("SSH key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid port: {0} (expected 1-65535)")]
    InvalidPort(String),

    #[error("no Dockerfile or compose file found in {0}")]
    BuildDescriptorMissing(String),

    #[error("invalid compose file {file}: {reason}")]
    InvalidCompose { file: String, reason: String },

    #[error("repository sync failed: {0}")]
    RepoSync(String),

    #[error("SSH connection failed: {0}")]
    SshFailed(String),

    #[error("remote provisioning failed with exit code {0}")]
    ProvisionFailed(i32),

    #[error("file mirroring failed with exit code {0}")]
    MirrorFailed(i32),

    #[error("remote deploy failed: {0}")]
    DeployFailed(String),

    #[error("reverse proxy configuration failed with exit code {0}")]
    ProxyConfigFailed(i32),

    #[error("container engine service is not active")]
    EngineNotRunning,

    #[error("container '{0}' is not running")]
    ContainerNotRunning(String),

    #[error("reverse proxy service is not active")]
    ProxyNotRunning,

    #[error("HTTP probe through the proxy failed on the server")]
    InternalProbeFailed,

    #[error("external HTTP probe to {url} failed: {reason}")]
    ExternalProbeFailed { url: String, reason: String },

    #[error("on-server validation failed with exit code {0}")]
    ValidationBatchFailed(i32),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("input error: {0}")]
    Input(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Process exit code that automation wrappers branch on.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::PrerequisiteMissing(_) | Self::CommandNotFound(_) => 9,
            Self::InvalidUrl(_) => 10,
            Self::EmptyCredential => 11,
            Self::EmptySshUser => 12,
            Self::InvalidAddress(_) => 13,
            Self::KeyNotFound(_) => 14,
            Self::InvalidPort(_) => 15,
            Self::BuildDescriptorMissing(_) | Self::InvalidCompose { .. } => 16,
            Self::RepoSync(_) => 17,
            Self::SshFailed(_) => 18,
            Self::ProvisionFailed(_) => 19,
            Self::MirrorFailed(_) => 21,
            Self::DeployFailed(_) => 22,
            Self::ProxyConfigFailed(_) => 23,
            Self::EngineNotRunning => 31,
            Self::ContainerNotRunning(_) => 32,
            Self::ProxyNotRunning => 33,
            Self::InternalProbeFailed => 34,
            Self::ExternalProbeFailed { .. } => 35,
            Self::ValidationBatchFailed(_) => 36,
            Self::Input(_) | Self::Other(_) | Self::Io(_) | Self::Json(_) => 1,
        }
    }
}
