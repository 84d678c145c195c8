use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::redact::MASK;

pub const DEFAULT_BRANCH: &str = "main";

/// A credential that never renders in clear text.
///
/// `Debug` and `Display` both print [`MASK`]; the value is only
/// reachable through [`Secret::expose`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({MASK})")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

/// Operator answers exactly as collected, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pub repo_url: String,
    pub credential: Secret,
    pub branch: String,
    pub ssh_user: String,
    pub server_address: String,
    pub ssh_key_path: String,
    pub app_port: String,
}

impl RawInput {
    /// One line per field, credential masked.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        vec![
            format!("Repository URL: {}", self.repo_url),
            format!("Credential:     {}", self.credential),
            format!("Branch:         {}", self.branch),
            format!("SSH user:       {}", self.ssh_user),
            format!("Server address: {}", self.server_address),
            format!("SSH key:        {}", self.ssh_key_path),
            format!("App port:       {}", self.app_port),
        ]
    }
}

/// Validated deployment parameters. Immutable once built.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub repo_url: String,
    pub branch: String,
    pub credential: Secret,
    pub ssh_user: String,
    pub server_address: Ipv4Addr,
    pub ssh_key_path: PathBuf,
    pub app_port: u16,
}
