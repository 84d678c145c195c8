use std::net::Ipv4Addr;
use std::time::Duration;

use crate::descriptor::BuildDescriptor;
use crate::error::DeployResult;
use crate::git::repo_dir_name;
use crate::request::DeploymentRequest;

/// Remote destination of the project files, relative to the
/// remote user's home directory.
pub const REMOTE_APP_DIR: &str = "app";

/// Loopback host port a Dockerfile container is published on.
/// Nginx is the only public listener.
pub const HOST_PORT: u16 = 8080;

/// Delay between starting the container and the liveness probe.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Names and ports derived for one deployment run.
///
/// # Example
///
/// ```
/// use std::net::Ipv4Addr;
/// use shipyard::DeployPlan;
///
/// let plan = DeployPlan::new("My_App", Ipv4Addr::new(203, 0, 113, 5), 5000);
///
/// assert_eq!(plan.image, "my_app:latest");
/// assert_eq!(plan.container, "my_app");
/// assert_eq!(plan.external_url(), "http://203.0.113.5/");
/// ```
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub project: String,
    pub image: String,
    pub container: String,
    pub site_name: String,
    pub remote_dir: String,
    pub server_address: Ipv4Addr,
    pub app_port: u16,
    pub descriptor: BuildDescriptor,
}

impl DeployPlan {
    #[must_use]
    pub fn new(project: &str, server_address: Ipv4Addr, app_port: u16) -> Self {
        let name = docker_name(project);
        Self {
            project: project.to_string(),
            image: format!("{name}:latest"),
            container: name.clone(),
            site_name: name,
            remote_dir: REMOTE_APP_DIR.to_string(),
            server_address,
            app_port,
            descriptor: BuildDescriptor::Dockerfile,
        }
    }

    pub fn from_request(request: &DeploymentRequest) -> DeployResult<Self> {
        let project = repo_dir_name(&request.repo_url)?;
        Ok(Self::new(
            &project,
            request.server_address,
            request.app_port,
        ))
    }

    #[must_use]
    pub fn descriptor(mut self, descriptor: BuildDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    #[must_use]
    pub fn remote_dir(mut self, dir: &str) -> Self {
        self.remote_dir = dir.to_string();
        self
    }

    /// Remote directory as a shell word; relative paths resolve
    /// against `$HOME`.
    #[must_use]
    pub fn remote_path(&self) -> String {
        if self.remote_dir.starts_with('/') {
            self.remote_dir.clone()
        } else {
            format!("$HOME/{}", self.remote_dir)
        }
    }

    /// Host port the application answers on. A Dockerfile
    /// container is published on [`HOST_PORT`]; a compose project
    /// publishes its own ports, so the app port is used as is.
    #[must_use]
    pub const fn host_port(&self) -> u16 {
        match self.descriptor {
            BuildDescriptor::Dockerfile => HOST_PORT,
            BuildDescriptor::Compose { .. } => self.app_port,
        }
    }

    /// Upstream Nginx proxies to.
    #[must_use]
    pub fn upstream(&self) -> String {
        format!("http://127.0.0.1:{}", self.host_port())
    }

    /// Liveness URL as seen from the server itself.
    #[must_use]
    pub fn liveness_url(&self) -> String {
        format!("{}/", self.upstream())
    }

    /// URL probed from the controlling machine through the proxy.
    #[must_use]
    pub fn external_url(&self) -> String {
        format!("http://{}/", self.server_address)
    }
}

/// Lowercase a project name and replace characters Docker does
/// not accept in image or container names.
#[must_use]
pub fn docker_name(project: &str) -> String {
    let name: String = project
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_start_matches(['_', '.', '-']);
    if name.is_empty() {
        "app".to_string()
    } else {
        name.to_string()
    }
}
