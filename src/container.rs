use serde::Deserialize;

use crate::descriptor::BuildDescriptor;
use crate::error::DeployResult;

/// Subset of `docker inspect --format '{{json .State}}'`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    pub status: String,
    pub running: bool,
    #[serde(default)]
    pub exit_code: i64,
}

/// Parse the last JSON line of `docker inspect` output.
pub fn parse_state(output: &str) -> DeployResult<ContainerState> {
    let line = output
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap_or("");
    Ok(serde_json::from_str(line.trim())?)
}

/// Whether the output of
/// [`container_state_script`](crate::scripts::container_state_script)
/// shows the application running.
pub fn is_running(descriptor: &BuildDescriptor, output: &str) -> DeployResult<bool> {
    match descriptor {
        BuildDescriptor::Dockerfile => Ok(parse_state(output)?.running),
        BuildDescriptor::Compose { .. } => Ok(output.lines().any(|l| !l.trim().is_empty())),
    }
}
