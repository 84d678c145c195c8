use std::time::Duration;

use crate::error::{DeployError, DeployResult};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP reachability check from the controlling machine.
pub trait HttpProbe {
    /// Return the response status, or an error when no response
    /// arrives.
    fn probe(&self, url: &str) -> DeployResult<u16>;
}

/// Blocking [`HttpProbe`] over `reqwest`.
pub struct ReqwestProbe {
    client: reqwest::blocking::Client,
}

impl ReqwestProbe {
    pub fn new() -> DeployResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("shipyard/", env!("CARGO_PKG_VERSION")))
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| DeployError::ExternalProbeFailed {
                url: String::new(),
                reason: format!("could not create HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbe {
    fn probe(&self, url: &str) -> DeployResult<u16> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| DeployError::ExternalProbeFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(response.status().as_u16())
    }
}

/// Probe `url` and require a non-error status (below 400).
pub fn check(probe: &dyn HttpProbe, url: &str) -> DeployResult<u16> {
    let status = probe.probe(url)?;
    if status < 400 {
        Ok(status)
    } else {
        Err(DeployError::ExternalProbeFailed {
            url: url.to_string(),
            reason: format!("HTTP status {status}"),
        })
    }
}
