//! Step-gating state machine of the provisioning pipeline.
//!
//! [`transition`] is pure: the driver executes whatever
//! [`Stage::next_step`] asks for and feeds the outcome back. A
//! failure is terminal and nothing resumes from it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    InputCollected,
    Validated,
    RepoSynced,
    DescriptorVerified,
    RemoteReachable,
    RemoteProvisioned,
    AppDeployed,
    ProxyConfigured,
    Verified,
    Failed { step: u8, exit_code: i32 },
}

impl Stage {
    /// Step that moves the pipeline out of this stage, or `None`
    /// once it is terminal.
    #[must_use]
    pub const fn next_step(self) -> Option<u8> {
        match self {
            Self::Init | Self::InputCollected => Some(1),
            Self::Validated => Some(2),
            Self::RepoSynced => Some(3),
            Self::DescriptorVerified => Some(4),
            Self::RemoteReachable => Some(5),
            Self::RemoteProvisioned => Some(6),
            Self::AppDeployed => Some(7),
            Self::ProxyConfigured => Some(8),
            Self::Verified | Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.next_step().is_none()
    }

    const fn advance(self) -> Self {
        match self {
            Self::Init => Self::InputCollected,
            Self::InputCollected => Self::Validated,
            Self::Validated => Self::RepoSynced,
            Self::RepoSynced => Self::DescriptorVerified,
            Self::DescriptorVerified => Self::RemoteReachable,
            Self::RemoteReachable => Self::RemoteProvisioned,
            Self::RemoteProvisioned => Self::AppDeployed,
            Self::AppDeployed => Self::ProxyConfigured,
            Self::ProxyConfigured | Self::Verified => Self::Verified,
            failed @ Self::Failed { .. } => failed,
        }
    }

    /// Process exit code for a terminal stage.
    #[must_use]
    pub const fn exit_code(self) -> Option<i32> {
        match self {
            Self::Verified => Some(0),
            Self::Failed { exit_code, .. } => Some(exit_code),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { step, exit_code } => {
                write!(f, "Failed(step {step}, exit code {exit_code})")
            }
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failure,
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    pub step: u8,
    pub status: StepStatus,
    pub exit_code: i32,
}

impl StepResult {
    #[must_use]
    pub const fn success(step: u8) -> Self {
        Self {
            step,
            status: StepStatus::Success,
            exit_code: 0,
        }
    }

    #[must_use]
    pub const fn failure(step: u8, exit_code: i32) -> Self {
        Self {
            step,
            status: StepStatus::Failure,
            exit_code,
        }
    }
}

/// Apply a step result to a stage.
///
/// - success of the expected step advances one stage
/// - failure of the expected step ends in [`Stage::Failed`]
/// - a result for any other step changes nothing
/// - terminal stages absorb every result
#[must_use]
pub const fn transition(stage: Stage, result: &StepResult) -> Stage {
    let Some(expected) = stage.next_step() else {
        return stage;
    };
    if result.step != expected {
        return stage;
    }
    match result.status {
        StepStatus::Success => stage.advance(),
        StepStatus::Failure => Stage::Failed {
            step: result.step,
            exit_code: result.exit_code,
        },
    }
}

/// Human name of a step, used in log lines.
#[must_use]
pub const fn step_name(step: u8) -> &'static str {
    match step {
        1 => "collect and validate parameters",
        2 => "synchronize repository",
        3 => "verify build descriptor",
        4 => "check SSH connectivity",
        5 => "provision remote host",
        6 => "deploy application",
        7 => "configure reverse proxy",
        8 => "validate deployment",
        _ => "unknown step",
    }
}
