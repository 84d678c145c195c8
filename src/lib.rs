//! Provision a Linux host and deploy a containerized app behind
//! Nginx.
//!
//! Shipyard takes a git repository with a `Dockerfile` or compose
//! file and a fresh server reachable over SSH. It leaves the app
//! running in Docker behind an Nginx reverse proxy. No YAML to
//! write and no shell scripts to maintain: answer the prompts and
//! watch the steps go by.
//!
//! # Overview
//!
//! A run is a [`Pipeline`] of eight steps, each gated on the one
//! before:
//!
//! 1. **Collect and validate** connection parameters
//!    ([`input`], [`validate`])
//! 2. **Synchronize** the repository locally ([`git`])
//! 3. **Check** for a build descriptor ([`descriptor`])
//! 4. **Probe** SSH connectivity ([`ssh`])
//! 5. **Provision** Docker, Compose and Nginx on the server
//! 6. **Deploy**: mirror files ([`rsync`]), build, run, probe
//! 7. **Configure** the Nginx site ([`nginx`])
//! 8. **Validate** services, container and HTTP reachability
//!
//! The first failure ends the run with a step-specific exit
//! code (see [`DeployError::exit_code`]). The remote side of steps
//! 5-8 lives in [`scripts`].
//!
//! Every line written to the console or the session log passes
//! through a [`RedactingWriter`], so the repository credential
//! never appears in clear text.
//!
//! # Example
//!
//! Drive the pipeline with canned answers:
//!
//! ```rust,no_run
//! use shipyard::{Pipeline, Redactor, ScriptedPrompter, Session, SessionLog};
//!
//! fn main() -> anyhow::Result<()> {
//!     let workdir = std::env::current_dir()?;
//!     let log = SessionLog::create(&workdir, Redactor::new())?;
//!
//!     let prompter = ScriptedPrompter::new([
//!         "https://github.com/example/app.git",
//!         "ghp_token",
//!         "main",
//!         "deploy",
//!         "203.0.113.5",
//!         "~/.ssh/id_ed25519",
//!         "5000",
//!     ]);
//!
//!     let stage = Pipeline::new(Session::new(log, workdir))
//!         .prompter(prompter)
//!         .run();
//!
//!     std::process::exit(stage.exit_code().unwrap_or(1));
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cmd;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod git;
pub mod input;
pub mod log;
pub mod nginx;
pub mod pipeline;
pub mod plan;
pub mod probe;
pub mod redact;
pub mod request;
pub mod rsync;
pub mod scripts;
pub mod session;
pub mod ssh;
pub mod state;
pub mod validate;

pub use descriptor::BuildDescriptor;
pub use error::{DeployError, DeployResult};
pub use input::{ScriptedPrompter, TerminalPrompter};
pub use log::SessionLog;
pub use nginx::NginxSite;
pub use pipeline::{Cli, Pipeline};
pub use plan::DeployPlan;
pub use redact::{RedactingWriter, Redactor};
pub use request::{DeploymentRequest, Secret};
pub use session::Session;
pub use ssh::SshSession;
pub use state::Stage;
