use std::net::Ipv4Addr;
use std::path::Path;

use crate::cmd::{self, CommandOutput};
use crate::error::DeployResult;
use crate::log::SessionLog;

pub const CONNECT_TIMEOUT_SECS: u32 = 10;

/// Prepended to every batch: stop at the first failing command
/// (pipelines included) and fold stderr into the streamed output.
pub const BATCH_PRELUDE: &str = "set -euo pipefail\nexec 2>&1\n";

/// Remote command channel. Output is streamed into the session
/// log while the command runs.
pub trait RemoteExecutor {
    /// Run one ad-hoc command.
    fn run_remote_command(&self, command: &str, log: &SessionLog) -> DeployResult<CommandOutput>;

    /// Run a multi-line script under a fail-fast shell. The
    /// returned code is the script's own exit status.
    fn run_remote_batch(&self, script: &str, log: &SessionLog) -> DeployResult<CommandOutput>;
}

/// SSH session wrapper for executing commands on a remote host.
///
/// Unknown host keys are pinned on first contact
/// (`StrictHostKeyChecking=accept-new`) and `BatchMode` rules out
/// any interactive prompt.
#[derive(Debug, Clone)]
pub struct SshSession {
    host: String,
    user: String,
    key: Option<String>,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: None,
        }
    }

    #[must_use]
    pub fn for_address(address: Ipv4Addr, user: &str) -> Self {
        Self::new(&address.to_string(), user)
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &Path) -> Self {
        self.key = Some(key_path.display().to_string());
        self
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Options shared by `ssh` and anything tunnelling over it.
    #[must_use]
    pub fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}"),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args
    }

    /// The ssh invocation as one string, for `rsync -e`.
    #[must_use]
    pub fn ssh_command(&self) -> String {
        let mut parts = vec!["ssh".to_string()];
        parts.extend(self.ssh_base_args().into_iter().map(|a| {
            if a.contains(char::is_whitespace) {
                format!("'{a}'")
            } else {
                a
            }
        }));
        parts.join(" ")
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.ssh_base_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn stream(
        &self,
        command: &str,
        stdin: Option<&[u8]>,
        log: &SessionLog,
    ) -> DeployResult<CommandOutput> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = cmd::run_streaming("ssh", &refs, stdin, &mut |line| log.info(line))?;

        // Remote stderr is folded into stdout for batches; what
        // is left here comes from ssh itself.
        log.output(&output.stderr);
        Ok(output)
    }
}

impl RemoteExecutor for SshSession {
    fn run_remote_command(&self, command: &str, log: &SessionLog) -> DeployResult<CommandOutput> {
        self.stream(command, None, log)
    }

    fn run_remote_batch(&self, script: &str, log: &SessionLog) -> DeployResult<CommandOutput> {
        let body = batch_body(script);
        self.stream("bash -s", Some(body.as_bytes()), log)
    }
}

/// Script text as sent to the remote `bash -s`.
#[must_use]
pub fn batch_body(script: &str) -> String {
    let mut body = String::with_capacity(BATCH_PRELUDE.len() + script.len() + 1);
    body.push_str(BATCH_PRELUDE);
    body.push_str(script);
    if !script.ends_with('\n') {
        body.push('\n');
    }
    body
}
