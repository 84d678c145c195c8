use std::path::Path;

use crate::cmd::{self, CommandOutput};
use crate::error::DeployResult;
use crate::log::SessionLog;
use crate::ssh::SshSession;

/// Paths never shipped to the server.
pub const EXCLUDES: &[&str] = &[".git", "__pycache__", "*.pyc", ".venv", "node_modules"];

/// One-way, additive copy of a local tree to the remote host.
pub trait FileMirror {
    fn mirror_files(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        log: &SessionLog,
    ) -> DeployResult<CommandOutput>;
}

/// Mirror over `rsync -az` tunnelled through the deploy SSH
/// session. Times and permissions are preserved; nothing is
/// deleted on the remote side.
pub struct Rsync {
    ssh: SshSession,
}

impl Rsync {
    #[must_use]
    pub const fn new(ssh: SshSession) -> Self {
        Self { ssh }
    }

    #[must_use]
    pub fn build_args(&self, local_dir: &Path, remote_dir: &str) -> Vec<String> {
        let mut args = vec!["-az".to_string()];
        for pattern in EXCLUDES {
            args.push("--exclude".to_string());
            args.push((*pattern).to_string());
        }
        args.push("-e".to_string());
        args.push(self.ssh.ssh_command());
        // Trailing slash: copy the directory's contents
        args.push(format!("{}/", local_dir.display()));
        args.push(format!("{}:{remote_dir}/", self.ssh.destination()));
        args
    }
}

impl FileMirror for Rsync {
    fn mirror_files(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        log: &SessionLog,
    ) -> DeployResult<CommandOutput> {
        log.info(format!(
            "Mirroring {} to {}:{remote_dir}/",
            local_dir.display(),
            self.ssh.destination()
        ));

        let args = self.build_args(local_dir, remote_dir);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = cmd::run_streaming("rsync", &refs, None, &mut |line| log.info(line))?;
        log.output(&output.stderr);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_exclude_vcs_and_caches_without_delete() {
        let rsync = Rsync::new(SshSession::new("203.0.113.5", "deploy"));

        let args = rsync.build_args(Path::new("/work/app"), "app");

        assert_eq!(args[0], "-az");
        assert!(args.windows(2).any(|w| w == ["--exclude", ".git"]));
        assert!(args.windows(2).any(|w| w == ["--exclude", "__pycache__"]));
        assert!(!args.iter().any(|a| a.starts_with("--delete")));
        assert_eq!(args[args.len() - 2], "/work/app/");
        assert_eq!(args[args.len() - 1], "deploy@203.0.113.5:app/");
    }

    #[test]
    fn remote_shell_reuses_ssh_options() {
        let rsync = Rsync::new(SshSession::new("h", "u"));

        let args = rsync.build_args(Path::new("/w"), "app");
        let e = args.iter().position(|a| a == "-e").unwrap();

        assert!(args[e + 1].starts_with("ssh "));
        assert!(args[e + 1].contains("StrictHostKeyChecking=accept-new"));
    }
}
