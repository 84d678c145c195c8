use std::path::{Path, PathBuf};

use url::Url;

use crate::cmd::{self, CommandOutput};
use crate::error::{DeployError, DeployResult};
use crate::log::SessionLog;
use crate::request::{DeploymentRequest, Secret};

/// A repository URL in its two forms: the clean one that may be
/// logged and stored, and the credential-bearing one that is only
/// ever handed to git.
#[derive(Debug, Clone)]
pub struct RepoSource {
    pub url: String,
    pub authenticated: String,
}

impl RepoSource {
    pub fn new(url: &str, credential: &Secret) -> DeployResult<Self> {
        Ok(Self {
            url: url.to_string(),
            authenticated: authenticated_url(url, credential)?,
        })
    }
}

/// Version control operations needed to keep a local working
/// copy in sync with its upstream.
pub trait Vcs {
    /// Clone `source` at `branch` into `dest`, which must not
    /// exist yet.
    fn clone_repo(
        &self,
        source: &RepoSource,
        branch: &str,
        dest: &Path,
    ) -> DeployResult<CommandOutput>;

    /// Fetch `branch`, check it out and fast-forward it in an
    /// existing working copy.
    fn fetch_and_checkout(
        &self,
        source: &RepoSource,
        branch: &str,
        dest: &Path,
    ) -> DeployResult<CommandOutput>;
}

/// [`Vcs`] backed by the `git` command line.
///
/// The credential only travels in the fetch URL argument. After
/// cloning, `origin` is reset to the clean URL so the working
/// tree never stores it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Vcs for GitCli {
    fn clone_repo(
        &self,
        source: &RepoSource,
        branch: &str,
        dest: &Path,
    ) -> DeployResult<CommandOutput> {
        let dest_str = dest.display().to_string();
        let clone = cmd::run(
            "git",
            &["clone", "--branch", branch, &source.authenticated, &dest_str],
        )?;
        if !clone.success() {
            return Ok(clone);
        }

        let reset = cmd::run(
            "git",
            &["-C", &dest_str, "remote", "set-url", "origin", &source.url],
        )?;
        Ok(merge_outputs(clone, reset))
    }

    fn fetch_and_checkout(
        &self,
        source: &RepoSource,
        branch: &str,
        dest: &Path,
    ) -> DeployResult<CommandOutput> {
        let dest_str = dest.display().to_string();
        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        let tracking = format!("origin/{branch}");

        let steps: [Vec<&str>; 3] = [
            vec!["-C", &dest_str, "fetch", &source.authenticated, &refspec],
            vec!["-C", &dest_str, "checkout", branch],
            vec!["-C", &dest_str, "merge", "--ff-only", &tracking],
        ];

        let mut combined = CommandOutput {
            code: Some(0),
            ..CommandOutput::default()
        };
        for args in &steps {
            let out = cmd::run("git", args)?;
            let failed = !out.success();
            combined = merge_outputs(combined, out);
            if failed {
                break;
            }
        }
        Ok(combined)
    }
}

/// Produce a working copy of `request.repo_url` at
/// `workdir/<repo name>` checked out to `request.branch`.
///
/// Clones when the destination is absent and converges an
/// existing clone otherwise. Returns the working copy path.
pub fn sync_repository(
    vcs: &dyn Vcs,
    request: &DeploymentRequest,
    workdir: &Path,
    log: &SessionLog,
) -> DeployResult<PathBuf> {
    let name = repo_dir_name(&request.repo_url)?;
    let dest = workdir.join(&name);
    let source = RepoSource::new(&request.repo_url, &request.credential)?;

    let output = if dest.join(".git").is_dir() {
        log.info(format!(
            "Repository {name} exists, fetching branch {}",
            request.branch
        ));
        vcs.fetch_and_checkout(&source, &request.branch, &dest)?
    } else if dest.exists() {
        return Err(DeployError::RepoSync(format!(
            "{} exists but is not a git working copy",
            dest.display()
        )));
    } else {
        log.info(format!(
            "Cloning {} (branch {}) into {name}",
            source.authenticated, request.branch
        ));
        vcs.clone_repo(&source, &request.branch, &dest)?
    };

    log.output(&output.combined());

    if output.success() {
        Ok(dest)
    } else {
        Err(DeployError::RepoSync(format!(
            "git exited with code {}",
            output.exit_code()
        )))
    }
}

/// Local directory name for a repository: the last path segment
/// without a trailing `.git`.
pub fn repo_dir_name(repo_url: &str) -> DeployResult<String> {
    let url = parse_url(repo_url)?;
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| s.strip_suffix(".git").unwrap_or(s).to_string())
        .filter(|s| !s.is_empty() && s != "." && s != "..")
        .ok_or_else(|| DeployError::InvalidUrl(repo_url.to_string()))
}

/// Embed the credential as the basic-auth user segment.
pub fn authenticated_url(repo_url: &str, credential: &Secret) -> DeployResult<String> {
    let mut url = parse_url(repo_url)?;
    url.set_username(credential.expose())
        .map_err(|()| DeployError::InvalidUrl(repo_url.to_string()))?;
    url.set_password(None)
        .map_err(|()| DeployError::InvalidUrl(repo_url.to_string()))?;
    Ok(url.to_string())
}

/// Every form the credential can take in output: raw and
/// percent-encoded as a URL user segment.
#[must_use]
pub fn secret_forms(credential: &Secret) -> Vec<String> {
    let mut forms = vec![credential.expose().to_string()];
    if let Ok(mut url) = Url::parse("https://host.invalid/") {
        if url.set_username(credential.expose()).is_ok() {
            let encoded = url.username().to_string();
            if !forms.contains(&encoded) {
                forms.push(encoded);
            }
        }
    }
    forms
}

fn parse_url(repo_url: &str) -> DeployResult<Url> {
    Url::parse(repo_url).map_err(|_| DeployError::InvalidUrl(repo_url.to_string()))
}

fn merge_outputs(first: CommandOutput, second: CommandOutput) -> CommandOutput {
    CommandOutput {
        code: second.code,
        stdout: first.stdout + &second.stdout,
        stderr: first.stderr + &second.stderr,
    }
}
