use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::Parser;

use crate::cmd;
use crate::container;
use crate::descriptor;
use crate::error::{DeployError, DeployResult};
use crate::git::{self, GitCli, Vcs};
use crate::input::{self, Prompter, TerminalPrompter};
use crate::log::SessionLog;
use crate::plan::{DeployPlan, SETTLE_DELAY};
use crate::probe::{self, HttpProbe, ReqwestProbe};
use crate::redact::RedactingWriter;
use crate::request::{DeploymentRequest, RawInput};
use crate::rsync::{FileMirror, Rsync};
use crate::scripts::{self, check};
use crate::session::Session;
use crate::ssh::{RemoteExecutor, SshSession};
use crate::state::{Stage, StepResult, step_name, transition};
use crate::validate;

/// Provisioning pipeline: eight gated steps from operator input
/// to a verified deployment.
///
/// External tools default to the real implementations (`git`,
/// `ssh`, `rsync`, `reqwest`) and can be swapped through the
/// builder methods.
pub struct Pipeline {
    session: Session,
    prompter: Box<dyn Prompter>,
    vcs: Option<Box<dyn Vcs>>,
    remote: Option<Box<dyn RemoteExecutor>>,
    mirror: Option<Box<dyn FileMirror>>,
    probe: Option<Box<dyn HttpProbe>>,
    settle_delay: Duration,
    run: RunState,
}

/// Values produced by earlier steps and consumed by later ones.
#[derive(Default)]
struct RunState {
    raw: Option<RawInput>,
    request: Option<DeploymentRequest>,
    checkout: Option<PathBuf>,
    plan: Option<DeployPlan>,
}

impl Pipeline {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            prompter: Box::new(TerminalPrompter),
            vcs: None,
            remote: None,
            mirror: None,
            probe: None,
            settle_delay: SETTLE_DELAY,
            run: RunState::default(),
        }
    }

    #[must_use]
    pub fn prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    #[must_use]
    pub fn vcs(mut self, vcs: impl Vcs + 'static) -> Self {
        self.vcs = Some(Box::new(vcs));
        self
    }

    #[must_use]
    pub fn remote(mut self, remote: impl RemoteExecutor + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    #[must_use]
    pub fn mirror(mut self, mirror: impl FileMirror + 'static) -> Self {
        self.mirror = Some(Box::new(mirror));
        self
    }

    #[must_use]
    pub fn probe(mut self, probe: impl HttpProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    #[must_use]
    pub const fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    #[must_use]
    pub fn log(&self) -> &SessionLog {
        &self.session.log
    }

    /// Run every step and return the terminal stage.
    pub fn run(&mut self) -> Stage {
        self.log().info(format!(
            "Deployment session started, log file: {}",
            self.log().path().display()
        ));

        let stage = self.drive(Stage::Init, None);
        self.report(stage);
        stage
    }

    /// Collect and validate input, then print the plan and the
    /// remote scripts without touching anything.
    ///
    /// Returns [`Stage::Validated`] on success.
    pub fn dry_run(&mut self) -> Stage {
        let stage = self.drive(Stage::Init, Some(Stage::Validated));

        let stage = if stage == Stage::Validated {
            match self.print_plan() {
                Ok(()) => stage,
                Err(err) => {
                    self.log().error(format!("Could not print plan: {err}"));
                    Stage::Failed {
                        step: 1,
                        exit_code: err.exit_code(),
                    }
                }
            }
        } else {
            stage
        };

        self.log()
            .info(format!("Full log: {}", self.log().path().display()));
        stage
    }

    fn drive(&mut self, mut stage: Stage, stop_at: Option<Stage>) -> Stage {
        while let Some(step) = stage.next_step() {
            if Some(stage) == stop_at {
                break;
            }

            let result = match self.execute(stage) {
                Ok(()) => StepResult::success(step),
                Err(err) => {
                    let code = err.exit_code();
                    self.log().error(format!(
                        "Step {step} ({}) failed with exit code {code}: {err}",
                        step_name(step)
                    ));
                    StepResult::failure(step, code)
                }
            };
            stage = transition(stage, &result);
        }
        stage
    }

    fn execute(&mut self, stage: Stage) -> DeployResult<()> {
        if let Some(step) = stage.next_step() {
            if stage != Stage::InputCollected {
                self.log()
                    .info(format!("=== Step {step}: {} ===", step_name(step)));
            }
        }

        match stage {
            Stage::Init => self.collect(),
            Stage::InputCollected => self.validate(),
            Stage::Validated => self.sync_repository(),
            Stage::RepoSynced => self.verify_descriptor(),
            Stage::DescriptorVerified => self.check_connectivity(),
            Stage::RemoteReachable => self.provision(),
            Stage::RemoteProvisioned => self.deploy(),
            Stage::AppDeployed => self.configure_proxy(),
            Stage::ProxyConfigured => self.verify(),
            Stage::Verified | Stage::Failed { .. } => Ok(()),
        }
    }

    fn collect(&mut self) -> DeployResult<()> {
        let raw = input::collect(self.prompter.as_mut())?;

        let log = &self.session.log;
        for form in git::secret_forms(&raw.credential) {
            log.redactor().register(&form);
        }
        log.info("Collected deployment parameters:");
        for line in raw.summary() {
            log.info(format!("  {line}"));
        }

        self.run.raw = Some(raw);
        Ok(())
    }

    fn validate(&mut self) -> DeployResult<()> {
        let raw = self.run.raw.as_ref().ok_or_else(|| missing("collected input"))?;
        let validated = validate::validate(raw)?;

        for warning in &validated.warnings {
            self.session.log.warn(warning);
        }
        let request = validated.request;

        self.check_local_tools()?;
        let plan = DeployPlan::from_request(&request)?;

        let ssh = SshSession::for_address(request.server_address, &request.ssh_user)
            .with_key(&request.ssh_key_path);
        if self.mirror.is_none() {
            self.mirror = Some(Box::new(Rsync::new(ssh.clone())));
        }
        if self.remote.is_none() {
            self.remote = Some(Box::new(ssh));
        }

        self.session.log.info(format!(
            "Parameters valid: {}@{}, branch {}, app port {}",
            request.ssh_user, request.server_address, request.branch, request.app_port
        ));

        self.run.request = Some(request);
        self.run.plan = Some(plan);
        Ok(())
    }

    /// Only tools whose real implementation will run are
    /// required locally.
    fn check_local_tools(&self) -> DeployResult<()> {
        let tools = [
            ("git", self.vcs.is_none()),
            ("ssh", self.remote.is_none()),
            ("rsync", self.mirror.is_none()),
        ];
        for (tool, required) in tools {
            if required && !cmd::command_exists(tool) {
                return Err(DeployError::PrerequisiteMissing(format!(
                    "{tool} is not installed locally"
                )));
            }
        }
        Ok(())
    }

    fn sync_repository(&mut self) -> DeployResult<()> {
        let request = self.run.request.as_ref().ok_or_else(|| missing("request"))?;
        let default_vcs = GitCli::new();
        let vcs: &dyn Vcs = self.vcs.as_deref().unwrap_or(&default_vcs);

        let checkout =
            git::sync_repository(vcs, request, self.session.workdir(), &self.session.log)?;
        self.session
            .log
            .info(format!("Working copy ready at {}", checkout.display()));

        self.run.checkout = Some(checkout);
        Ok(())
    }

    fn verify_descriptor(&mut self) -> DeployResult<()> {
        let checkout = self.run.checkout.as_ref().ok_or_else(|| missing("working copy"))?;
        let found = descriptor::detect(checkout)?;
        self.session
            .log
            .info(format!("Found build descriptor: {found}"));

        let plan = self.run.plan.take().ok_or_else(|| missing("plan"))?;
        self.run.plan = Some(plan.descriptor(found));
        Ok(())
    }

    fn check_connectivity(&self) -> DeployResult<()> {
        let remote = self.remote_executor()?;
        let target = self.target()?;
        let log = self.log();

        log.info(format!("Checking SSH connectivity to {target}..."));
        for command in [scripts::CONNECTIVITY_PROBE, scripts::INTROSPECTION] {
            let out = remote.run_remote_command(command, log)?;
            if !out.success() {
                return Err(DeployError::SshFailed(format!(
                    "'{command}' on {target} exited with code {}",
                    out.exit_code()
                )));
            }
        }
        log.info("SSH connectivity verified");
        Ok(())
    }

    fn provision(&self) -> DeployResult<()> {
        let remote = self.remote_executor()?;
        let log = self.log();

        log.info("Installing Docker, Docker Compose and Nginx where missing...");
        let out = remote.run_remote_batch(&scripts::provision_script(), log)?;
        if !out.success() {
            return Err(DeployError::ProvisionFailed(out.exit_code()));
        }
        log.info("Remote host provisioned");
        Ok(())
    }

    fn deploy(&self) -> DeployResult<()> {
        let remote = self.remote_executor()?;
        let mirror = self.mirror.as_deref().ok_or_else(|| missing("file mirror"))?;
        let checkout = self.run.checkout.as_deref().ok_or_else(|| missing("working copy"))?;
        let plan = self.plan()?;
        let log = self.log();

        let out = mirror.mirror_files(checkout, &plan.remote_dir, log)?;
        if !out.success() {
            return Err(DeployError::MirrorFailed(out.exit_code()));
        }

        let out = remote.run_remote_batch(&scripts::deploy_script(plan), log)?;
        if !out.success() {
            return Err(DeployError::DeployFailed(format!(
                "deploy script exited with code {}",
                out.exit_code()
            )));
        }

        log.info(format!(
            "Waiting {}s for the application to start...",
            self.settle_delay.as_secs()
        ));
        thread::sleep(self.settle_delay);

        let live = remote.run_remote_command(&scripts::liveness_command(plan), log)?;
        if live.success() {
            log.info(format!("Application responded on {}", plan.liveness_url()));
            return Ok(());
        }

        log.warn(format!(
            "Application did not respond on {} (exit code {}), checking the container",
            plan.liveness_url(),
            live.exit_code()
        ));
        let state = remote.run_remote_batch(&scripts::container_state_script(plan), log)?;
        let running = state.success()
            && container::is_running(&plan.descriptor, &state.stdout).unwrap_or_else(|err| {
                log.warn(format!(
                    "Could not read the state of container {}: {err}",
                    plan.container
                ));
                false
            });
        if running {
            log.info(format!("Container {} is running", plan.container));
            Ok(())
        } else {
            Err(DeployError::DeployFailed(format!(
                "container {} is not running",
                plan.container
            )))
        }
    }

    fn configure_proxy(&self) -> DeployResult<()> {
        let remote = self.remote_executor()?;
        let plan = self.plan()?;
        let log = self.log();

        let site = scripts::site_for(plan);
        log.info(format!("Configuring nginx site {}", site.available_path()));
        let out = remote.run_remote_batch(&scripts::proxy_script(&site), log)?;
        if !out.success() {
            return Err(DeployError::ProxyConfigFailed(out.exit_code()));
        }
        log.info("Nginx configured and reloaded");
        Ok(())
    }

    fn verify(&self) -> DeployResult<()> {
        let remote = self.remote_executor()?;
        let plan = self.plan()?;
        let log = self.log();

        let out = remote.run_remote_batch(&scripts::validation_script(plan), log)?;
        match out.code {
            Some(0) => {}
            Some(check::ENGINE) => return Err(DeployError::EngineNotRunning),
            Some(check::CONTAINER) => {
                return Err(DeployError::ContainerNotRunning(plan.container.clone()));
            }
            Some(check::PROXY) => return Err(DeployError::ProxyNotRunning),
            Some(check::INTERNAL_PROBE) => return Err(DeployError::InternalProbeFailed),
            _ => return Err(DeployError::ValidationBatchFailed(out.exit_code())),
        }

        let url = plan.external_url();
        log.info(format!("Probing {url} from this machine..."));
        let status = match self.probe.as_deref() {
            Some(p) => probe::check(p, &url)?,
            None => probe::check(&ReqwestProbe::new()?, &url)?,
        };
        log.info(format!("External probe returned HTTP {status}"));
        Ok(())
    }

    fn report(&self, stage: Stage) {
        let log = self.log();
        match stage {
            Stage::Verified => {
                log.info("Deployment completed successfully");
                if let Some(plan) = &self.run.plan {
                    log.info(format!("Application available at {}", plan.external_url()));
                }
            }
            Stage::Failed { step, exit_code } => log.error(format!(
                "Deployment failed at step {step} ({}) with exit code {exit_code}",
                step_name(step)
            )),
            _ => {}
        }
        log.info(format!("Full log: {}", log.path().display()));
    }

    fn print_plan(&self) -> DeployResult<()> {
        let request = self.run.request.as_ref().ok_or_else(|| missing("request"))?;
        let plan = self.plan()?;
        let site = scripts::site_for(plan);

        let text = render_plan(request, plan, self.session.workdir(), &site.render())
            .map_err(|e| DeployError::Other(e.to_string()))?;

        let mut out = RedactingWriter::new(io::stdout().lock(), self.session.redactor().clone());
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn remote_executor(&self) -> DeployResult<&dyn RemoteExecutor> {
        self.remote.as_deref().ok_or_else(|| missing("remote executor"))
    }

    fn plan(&self) -> DeployResult<&DeployPlan> {
        self.run.plan.as_ref().ok_or_else(|| missing("plan"))
    }

    fn target(&self) -> DeployResult<String> {
        let request = self.run.request.as_ref().ok_or_else(|| missing("request"))?;
        Ok(format!("{}@{}", request.ssh_user, request.server_address))
    }
}

fn missing(what: &str) -> DeployError {
    DeployError::Other(format!("{what} not available at this stage"))
}

fn render_plan(
    request: &DeploymentRequest,
    plan: &DeployPlan,
    workdir: &Path,
    site: &str,
) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "=== Dry run: no changes will be made ===")?;
    writeln!(out)?;
    writeln!(out, "--- Plan ---")?;
    writeln!(out, "Repository:   {} (branch {})", request.repo_url, request.branch)?;
    writeln!(out, "Working copy: {}", workdir.join(&plan.project).display())?;
    writeln!(
        out,
        "Target:       {}@{} (key {})",
        request.ssh_user,
        request.server_address,
        request.ssh_key_path.display()
    )?;
    writeln!(out, "Image:        {}", plan.image)?;
    writeln!(
        out,
        "Container:    {} (127.0.0.1:{} -> {})",
        plan.container,
        plan.host_port(),
        plan.app_port
    )?;
    writeln!(out, "Remote dir:   {}", plan.remote_path())?;
    writeln!(
        out,
        "Build:        {} (assumed, detected after cloning)",
        plan.descriptor
    )?;
    writeln!(out)?;
    writeln!(out, "--- Step 5: provision ---")?;
    writeln!(out, "{}", scripts::provision_script())?;
    writeln!(out, "--- Step 6: deploy ---")?;
    writeln!(out, "{}", scripts::deploy_script(plan))?;
    writeln!(out, "--- Step 7: nginx site ---")?;
    writeln!(out, "{site}")?;
    writeln!(out, "--- Step 8: validation ---")?;
    writeln!(out, "{}", scripts::validation_script(plan))?;

    Ok(out)
}

#[derive(Parser)]
#[command(name = "shipyard", version)]
#[command(about = "Provision a Linux host and deploy a containerized app behind Nginx")]
pub struct Cli {
    /// Collect and validate input, then print the plan and remote
    /// scripts without executing them
    #[arg(long)]
    pub dry_run: bool,
}
