//! Remote batch scripts for each provisioning step.
//!
//! Every script runs under the fail-fast prelude from
//! [`crate::ssh::BATCH_PRELUDE`]. Scripts that need root start
//! with [`SUDO_PRELUDE`], which picks `sudo` for non-root users.

use crate::descriptor::BuildDescriptor;
use crate::nginx::{NginxSite, SITES_ENABLED};
use crate::plan::DeployPlan;

pub const CONNECTIVITY_PROBE: &str = "echo ok";
pub const INTROSPECTION: &str = "whoami && hostname && uname -a";

pub const SUDO_PRELUDE: &str = "\
SUDO=\"\"
if [ \"$(id -u)\" -ne 0 ]; then SUDO=\"sudo\"; fi
";

const COMPOSE_PRELUDE: &str = "\
if $SUDO docker compose version >/dev/null 2>&1; then
    COMPOSE=\"$SUDO docker compose\"
else
    COMPOSE=\"$SUDO docker-compose\"
fi
";

/// Prints the ids of running containers of a compose file. Works
/// with Compose v1, which has no `ps --status` filter.
const COMPOSE_RUNNING: &str = "\
compose_running() {
    for id in $($COMPOSE -f \"$1\" ps -q 2>/dev/null); do
        running=$($SUDO docker inspect --format '{{.State.Running}}' \"$id\" 2>/dev/null || true)
        if [ \"$running\" = \"true\" ]; then
            echo \"$id\"
        fi
    done
}
";

/// Exit codes the validation script uses for each check.
pub mod check {
    pub const ENGINE: i32 = 31;
    pub const CONTAINER: i32 = 32;
    pub const PROXY: i32 = 33;
    pub const INTERNAL_PROBE: i32 = 34;
}

/// Install Docker, Compose and Nginx where missing, grant the
/// user Docker access and enable both services.
#[must_use]
pub fn provision_script() -> String {
    format!(
        "{SUDO_PRELUDE}\
export DEBIAN_FRONTEND=noninteractive
APT_UPDATED=0
apt_install() {{
    if [ \"$APT_UPDATED\" -eq 0 ]; then
        $SUDO apt-get update -y
        APT_UPDATED=1
    fi
    $SUDO apt-get install -y \"$@\"
}}

if command -v docker >/dev/null 2>&1; then
    echo \"Docker already installed\"
else
    echo \"Installing Docker...\"
    apt_install docker.io
fi

if docker compose version >/dev/null 2>&1 || command -v docker-compose >/dev/null 2>&1; then
    echo \"Docker Compose already installed\"
else
    echo \"Installing Docker Compose...\"
    # Ubuntu ships Compose v2 as docker-compose-v2; the plugin
    # package only exists in Docker's own repository.
    apt_install docker-compose-v2 || apt_install docker-compose-plugin \\
        || apt_install docker-compose
fi

if command -v nginx >/dev/null 2>&1; then
    echo \"Nginx already installed\"
else
    echo \"Installing Nginx...\"
    apt_install nginx
fi

$SUDO usermod -aG docker \"$(id -un)\"
$SUDO systemctl enable --now docker
$SUDO systemctl enable --now nginx

echo \"Installed versions:\"
docker --version
docker compose version 2>/dev/null || docker-compose --version
nginx -v
"
    )
}

/// Build and (re)start the application from the mirrored tree.
#[must_use]
pub fn deploy_script(plan: &DeployPlan) -> String {
    let dir = plan.remote_path();
    match &plan.descriptor {
        BuildDescriptor::Dockerfile => format!(
            "{SUDO_PRELUDE}\
cd \"{dir}\"
echo \"Building image {image}...\"
$SUDO docker build -t {image} .
echo \"Replacing container {container}...\"
$SUDO docker rm -f {container} >/dev/null 2>&1 || true
$SUDO docker run -d --name {container} --restart unless-stopped \\
    -p 127.0.0.1:{host_port}:{port} {image}
",
            image = plan.image,
            container = plan.container,
            host_port = plan.host_port(),
            port = plan.app_port,
        ),
        BuildDescriptor::Compose { file, .. } => format!(
            "{SUDO_PRELUDE}{COMPOSE_PRELUDE}\
cd \"{dir}\"
echo \"Building and starting services from {file}...\"
$COMPOSE -f {file} up -d --build --remove-orphans
$COMPOSE -f {file} ps
"
        ),
    }
}

/// Liveness probe run on the server straight against the app
/// port.
#[must_use]
pub fn liveness_command(plan: &DeployPlan) -> String {
    format!(
        "curl -fsS -o /dev/null --max-time 5 {}",
        plan.liveness_url()
    )
}

/// Print the container state: `docker inspect` JSON for a
/// Dockerfile project, running container ids for compose.
#[must_use]
pub fn container_state_script(plan: &DeployPlan) -> String {
    match &plan.descriptor {
        BuildDescriptor::Dockerfile => format!(
            "{SUDO_PRELUDE}$SUDO docker inspect --format '{{{{json .State}}}}' {}\n",
            plan.container
        ),
        BuildDescriptor::Compose { file, .. } => format!(
            "{SUDO_PRELUDE}{COMPOSE_PRELUDE}{COMPOSE_RUNNING}\
cd \"{}\"
compose_running {file}
",
            plan.remote_path()
        ),
    }
}

/// The site definition installed for `plan`.
#[must_use]
pub fn site_for(plan: &DeployPlan) -> NginxSite {
    NginxSite::new(&plan.site_name, &plan.upstream())
        .server_name(&plan.server_address.to_string())
        .proxy_headers()
}

/// Replace the site definition, syntax-check and reload.
///
/// `nginx -t` runs before `systemctl reload`; under the
/// fail-fast prelude a broken definition stops the script and
/// the running configuration stays in place.
#[must_use]
pub fn proxy_script(site: &NginxSite) -> String {
    format!(
        "{SUDO_PRELUDE}\
SITE_AVAILABLE=\"{available}\"
SITE_ENABLED=\"{enabled}\"
echo \"Removing previous site definition...\"
$SUDO rm -f \"$SITE_ENABLED\" \"$SITE_AVAILABLE\"
echo \"Writing site definition $SITE_AVAILABLE...\"
$SUDO tee \"$SITE_AVAILABLE\" >/dev/null <<'SHIPYARD_SITE'
{body}SHIPYARD_SITE
$SUDO ln -sf \"$SITE_AVAILABLE\" \"$SITE_ENABLED\"
if [ -e {SITES_ENABLED}/default ] || [ -L {SITES_ENABLED}/default ]; then
    echo \"Disabling default site...\"
    $SUDO rm -f {SITES_ENABLED}/default
fi
echo \"Checking configuration...\"
$SUDO nginx -t
echo \"Reloading nginx...\"
$SUDO systemctl reload nginx
",
        available = site.available_path(),
        enabled = site.enabled_path(),
        body = site.render(),
    )
}

/// On-server checks, each exiting with its own code from
/// [`check`].
#[must_use]
pub fn validation_script(plan: &DeployPlan) -> String {
    let (helpers, container_check) = match &plan.descriptor {
        BuildDescriptor::Dockerfile => (
            String::new(),
            format!(
                "[ \"$($SUDO docker inspect --format '{{{{.State.Running}}}}' {} \
                 2>/dev/null)\" = \"true\" ]",
                plan.container
            ),
        ),
        BuildDescriptor::Compose { file, .. } => (
            format!("{COMPOSE_PRELUDE}{COMPOSE_RUNNING}"),
            format!(
                "[ -n \"$(cd \"{}\" && compose_running {file})\" ]",
                plan.remote_path()
            ),
        ),
    };

    format!(
        "{SUDO_PRELUDE}{helpers}\
echo \"Checking docker service...\"
if ! $SUDO systemctl is-active --quiet docker; then
    echo \"docker is not active\"
    exit {engine}
fi
echo \"Checking container {container}...\"
if ! {container_check}; then
    echo \"container {container} is not running\"
    exit {running}
fi
echo \"Checking nginx service...\"
if ! $SUDO systemctl is-active --quiet nginx; then
    echo \"nginx is not active\"
    exit {proxy}
fi
echo \"Probing http://localhost/ through nginx...\"
if ! curl -fsS -o /dev/null --max-time 10 http://localhost/; then
    echo \"proxy probe failed\"
    exit {probe}
fi
echo \"All on-server checks passed\"
",
        container = plan.container,
        engine = check::ENGINE,
        running = check::CONTAINER,
        proxy = check::PROXY,
        probe = check::INTERNAL_PROBE,
    )
}
