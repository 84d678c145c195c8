use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DeployError, DeployResult};
use crate::request::{DEFAULT_BRANCH, DeploymentRequest, RawInput, Secret};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://.+").expect("URL pattern is valid"));

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").expect("IPv4 pattern is valid")
});

/// A request that passed every check, plus the non-fatal
/// warnings raised on the way.
#[derive(Debug)]
pub struct Validated {
    pub request: DeploymentRequest,
    pub warnings: Vec<String>,
}

/// Check every field in prompt order and stop at the first
/// failure. Has no side effects.
pub fn validate(raw: &RawInput) -> DeployResult<Validated> {
    let mut warnings = Vec::new();

    let repo_url = validate_url(&raw.repo_url)?;
    validate_credential(&raw.credential)?;
    let branch = normalize_branch(&raw.branch, &mut warnings);
    let ssh_user = validate_ssh_user(&raw.ssh_user)?;
    let server_address = validate_address(&raw.server_address)?;
    let ssh_key_path = validate_key_path(&raw.ssh_key_path, &mut warnings)?;
    let app_port = validate_port(&raw.app_port)?;

    Ok(Validated {
        request: DeploymentRequest {
            repo_url,
            branch,
            credential: raw.credential.clone(),
            ssh_user,
            server_address,
            ssh_key_path,
            app_port,
        },
        warnings,
    })
}

pub fn validate_url(url: &str) -> DeployResult<String> {
    let url = url.trim();
    if URL_RE.is_match(url) {
        Ok(url.to_string())
    } else {
        Err(DeployError::InvalidUrl(url.to_string()))
    }
}

pub fn validate_credential(credential: &Secret) -> DeployResult<()> {
    if credential.is_empty() {
        Err(DeployError::EmptyCredential)
    } else {
        Ok(())
    }
}

/// Empty branch falls back to `main` with a warning.
pub fn normalize_branch(branch: &str, warnings: &mut Vec<String>) -> String {
    let branch = branch.trim();
    if branch.is_empty() {
        warnings.push(format!("No branch given, defaulting to '{DEFAULT_BRANCH}'"));
        DEFAULT_BRANCH.to_string()
    } else {
        branch.to_string()
    }
}

pub fn validate_ssh_user(user: &str) -> DeployResult<String> {
    let user = user.trim();
    if user.is_empty() {
        Err(DeployError::EmptySshUser)
    } else {
        Ok(user.to_string())
    }
}

pub fn validate_address(address: &str) -> DeployResult<Ipv4Addr> {
    let address = address.trim();
    let invalid = || DeployError::InvalidAddress(address.to_string());

    let caps = IPV4_RE.captures(address).ok_or_else(invalid)?;
    let mut octets = [0u8; 4];
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = caps[i + 1].parse().map_err(|_| invalid())?;
    }
    Ok(Ipv4Addr::from(octets))
}

/// Expand `~` and require an existing regular file. Group or
/// world permission bits only produce a warning.
pub fn validate_key_path(path: &str, warnings: &mut Vec<String>) -> DeployResult<PathBuf> {
    let path = path.trim();
    let expanded = PathBuf::from(shellexpand::tilde(path).as_ref());

    if path.is_empty() || !expanded.is_file() {
        return Err(DeployError::KeyNotFound(expanded.display().to_string()));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = std::fs::metadata(&expanded)?.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warnings.push(format!(
                "SSH key {} has permissions {mode:o}, expected 600",
                expanded.display()
            ));
        }
    }
    #[cfg(not(unix))]
    let _ = warnings;

    Ok(expanded)
}

pub fn validate_port(port: &str) -> DeployResult<u16> {
    let port = port.trim();
    let invalid = || DeployError::InvalidPort(port.to_string());

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(p) => Ok(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_requires_http_scheme() {
        assert!(validate_url("https://example.com/org/app.git").is_ok());
        assert!(validate_url("http://x").is_ok());
        assert!(validate_url("git@example.com:org/app.git").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn address_boundaries() {
        assert_eq!(
            validate_address("0.0.0.0").unwrap(),
            Ipv4Addr::new(0, 0, 0, 0)
        );
        assert_eq!(
            validate_address("255.255.255.255").unwrap(),
            Ipv4Addr::new(255, 255, 255, 255)
        );
        assert!(validate_address("256.1.1.1").is_err());
        assert!(validate_address("1.2.3").is_err());
        assert!(validate_address("1.2.3.4.5").is_err());
        assert!(validate_address("a.b.c.d").is_err());
        assert!(validate_address("1..2.3").is_err());
    }

    #[test]
    fn port_boundaries() {
        assert_eq!(validate_port("1").unwrap(), 1);
        assert_eq!(validate_port("65535").unwrap(), 65535);
        assert!(validate_port("0").is_err());
        assert!(validate_port("65536").is_err());
        assert!(validate_port("-1").is_err());
        assert!(validate_port("80a").is_err());
        assert!(validate_port("").is_err());
        assert!(validate_port("99999999999999999999").is_err());
    }

    #[test]
    fn branch_defaults_to_main() {
        let mut warnings = Vec::new();

        let branch = normalize_branch("  ", &mut warnings);

        assert_eq!(branch, "main");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn explicit_branch_has_no_warning() {
        let mut warnings = Vec::new();

        let branch = normalize_branch("develop", &mut warnings);

        assert_eq!(branch, "develop");
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut warnings = Vec::new();

        let err = validate_key_path("/definitely/not/here/id_rsa", &mut warnings).unwrap_err();

        assert_eq!(err.exit_code(), 14);
    }

    #[test]
    fn directory_is_not_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut warnings = Vec::new();

        let err = validate_key_path(dir.path().to_str().unwrap(), &mut warnings).unwrap_err();

        assert!(matches!(err, DeployError::KeyNotFound(_)));
    }
}
