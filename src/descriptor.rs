use std::fmt;
use std::path::Path;

use docker_compose_types::Compose;

use crate::error::{DeployError, DeployResult};

pub const DOCKERFILE: &str = "Dockerfile";

/// Compose file names in lookup order.
pub const COMPOSE_FILES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// How the project at the repository root builds its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildDescriptor {
    Dockerfile,
    Compose { file: String, services: Vec<String> },
}

impl BuildDescriptor {
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Dockerfile => DOCKERFILE,
            Self::Compose { file, .. } => file,
        }
    }
}

impl fmt::Display for BuildDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dockerfile => f.write_str(DOCKERFILE),
            Self::Compose { file, services } => {
                write!(f, "{file} (services: {})", services.join(", "))
            }
        }
    }
}

/// Find the build descriptor at `root`. A `Dockerfile` wins over
/// a compose file; a compose file must parse and declare at
/// least one service.
pub fn detect(root: &Path) -> DeployResult<BuildDescriptor> {
    if root.join(DOCKERFILE).is_file() {
        return Ok(BuildDescriptor::Dockerfile);
    }

    for name in COMPOSE_FILES {
        let path = root.join(name);
        if !path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        let services = compose_services(&content).map_err(|reason| DeployError::InvalidCompose {
            file: (*name).to_string(),
            reason,
        })?;
        return Ok(BuildDescriptor::Compose {
            file: (*name).to_string(),
            services,
        });
    }

    Err(DeployError::BuildDescriptorMissing(root.display().to_string()))
}

/// Service names declared in a compose document, in file order.
pub fn compose_services(content: &str) -> Result<Vec<String>, String> {
    let compose: Compose = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let services: Vec<String> = compose.services.0.keys().cloned().collect();

    if services.is_empty() {
        Err("no services declared".to_string())
    } else {
        Ok(services)
    }
}
