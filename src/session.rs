use std::path::{Path, PathBuf};

use crate::log::SessionLog;
use crate::redact::Redactor;

/// Per-run context handed to every component: the session log
/// and the local directory that holds the working copy.
#[derive(Clone)]
pub struct Session {
    pub log: SessionLog,
    pub workdir: PathBuf,
}

impl Session {
    #[must_use]
    pub const fn new(log: SessionLog, workdir: PathBuf) -> Self {
        Self { log, workdir }
    }

    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    #[must_use]
    pub fn redactor(&self) -> &Redactor {
        self.log.redactor()
    }
}
