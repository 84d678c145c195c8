use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;

use crate::error::DeployResult;
use crate::redact::{Redactor, RedactingWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only, secret-redacted session log.
///
/// Every record goes to the session file and is echoed to the
/// console: info and warnings on stdout, errors on stderr. All
/// three sinks sit behind a [`RedactingWriter`], so nothing
/// logged here can leak a registered secret. Clones share the
/// same file.
#[derive(Clone)]
pub struct SessionLog {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    file: Mutex<RedactingWriter<File>>,
    redactor: Redactor,
    console: bool,
}

impl SessionLog {
    /// Create `deploy_<YYYYMMDD_HHMMSS>.log` in `dir`.
    pub fn create(dir: &Path, redactor: Redactor) -> DeployResult<Self> {
        let name = format!("deploy_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        Self::open(dir.join(name), redactor, true)
    }

    /// Open a log that only writes to `path`, without echoing to
    /// the console.
    pub fn quiet(path: impl Into<PathBuf>, redactor: Redactor) -> DeployResult<Self> {
        Self::open(path.into(), redactor, false)
    }

    fn open(path: PathBuf, redactor: Redactor, console: bool) -> DeployResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            inner: Arc::new(Inner {
                path,
                file: Mutex::new(RedactingWriter::new(file, redactor.clone())),
                redactor,
                console,
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    #[must_use]
    pub fn redactor(&self) -> &Redactor {
        &self.inner.redactor
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.record(Level::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.record(Level::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.record(Level::Error, message.as_ref());
    }

    /// Log captured command output, one info record per
    /// non-empty line.
    pub fn output(&self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.info(line);
        }
    }

    fn record(&self, level: Level, message: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let line = format_line(&timestamp, level, message);

        {
            let mut file = self
                .inner
                .file
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = file.write_all(line.as_bytes()) {
                tracing::warn!(
                    error = %e,
                    path = %self.inner.path.display(),
                    "failed to append to session log"
                );
            }
        }

        if !self.inner.console {
            return;
        }

        let redactor = self.inner.redactor.clone();
        let result = if level == Level::Error {
            RedactingWriter::new(io::stderr().lock(), redactor).write_all(line.as_bytes())
        } else {
            RedactingWriter::new(io::stdout().lock(), redactor).write_all(line.as_bytes())
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write log line to console");
        }
    }
}

/// Render one record as `[timestamp] [LEVEL] message\n`.
#[must_use]
pub fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    format!("[{timestamp}] [{level}] {message}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        let line = format_line("2026-01-02 03:04:05", Level::Warn, "careful");

        assert_eq!(line, "[2026-01-02 03:04:05] [WARN] careful\n");
    }

    #[test]
    fn records_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::quiet(dir.path().join("s.log"), Redactor::new()).unwrap();

        log.info("first");
        log.warn("second");
        log.error("third");

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("[INFO] first"));
        assert!(lines[1].ends_with("[WARN] second"));
        assert!(lines[2].ends_with("[ERROR] third"));
    }

    #[test]
    fn output_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::quiet(dir.path().join("s.log"), Redactor::new()).unwrap();

        log.output("one\n\n   \ntwo\n");

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
