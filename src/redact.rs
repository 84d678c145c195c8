use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::{Arc, PoisonError, RwLock};

use tracing_subscriber::fmt::MakeWriter;

/// Placeholder written in place of every registered secret.
pub const MASK: &str = "****";

/// Shared set of secret substrings that must never reach an
/// output sink.
///
/// Clones share the same set, so a secret registered after a
/// sink was built is still masked by it.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    secrets: Arc<RwLock<Vec<String>>>,
}

impl Redactor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret. Empty strings are ignored.
    pub fn register(&self, secret: &str) {
        if secret.is_empty() {
            return;
        }
        let mut secrets = self
            .secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if secrets.iter().any(|s| s == secret) {
            return;
        }
        secrets.push(secret.to_string());
        // Longest first so an encoded form is never half-masked
        // by a shorter secret it contains.
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
    }

    /// Replace every registered secret in `text` with [`MASK`].
    #[must_use]
    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let secrets = self
            .secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut out = Cow::Borrowed(text);
        for secret in secrets.iter() {
            if out.contains(secret.as_str()) {
                out = Cow::Owned(out.replace(secret.as_str(), MASK));
            }
        }
        out
    }
}

/// Writer decorator that masks secrets before bytes reach the
/// wrapped sink.
///
/// Each `write` call is redacted on its own, so callers hand
/// over whole lines.
pub struct RedactingWriter<W> {
    inner: W,
    redactor: Redactor,
}

impl<W: Write> RedactingWriter<W> {
    pub const fn new(inner: W, redactor: Redactor) -> Self {
        Self { inner, redactor }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let clean = self.redactor.redact(&text);
        self.inner.write_all(clean.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `tracing-subscriber` writer factory that routes diagnostics to
/// stderr through a [`RedactingWriter`].
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter {
    redactor: Redactor,
}

impl RedactingMakeWriter {
    #[must_use]
    pub const fn new(redactor: Redactor) -> Self {
        Self { redactor }
    }
}

impl<'a> MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(io::stderr(), self.redactor.clone())
    }
}
