use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;

use crate::error::{DeployError, DeployResult};

/// Exit status and captured streams of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Exit code, with signal termination reported as -1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(-1)
    }

    /// Stdout followed by stderr, for logging.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Run a command to completion and capture its output. A
/// non-zero exit is returned in [`CommandOutput::code`], not as
/// an error.
pub fn run(program: &str, args: &[&str]) -> DeployResult<CommandOutput> {
    tracing::debug!(command = %format_command(program, args), "running");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, e))?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a command, optionally feeding `stdin`, and hand every
/// stdout line to `on_line` as it arrives.
///
/// Stdin is written and stderr drained on scoped helper threads
/// so neither pipe can fill up and stall the child.
pub fn run_streaming(
    program: &str,
    args: &[&str],
    stdin: Option<&[u8]>,
    on_line: &mut dyn FnMut(&str),
) -> DeployResult<CommandOutput> {
    tracing::debug!(command = %format_command(program, args), "streaming");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    // Reap the child before surfacing a read error.
    let streamed = stream_child(&mut child, stdin, on_line);
    let status = child.wait()?;
    let (stdout, stderr) = streamed?;

    Ok(CommandOutput {
        code: status.code(),
        stdout,
        stderr,
    })
}

fn stream_child(
    child: &mut Child,
    stdin: Option<&[u8]>,
    on_line: &mut dyn FnMut(&str),
) -> DeployResult<(String, String)> {
    let child_stdin = child.stdin.take();
    let child_stdout = child.stdout.take();
    let child_stderr = child.stderr.take();

    thread::scope(|scope| -> DeployResult<(String, String)> {
        if let (Some(mut pipe), Some(data)) = (child_stdin, stdin) {
            scope.spawn(move || {
                // A child that exits early closes the pipe; its exit
                // status reports the real failure.
                let _ = pipe.write_all(data);
            });
        }

        let stderr_handle = child_stderr.map(|mut pipe| {
            scope.spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let mut captured = String::new();
        if let Some(pipe) = child_stdout {
            let mut reader = BufReader::new(pipe);
            let mut buf = Vec::new();
            // Remote output is not guaranteed to be UTF-8.
            while reader.read_until(b'\n', &mut buf)? > 0 {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\n', '\r']);
                on_line(line);
                captured.push_str(line);
                captured.push('\n');
                buf.clear();
            }
        }

        let stderr = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        Ok((captured, stderr))
    })
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[must_use]
pub fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}

fn spawn_error(program: &str, e: std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(e)
    }
}
