use std::collections::VecDeque;

use dialoguer::{Input, Password};

use crate::error::{DeployError, DeployResult};
use crate::request::{DEFAULT_BRANCH, RawInput, Secret};

/// Source of operator answers.
pub trait Prompter {
    /// Ask for a visible value. Empty input yields `default`
    /// when one is given.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String>;

    /// Ask for a value without echoing it.
    fn secret(&mut self, prompt: &str) -> DeployResult<Secret>;
}

/// Interactive terminal prompts.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input
            .interact_text()
            .map(|s| s.trim().to_string())
            .map_err(|e| DeployError::Input(e.to_string()))
    }

    fn secret(&mut self, prompt: &str) -> DeployResult<Secret> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(|s| Secret::new(&s))
            .map_err(|e| DeployError::Input(e.to_string()))
    }
}

/// Replays canned answers in order, for tests and scripted runs.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    fn next(&mut self, prompt: &str) -> DeployResult<String> {
        self.answers
            .pop_front()
            .ok_or_else(|| DeployError::Input(format!("no answer for '{prompt}'")))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        let answer = self.next(prompt)?;
        let answer = answer.trim();
        match default {
            Some(d) if answer.is_empty() => Ok(d.to_string()),
            _ => Ok(answer.to_string()),
        }
    }

    fn secret(&mut self, prompt: &str) -> DeployResult<Secret> {
        self.next(prompt).map(|s| Secret::new(&s))
    }
}

/// Ask for every deployment parameter, in a fixed order.
///
/// The branch prompt shows `main` as its default; an empty
/// answer is still left for the validator to normalize.
pub fn collect(prompter: &mut dyn Prompter) -> DeployResult<RawInput> {
    let repo_url = prompter.input("Git repository URL", None)?;
    let credential = prompter.secret("Personal access token")?;
    let branch = prompter.input(&format!("Branch [{DEFAULT_BRANCH}]"), None)?;
    let ssh_user = prompter.input("SSH username", None)?;
    let server_address = prompter.input("Server IP address", None)?;
    let ssh_key_path = prompter.input("SSH private key path", None)?;
    let app_port = prompter.input("Application port (inside the container)", None)?;

    Ok(RawInput {
        repo_url,
        credential,
        branch,
        ssh_user,
        server_address,
        ssh_key_path,
        app_port,
    })
}
