//! Interactive input.
//!
//! Values are resolved from an explicit override map (a snapshot of the process
//! environment taken at startup) before falling back to asking the operator.

use std::{
    collections::HashMap,
    io::{self, BufRead, Write},
};

use anyhow::{Context, Result, bail};
use dialoguer::{Password, console::Term};
use log::debug;

pub trait Prompt {
    /// Shows `message` and returns the operator's answer with surrounding
    /// whitespace removed.
    fn ask(&mut self, message: &str) -> Result<String>;

    /// Like [`Prompt::ask`] but the answer is not echoed.
    fn ask_secret(&mut self, message: &str) -> Result<String>;
}

/// Prompts on stderr and reads from stdin.
///
/// stdout belongs to the wrapped command, so nothing is written there.
pub struct Terminal;

impl Prompt for Terminal {
    fn ask(&mut self, message: &str) -> Result<String> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{message}")?;
        stderr.flush()?;
        read_answer(&mut io::stdin().lock(), message)
    }

    fn ask_secret(&mut self, message: &str) -> Result<String> {
        // dialoguer appends its own separator.
        let label = message.trim().trim_end_matches(':');
        let value = Password::new()
            .with_prompt(label)
            .allow_empty_password(true)
            .interact_on(&Term::stderr())
            .with_context(|| format!("Failed to read input for '{label}'"))?;
        Ok(value.trim().to_string())
    }
}

fn read_answer(reader: &mut impl BufRead, message: &str) -> Result<String> {
    let mut input = String::new();
    let read = reader
        .read_line(&mut input)
        .with_context(|| format!("Failed to read input for '{}'", message.trim()))?;
    if read == 0 {
        bail!("Unexpected end of input for '{}'", message.trim());
    }
    Ok(input.trim().to_string())
}

fn non_empty(value: String, message: &str) -> Result<String> {
    if value.is_empty() {
        bail!("No value entered for '{}'", message.trim());
    }
    Ok(value)
}

pub struct Input<P> {
    prompt: P,
    overrides: HashMap<String, String>,
}

impl<P: Prompt> Input<P> {
    pub fn new(prompt: P, overrides: HashMap<String, String>) -> Self {
        Self { prompt, overrides }
    }

    /// Returns the override for `key` when it is set and non-empty, otherwise asks.
    pub fn env_or_prompt(&mut self, key: &str, message: &str) -> Result<String> {
        self.resolve(key, message, false)
    }

    /// [`Input::env_or_prompt`] with a hidden answer.
    pub fn env_or_prompt_secret(&mut self, key: &str, message: &str) -> Result<String> {
        self.resolve(key, message, true)
    }

    /// Always asks. Empty answers are rejected.
    pub fn prompt(&mut self, message: &str) -> Result<String> {
        let value = self.prompt.ask(message)?;
        non_empty(value, message)
    }

    fn resolve(&mut self, key: &str, message: &str, secret: bool) -> Result<String> {
        if let Some(value) = self.overrides.get(key).filter(|value| !value.is_empty()) {
            debug!("Using {key} from the environment");
            return Ok(value.clone());
        }

        let answer = if secret {
            self.prompt.ask_secret(message).and_then(|value| non_empty(value, message))
        } else {
            self.prompt(message)
        };
        answer.with_context(|| format!("Set {key} or enter a value when prompted"))
    }

    #[cfg(test)]
    pub fn prompter(&self) -> &P {
        &self.prompt
    }
}

#[cfg(test)]
pub use scripted::Scripted;
