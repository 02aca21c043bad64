//! Line input for the review loop

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use thiserror::Error;
use tracing::debug;

/// Interactive input failures
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("input interrupted")]
    Interrupted,

    #[error("end of input")]
    Eof,

    #[error("readline error: {0}")]
    Readline(String),
}

impl PromptError {
    /// Ctrl-C and Ctrl-D both mean the user wants out
    pub fn is_quit(&self) -> bool {
        matches!(self, PromptError::Interrupted | PromptError::Eof)
    }
}

impl From<ReadlineError> for PromptError {
    fn from(e: ReadlineError) -> Self {
        match e {
            ReadlineError::Interrupted => PromptError::Interrupted,
            ReadlineError::Eof => PromptError::Eof,
            other => PromptError::Readline(other.to_string()),
        }
    }
}

/// Blocking source of user input lines
pub trait Prompter {
    /// Show `prompt` and read one line, without the trailing newline
    fn read_line(&mut self, prompt: &str) -> Result<String, PromptError>;
}

/// Terminal input through rustyline
pub struct ReadlinePrompter {
    editor: DefaultEditor,
}

impl ReadlinePrompter {
    pub fn new() -> Result<Self, PromptError> {
        debug!("ReadlinePrompter::new: called");
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompter for ReadlinePrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String, PromptError> {
        let line = self.editor.readline(prompt)?;
        if !line.trim().is_empty() {
            let _ = self.editor.add_history_entry(line.as_str());
        }
        Ok(line)
    }
}
