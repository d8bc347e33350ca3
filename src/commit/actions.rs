//! What the user can do with a generated message.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use dialoguer::Select;
use tracing::debug;

use crate::error::{ClipboardError, PromptError};

/// Choice made after a message is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accept,
    Copy,
    Regenerate,
    Cancel,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Accept, Action::Copy, Action::Regenerate, Action::Cancel];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Accept => "Accept and commit",
            Action::Copy => "Copy to clipboard",
            Action::Regenerate => "Regenerate",
            Action::Cancel => "Cancel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Asks the user what to do with a message.
#[cfg_attr(test, mockall::automock)]
pub trait ActionPrompt: Send + Sync {
    fn choose(&self, message: &str) -> Result<Action, PromptError>;
}

/// Arrow-key menu on the terminal. Escape counts as cancel.
pub struct TerminalPrompt;

impl ActionPrompt for TerminalPrompt {
    fn choose(&self, _message: &str) -> Result<Action, PromptError> {
        if !console_is_interactive() {
            return Err(PromptError::Unavailable("stdin is not a terminal".into()));
        }

        let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
        let picked = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact_opt()?;

        Ok(picked.and_then(|i| Action::ALL.get(i).copied()).unwrap_or(Action::Cancel))
    }
}

fn console_is_interactive() -> bool {
    use std::io::IsTerminal;
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Destination for the copy action.
#[cfg_attr(test, mockall::automock)]
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Copies through whichever platform utility is installed.
pub struct SystemClipboard;

const CLIPBOARD_PROGRAMS: [(&str, &[&str]); 5] = [
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip", &[]),
];

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        let (program, args) = CLIPBOARD_PROGRAMS
            .iter()
            .find(|(program, _)| which::which(program).is_ok())
            .ok_or(ClipboardError::NoUtility)?;

        debug!("Copying {} chars with {}", text.len(), program);
        let failed = |message: String| ClipboardError::Failed {
            program: program.to_string(),
            message,
        };

        let mut child = Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| failed(e.to_string()))?;
        }

        let output = child.wait_with_output().map_err(|e| failed(e.to_string()))?;
        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(())
    }
}
