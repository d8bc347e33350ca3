//! Commit Generation Orchestrator: turns the pending change set into a
//! commit message and acts on the user's decision.

pub mod actions;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod retry;
pub mod templates;

pub use actions::{Action, ActionPrompt, Clipboard, SystemClipboard, TerminalPrompt};
pub use message::{clean_message, commit_command};
pub use orchestrator::{Collaborators, CommitOptions, CommitOrchestrator, CommitOutcome, SideEffect};
pub use prompt::{MAX_DIFF_CHARS, build_commit_prompt, sanitize_diff, truncate_diff};
pub use retry::{
    ErrorClass, GenerationAttempt, MAX_ATTEMPTS, Sleeper, Step, TokioSleeper, backoff_policy, classify,
    classify_message, run_with_retry,
};
pub use templates::{builtin_prompt, system_prompt};
