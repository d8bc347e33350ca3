//! ollama-commit - writes commit messages for your working tree with a local Ollama model.
//!
//! # Overview
//!
//! The crate has two halves. [`config`] resolves settings from the
//! environment, a project file, a user file and built-in defaults, and keeps
//! the model-role registry in step with the primary model. [`commit`] runs
//! one round of change collection, prompting, generation and the user's
//! accept / copy / regenerate / cancel decision.

pub mod commit;
pub mod config;
pub mod display;
pub mod error;
pub mod git;
pub mod ollama;

// Re-export commonly used types
pub use commit::{Action, CommitOptions, CommitOrchestrator, CommitOutcome};
pub use config::{ConfigManager, ConfigPaths, ConfigTarget, ResolvedConfig};
pub use error::{ClipboardError, CommitError, ConfigError, GitError, ModelError, PromptError};
pub use git::{ChangeSet, GitBackend, GitCli};
pub use ollama::{ModelClient, OllamaClient};
