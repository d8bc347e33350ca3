//! Error types for ollama-commit modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from configuration loading and persistence.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine home directory for the user config file")]
    NoHomeDirectory,

    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to overwrite {path}: existing content is not a JSON object ({reason})")]
    InvalidFile { path: PathBuf, reason: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Invalid model profile: {0}")]
    InvalidProfile(String),

    #[error("No model profile named '{0}'")]
    ProfileNotFound(String),

    #[error("Unknown config key '{0}'")]
    UnknownKey(String),
}

/// Errors from the version-control layer.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("No changes to commit (working tree is clean)")]
    NoChanges,

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Failed to run git {command}: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the model server.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model not found on server: {0}")]
    ModelNotFound(String),

    #[error("Invalid model '{model}': {reason}")]
    InvalidModel { model: String, reason: String },

    #[error("Request to model server timed out after {0}ms")]
    Timeout(u64),

    #[error("Failed to connect to model server at {host}: {message}")]
    Connection { host: String, message: String },

    #[error("Network error talking to model server: {0}")]
    Network(String),

    #[error("Model server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Model server returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Errors from one commit-generation run.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<CommitError>,
    },

    #[error("No models installed on {host}. Pull one with: ollama-commit models pull <name>")]
    NoModelsAvailable { host: String },
}

/// Errors from the interactive action prompt.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Interactive prompt failed: {0}")]
    Terminal(#[from] dialoguer::Error),

    #[error("Interactive prompt is not available: {0}")]
    Unavailable(String),
}

/// Errors from clipboard access.
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("No clipboard utility found (tried pbcopy, wl-copy, xclip, xsel, clip)")]
    NoUtility,

    #[error("Clipboard utility {program} failed: {message}")]
    Failed { program: String, message: String },
}
