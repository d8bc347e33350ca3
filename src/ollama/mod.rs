//! Ollama model server access.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::ModelError;

pub use client::OllamaClient;
pub use types::InstalledModel;

/// Text generation against a model server.
///
/// This abstraction allows mocking the HTTP server in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run a single non-streaming completion and return the raw text.
    async fn generate(&self, model: &str, host: &str, prompt: &str) -> Result<String, ModelError>;

    /// Whether the server answers at all.
    async fn test_connection(&self, host: &str) -> bool;

    /// Models installed on the server.
    async fn list_models(&self, host: &str) -> Result<Vec<InstalledModel>, ModelError>;

    /// Download a model, waiting for the server to finish.
    async fn pull_model(&self, host: &str, model: &str) -> Result<(), ModelError>;
}
