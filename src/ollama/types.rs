//! Ollama HTTP API wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PullRequest<'a> {
    pub model: &'a str,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<InstalledModel>,
}

/// One entry of `GET /api/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstalledModel {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl InstalledModel {
    /// Whether `wanted` names this model, treating a missing tag as `:latest`.
    pub fn matches(&self, wanted: &str) -> bool {
        with_default_tag(&self.name) == with_default_tag(wanted)
    }

    /// Embedding-only models cannot write commit messages.
    pub fn is_embedding_model(&self) -> bool {
        self.name.to_lowercase().contains("embed")
    }
}

fn with_default_tag(name: &str) -> String {
    let name = name.trim();
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}:latest", name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}
