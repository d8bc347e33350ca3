//! Resolved configuration types and built-in defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Primary model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Ollama's default listen address.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Embeddings model used when no profile carries the `embed` role.
pub const FALLBACK_EMBEDDINGS_MODEL: &str = "nomic-embed-text";

/// Name of the synthetic embeddings profile.
pub const EMBEDDINGS_PROFILE_NAME: &str = "embeddingsProvider";

pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_MODEL_PULL_TIMEOUT_MS: u64 = 300_000;

/// Role a model profile can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    Chat,
    Edit,
    Autocomplete,
    Apply,
    Summarize,
    Embed,
}

impl ModelRole {
    /// Roles given to a profile created for the primary model.
    pub const CHAT_DEFAULTS: [ModelRole; 5] = [
        ModelRole::Chat,
        ModelRole::Edit,
        ModelRole::Autocomplete,
        ModelRole::Apply,
        ModelRole::Summarize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::Chat => "chat",
            ModelRole::Edit => "edit",
            ModelRole::Autocomplete => "autocomplete",
            ModelRole::Apply => "apply",
            ModelRole::Summarize => "summarize",
            ModelRole::Embed => "embed",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "edit" => Ok(Self::Edit),
            "autocomplete" => Ok(Self::Autocomplete),
            "apply" => Ok(Self::Apply),
            "summarize" => Ok(Self::Summarize),
            "embed" => Ok(Self::Embed),
            _ => Err(format!("Unknown model role: {}", s)),
        }
    }
}

/// Provider serving a model profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    #[serde(rename = "lmstudio")]
    LmStudio,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::LmStudio => "lmstudio",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LmStudio),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// A named model entry binding roles to a concrete model identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub name: String,
    pub provider: Provider,
    pub model: String,
    pub roles: Vec<ModelRole>,
}

impl ModelProfile {
    /// Profile for a primary chat model with the default role set.
    pub fn chat(model: &str) -> Self {
        Self {
            name: model.to_string(),
            provider: Provider::Ollama,
            model: model.to_string(),
            roles: ModelRole::CHAT_DEFAULTS.to_vec(),
        }
    }

    /// The synthetic embeddings profile.
    pub fn embeddings(model: &str) -> Self {
        Self {
            name: EMBEDDINGS_PROFILE_NAME.to_string(),
            provider: Provider::Ollama,
            model: model.to_string(),
            roles: vec![ModelRole::Embed],
        }
    }

    pub fn has_role(&self, role: ModelRole) -> bool {
        self.roles.contains(&role)
    }

    /// Check the profile and drop duplicate roles.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidProfile("name must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidProfile(format!(
                "profile '{}' has an empty model id",
                self.name
            )));
        }

        let mut seen = Vec::with_capacity(self.roles.len());
        self.roles.retain(|role| {
            if seen.contains(role) {
                false
            } else {
                seen.push(*role);
                true
            }
        });

        if self.roles.is_empty() {
            return Err(ConfigError::InvalidProfile(format!(
                "profile '{}' needs at least one role",
                self.name
            )));
        }

        Ok(self)
    }
}

/// Built-in system prompt styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptTemplate {
    #[default]
    Default,
    Conventional,
    Simple,
    Detailed,
}

impl PromptTemplate {
    pub const ALL: [PromptTemplate; 4] = [
        PromptTemplate::Default,
        PromptTemplate::Conventional,
        PromptTemplate::Simple,
        PromptTemplate::Detailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTemplate::Default => "default",
            PromptTemplate::Conventional => "conventional",
            PromptTemplate::Simple => "simple",
            PromptTemplate::Detailed => "detailed",
        }
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "conventional" => Ok(Self::Conventional),
            "simple" => Ok(Self::Simple),
            "detailed" => Ok(Self::Detailed),
            _ => Err(format!("Unknown prompt template: {}", s)),
        }
    }
}

/// Network timeouts, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    pub connection: u64,
    pub generation: u64,
    pub model_pull: u64,
}

impl Timeouts {
    pub fn connection(&self) -> Duration {
        Duration::from_millis(self.connection)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_millis(self.generation)
    }

    pub fn model_pull(&self) -> Duration {
        Duration::from_millis(self.model_pull)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connection: DEFAULT_CONNECTION_TIMEOUT_MS,
            generation: DEFAULT_GENERATION_TIMEOUT_MS,
            model_pull: DEFAULT_MODEL_PULL_TIMEOUT_MS,
        }
    }
}

/// A source of extra prompt context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextProviderSpec {
    pub provider: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

fn enabled_by_default() -> bool {
    true
}

impl ContextProviderSpec {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            enabled: true,
            params: None,
        }
    }

    /// Read an unsigned integer parameter.
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.as_ref()?.get(key)?.as_u64()
    }
}

/// Fully-resolved configuration consumed by one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub model: String,
    pub host: String,
    pub verbose: bool,
    pub interactive: bool,
    pub debug: bool,
    pub auto_stage: bool,
    pub auto_model: bool,
    pub auto_commit: bool,
    pub quiet: bool,
    pub prompt_file: PathBuf,
    pub prompt_template: PromptTemplate,
    pub timeouts: Timeouts,
    pub use_emojis: bool,
    pub models: Vec<ModelProfile>,
    pub embeddings_provider: String,
    pub context: Vec<ContextProviderSpec>,
}

impl ResolvedConfig {
    /// Built-in defaults. The prompt file location depends on the home directory.
    pub fn defaults(prompt_file: PathBuf) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            host: DEFAULT_HOST.to_string(),
            verbose: false,
            interactive: true,
            debug: false,
            auto_stage: false,
            auto_model: false,
            auto_commit: false,
            quiet: false,
            prompt_file,
            prompt_template: PromptTemplate::Default,
            timeouts: Timeouts::default(),
            use_emojis: false,
            models: vec![
                ModelProfile::chat(DEFAULT_MODEL),
                ModelProfile::embeddings(FALLBACK_EMBEDDINGS_MODEL),
            ],
            embeddings_provider: EMBEDDINGS_PROFILE_NAME.to_string(),
            context: vec![
                ContextProviderSpec::new("branch"),
                ContextProviderSpec {
                    provider: "recent-commits".to_string(),
                    enabled: true,
                    params: Some(serde_json::json!({ "limit": 5 })),
                },
            ],
        }
    }

    /// Auto-commit without staged content is meaningless, so it implies auto-stage.
    pub fn effective_auto_stage(&self) -> bool {
        self.auto_stage || self.auto_commit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_template_parse() {
        assert_eq!("conventional".parse::<PromptTemplate>(), Ok(PromptTemplate::Conventional));
        assert_eq!(" Detailed ".parse::<PromptTemplate>(), Ok(PromptTemplate::Detailed));
        assert!("fancy".parse::<PromptTemplate>().is_err());
    }

    #[test]
    fn test_provider_serde_names() {
        let json = serde_json::to_string(&Provider::OpenAi).unwrap();
        assert_eq!(json, r#""openai""#);
        let parsed: Provider = serde_json::from_str(r#""lmstudio""#).unwrap();
        assert_eq!(parsed, Provider::LmStudio);
    }

    #[test]
    fn test_profile_validation_dedups_roles() {
        let profile = ModelProfile {
            name: "coder".to_string(),
            provider: Provider::Ollama,
            model: "qwen2.5-coder".to_string(),
            roles: vec![ModelRole::Chat, ModelRole::Edit, ModelRole::Chat],
        };
        let profile = profile.validated().unwrap();
        assert_eq!(profile.roles, vec![ModelRole::Chat, ModelRole::Edit]);
    }

    #[test]
    fn test_profile_validation_rejects_empty_roles() {
        let profile = ModelProfile {
            name: "coder".to_string(),
            provider: Provider::Ollama,
            model: "qwen2.5-coder".to_string(),
            roles: vec![],
        };
        assert!(matches!(profile.validated(), Err(ConfigError::InvalidProfile(_))));
    }

    #[test]
    fn test_defaults_have_chat_and_embed_profiles() {
        let config = ResolvedConfig::defaults(PathBuf::from("/tmp/prompt.txt"));
        assert!(config.models.iter().any(|m| m.has_role(ModelRole::Chat) && m.model == config.model));
        assert!(config.models.iter().any(|m| m.has_role(ModelRole::Embed)));
        assert!(config.interactive);
    }

    #[test]
    fn test_auto_commit_forces_auto_stage() {
        let mut config = ResolvedConfig::defaults(PathBuf::from("/tmp/prompt.txt"));
        config.auto_stage = false;
        config.auto_commit = true;
        assert!(config.effective_auto_stage());
    }

    #[test]
    fn test_context_param_lookup() {
        let spec = ContextProviderSpec {
            provider: "recent-commits".to_string(),
            enabled: true,
            params: Some(serde_json::json!({ "limit": 3 })),
        };
        assert_eq!(spec.param_u64("limit"), Some(3));
        assert_eq!(spec.param_u64("missing"), None);
    }

    #[test]
    fn test_context_spec_enabled_defaults_true() {
        let spec: ContextProviderSpec = serde_json::from_str(r#"{"provider": "branch"}"#).unwrap();
        assert!(spec.enabled);
    }
}
