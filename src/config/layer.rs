//! Partial configuration layers and the pure functions that combine them.
//!
//! A layer holds whatever one source supplied: a JSON file, the environment,
//! or a CLI-driven patch. Absent fields stay `None` so that lower layers can
//! fill the gap.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::schema::{ContextProviderSpec, ModelProfile, PromptTemplate, ResolvedConfig};

/// Prefix shared by all per-field environment variables.
pub const ENV_PREFIX: &str = "OLLAMA_COMMIT_";

/// Environment variable for the model server host.
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";

/// A non-fatal configuration problem. The affected value falls back to the
/// next-lower layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
}

impl ConfigWarning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Partial timeouts, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_pull: Option<u64>,
}

impl TimeoutsLayer {
    pub fn is_empty(&self) -> bool {
        self.connection.is_none() && self.generation.is_none() && self.model_pull.is_none()
    }
}

/// One configuration source's contribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_stage: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_model: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_commit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<PromptTemplate>,
    #[serde(default, skip_serializing_if = "TimeoutsLayer::is_empty")]
    pub timeouts: TimeoutsLayer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_emojis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<ModelProfile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<ContextProviderSpec>>,
}

impl ConfigLayer {
    /// Build a layer from a parsed JSON object, one field at a time.
    ///
    /// A field with the wrong type is skipped with a warning instead of
    /// discarding the whole layer. Unknown keys are ignored.
    pub fn from_json(map: &Map<String, Value>, origin: &str, warnings: &mut Vec<ConfigWarning>) -> Self {
        let field = |key: &str| map.get(key).filter(|v| !v.is_null());

        let mut layer = ConfigLayer {
            model: decode(field("model"), "model", origin, warnings),
            host: None,
            verbose: decode(field("verbose"), "verbose", origin, warnings),
            interactive: decode(field("interactive"), "interactive", origin, warnings),
            debug: decode(field("debug"), "debug", origin, warnings),
            auto_stage: decode(field("autoStage"), "autoStage", origin, warnings),
            auto_model: decode(field("autoModel"), "autoModel", origin, warnings),
            auto_commit: decode(field("autoCommit"), "autoCommit", origin, warnings),
            quiet: decode(field("quiet"), "quiet", origin, warnings),
            prompt_file: decode(field("promptFile"), "promptFile", origin, warnings),
            prompt_template: decode(field("promptTemplate"), "promptTemplate", origin, warnings),
            timeouts: TimeoutsLayer::default(),
            use_emojis: decode(field("useEmojis"), "useEmojis", origin, warnings),
            models: decode(field("models"), "models", origin, warnings),
            embeddings_provider: decode(
                field("embeddingsProvider"),
                "embeddingsProvider",
                origin,
                warnings,
            ),
            context: decode(field("context"), "context", origin, warnings),
        };

        let host: Option<String> = decode(field("host"), "host", origin, warnings);
        layer.host = host.map(|h| normalize_host(&h, origin, warnings));

        match field("timeouts") {
            Some(Value::Object(timeouts)) => {
                let sub = |key: &str| timeouts.get(key).filter(|v| !v.is_null());
                layer.timeouts = TimeoutsLayer {
                    connection: decode(sub("connection"), "timeouts.connection", origin, warnings),
                    generation: decode(sub("generation"), "timeouts.generation", origin, warnings),
                    model_pull: decode(sub("modelPull"), "timeouts.modelPull", origin, warnings),
                };
            }
            Some(other) => warnings.push(ConfigWarning::new(format!(
                "Ignoring 'timeouts' in {origin}: expected an object, found {other}"
            ))),
            None => {}
        }

        layer
    }

    /// Build the environment layer.
    ///
    /// Each variable maps to exactly one field. Booleans accept `true`/`1`,
    /// numbers that fail to parse are dropped so the next layer wins.
    pub fn from_env(env: &EnvSnapshot, warnings: &mut Vec<ConfigWarning>) -> Self {
        let flag = |path: &str| env.get(&env_var_name(path)).map(parse_env_bool);
        let text = |path: &str| env.get(&env_var_name(path)).map(str::to_string);
        let number = |path: &str| env.get(&env_var_name(path)).and_then(|v| v.trim().parse::<u64>().ok());

        let prompt_template = env.get(&env_var_name("promptTemplate")).and_then(|raw| {
            match raw.parse::<PromptTemplate>() {
                Ok(template) => Some(template),
                Err(_) => {
                    warnings.push(ConfigWarning::new(format!(
                        "Ignoring {}='{}': expected one of default, conventional, simple, detailed",
                        env_var_name("promptTemplate"),
                        raw
                    )));
                    None
                }
            }
        });

        let host = env
            .get(HOST_ENV_VAR)
            .map(|h| normalize_host(h, HOST_ENV_VAR, warnings));

        ConfigLayer {
            model: text("model"),
            host,
            verbose: flag("verbose"),
            interactive: flag("interactive"),
            debug: flag("debug"),
            auto_stage: flag("autoStage"),
            auto_model: flag("autoModel"),
            auto_commit: flag("autoCommit"),
            quiet: flag("quiet"),
            prompt_file: text("promptFile").map(PathBuf::from),
            prompt_template,
            timeouts: TimeoutsLayer {
                connection: number("timeouts.connection"),
                generation: number("timeouts.generation"),
                model_pull: number("timeouts.modelPull"),
            },
            use_emojis: flag("useEmojis"),
            models: None,
            embeddings_provider: text("embeddingsProvider"),
            context: None,
        }
    }

    /// Combine two layers; values from `higher` win field by field.
    pub fn overlay(&self, higher: &ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            model: higher.model.clone().or_else(|| self.model.clone()),
            host: higher.host.clone().or_else(|| self.host.clone()),
            verbose: higher.verbose.or(self.verbose),
            interactive: higher.interactive.or(self.interactive),
            debug: higher.debug.or(self.debug),
            auto_stage: higher.auto_stage.or(self.auto_stage),
            auto_model: higher.auto_model.or(self.auto_model),
            auto_commit: higher.auto_commit.or(self.auto_commit),
            quiet: higher.quiet.or(self.quiet),
            prompt_file: higher.prompt_file.clone().or_else(|| self.prompt_file.clone()),
            prompt_template: higher.prompt_template.or(self.prompt_template),
            timeouts: TimeoutsLayer {
                connection: higher.timeouts.connection.or(self.timeouts.connection),
                generation: higher.timeouts.generation.or(self.timeouts.generation),
                model_pull: higher.timeouts.model_pull.or(self.timeouts.model_pull),
            },
            use_emojis: higher.use_emojis.or(self.use_emojis),
            models: higher.models.clone().or_else(|| self.models.clone()),
            embeddings_provider: higher
                .embeddings_provider
                .clone()
                .or_else(|| self.embeddings_provider.clone()),
            context: higher.context.clone().or_else(|| self.context.clone()),
        }
    }

    /// Fill a full configuration: present fields replace the base values.
    pub fn apply_to(&self, base: &ResolvedConfig) -> ResolvedConfig {
        let mut out = base.clone();
        if let Some(v) = &self.model {
            out.model = v.clone();
        }
        if let Some(v) = &self.host {
            out.host = v.clone();
        }
        if let Some(v) = self.verbose {
            out.verbose = v;
        }
        if let Some(v) = self.interactive {
            out.interactive = v;
        }
        if let Some(v) = self.debug {
            out.debug = v;
        }
        if let Some(v) = self.auto_stage {
            out.auto_stage = v;
        }
        if let Some(v) = self.auto_model {
            out.auto_model = v;
        }
        if let Some(v) = self.auto_commit {
            out.auto_commit = v;
        }
        if let Some(v) = self.quiet {
            out.quiet = v;
        }
        if let Some(v) = &self.prompt_file {
            out.prompt_file = v.clone();
        }
        if let Some(v) = self.prompt_template {
            out.prompt_template = v;
        }
        if let Some(v) = self.timeouts.connection {
            out.timeouts.connection = v;
        }
        if let Some(v) = self.timeouts.generation {
            out.timeouts.generation = v;
        }
        if let Some(v) = self.timeouts.model_pull {
            out.timeouts.model_pull = v;
        }
        if let Some(v) = self.use_emojis {
            out.use_emojis = v;
        }
        if let Some(v) = &self.models {
            out.models = v.clone();
        }
        if let Some(v) = &self.embeddings_provider {
            out.embeddings_provider = v.clone();
        }
        if let Some(v) = &self.context {
            out.context = v.clone();
        }
        out
    }

    /// Serialize only the fields this layer supplies.
    pub fn to_json_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Build a single-field patch from a `key value` pair typed on the CLI.
    ///
    /// The value is read as JSON when possible (`true`, `42`, `[...]`) and as a
    /// plain string otherwise. Dotted keys address `timeouts.*`.
    pub fn from_assignment(key: &str, raw: &str, warnings: &mut Vec<ConfigWarning>) -> Option<Self> {
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

        let mut map = Map::new();
        match key.split_once('.') {
            Some(("timeouts", sub)) if matches!(sub, "connection" | "generation" | "modelPull") => {
                let mut inner = Map::new();
                inner.insert(sub.to_string(), value);
                map.insert("timeouts".to_string(), Value::Object(inner));
            }
            Some(_) => return None,
            None if KNOWN_KEYS.contains(&key) => {
                map.insert(key.to_string(), value);
            }
            None => return None,
        }

        Some(ConfigLayer::from_json(&map, "command line", warnings))
    }
}

/// Top-level keys understood in config files.
pub const KNOWN_KEYS: [&str; 16] = [
    "model",
    "host",
    "verbose",
    "interactive",
    "debug",
    "autoStage",
    "autoModel",
    "autoCommit",
    "quiet",
    "promptFile",
    "promptTemplate",
    "timeouts",
    "useEmojis",
    "models",
    "embeddingsProvider",
    "context",
];

fn decode<T: DeserializeOwned>(
    value: Option<&Value>,
    key: &str,
    origin: &str,
    warnings: &mut Vec<ConfigWarning>,
) -> Option<T> {
    let value = value?;
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warnings.push(ConfigWarning::new(format!(
                "Ignoring '{key}' in {origin}: {e}"
            )));
            None
        }
    }
}

/// Best-effort host cleanup: add a missing scheme and drop trailing slashes.
pub fn normalize_host(raw: &str, origin: &str, warnings: &mut Vec<ConfigWarning>) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }

    let fixed = format!("http://{}", trimmed);
    warnings.push(ConfigWarning::new(format!(
        "Host '{raw}' from {origin} has no http(s) scheme; using '{fixed}'"
    )));
    fixed
}

/// Map a camelCase config path to its environment variable name.
///
/// `timeouts.modelPull` becomes `OLLAMA_COMMIT_TIMEOUTS_MODEL_PULL`.
pub fn env_var_name(path: &str) -> String {
    let mut name = String::from(ENV_PREFIX);
    for ch in path.chars() {
        if ch == '.' {
            name.push('_');
        } else if ch.is_ascii_uppercase() {
            name.push('_');
            name.push(ch);
        } else {
            name.push(ch.to_ascii_uppercase());
        }
    }
    name
}

fn parse_env_bool(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "1")
}

/// Snapshot of the relevant process environment.
///
/// Captured once so that resolution is a pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture `OLLAMA_HOST` and every `OLLAMA_COMMIT_*` variable.
    pub fn from_process() -> Self {
        let vars = std::env::vars()
            .filter(|(k, _)| k == HOST_ENV_VAR || k.starts_with(ENV_PREFIX))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Look up a variable. Empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_env_var_name_transform() {
        assert_eq!(env_var_name("model"), "OLLAMA_COMMIT_MODEL");
        assert_eq!(env_var_name("autoStage"), "OLLAMA_COMMIT_AUTO_STAGE");
        assert_eq!(env_var_name("timeouts.modelPull"), "OLLAMA_COMMIT_TIMEOUTS_MODEL_PULL");
        assert_eq!(env_var_name("timeouts.generation"), "OLLAMA_COMMIT_TIMEOUTS_GENERATION");
    }

    #[test]
    fn test_env_bool_parsing() {
        let env = EnvSnapshot::from_pairs([
            ("OLLAMA_COMMIT_VERBOSE", "1"),
            ("OLLAMA_COMMIT_DEBUG", "true"),
            ("OLLAMA_COMMIT_QUIET", "yes"),
        ]);
        let layer = ConfigLayer::from_env(&env, &mut Vec::new());
        assert_eq!(layer.verbose, Some(true));
        assert_eq!(layer.debug, Some(true));
        assert_eq!(layer.quiet, Some(false));
        assert_eq!(layer.auto_commit, None);
    }

    #[test]
    fn test_env_number_rejects_garbage() {
        let env = EnvSnapshot::from_pairs([
            ("OLLAMA_COMMIT_TIMEOUTS_GENERATION", "soon"),
            ("OLLAMA_COMMIT_TIMEOUTS_CONNECTION", "2500"),
        ]);
        let layer = ConfigLayer::from_env(&env, &mut Vec::new());
        assert_eq!(layer.timeouts.generation, None);
        assert_eq!(layer.timeouts.connection, Some(2500));
    }

    #[test]
    fn test_env_unknown_template_warns() {
        let env = EnvSnapshot::from_pairs([("OLLAMA_COMMIT_PROMPT_TEMPLATE", "fancy")]);
        let mut warnings = Vec::new();
        let layer = ConfigLayer::from_env(&env, &mut warnings);
        assert_eq!(layer.prompt_template, None);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_env_empty_value_is_unset() {
        let env = EnvSnapshot::from_pairs([("OLLAMA_COMMIT_MODEL", "  ")]);
        let layer = ConfigLayer::from_env(&env, &mut Vec::new());
        assert_eq!(layer.model, None);
    }

    #[test]
    fn test_from_json_skips_wrongly_typed_field() {
        let map = object(json!({ "model": "mistral", "verbose": "very", "timeouts": { "generation": 5000 } }));
        let mut warnings = Vec::new();
        let layer = ConfigLayer::from_json(&map, "test.json", &mut warnings);
        assert_eq!(layer.model.as_deref(), Some("mistral"));
        assert_eq!(layer.verbose, None);
        assert_eq!(layer.timeouts.generation, Some(5000));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("verbose"));
    }

    #[test]
    fn test_from_json_normalizes_host() {
        let map = object(json!({ "host": "gpu-box:11434/" }));
        let mut warnings = Vec::new();
        let layer = ConfigLayer::from_json(&map, "test.json", &mut warnings);
        assert_eq!(layer.host.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_normalize_host_keeps_https() {
        let mut warnings = Vec::new();
        assert_eq!(
            normalize_host("https://ollama.example.com/", "test", &mut warnings),
            "https://ollama.example.com"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_overlay_is_per_field() {
        let lower = ConfigLayer {
            model: Some("lower".into()),
            verbose: Some(true),
            timeouts: TimeoutsLayer {
                connection: Some(1),
                generation: Some(2),
                model_pull: None,
            },
            ..Default::default()
        };
        let higher = ConfigLayer {
            model: Some("higher".into()),
            timeouts: TimeoutsLayer {
                generation: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = lower.overlay(&higher);
        assert_eq!(merged.model.as_deref(), Some("higher"));
        assert_eq!(merged.verbose, Some(true));
        assert_eq!(merged.timeouts.connection, Some(1));
        assert_eq!(merged.timeouts.generation, Some(20));
    }

    #[test]
    fn test_overlay_does_not_mutate_inputs() {
        let lower = ConfigLayer {
            model: Some("lower".into()),
            ..Default::default()
        };
        let higher = ConfigLayer {
            model: Some("higher".into()),
            ..Default::default()
        };
        let _ = lower.overlay(&higher);
        assert_eq!(lower.model.as_deref(), Some("lower"));
    }

    #[test]
    fn test_to_json_map_only_has_present_fields() {
        let layer = ConfigLayer {
            auto_commit: Some(true),
            timeouts: TimeoutsLayer {
                model_pull: Some(9),
                ..Default::default()
            },
            ..Default::default()
        };
        let map = layer.to_json_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["autoCommit"], json!(true));
        assert_eq!(map["timeouts"], json!({ "modelPull": 9 }));
    }

    #[test]
    fn test_from_assignment() {
        let mut warnings = Vec::new();
        let layer = ConfigLayer::from_assignment("timeouts.generation", "60000", &mut warnings).unwrap();
        assert_eq!(layer.timeouts.generation, Some(60000));

        let layer = ConfigLayer::from_assignment("model", "qwen2.5-coder:7b", &mut warnings).unwrap();
        assert_eq!(layer.model.as_deref(), Some("qwen2.5-coder:7b"));

        assert!(ConfigLayer::from_assignment("colour", "blue", &mut warnings).is_none());
        assert!(warnings.is_empty());
    }
}
