//! Configuration manager: loads the ranked layers, resolves them, and
//! persists changes back to the user or project file.
//!
//! Priority order (highest first):
//! 1. Environment (`OLLAMA_HOST`, `OLLAMA_COMMIT_*`)
//! 2. Project file (`<dir>/.ollama-commit.json`)
//! 3. User file (`~/.ollama-commit/config.json`)
//! 4. Built-in defaults

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ConfigError;

use super::layer::{ConfigLayer, ConfigWarning, EnvSnapshot};
use super::registry::{
    ensure_embeddings_profile, find_by_role, remove_profile, sync_primary_model, upsert_profile,
};
use super::schema::{ModelProfile, ModelRole, ResolvedConfig};
use super::sources::{ConfigSource, ConfigSourceMap, RankedLayers};

const USER_DIR_NAME: &str = ".ollama-commit";
const USER_FILE_NAME: &str = "config.json";
const PROMPT_FILE_NAME: &str = "prompt.txt";
const PROJECT_FILE_NAME: &str = ".ollama-commit.json";

/// Which persisted layer a save or remove targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTarget {
    User,
    Local,
}

/// Locations of the persisted layers.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub user_file: PathBuf,
    pub project_file: PathBuf,
    pub prompt_file: PathBuf,
}

impl ConfigPaths {
    /// Standard locations for a project rooted at `project_dir`.
    pub fn discover(project_dir: &Path) -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self::with_home(&home, project_dir))
    }

    pub fn with_home(home: &Path, project_dir: &Path) -> Self {
        let user_dir = home.join(USER_DIR_NAME);
        Self {
            user_file: user_dir.join(USER_FILE_NAME),
            project_file: project_dir.join(PROJECT_FILE_NAME),
            prompt_file: user_dir.join(PROMPT_FILE_NAME),
        }
    }

    pub fn file_for(&self, target: ConfigTarget) -> &Path {
        match target {
            ConfigTarget::User => &self.user_file,
            ConfigTarget::Local => &self.project_file,
        }
    }
}

/// Owns the layers and the resolved snapshot for one process.
pub struct ConfigManager {
    paths: ConfigPaths,
    env: EnvSnapshot,
    initialized: bool,
    defaults: ResolvedConfig,
    user: ConfigLayer,
    project: ConfigLayer,
    environment: ConfigLayer,
    resolved: ResolvedConfig,
    sources: ConfigSourceMap,
    warnings: Vec<ConfigWarning>,
}

impl ConfigManager {
    pub fn new(paths: ConfigPaths, env: EnvSnapshot) -> Self {
        let defaults = ResolvedConfig::defaults(paths.prompt_file.clone());
        Self {
            paths,
            env,
            initialized: false,
            resolved: defaults.clone(),
            defaults,
            user: ConfigLayer::default(),
            project: ConfigLayer::default(),
            environment: ConfigLayer::default(),
            sources: ConfigSourceMap::all_default(),
            warnings: Vec::new(),
        }
    }

    /// Load every layer once. Later calls are no-ops.
    ///
    /// Broken files become warnings, never errors.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.reload();
        self.initialized = true;
    }

    fn reload(&mut self) {
        let mut warnings = Vec::new();

        self.user = load_layer(&self.paths.user_file, &mut warnings);
        self.project = load_layer(&self.paths.project_file, &mut warnings);
        self.environment = ConfigLayer::from_env(&self.env, &mut warnings);

        let merged = self.user.overlay(&self.project).overlay(&self.environment);
        self.resolved = merged.apply_to(&self.defaults);

        let layers = RankedLayers {
            environment: &self.environment,
            project: &self.project,
            user: &self.user,
        };
        self.sources = ConfigSourceMap::compute(&self.resolved, &layers);

        // A layer that only lists profiles still picks the model to run.
        if self.sources.model == ConfigSource::Default
            && self.sources.models != ConfigSource::Default
            && let Some(chat) = find_by_role(&self.resolved.models, ModelRole::Chat)
        {
            self.resolved.model = chat.model.clone();
            self.sources.model = self.sources.models;
        }

        // Reloads re-read the same files; report each problem once.
        for warning in warnings {
            debug!("Config warning: {}", warning);
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
    }

    /// Owned copy of the resolved configuration.
    pub fn config(&self) -> ResolvedConfig {
        self.resolved.clone()
    }

    pub fn config_sources(&self) -> ConfigSourceMap {
        self.sources.clone()
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Drain collected warnings so the caller can log them once.
    pub fn take_warnings(&mut self) -> Vec<ConfigWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Merge `patch` into the target file and re-resolve.
    ///
    /// Setting `model` re-runs the model-role sync on the target file's
    /// profile list. An empty `model` is neither persisted nor synced.
    /// Setting `models` alone writes the chat profile's model back to
    /// `model`, so the two agree in the saved file.
    pub fn save_config(&mut self, patch: &ConfigLayer, target: ConfigTarget) -> Result<(), ConfigError> {
        self.initialize();

        let mut patch = patch.clone();
        let sync_model = match patch.model.as_deref().map(str::trim) {
            Some("") => {
                self.warnings.push(ConfigWarning::new(
                    "Ignoring empty model value; model profiles left unchanged",
                ));
                patch.model = None;
                None
            }
            Some(model) => Some(model.to_string()),
            None => None,
        };

        let path = self.paths.file_for(target).to_path_buf();
        let mut raw = read_raw_for_write(&path)?;
        merge_patch(&mut raw, &patch.to_json_map().map_err(ConfigError::Serialize)?);

        if let Some(model) = sync_model {
            let mut scratch = Vec::new();
            let stored = ConfigLayer::from_json(&raw, &path.display().to_string(), &mut scratch);
            let current = stored.models.unwrap_or_else(|| self.resolved.models.clone());

            let synced = ensure_embeddings_profile(&sync_primary_model(&current, &model));
            raw.insert(
                "models".to_string(),
                serde_json::to_value(&synced).map_err(ConfigError::Serialize)?,
            );
        } else if let Some(chat) = patch.models.as_deref().and_then(|m| find_by_role(m, ModelRole::Chat)) {
            debug!("Syncing model field to chat profile {}", chat.model);
            raw.insert("model".to_string(), Value::String(chat.model.clone()));
        }

        write_atomic(&path, &raw)?;
        self.reload();
        Ok(())
    }

    /// Delete the target file. Returns whether a file was removed.
    pub fn remove_config(&mut self, target: ConfigTarget) -> Result<bool, ConfigError> {
        self.initialize();

        let path = self.paths.file_for(target).to_path_buf();
        let removed = match std::fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(source) => return Err(ConfigError::WriteFailed { path, source }),
        };

        self.reload();
        Ok(removed)
    }

    /// Add or replace a profile (by name) in the target file.
    pub fn add_model(&mut self, profile: ModelProfile, target: ConfigTarget) -> Result<(), ConfigError> {
        let profile = profile.validated()?;
        self.initialize();

        let current = self.stored_models(target);
        let models = ensure_embeddings_profile(&upsert_profile(&current, profile));
        self.save_config(
            &ConfigLayer {
                models: Some(models),
                ..Default::default()
            },
            target,
        )
    }

    /// Remove a profile by name from the target file.
    pub fn remove_model(&mut self, name: &str, target: ConfigTarget) -> Result<(), ConfigError> {
        self.initialize();

        let current = self.stored_models(target);
        let models =
            remove_profile(&current, name).ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;
        self.save_config(
            &ConfigLayer {
                models: Some(models),
                ..Default::default()
            },
            target,
        )
    }

    fn stored_models(&self, target: ConfigTarget) -> Vec<ModelProfile> {
        let layer = match target {
            ConfigTarget::User => &self.user,
            ConfigTarget::Local => &self.project,
        };
        // A file without a profile list starts from the resolved one, pointed
        // at the resolved model so a later write keeps `model` as it is.
        layer
            .models
            .clone()
            .unwrap_or_else(|| sync_primary_model(&self.resolved.models, &self.resolved.model))
    }

    pub fn model_by_role(&self, role: ModelRole) -> Option<ModelProfile> {
        find_by_role(&self.resolved.models, role).cloned()
    }

    pub fn chat_model(&self) -> Option<ModelProfile> {
        self.model_by_role(ModelRole::Chat)
    }

    /// The chat profile's model, falling back to the flat `model` field.
    pub fn primary_model(&self) -> String {
        self.chat_model()
            .map(|p| p.model)
            .unwrap_or_else(|| self.resolved.model.clone())
    }

    /// The profile named by `embeddingsProvider`, else the first `embed` profile.
    pub fn embeddings_model(&self) -> Option<ModelProfile> {
        self.resolved
            .models
            .iter()
            .find(|m| m.name == self.resolved.embeddings_provider)
            .or_else(|| find_by_role(&self.resolved.models, ModelRole::Embed))
            .cloned()
    }
}

/// Read one file layer. Missing files are empty; broken files warn and are skipped.
fn load_layer(path: &Path, warnings: &mut Vec<ConfigWarning>) -> ConfigLayer {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ConfigLayer::default(),
        Err(e) => {
            warnings.push(ConfigWarning::new(format!(
                "Could not read {}: {}. Skipping this file.",
                path.display(),
                e
            )));
            return ConfigLayer::default();
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => ConfigLayer::from_json(&map, &path.display().to_string(), warnings),
        Ok(_) => {
            warnings.push(ConfigWarning::new(format!(
                "{} does not contain a JSON object. Skipping this file.",
                path.display()
            )));
            ConfigLayer::default()
        }
        Err(e) => {
            warnings.push(ConfigWarning::new(format!(
                "Failed to parse {}: {}. Skipping this file.",
                path.display(),
                e
            )));
            ConfigLayer::default()
        }
    }
}

/// Existing object for a write. A file we cannot parse is never overwritten.
fn read_raw_for_write(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ConfigError::InvalidFile {
            path: path.to_path_buf(),
            reason: format!("found {}", json_kind(&other)),
        }),
        Err(e) => Err(ConfigError::InvalidFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Key-by-key merge; `timeouts` merges per sub-key.
fn merge_patch(raw: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match (raw.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) if key == "timeouts" => {
                for (sub, v) in incoming {
                    existing.insert(sub.clone(), v.clone());
                }
            }
            _ => {
                raw.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Write the file via a temp file in the same directory, then rename.
fn write_atomic(path: &Path, raw: &Map<String, Value>) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let body = serde_json::to_string_pretty(raw).map_err(ConfigError::Serialize)?;

    let mut file = NamedTempFile::new_in(&dir).map_err(write_err)?;
    file.write_all(body.as_bytes()).map_err(write_err)?;
    file.write_all(b"\n").map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
