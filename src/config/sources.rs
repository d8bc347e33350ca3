//! Per-field provenance of the resolved configuration.

use std::fmt;

use serde::Serialize;

use super::layer::ConfigLayer;
use super::schema::ResolvedConfig;

/// Which layer supplied a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigSource {
    Environment,
    ProjectFile,
    UserFile,
    Default,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Environment => "environment",
            ConfigSource::ProjectFile => "project-file",
            ConfigSource::UserFile => "user-file",
            ConfigSource::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutSources {
    pub connection: ConfigSource,
    pub generation: ConfigSource,
    pub model_pull: ConfigSource,
}

/// Same shape as [`ResolvedConfig`], with a provenance label per leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSourceMap {
    pub model: ConfigSource,
    pub host: ConfigSource,
    pub verbose: ConfigSource,
    pub interactive: ConfigSource,
    pub debug: ConfigSource,
    pub auto_stage: ConfigSource,
    pub auto_model: ConfigSource,
    pub auto_commit: ConfigSource,
    pub quiet: ConfigSource,
    pub prompt_file: ConfigSource,
    pub prompt_template: ConfigSource,
    pub timeouts: TimeoutSources,
    pub use_emojis: ConfigSource,
    pub models: ConfigSource,
    pub embeddings_provider: ConfigSource,
    pub context: ConfigSource,
}

/// The three non-default layers, highest precedence first.
pub struct RankedLayers<'a> {
    pub environment: &'a ConfigLayer,
    pub project: &'a ConfigLayer,
    pub user: &'a ConfigLayer,
}

impl RankedLayers<'_> {
    /// First layer (by precedence) that supplied a value equal to the resolved one.
    ///
    /// Equality matters: a layer that supplied something else lost to a
    /// higher layer and must not be reported.
    fn pick<T, F>(&self, resolved: &T, get: F) -> ConfigSource
    where
        T: PartialEq,
        F: Fn(&ConfigLayer) -> Option<&T>,
    {
        let ranked = [
            (ConfigSource::Environment, self.environment),
            (ConfigSource::ProjectFile, self.project),
            (ConfigSource::UserFile, self.user),
        ];

        ranked
            .into_iter()
            .find(|(_, layer)| get(layer).is_some_and(|v| v == resolved))
            .map(|(source, _)| source)
            .unwrap_or(ConfigSource::Default)
    }
}

impl ConfigSourceMap {
    /// Every leaf attributed to defaults.
    pub fn all_default() -> Self {
        let d = ConfigSource::Default;
        Self {
            model: d,
            host: d,
            verbose: d,
            interactive: d,
            debug: d,
            auto_stage: d,
            auto_model: d,
            auto_commit: d,
            quiet: d,
            prompt_file: d,
            prompt_template: d,
            timeouts: TimeoutSources {
                connection: d,
                generation: d,
                model_pull: d,
            },
            use_emojis: d,
            models: d,
            embeddings_provider: d,
            context: d,
        }
    }

    /// Compute provenance for every leaf independently of how the merge ran.
    pub fn compute(resolved: &ResolvedConfig, layers: &RankedLayers<'_>) -> Self {
        Self {
            model: layers.pick(&resolved.model, |l| l.model.as_ref()),
            host: layers.pick(&resolved.host, |l| l.host.as_ref()),
            verbose: layers.pick(&resolved.verbose, |l| l.verbose.as_ref()),
            interactive: layers.pick(&resolved.interactive, |l| l.interactive.as_ref()),
            debug: layers.pick(&resolved.debug, |l| l.debug.as_ref()),
            auto_stage: layers.pick(&resolved.auto_stage, |l| l.auto_stage.as_ref()),
            auto_model: layers.pick(&resolved.auto_model, |l| l.auto_model.as_ref()),
            auto_commit: layers.pick(&resolved.auto_commit, |l| l.auto_commit.as_ref()),
            quiet: layers.pick(&resolved.quiet, |l| l.quiet.as_ref()),
            prompt_file: layers.pick(&resolved.prompt_file, |l| l.prompt_file.as_ref()),
            prompt_template: layers.pick(&resolved.prompt_template, |l| l.prompt_template.as_ref()),
            timeouts: TimeoutSources {
                connection: layers.pick(&resolved.timeouts.connection, |l| {
                    l.timeouts.connection.as_ref()
                }),
                generation: layers.pick(&resolved.timeouts.generation, |l| {
                    l.timeouts.generation.as_ref()
                }),
                model_pull: layers.pick(&resolved.timeouts.model_pull, |l| {
                    l.timeouts.model_pull.as_ref()
                }),
            },
            use_emojis: layers.pick(&resolved.use_emojis, |l| l.use_emojis.as_ref()),
            models: layers.pick(&resolved.models, |l| l.models.as_ref()),
            embeddings_provider: layers.pick(&resolved.embeddings_provider, |l| {
                l.embeddings_provider.as_ref()
            }),
            context: layers.pick(&resolved.context, |l| l.context.as_ref()),
        }
    }

    /// Flattened `(key, source)` pairs using the on-disk key names.
    pub fn entries(&self) -> Vec<(&'static str, ConfigSource)> {
        vec![
            ("model", self.model),
            ("host", self.host),
            ("verbose", self.verbose),
            ("interactive", self.interactive),
            ("debug", self.debug),
            ("autoStage", self.auto_stage),
            ("autoModel", self.auto_model),
            ("autoCommit", self.auto_commit),
            ("quiet", self.quiet),
            ("promptFile", self.prompt_file),
            ("promptTemplate", self.prompt_template),
            ("timeouts.connection", self.timeouts.connection),
            ("timeouts.generation", self.timeouts.generation),
            ("timeouts.modelPull", self.timeouts.model_pull),
            ("useEmojis", self.use_emojis),
            ("models", self.models),
            ("embeddingsProvider", self.embeddings_provider),
            ("context", self.context),
        ]
    }
}
