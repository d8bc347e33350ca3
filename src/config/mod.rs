//! Configuration Resolution Engine.
//!
//! Merges environment variables, the project file, the user file, and
//! built-in defaults into one [`ResolvedConfig`], tracking where every value
//! came from.

pub mod layer;
pub mod manager;
pub mod registry;
pub mod schema;
pub mod sources;

pub use layer::{ConfigLayer, ConfigWarning, EnvSnapshot, KNOWN_KEYS, TimeoutsLayer, env_var_name, normalize_host};
pub use manager::{ConfigManager, ConfigPaths, ConfigTarget};
pub use registry::{ensure_embeddings_profile, find_by_role, sync_primary_model};
pub use schema::{
    ContextProviderSpec, DEFAULT_HOST, DEFAULT_MODEL, EMBEDDINGS_PROFILE_NAME, FALLBACK_EMBEDDINGS_MODEL,
    ModelProfile, ModelRole, PromptTemplate, Provider, ResolvedConfig, Timeouts,
};
pub use sources::{ConfigSource, ConfigSourceMap};
