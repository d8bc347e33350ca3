mod common;

use serde_json::json;
use serial_test::serial;

use ollama_commit::config::{
    ConfigManager, ConfigSource, DEFAULT_HOST, DEFAULT_MODEL, EnvSnapshot, ModelRole, PromptTemplate,
};

use common::ConfigFixture;

#[test]
fn test_defaults_when_nothing_is_configured() {
    let fixture = ConfigFixture::new();
    let manager = fixture.manager(&[]);
    let config = manager.config();

    assert_eq!(config.model, DEFAULT_MODEL);
    assert_eq!(config.host, DEFAULT_HOST);
    assert!(config.interactive);
    assert_eq!(config.timeouts.generation, 120_000);
    assert_eq!(config.prompt_file, fixture.paths.prompt_file);
    assert!(manager.config_sources().entries().iter().all(|(_, s)| *s == ConfigSource::Default));
    assert!(manager.warnings().is_empty());
}

#[test]
fn test_per_field_precedence() {
    let fixture = ConfigFixture::new();
    fixture.write_user(json!({
        "model": "user-model",
        "verbose": true,
        "debug": true,
        "promptTemplate": "simple",
        "timeouts": { "connection": 1111, "generation": 2222 }
    }));
    fixture.write_project(json!({
        "model": "project-model",
        "verbose": false,
        "timeouts": { "generation": 3333 }
    }));

    let manager = fixture.manager(&[("OLLAMA_COMMIT_MODEL", "env-model")]);
    let config = manager.config();
    let sources = manager.config_sources();

    assert_eq!(config.model, "env-model");
    assert_eq!(sources.model, ConfigSource::Environment);

    assert!(!config.verbose);
    assert_eq!(sources.verbose, ConfigSource::ProjectFile);

    assert!(config.debug);
    assert_eq!(sources.debug, ConfigSource::UserFile);

    assert_eq!(config.prompt_template, PromptTemplate::Simple);
    assert_eq!(sources.prompt_template, ConfigSource::UserFile);

    assert_eq!(config.timeouts.connection, 1111);
    assert_eq!(sources.timeouts.connection, ConfigSource::UserFile);
    assert_eq!(config.timeouts.generation, 3333);
    assert_eq!(sources.timeouts.generation, ConfigSource::ProjectFile);
    assert_eq!(sources.timeouts.model_pull, ConfigSource::Default);

    assert_eq!(config.host, DEFAULT_HOST);
    assert_eq!(sources.host, ConfigSource::Default);
}

#[test]
fn test_env_host_and_bad_number() {
    let fixture = ConfigFixture::new();
    fixture.write_project(json!({ "timeouts": { "generation": 5000 } }));

    let manager = fixture.manager(&[
        ("OLLAMA_HOST", "http://gpu-box:11434/"),
        ("OLLAMA_COMMIT_TIMEOUTS_GENERATION", "fast"),
        ("OLLAMA_COMMIT_AUTO_COMMIT", "1"),
    ]);
    let config = manager.config();
    let sources = manager.config_sources();

    assert_eq!(config.host, "http://gpu-box:11434");
    assert_eq!(sources.host, ConfigSource::Environment);
    assert_eq!(config.timeouts.generation, 5000);
    assert_eq!(sources.timeouts.generation, ConfigSource::ProjectFile);
    assert!(config.auto_commit);
    assert!(config.effective_auto_stage());
}

#[test]
fn test_broken_project_file_is_skipped_with_warning() {
    let fixture = ConfigFixture::new();
    fixture.write_user(json!({ "model": "user-model" }));
    std::fs::write(&fixture.paths.project_file, "{ \"model\": ").unwrap();

    let manager = fixture.manager(&[]);
    assert_eq!(manager.config().model, "user-model");
    assert_eq!(manager.warnings().len(), 1);
    assert!(manager.warnings()[0].message.contains(".ollama-commit.json"));
}

#[test]
fn test_wrongly_typed_field_falls_back_to_lower_layer() {
    let fixture = ConfigFixture::new();
    fixture.write_user(json!({ "interactive": false }));
    fixture.write_project(json!({ "interactive": "nope", "useEmojis": true }));

    let manager = fixture.manager(&[]);
    let config = manager.config();
    assert!(!config.interactive);
    assert_eq!(manager.config_sources().interactive, ConfigSource::UserFile);
    assert!(config.use_emojis);
    assert_eq!(manager.warnings().len(), 1);
}

#[test]
fn test_models_list_is_a_single_leaf() {
    let fixture = ConfigFixture::new();
    fixture.write_user(json!({
        "models": [
            { "name": "coder", "provider": "ollama", "model": "qwen2.5-coder:7b", "roles": ["chat", "edit"] }
        ]
    }));

    let manager = fixture.manager(&[]);
    assert_eq!(manager.config().models.len(), 1);
    assert_eq!(manager.config_sources().models, ConfigSource::UserFile);
    assert_eq!(manager.chat_model().unwrap().model, "qwen2.5-coder:7b");
    assert_eq!(manager.primary_model(), "qwen2.5-coder:7b");
    // With no `model` anywhere, the listed chat profile decides what runs.
    assert_eq!(manager.config().model, "qwen2.5-coder:7b");
    assert_eq!(manager.config_sources().model, ConfigSource::UserFile);
    // No embed profile and no profile named like the provider.
    assert!(manager.embeddings_model().is_none());
    assert!(manager.model_by_role(ModelRole::Edit).is_some());
}

#[test]
fn test_explicit_model_beats_profile_list() {
    let fixture = ConfigFixture::new();
    fixture.write_user(json!({
        "models": [
            { "name": "coder", "provider": "ollama", "model": "qwen2.5-coder:7b", "roles": ["chat"] }
        ]
    }));
    fixture.write_project(json!({ "model": "mistral" }));

    let manager = fixture.manager(&[]);
    assert_eq!(manager.config().model, "mistral");
    assert_eq!(manager.config_sources().model, ConfigSource::ProjectFile);

    let env_manager = fixture.manager(&[("OLLAMA_COMMIT_MODEL", "phi3")]);
    assert_eq!(env_manager.config().model, "phi3");
}

#[test]
#[serial]
fn test_process_environment_capture() {
    let fixture = ConfigFixture::new();
    temp_env::with_vars(
        [
            ("OLLAMA_HOST", Some("remote:11434")),
            ("OLLAMA_COMMIT_QUIET", Some("true")),
            ("OLLAMA_COMMIT_PROMPT_TEMPLATE", Some("detailed")),
            ("OLLAMA_COMMIT_MODEL", None),
        ],
        || {
            let mut manager = ConfigManager::new(fixture.paths.clone(), EnvSnapshot::from_process());
            manager.initialize();
            let config = manager.config();

            assert_eq!(config.host, "http://remote:11434");
            assert!(config.quiet);
            assert_eq!(config.prompt_template, PromptTemplate::Detailed);
            assert_eq!(config.model, DEFAULT_MODEL);

            let warnings = manager.take_warnings();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].message.contains("remote:11434"));
        },
    );
}
