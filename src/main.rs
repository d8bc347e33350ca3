//! ollama-commit - CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ollama_commit::commit::{Collaborators, SystemClipboard, TerminalPrompt, TokioSleeper};
use ollama_commit::config::{
    ConfigLayer, ConfigManager, ConfigPaths, ConfigTarget, EnvSnapshot, ModelProfile, ModelRole, Provider,
    ResolvedConfig,
};
use ollama_commit::display;
use ollama_commit::error::ConfigError;
use ollama_commit::{CommitOptions, CommitOrchestrator, CommitOutcome, GitCli, ModelClient, OllamaClient};

/// Generate commit messages for your changes with a local Ollama model.
#[derive(Parser, Debug)]
#[command(name = "ollama-commit")]
#[command(about = "Generate commit messages for your changes with a local Ollama model")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    commit: CommitArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug)]
struct CommitArgs {
    /// Repository directory
    #[arg(short = 'd', long, global = true, default_value = ".")]
    directory: PathBuf,

    /// Model to use for this run
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Ollama server URL
    #[arg(long)]
    host: Option<String>,

    /// Show more progress output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Show debug logs
    #[arg(long, global = true)]
    debug: bool,

    /// Only print errors and the final result
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Stage all changes before generating
    #[arg(long)]
    auto_stage: bool,

    /// Fall back to an installed model when the configured one is missing
    #[arg(long)]
    auto_model: bool,

    /// Commit and push without asking (implies --auto-stage)
    #[arg(long)]
    auto_commit: bool,

    /// Prompt template: default, conventional, simple, detailed
    #[arg(short = 't', long)]
    prompt_template: Option<String>,

    /// Print the commit command instead of asking what to do
    #[arg(long)]
    no_interactive: bool,
}

impl CommitArgs {
    fn options(&self) -> CommitOptions {
        CommitOptions {
            model: self.model.clone(),
            host: self.host.clone(),
            verbose: self.verbose,
            debug: self.debug,
            quiet: self.quiet,
            auto_stage: self.auto_stage,
            auto_model: self.auto_model,
            auto_commit: self.auto_commit,
            prompt_template: self.prompt_template.clone(),
            no_interactive: self.no_interactive,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Check that the Ollama server is reachable
    Test,

    /// List or download models on the Ollama server
    Models {
        #[command(subcommand)]
        action: ModelsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the resolved configuration as JSON
    Show,

    /// Show which layer supplied each setting
    Sources,

    /// Set a key (e.g. `model`, `timeouts.generation`)
    Set {
        key: String,
        value: String,

        /// Write to the project file instead of the user file
        #[arg(long)]
        local: bool,
    },

    /// Delete the user (or project) config file
    Reset {
        #[arg(long)]
        local: bool,
    },

    /// Add or replace a model profile
    AddModel {
        /// Profile name
        name: String,

        /// Model identifier, e.g. `qwen2.5-coder:7b`
        #[arg(long)]
        model: String,

        #[arg(long, default_value = "ollama")]
        provider: Provider,

        /// Comma-separated roles
        #[arg(long, value_delimiter = ',', default_value = "chat")]
        roles: Vec<ModelRole>,

        #[arg(long)]
        local: bool,
    },

    /// Remove a model profile by name
    RemoveModel {
        name: String,

        #[arg(long)]
        local: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ModelsCommand {
    /// List installed models
    List,

    /// Download a model
    Pull { name: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let project_dir = project_root(&cli.commit.directory);
    let paths = ConfigPaths::discover(&project_dir).context("Could not locate config files")?;
    let mut manager = ConfigManager::new(paths, EnvSnapshot::from_process());
    manager.initialize();

    let config = cli.commit.options().apply(&manager.config());
    init_tracing(&config);
    report_warnings(&mut manager, config.quiet);

    match cli.command {
        None => run_commit(&cli.commit.directory, config).await,
        Some(Commands::Config { action }) => run_config(&mut manager, action),
        Some(Commands::Test) => run_test(&config).await,
        Some(Commands::Models { action }) => run_models(&config, action).await,
    }
}

/// Repository root when `dir` is inside one, so the project file is found from subdirectories.
fn project_root(dir: &Path) -> PathBuf {
    GitCli::open(dir)
        .map(|git| git.workdir().to_path_buf())
        .unwrap_or_else(|_| dir.to_path_buf())
}

fn init_tracing(config: &ResolvedConfig) {
    let level = if config.debug {
        "debug"
    } else if config.verbose {
        "info"
    } else if config.quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,ollama_commit={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn report_warnings(manager: &mut ConfigManager, quiet: bool) {
    for warning in manager.take_warnings() {
        if !quiet {
            warn!("{}", warning);
        }
    }
}

async fn run_commit(directory: &Path, config: ResolvedConfig) -> Result<u8> {
    let quiet = config.quiet;
    let git = GitCli::open(directory)?;
    let model = OllamaClient::new(&config.timeouts)?;

    let deps = Collaborators {
        git: &git,
        model: &model,
        prompt: &TerminalPrompt,
        clipboard: &SystemClipboard,
        sleeper: &TokioSleeper,
    };

    let outcome = CommitOrchestrator::new(config, deps).run().await?;
    match &outcome {
        CommitOutcome::NoChanges if !quiet => println!("No changes to commit."),
        CommitOutcome::SideEffectFailed { stage, error } => {
            eprintln!("Error: {} failed: {}", stage.as_str(), error);
        }
        _ => {}
    }
    Ok(outcome.exit_code())
}

fn target(local: bool) -> ConfigTarget {
    if local { ConfigTarget::Local } else { ConfigTarget::User }
}

fn run_config(manager: &mut ConfigManager, action: ConfigCommand) -> Result<u8> {
    match action {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&manager.config())?);
        }
        ConfigCommand::Sources => {
            let paths = manager.paths();
            println!("User file:    {}", paths.user_file.display());
            println!("Project file: {}", paths.project_file.display());
            println!();
            println!("{}", display::sources_table(&manager.config(), &manager.config_sources()));
        }
        ConfigCommand::Set { key, value, local } => {
            let mut warnings = Vec::new();
            let patch = ConfigLayer::from_assignment(&key, &value, &mut warnings)
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            if let Some(warning) = warnings.first() {
                bail!("Invalid value for '{}': {}", key, warning);
            }

            let target = target(local);
            manager.save_config(&patch, target)?;
            report_warnings(manager, false);
            println!("✓ Set {} in {}", key, manager.paths().file_for(target).display());
        }
        ConfigCommand::Reset { local } => {
            let target = target(local);
            let path = manager.paths().file_for(target).to_path_buf();
            if manager.remove_config(target)? {
                println!("✓ Removed {}", path.display());
            } else {
                println!("Nothing to reset: {} does not exist", path.display());
            }
        }
        ConfigCommand::AddModel {
            name,
            model,
            provider,
            roles,
            local,
        } => {
            let profile = ModelProfile {
                name: name.clone(),
                provider,
                model,
                roles,
            };
            manager.add_model(profile, target(local))?;
            println!("✓ Saved model profile '{}'", name);
        }
        ConfigCommand::RemoveModel { name, local } => {
            manager.remove_model(&name, target(local))?;
            println!("✓ Removed model profile '{}'", name);
        }
    }
    Ok(0)
}

async fn run_test(config: &ResolvedConfig) -> Result<u8> {
    let client = OllamaClient::new(&config.timeouts)?;
    if client.test_connection(&config.host).await {
        println!("✓ Connected to {}", config.host);
        Ok(0)
    } else {
        eprintln!("✗ Could not reach Ollama at {}", config.host);
        Ok(1)
    }
}

async fn run_models(config: &ResolvedConfig, action: ModelsCommand) -> Result<u8> {
    let client = OllamaClient::new(&config.timeouts)?;
    match action {
        ModelsCommand::List => {
            let models = client
                .list_models(&config.host)
                .await
                .with_context(|| format!("Failed to list models on {}", config.host))?;
            if models.is_empty() {
                println!("No models installed. Pull one with: ollama-commit models pull <name>");
            }
            for model in models {
                let marker = if model.matches(&config.model) { "*" } else { " " };
                match model.size {
                    Some(size) => println!("{} {}  ({:.1} GB)", marker, model.name, size as f64 / 1e9),
                    None => println!("{} {}", marker, model.name),
                }
            }
        }
        ModelsCommand::Pull { name } => {
            if !config.quiet {
                println!("Pulling {} (this can take a while)...", name);
            }
            client
                .pull_model(&config.host, &name)
                .await
                .with_context(|| format!("Failed to pull {}", name))?;
            println!("✓ Pulled {}", name);
        }
    }
    Ok(0)
}
