//! One round of "fetch changes, ask the model, let the user decide".

use tracing::{debug, error, info, warn};

use crate::config::{ConfigWarning, PromptTemplate, ResolvedConfig, normalize_host};
use crate::display;
use crate::error::{CommitError, GitError};
use crate::git::{ChangeSet, GitBackend};
use crate::ollama::ModelClient;

use super::actions::{Action, ActionPrompt, Clipboard};
use super::message::{clean_message, commit_command};
use super::prompt::build_commit_prompt;
use super::retry::{GenerationAttempt, Sleeper, Step, run_with_retry};
use super::templates::system_prompt;

const DEFAULT_RECENT_COMMITS: u64 = 5;

/// Per-run overrides from the command line.
///
/// Boolean flags can only switch features on; `no_interactive` switches
/// the prompt off.
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    pub model: Option<String>,
    pub host: Option<String>,
    pub verbose: bool,
    pub debug: bool,
    pub quiet: bool,
    pub auto_stage: bool,
    pub auto_model: bool,
    pub auto_commit: bool,
    pub prompt_template: Option<String>,
    pub no_interactive: bool,
}

impl CommitOptions {
    pub fn apply(&self, config: &ResolvedConfig) -> ResolvedConfig {
        let mut out = config.clone();

        if let Some(model) = self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            out.model = model.to_string();
        }
        if let Some(host) = &self.host {
            let mut warnings: Vec<ConfigWarning> = Vec::new();
            out.host = normalize_host(host, "--host", &mut warnings);
            for w in warnings {
                warn!("{}", w);
            }
        }

        out.verbose |= self.verbose;
        out.debug |= self.debug;
        out.quiet |= self.quiet;
        out.auto_stage |= self.auto_stage;
        out.auto_model |= self.auto_model;
        out.auto_commit |= self.auto_commit;
        if self.no_interactive {
            out.interactive = false;
        }

        if let Some(raw) = &self.prompt_template {
            match raw.parse::<PromptTemplate>() {
                Ok(template) => out.prompt_template = template,
                Err(e) => debug!("{}; keeping '{}'", e, out.prompt_template),
            }
        }

        out
    }
}

/// Which side effect failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    Stage,
    Commit,
    Push,
}

impl SideEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SideEffect::Stage => "stage",
            SideEffect::Commit => "commit",
            SideEffect::Push => "push",
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Working tree was clean; the model was never called.
    NoChanges,
    /// Non-interactive run: the ready-to-run command was printed.
    Printed { command: String },
    /// `clipboard` is false when the copy failed and the message was printed instead.
    Copied { message: String, clipboard: bool },
    Committed { message: String, pushed: bool },
    SideEffectFailed { stage: SideEffect, error: GitError },
    Cancelled,
}

impl CommitOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            CommitOutcome::NoChanges
            | CommitOutcome::Printed { .. }
            | CommitOutcome::Copied { .. }
            | CommitOutcome::Committed { .. } => 0,
            CommitOutcome::SideEffectFailed { .. } | CommitOutcome::Cancelled => 1,
        }
    }

    /// Whether the user took the message (commit, copy or printed command).
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            CommitOutcome::Printed { .. } | CommitOutcome::Copied { .. } | CommitOutcome::Committed { .. }
        )
    }
}

/// External services one run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub git: &'a dyn GitBackend,
    pub model: &'a dyn ModelClient,
    pub prompt: &'a dyn ActionPrompt,
    pub clipboard: &'a dyn Clipboard,
    pub sleeper: &'a dyn Sleeper,
}

pub struct CommitOrchestrator<'a> {
    config: ResolvedConfig,
    deps: Collaborators<'a>,
}

impl<'a> CommitOrchestrator<'a> {
    pub fn new(config: ResolvedConfig, deps: Collaborators<'a>) -> Self {
        Self { config, deps }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Drive the run to a terminal outcome.
    ///
    /// Fatal failures come back as `Err`; everything the user decided, and
    /// side-effect failures, come back as an outcome.
    pub async fn run(&self) -> Result<CommitOutcome, CommitError> {
        let model = self.select_model().await?;
        let system = system_prompt(&self.config);
        let context = self.gather_context().await;

        loop {
            let step = run_with_retry(self.deps.sleeper, |attempt| {
                self.generate_once(&model, &system, context.as_deref(), attempt)
            })
            .await;

            let (changes, message) = match step {
                Step::Done(generated) => generated,
                Step::Informational(e) => {
                    info!("{}", e);
                    return Ok(CommitOutcome::NoChanges);
                }
                Step::Fatal(e) => return Err(e),
            };

            if !self.config.quiet {
                println!("{}", display::change_summary(&changes));
                println!("{}", display::message_box(&message));
            }

            let action = if self.config.interactive {
                match self.deps.prompt.choose(&message) {
                    Ok(action) => Some(action),
                    Err(e) => {
                        warn!("{}. Continuing non-interactively.", e);
                        None
                    }
                }
            } else {
                None
            };

            let action = match action {
                Some(action) => action,
                None if self.config.auto_commit => Action::Accept,
                None => return Ok(self.print_command(&changes, &message)),
            };

            match action {
                Action::Accept => return Ok(self.accept(&changes, &message).await),
                Action::Copy => return Ok(self.copy(&message)),
                Action::Regenerate => {
                    info!("Regenerating commit message");
                    continue;
                }
                Action::Cancel => {
                    info!("Cancelled");
                    return Ok(CommitOutcome::Cancelled);
                }
            }
        }
    }

    /// Resolve the model to call, checking the server when `auto_model` is on.
    ///
    /// `config.model` already follows the chat profile when no layer sets
    /// `model` explicitly.
    async fn select_model(&self) -> Result<String, CommitError> {
        let configured = self.config.model.clone();
        if !self.config.auto_model {
            return Ok(configured);
        }

        let installed = self.deps.model.list_models(&self.config.host).await?;
        if installed.iter().any(|m| m.matches(&configured)) {
            debug!("Model {} is installed", configured);
            return Ok(configured);
        }

        match installed.iter().find(|m| !m.is_embedding_model()) {
            Some(fallback) => {
                warn!(
                    "Model {} is not installed on {}; using {}",
                    configured, self.config.host, fallback.name
                );
                Ok(fallback.name.clone())
            }
            None => Err(CommitError::NoModelsAvailable {
                host: self.config.host.clone(),
            }),
        }
    }

    /// Extra prompt context from the configured providers. Failures are skipped.
    async fn gather_context(&self) -> Option<String> {
        let mut sections = Vec::new();

        for spec in self.config.context.iter().filter(|s| s.enabled) {
            match spec.provider.as_str() {
                "branch" => match self.deps.git.current_branch().await {
                    Ok(Some(branch)) => sections.push(format!("Branch: {}", branch)),
                    Ok(None) => {}
                    Err(e) => debug!("Skipping branch context: {}", e),
                },
                "recent-commits" => {
                    let limit = spec.param_u64("limit").unwrap_or(DEFAULT_RECENT_COMMITS) as usize;
                    match self.deps.git.recent_subjects(limit).await {
                        Ok(subjects) if !subjects.is_empty() => {
                            let list: Vec<String> = subjects.iter().map(|s| format!("- {}", s)).collect();
                            sections.push(format!("Recent commits:\n{}", list.join("\n")));
                        }
                        Ok(_) => {}
                        Err(e) => debug!("Skipping recent commit context: {}", e),
                    }
                }
                other => debug!("Ignoring unknown context provider '{}'", other),
            }
        }

        if sections.is_empty() {
            None
        } else {
            Some(sections.join("\n\n"))
        }
    }

    async fn generate_once(
        &self,
        model: &str,
        system: &str,
        context: Option<&str>,
        attempt: GenerationAttempt,
    ) -> Result<(ChangeSet, String), CommitError> {
        if let Some(last) = &attempt.last_error {
            debug!("Attempt {} after: {}", attempt.number, last);
        }

        if self.config.effective_auto_stage() {
            self.deps.git.stage_all().await?;
        }
        let changes = self.deps.git.changes(true).await?;

        let prompt = build_commit_prompt(system, context, &changes);
        if self.config.verbose {
            info!("Prompt length: {} chars", prompt.len());
        }

        let raw = self.deps.model.generate(model, &self.config.host, &prompt).await?;
        let message = clean_message(&raw)?;
        Ok((changes, message))
    }

    fn print_command(&self, changes: &ChangeSet, message: &str) -> CommitOutcome {
        let command = commit_command(message, changes.staged);
        println!("{}", command);
        CommitOutcome::Printed { command }
    }

    /// Commit and push if auto-commit is on. Runs each side effect at most once.
    ///
    /// Unstaged changes are only staged when auto-stage is in effect;
    /// otherwise the command is printed and nothing is touched.
    async fn accept(&self, changes: &ChangeSet, message: &str) -> CommitOutcome {
        if !changes.staged {
            if !self.config.effective_auto_stage() {
                info!("Changes are not staged; leaving the commit to you");
                return self.print_command(changes, message);
            }
            if let Err(error) = self.deps.git.stage_all().await {
                return side_effect_failed(SideEffect::Stage, error);
            }
        }

        if let Err(error) = self.deps.git.commit(message).await {
            return side_effect_failed(SideEffect::Commit, error);
        }
        if !self.config.quiet {
            println!("✓ Committed");
        }

        if !self.config.auto_commit {
            return CommitOutcome::Committed {
                message: message.to_string(),
                pushed: false,
            };
        }

        if let Err(error) = self.deps.git.push().await {
            return side_effect_failed(SideEffect::Push, error);
        }
        if !self.config.quiet {
            println!("✓ Pushed");
        }

        CommitOutcome::Committed {
            message: message.to_string(),
            pushed: true,
        }
    }

    fn copy(&self, message: &str) -> CommitOutcome {
        match self.deps.clipboard.copy(message) {
            Ok(()) => {
                if !self.config.quiet {
                    println!("✓ Copied to clipboard");
                }
                CommitOutcome::Copied {
                    message: message.to_string(),
                    clipboard: true,
                }
            }
            Err(e) => {
                warn!("{}", e);
                println!("{}", message);
                CommitOutcome::Copied {
                    message: message.to_string(),
                    clipboard: false,
                }
            }
        }
    }
}

fn side_effect_failed(stage: SideEffect, error: GitError) -> CommitOutcome {
    error!("Failed to {}: {}", stage.as_str(), error);
    CommitOutcome::SideEffectFailed { stage, error }
}
