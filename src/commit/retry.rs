//! Two-tier retry policy for one round of commit message generation.
//!
//! Every failure is classified as informational (stop quietly), retryable
//! (back off and try again) or fatal (stop and report).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::{debug, warn};

use crate::error::{CommitError, GitError, ModelError};

/// Configuration: 3 total attempts, base 1s, doubling, max 5s.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_MS: u64 = 1_000;
const MAX_INTERVAL_MS: u64 = 5_000;
const MULTIPLIER: f64 = 2.0;

/// How the retry loop treats a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Not really a failure: end the run with a clean exit.
    Informational,
    Retryable,
    Fatal,
}

/// Classify a typed error.
pub fn classify(error: &CommitError) -> ErrorClass {
    match error {
        CommitError::Git(git) => match git {
            GitError::NoChanges => ErrorClass::Informational,
            GitError::NotARepository(_) => ErrorClass::Fatal,
            GitError::CommandFailed { .. } | GitError::SpawnFailed { .. } => ErrorClass::Retryable,
        },
        CommitError::Model(model) => match model {
            ModelError::EmptyResponse
            | ModelError::ModelNotFound(_)
            | ModelError::InvalidModel { .. }
            | ModelError::ClientBuild(_) => ErrorClass::Fatal,
            ModelError::Http { .. } => classify_message(&model.to_string()),
            ModelError::Timeout(_)
            | ModelError::Connection { .. }
            | ModelError::Network(_)
            | ModelError::InvalidResponse(_) => ErrorClass::Retryable,
        },
        CommitError::RetriesExhausted { .. } | CommitError::NoModelsAvailable { .. } => ErrorClass::Fatal,
    }
}

const FATAL_MARKERS: [&str; 3] = ["empty response", "model not found", "invalid model"];
const RETRYABLE_MARKERS: [&str; 5] = ["timeout", "network", "connection", "http", "failed to connect"];

/// Classify a bare error message. Fatal markers are checked first; unknown
/// messages are fatal.
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if FATAL_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorClass::Fatal
    } else if RETRYABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorClass::Retryable
    } else {
        ErrorClass::Fatal
    }
}

/// Backoff schedule: 1000 ms, 2000 ms, 4000 ms, then capped at 5000 ms.
pub fn backoff_policy() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(INITIAL_INTERVAL_MS),
        initial_interval: Duration::from_millis(INITIAL_INTERVAL_MS),
        randomization_factor: 0.0,
        multiplier: MULTIPLIER,
        max_interval: Duration::from_millis(MAX_INTERVAL_MS),
        max_elapsed_time: None,
        ..Default::default()
    }
}

fn next_delay(policy: &mut ExponentialBackoff) -> Duration {
    let delay = policy
        .next_backoff()
        .unwrap_or(Duration::from_millis(MAX_INTERVAL_MS));
    // Whole milliseconds keep the schedule exact.
    Duration::from_millis((delay.as_secs_f64() * 1000.0).round() as u64)
}

/// Sleep between attempts.
///
/// This abstraction lets tests observe delays without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// State of the current attempt, handed to each try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAttempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Display text of the previous failure, if any.
    pub last_error: Option<String>,
    pub class: Option<ErrorClass>,
}

/// Result of a retry loop.
#[derive(Debug)]
pub enum Step<T> {
    Done(T),
    /// The run should end cleanly (e.g. nothing to commit).
    Informational(CommitError),
    Fatal(CommitError),
}

/// Run `attempt` up to [`MAX_ATTEMPTS`] times.
///
/// Only retryable failures are retried. The delay is taken before the next
/// attempt, never after the last one. Exhaustion yields a fatal
/// [`CommitError::RetriesExhausted`] wrapping the last error.
pub async fn run_with_retry<T, F, Fut>(sleeper: &dyn Sleeper, mut attempt: F) -> Step<T>
where
    F: FnMut(GenerationAttempt) -> Fut,
    Fut: Future<Output = Result<T, CommitError>>,
{
    let mut policy = backoff_policy();
    let mut state = GenerationAttempt {
        number: 1,
        last_error: None,
        class: None,
    };

    loop {
        let number = state.number;
        let error = match attempt(state.clone()).await {
            Ok(value) => return Step::Done(value),
            Err(e) => e,
        };

        let class = classify(&error);
        match class {
            ErrorClass::Informational => return Step::Informational(error),
            ErrorClass::Fatal => return Step::Fatal(error),
            ErrorClass::Retryable if number >= MAX_ATTEMPTS => {
                return Step::Fatal(CommitError::RetriesExhausted {
                    attempts: number,
                    source: Box::new(error),
                });
            }
            ErrorClass::Retryable => {
                let delay = next_delay(&mut policy);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {}ms",
                    number,
                    MAX_ATTEMPTS,
                    error,
                    delay.as_millis()
                );
                sleeper.sleep(delay).await;
                debug!("Starting attempt {}", number + 1);

                state = GenerationAttempt {
                    number: number + 1,
                    last_error: Some(error.to_string()),
                    class: Some(class),
                };
            }
        }
    }
}
