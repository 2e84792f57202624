//! Attempt loop of a generation run
//!
//! The controller owns the attempt budget and the retry decision. What an
//! attempt does is supplied by the caller as a closure, so the loop can be
//! exercised without any I/O.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use log::{debug, error, info, warn};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::verify::GeneratedContent;
use super::GenerationRequest;
use crate::config::{BackoffConfig, PipelineConfig, MAX_ATTEMPTS_CEILING};
use crate::error::PipelineError;

/// Where a run currently is; only used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Prompting,
    Awaiting,
    Normalizing,
    Validating,
    Verifying,
    RetryScheduled,
    Succeeded,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Prompting => "prompting",
            PipelineState::Awaiting => "awaiting",
            PipelineState::Normalizing => "normalizing",
            PipelineState::Validating => "validating",
            PipelineState::Verifying => "verifying",
            PipelineState::RetryScheduled => "retry_scheduled",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Log a state transition of `request`
pub(crate) fn enter(request: &GenerationRequest, state: PipelineState) {
    debug!(
        "[{}] {} attempt {} -> {}",
        request.request_id(),
        request.content_type(),
        request.attempt() + 1,
        state
    );
}

/// Result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(GeneratedContent),
    RetryableFailure(PipelineError),
    TerminalFailure(PipelineError),
}

impl From<Result<GeneratedContent, PipelineError>> for AttemptOutcome {
    fn from(result: Result<GeneratedContent, PipelineError>) -> Self {
        match result {
            Ok(content) => AttemptOutcome::Success(content),
            Err(err) if err.is_retryable() => AttemptOutcome::RetryableFailure(err),
            Err(err) => AttemptOutcome::TerminalFailure(err),
        }
    }
}

/// Cooperative cancellation shared between a caller and a running pipeline.
///
/// Checked before each attempt's prompt is sent; an attempt already in
/// flight runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller-facing result of a run
#[derive(Debug)]
pub enum GenerationOutcome {
    Success { content: GeneratedContent, attempts: u32 },
    Failure { error: PipelineError, attempts: u32 },
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }

    /// Attempts made, inclusive of the first
    pub fn attempts(&self) -> u32 {
        match self {
            GenerationOutcome::Success { attempts, .. } | GenerationOutcome::Failure { attempts, .. } => *attempts,
        }
    }

    pub fn content(&self) -> Option<&GeneratedContent> {
        match self {
            GenerationOutcome::Success { content, .. } => Some(content),
            GenerationOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            GenerationOutcome::Failure { error, .. } => Some(error),
            GenerationOutcome::Success { .. } => None,
        }
    }

    /// Human-readable failure reason
    pub fn reason(&self) -> Option<String> {
        self.error().map(PipelineError::reason)
    }

    pub fn into_result(self) -> Result<GeneratedContent, PipelineError> {
        match self {
            GenerationOutcome::Success { content, .. } => Ok(content),
            GenerationOutcome::Failure { error, .. } => Err(error),
        }
    }
}

impl Serialize for GenerationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GenerationOutcome", 3)?;
        match self {
            GenerationOutcome::Success { content, attempts } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", content)?;
                state.serialize_field("attempts", attempts)?;
            }
            GenerationOutcome::Failure { error, attempts } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &error.reason())?;
                state.serialize_field("attempts", attempts)?;
            }
        }
        state.end()
    }
}

/// Bounds the attempts of a run and decides between retrying and giving up
#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: u32,
    upstream_backoff: Option<BackoffConfig>,
}

impl Default for RetryController {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RetryController {
    /// `max_attempts` is clamped to `1..=MAX_ATTEMPTS_CEILING`
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS_CEILING),
            upstream_backoff: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            upstream_backoff: config.upstream_backoff.clone(),
            ..Self::new(config.max_attempts)
        }
    }

    /// Wait between attempts after upstream failures
    pub fn with_upstream_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.upstream_backoff = Some(backoff);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> Option<ExponentialBackoff> {
        self.upstream_backoff.as_ref().map(|config| ExponentialBackoff {
            initial_interval: config.initial_interval,
            current_interval: config.initial_interval,
            max_interval: config.max_interval,
            multiplier: config.multiplier,
            randomization_factor: config.randomization_factor,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        })
    }

    /// Drive `attempt` until it succeeds, fails terminally, the attempt
    /// budget is spent or `cancel` is raised.
    ///
    /// Each call of `attempt` receives the request for that attempt. The
    /// budget is counted here; the request's own attempt counter is only
    /// informational.
    pub async fn run<F, Fut>(
        &self,
        request: GenerationRequest,
        cancel: &CancellationFlag,
        mut attempt: F,
    ) -> GenerationOutcome
    where
        F: FnMut(GenerationRequest) -> Fut,
        Fut: Future<Output = AttemptOutcome>,
    {
        let mut request = request;
        let mut backoff = self.backoff();
        let mut attempts = 0u32;

        enter(&request, PipelineState::Idle);

        loop {
            if cancel.is_cancelled() {
                info!("[{}] generation cancelled after {} attempt(s)", request.request_id(), attempts);
                enter(&request, PipelineState::Failed);
                return GenerationOutcome::Failure {
                    error: PipelineError::Cancelled,
                    attempts,
                };
            }

            attempts += 1;
            enter(&request, PipelineState::Prompting);

            let error = match attempt(request.clone()).await {
                AttemptOutcome::Success(content) => {
                    enter(&request, PipelineState::Succeeded);
                    return GenerationOutcome::Success { content, attempts };
                }
                AttemptOutcome::TerminalFailure(failure) => {
                    error!("[{}] terminal {} failure: {}", request.request_id(), failure.kind(), failure);
                    enter(&request, PipelineState::Failed);
                    return GenerationOutcome::Failure { error: failure, attempts };
                }
                AttemptOutcome::RetryableFailure(error) => error,
            };

            if attempts >= self.max_attempts {
                warn!(
                    "[{}] giving up after {} attempt(s), last failure {}: {}",
                    request.request_id(),
                    attempts,
                    error.kind(),
                    error
                );
                enter(&request, PipelineState::Failed);
                return GenerationOutcome::Failure { error, attempts };
            }

            warn!(
                "[{}] attempt {}/{} failed with {}, retrying: {}",
                request.request_id(),
                attempts,
                self.max_attempts,
                error.kind(),
                error
            );
            enter(&request, PipelineState::RetryScheduled);

            if error.is_upstream() {
                if let Some(delay) = backoff.as_mut().and_then(|b| b.next_backoff()) {
                    debug!("[{}] waiting {:?} before the next attempt", request.request_id(), delay);
                    tokio::time::sleep(delay).await;
                }
            }

            request = request.next_attempt();
        }
    }
}
