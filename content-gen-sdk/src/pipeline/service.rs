//! Public entry point of the generation pipeline

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};

use super::controller::{enter, AttemptOutcome, CancellationFlag, GenerationOutcome, PipelineState, RetryController};
use super::normalize::ResponseNormalizer;
use super::prompt::PromptBuilder;
use super::schema::SchemaValidator;
use super::verify::{ExternalVerifier, GeneratedContent, VideoVerifier};
use super::{ContentType, GenerationRequest, Parameters};
use crate::config::{PipelineConfig, DEFAULT_PROVIDER};
use crate::core::GenerationClient;
use crate::error::PipelineError;
use crate::services::openai::OpenAIClient;
use crate::services::youtube::YouTubeClient;
use crate::util::{measure_time_async, truncate_string};

const LOG_PREVIEW_CHARS: usize = 300;

/// Generates validated suggestions for every content type.
///
/// Holds only immutable configuration and shared clients, so a single
/// instance can serve any number of concurrent runs.
pub struct ContentSuggestionService {
    client: Arc<dyn GenerationClient>,
    verifiers: HashMap<ContentType, Arc<dyn ExternalVerifier>>,
    prompts: PromptBuilder,
    normalizer: ResponseNormalizer,
    validator: SchemaValidator,
    controller: RetryController,
}

impl ContentSuggestionService {
    /// Service with default pipeline settings and no verifiers
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self::with_config(client, &PipelineConfig::default())
    }

    pub fn with_config(client: Arc<dyn GenerationClient>, config: &PipelineConfig) -> Self {
        Self {
            client,
            verifiers: HashMap::new(),
            prompts: PromptBuilder::new(),
            normalizer: ResponseNormalizer::new(),
            validator: SchemaValidator::new(),
            controller: RetryController::from_config(config),
        }
    }

    /// Register the verifier for its content type, replacing any earlier one
    pub fn with_verifier(mut self, verifier: Arc<dyn ExternalVerifier>) -> Self {
        self.verifiers.insert(verifier.content_type(), verifier);
        self
    }

    /// OpenAI generation plus YouTube verification, configured from the
    /// environment (`PORTFOLIO_*` variables).
    pub fn from_env() -> Result<Self, PipelineError> {
        let config = PipelineConfig::from_provider(&**DEFAULT_PROVIDER)
            .map_err(|e| PipelineError::configuration(e.to_string()))?;
        let client = OpenAIClient::from_env().map_err(|e| PipelineError::configuration(e.to_string()))?;
        let youtube = YouTubeClient::from_env().map_err(|e| PipelineError::configuration(e.to_string()))?;
        let verifier = VideoVerifier::from_config(Arc::new(youtube), &config)?;

        Ok(Self::with_config(Arc::new(client), &config).with_verifier(Arc::new(verifier)))
    }

    pub fn max_attempts(&self) -> u32 {
        self.controller.max_attempts()
    }

    pub fn has_verifier(&self, content_type: ContentType) -> bool {
        self.verifiers.contains_key(&content_type)
    }

    /// Run the pipeline for `content_type`.
    ///
    /// `Err` only for caller mistakes detected before any I/O; every other
    /// failure is reported inside the outcome.
    pub async fn generate(
        &self,
        content_type: ContentType,
        parameters: Parameters,
    ) -> Result<GenerationOutcome, PipelineError> {
        self.generate_with_cancellation(content_type, parameters, &CancellationFlag::new())
            .await
    }

    /// Like `generate`, with the content type given by name (`"video"`, ...)
    pub async fn generate_named(&self, content_type: &str, parameters: Parameters) -> Result<GenerationOutcome, PipelineError> {
        let content_type = content_type.parse::<ContentType>()?;
        self.generate(content_type, parameters).await
    }

    pub async fn generate_with_cancellation(
        &self,
        content_type: ContentType,
        parameters: Parameters,
        cancel: &CancellationFlag,
    ) -> Result<GenerationOutcome, PipelineError> {
        self.run(GenerationRequest::new(content_type, parameters), cancel).await
    }

    pub async fn suggest_video(&self, parameters: Parameters) -> Result<GenerationOutcome, PipelineError> {
        self.generate(ContentType::Video, parameters).await
    }

    pub async fn suggest_roadmap(&self, parameters: Parameters) -> Result<GenerationOutcome, PipelineError> {
        self.generate(ContentType::Roadmap, parameters).await
    }

    pub async fn suggest_lesson(&self, parameters: Parameters) -> Result<GenerationOutcome, PipelineError> {
        self.generate(ContentType::Lesson, parameters).await
    }

    pub async fn suggest_project(&self, parameters: Parameters) -> Result<GenerationOutcome, PipelineError> {
        self.generate(ContentType::Project, parameters).await
    }

    /// Run an already constructed request
    pub async fn run(
        &self,
        request: GenerationRequest,
        cancel: &CancellationFlag,
    ) -> Result<GenerationOutcome, PipelineError> {
        let prompt = self.prompts.build(request.content_type(), request.parameters())?;

        info!(
            "[{}] generating {} (up to {} attempts)",
            request.request_id(),
            request.content_type(),
            self.controller.max_attempts()
        );
        debug!("[{}] prompt: {}", request.request_id(), truncate_string(&prompt, LOG_PREVIEW_CHARS));

        let request_id = request.request_id().to_string();
        let prompt = prompt.as_str();
        let outcome = self
            .controller
            .run(request, cancel, |attempt| async move {
                AttemptOutcome::from(self.attempt(&attempt, prompt).await)
            })
            .await;

        match &outcome {
            GenerationOutcome::Success { attempts, .. } => {
                info!("[{}] generated after {} attempt(s)", request_id, attempts)
            }
            GenerationOutcome::Failure { error, attempts } => {
                info!("[{}] failed after {} attempt(s): {}", request_id, attempts, error)
            }
        }

        Ok(outcome)
    }

    /// One pass through send, normalize, validate and verify
    async fn attempt(&self, request: &GenerationRequest, prompt: &str) -> Result<GeneratedContent, PipelineError> {
        enter(request, PipelineState::Awaiting);
        let (raw, elapsed) = measure_time_async(|| self.client.send(prompt)).await;
        let raw = raw?;
        debug!(
            "[{}] response after {:?}: {}",
            request.request_id(),
            elapsed,
            truncate_string(&raw, LOG_PREVIEW_CHARS)
        );

        enter(request, PipelineState::Normalizing);
        let normalized = self.normalizer.clean(&raw)?;

        enter(request, PipelineState::Validating);
        let validated = self.validator.validate(request.content_type(), &normalized.text)?;
        if !validated.coercions.is_empty() {
            debug!(
                "[{}] {:?} candidate needed coercions: {:?}",
                request.request_id(),
                normalized.recovery,
                validated.coercions
            );
        }

        match self.verifiers.get(&request.content_type()) {
            Some(verifier) => {
                enter(request, PipelineState::Verifying);
                let verified = verifier.verify(&validated.content).await?;
                Ok(GeneratedContent::Verified(verified))
            }
            None => Ok(GeneratedContent::Validated(validated.content)),
        }
    }
}

impl fmt::Debug for ContentSuggestionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut verified: Vec<_> = self.verifiers.keys().map(ContentType::as_str).collect();
        verified.sort_unstable();
        f.debug_struct("ContentSuggestionService")
            .field("verified", &verified)
            .field("controller", &self.controller)
            .finish()
    }
}
