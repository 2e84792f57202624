//! OpenAI API client implementation
//!
//! A strongly-typed client for OpenAI-compatible chat completion endpoints.
//! It is the production `GenerationClient` of the pipeline.

mod models;
pub use models::*;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{OpenAIConfig, ServiceConfig, DEFAULT_PROVIDER};
use crate::core::{GenerationClient, ServiceClient};
use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, parse_error_response, UserAgent};
use crate::util::measure_time_async;

/// Instruction sent ahead of every generation prompt
const SYSTEM_PROMPT: &str = "You are a content assistant for a software developer's portfolio. \
    You answer with a single JSON object and nothing else.";

/// OpenAI API client
pub struct OpenAIClient {
    http_client: Client,

    config: OpenAIConfig,
}

impl OpenAIClient {
    /// Create a new OpenAI client from configuration loaded out of the environment
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig::from_provider(&**DEFAULT_PROVIDER)?;
        Self::new_with_config(config)
    }

    /// Create a new OpenAI client with custom configuration
    pub fn new_with_config(config: OpenAIConfig) -> Result<Self> {
        config.validate()?;

        let http_client = build_http_client(
            Some(UserAgent::for_client("OpenAI-Client")),
            Some(Duration::from_secs(config.timeout_seconds)),
        )?;

        Ok(Self { http_client, config })
    }

    pub fn builder() -> OpenAIClientBuilder {
        OpenAIClientBuilder::default()
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Send a chat completion request
    pub async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        self.post("chat/completions", request).await
    }

    /// List available models
    pub async fn list_models(&self) -> Result<ListModelsResponse> {
        self.get("models").await
    }

    /// Send a single user prompt and return the first choice's text.
    ///
    /// A response without choices, with null content or with only whitespace
    /// is reported as `ServiceError::EmptyResponse`.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
            temperature: Some(self.config.temperature),
            ..Default::default()
        };

        let response = self.chat_completion(&request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::empty_response("No completion choices returned"))?;

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(ServiceError::empty_response(format!(
                "Empty completion content (finish_reason: {})",
                choice.finish_reason.as_deref().unwrap_or("none")
            ))),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.bearer_auth(&self.config.api_key);
        match self.config.org_id {
            Some(ref org) => builder.header("OpenAI-Organization", org),
            None => builder,
        }
    }

    async fn post<T, R>(&self, endpoint: &str, body: &T) -> Result<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!("Sending request to OpenAI: POST {}", url);

        let (response, elapsed) = measure_time_async(|| self.authorize(self.http_client.post(&url)).json(body).send()).await;
        let response = response?;

        debug!("OpenAI answered {} in {:?}", response.status(), elapsed);
        self.decode(endpoint, response).await
    }

    async fn get<R>(&self, endpoint: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!("Sending request to OpenAI: GET {}", url);

        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await?;

        self.decode(endpoint, response).await
    }

    async fn decode<R: DeserializeOwned>(&self, endpoint: &str, response: reqwest::Response) -> Result<R> {
        if response.status().is_success() {
            Ok(response.json::<R>().await?)
        } else {
            let error = parse_error_response("openai", endpoint, response).await;
            warn!("OpenAI request to {} failed: {}", endpoint, error);
            Err(error)
        }
    }
}

#[async_trait]
impl ServiceClient for OpenAIClient {
    fn name(&self) -> &str {
        "openai"
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl GenerationClient for OpenAIClient {
    async fn send(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }
}

/// Builder for OpenAI client
#[derive(Default)]
pub struct OpenAIClientBuilder {
    api_key: Option<String>,
    org_id: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_seconds: Option<u64>,
}

impl OpenAIClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Build the client; explicit values override the environment
    pub fn build(self) -> Result<OpenAIClient> {
        let mut config = OpenAIConfig::from_provider(&**DEFAULT_PROVIDER).unwrap_or_default();

        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }

        if let Some(org_id) = self.org_id {
            config.org_id = Some(org_id);
        }

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(model) = self.model {
            config.model = model;
        }

        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }

        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }

        OpenAIClient::new_with_config(config)
    }
}
