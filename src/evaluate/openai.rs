#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest},
};

use super::{CompletionService, EvaluationError};
use crate::config::OpenAiSettings;

/// Chat completions against an OpenAI-compatible endpoint.
pub struct OpenAiService {
    /// Configured client; its HTTP client carries the request timeout.
    client:     OpenAIClient<OpenAIConfig>,
    /// Model identifier.
    model:      String,
    /// Completion token cap.
    max_tokens: u32,
}

impl OpenAiService {
    /// Builds the client from `settings`, reusing `http` for transport.
    pub fn new(settings: &OpenAiSettings, http: reqwest::Client) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(settings.api_key().to_owned());
        if let Some(base) = settings.api_base() {
            config = config.with_api_base(base.to_owned());
        }

        Self {
            client:     OpenAIClient::with_config(config).with_http_client(http),
            model:      settings.model().to_owned(),
            max_tokens: settings.max_tokens(),
        }
    }

    /// Returns the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionService for OpenAiService {
    async fn complete(&self, prompt: &str) -> Result<String, EvaluationError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(classify)?;

        let response = self
            .client
            .chat()
            .create(CreateChatCompletionRequest {
                model: self.model.clone(),
                messages: vec![message.into()],
                temperature: Some(0.0),
                max_completion_tokens: Some(self.max_tokens),
                n: Some(1),
                ..Default::default()
            })
            .await
            .map_err(classify)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or(EvaluationError::EmptyResponse)
    }
}

/// Splits API-level rejections from everything else.
fn classify(err: OpenAIError) -> EvaluationError {
    match err {
        OpenAIError::ApiError(api) => EvaluationError::Service(api.message),
        other => EvaluationError::Transport(other.to_string()),
    }
}
