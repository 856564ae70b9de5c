use crate::{
    structured, CompletionError, CompletionResult, LanguageModel, LanguageModelError,
    LanguageModelInput, ModelResponse, RetryPolicy,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, info_span, warn};
use tracing_futures::Instrument;

/// Completes conversations against a preferred model, falling back to a
/// rotation of secondary models with bounded retries.
///
/// The primary model is called at most once. Fallback model `k % n` serves
/// fallback attempt `k`, and up to `n * cycles` retries follow the first
/// fallback call. Auth errors from any model end the request immediately.
pub struct CompletionOrchestrator {
    primary: Option<Arc<dyn LanguageModel>>,
    fallbacks: Vec<Arc<dyn LanguageModel>>,
    policy: RetryPolicy,
}

#[derive(Default)]
pub struct CompletionOrchestratorBuilder {
    primary: Option<Arc<dyn LanguageModel>>,
    fallbacks: Vec<Arc<dyn LanguageModel>>,
    policy: RetryPolicy,
}

impl CompletionOrchestratorBuilder {
    #[must_use]
    pub fn primary(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.primary = Some(model);
        self
    }

    #[must_use]
    pub fn fallback(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.fallbacks.push(model);
        self
    }

    #[must_use]
    pub fn fallbacks<I>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn LanguageModel>>,
    {
        self.fallbacks.extend(models);
        self
    }

    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn build(self) -> CompletionOrchestrator {
        CompletionOrchestrator {
            primary: self.primary,
            fallbacks: self.fallbacks,
            policy: self.policy,
        }
    }
}

impl CompletionOrchestrator {
    #[must_use]
    pub fn builder() -> CompletionOrchestratorBuilder {
        CompletionOrchestratorBuilder::default()
    }

    #[must_use]
    pub fn has_models(&self) -> bool {
        self.primary.is_some() || !self.fallbacks.is_empty()
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Produce a response that carries text, or a typed error.
    pub async fn generate(&self, input: LanguageModelInput) -> CompletionResult<ModelResponse> {
        let span = info_span!("study_buddy.completion");
        self.generate_inner(input).instrument(span).await
    }

    /// Produce the response text.
    pub async fn complete(&self, input: LanguageModelInput) -> CompletionResult<String> {
        let response = self.generate(input).await?;
        response.output_text().ok_or_else(|| {
            CompletionError::MalformedOutput("response carries no text".to_string())
        })
    }

    /// Complete and parse the first JSON array found in the response text.
    pub async fn generate_json_array<T: DeserializeOwned>(
        &self,
        input: LanguageModelInput,
    ) -> CompletionResult<Vec<T>> {
        let text = self.complete(input).await?;
        structured::parse_json_array(&text)
    }

    async fn generate_inner(&self, input: LanguageModelInput) -> CompletionResult<ModelResponse> {
        if !self.has_models() {
            return Err(CompletionError::MissingApiKey);
        }

        let mut calls = 0;

        if let Some(primary) = &self.primary {
            info!(
                provider = primary.provider(),
                model = %primary.model_id(),
                "trying primary model"
            );
            calls += 1;

            match call_model(primary.as_ref(), input.clone()).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_auth_error() => {
                    return Err(auth_error(primary.as_ref(), error));
                }
                Err(error) => {
                    warn!(
                        provider = primary.provider(),
                        model = %primary.model_id(),
                        error = %error,
                        "primary model failed, falling back"
                    );
                    if self.fallbacks.is_empty() {
                        return Err(CompletionError::Exhausted {
                            attempts: calls,
                            source: error,
                        });
                    }
                }
            }
        }

        let model_count = self.fallbacks.len();
        let max_retries = self.policy.max_retries(model_count);
        let mut attempt = 0;

        loop {
            let model = &self.fallbacks[attempt % model_count];
            info!(
                attempt = attempt + 1,
                provider = model.provider(),
                model = %model.model_id(),
                "trying fallback model"
            );
            calls += 1;

            match call_model(model.as_ref(), input.clone()).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_auth_error() => {
                    return Err(auth_error(model.as_ref(), error));
                }
                Err(error) => {
                    warn!(
                        attempt = attempt + 1,
                        model = %model.model_id(),
                        error = %error,
                        "fallback model failed"
                    );

                    if attempt >= max_retries {
                        return Err(CompletionError::Exhausted {
                            attempts: calls,
                            source: error,
                        });
                    }

                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// A response without text counts as a failed call so the rotation moves on.
async fn call_model(
    model: &dyn LanguageModel,
    input: LanguageModelInput,
) -> Result<ModelResponse, LanguageModelError> {
    let response = model.generate(input).await?;
    match response.output_text() {
        Some(text) if !text.trim().is_empty() => Ok(response),
        _ => Err(LanguageModelError::Invariant(
            model.provider(),
            format!("{} returned an empty response", model.model_id()),
        )),
    }
}

fn auth_error(model: &dyn LanguageModel, source: LanguageModelError) -> CompletionError {
    CompletionError::Auth {
        provider: model.provider(),
        model_id: model.model_id(),
        source,
    }
}
