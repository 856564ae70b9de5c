use reqwest::Client;
use std::{collections::HashMap, env, sync::Arc};
use study_buddy_sdk::{
    google::{GoogleModel, GoogleModelOptions},
    openai::{OpenAIChatModel, OpenAIChatModelOptions},
    CompletionOrchestrator, LanguageModel, RetryPolicy,
};
use tracing::{info, warn};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_APP_TITLE: &str = "AI Study Buddy";
pub const DEFAULT_REFERER: &str = "http://localhost";

/// Free OpenRouter models tried in order once Gemini is unavailable.
pub const DEFAULT_OPENROUTER_MODELS: [&str; 12] = [
    "google/gemini-2.0-flash-exp:free",
    "google/gemini-sep-2024:free",
    "mistralai/mistral-7b-instruct:free",
    "huggingfaceh4/zephyr-7b-beta:free",
    "google/gemini-exp-1206:free",
    "google/learnlm-1.5-pro-experimental:free",
    "meta-llama/llama-3.1-405b-instruct:free",
    "meta-llama/llama-3.1-70b-instruct:free",
    "meta-llama/llama-3-8b-instruct:free",
    "microsoft/phi-3-mini-128k-instruct:free",
    "qwen/qwen-2-7b-instruct:free",
    "openchat/openchat-7b:free",
];

const GEMINI_MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Clone, PartialEq)]
pub struct StudyBuddyConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub openrouter_models: Vec<String>,
    /// Sent as `HTTP-Referer` so OpenRouter can attribute traffic.
    pub referer: String,
    /// Sent as `X-Title`.
    pub app_title: String,
    pub retry_policy: RetryPolicy,
}

impl Default for StudyBuddyConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            openrouter_models: DEFAULT_OPENROUTER_MODELS
                .iter()
                .map(ToString::to_string)
                .collect(),
            referer: DEFAULT_REFERER.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl StudyBuddyConfig {
    /// Load `.env` if present, then read the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let openrouter_models = value("OPENROUTER_MODELS")
            .map(|models| {
                models
                    .split(',')
                    .map(str::trim)
                    .filter(|model| !model.is_empty())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or(defaults.openrouter_models);

        Self {
            gemini_api_key: value("GEMINI_API_KEY").filter(|key| is_usable_key(key)),
            gemini_model: value("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            openrouter_api_key: value("OPENROUTER_API_KEY").filter(|key| is_usable_key(key)),
            openrouter_base_url: value("OPENROUTER_BASE_URL")
                .unwrap_or(defaults.openrouter_base_url),
            openrouter_models,
            referer: value("STUDY_BUDDY_REFERER").unwrap_or(defaults.referer),
            app_title: value("STUDY_BUDDY_TITLE").unwrap_or(defaults.app_title),
            retry_policy: defaults.retry_policy,
        }
    }

    #[must_use]
    pub fn has_any_key(&self) -> bool {
        self.gemini_api_key.is_some() || self.openrouter_api_key.is_some()
    }

    /// Gemini as the primary model, the OpenRouter rotation as fallbacks.
    /// Providers without a key are left out; with no keys at all the
    /// orchestrator answers every request with `MissingApiKey`.
    #[must_use]
    pub fn build_orchestrator(&self) -> CompletionOrchestrator {
        if !self.has_any_key() {
            warn!("No AI API keys found (OpenRouter or Gemini). AI will be limited.");
        }

        let mut builder = CompletionOrchestrator::builder().retry_policy(self.retry_policy.clone());

        if let Some(api_key) = &self.gemini_api_key {
            builder = builder.primary(Arc::new(GoogleModel::new(
                self.gemini_model.clone(),
                GoogleModelOptions {
                    api_key: api_key.clone(),
                    max_output_tokens: Some(GEMINI_MAX_OUTPUT_TOKENS),
                    ..Default::default()
                },
            )));
        }

        if let Some(api_key) = &self.openrouter_api_key {
            let headers = HashMap::from([
                ("HTTP-Referer".to_string(), self.referer.clone()),
                ("X-Title".to_string(), self.app_title.clone()),
            ]);
            // one connection pool shared by the whole rotation
            let client = Client::new();
            let models = self
                .openrouter_models
                .iter()
                .map(|model_id| -> Arc<dyn LanguageModel> {
                    Arc::new(OpenAIChatModel::new(
                        model_id.clone(),
                        OpenAIChatModelOptions {
                            base_url: Some(self.openrouter_base_url.clone()),
                            api_key: api_key.clone(),
                            headers: Some(headers.clone()),
                            client: Some(client.clone()),
                        },
                    ))
                });
            builder = builder.fallbacks(models);
        }

        info!(
            gemini = self.gemini_api_key.is_some(),
            openrouter_models = if self.openrouter_api_key.is_some() {
                self.openrouter_models.len()
            } else {
                0
            },
            "configured completion providers"
        );

        builder.build()
    }
}

/// Placeholder keys shipped in sample env files are treated as absent.
fn is_usable_key(key: &str) -> bool {
    !key.contains("dummy")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = StudyBuddyConfig::from_lookup(lookup(&[]));
        assert_eq!(config, StudyBuddyConfig::default());
        assert!(!config.has_any_key());
        assert_eq!(config.openrouter_models.len(), 12);
        assert!(!config.build_orchestrator().has_models());
    }

    #[test]
    fn dummy_keys_count_as_missing() {
        let config = StudyBuddyConfig::from_lookup(lookup(&[
            ("OPENROUTER_API_KEY", "sk-or-v1-dummy-key"),
            ("GEMINI_API_KEY", "  "),
        ]));
        assert!(!config.has_any_key());
    }

    #[test]
    fn reads_overrides() {
        let config = StudyBuddyConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g-key"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("OPENROUTER_API_KEY", "or-key"),
            ("OPENROUTER_MODELS", "a/one:free, b/two:free,,"),
            ("STUDY_BUDDY_TITLE", "Exam Cram"),
        ]));

        assert_eq!(config.gemini_api_key.as_deref(), Some("g-key"));
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.openrouter_models, vec!["a/one:free", "b/two:free"]);
        assert_eq!(config.app_title, "Exam Cram");
        assert_eq!(config.openrouter_base_url, DEFAULT_OPENROUTER_BASE_URL);
        assert!(config.build_orchestrator().has_models());
    }
}
