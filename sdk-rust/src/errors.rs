use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request to the provider failed or the parsing of the response
    /// failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The request returns a non-OK status code
    #[error("Status error: {1} (Status {0})")]
    StatusCode(StatusCode, String),
    /// The response from the provider was unexpected. (e.g. no candidates
    /// returned by Gemini, or an empty completion)
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
}

pub type LanguageModelResult<T> = Result<T, LanguageModelError>;

/// Fragments that providers put in error messages when the key itself is the
/// problem, regardless of the status code they pair it with.
const AUTH_MESSAGE_MARKERS: [&str; 4] = [
    "api_key_invalid",
    "api key not valid",
    "invalid api key",
    "unauthorized",
];

impl LanguageModelError {
    /// Whether the failure is caused by missing or rejected credentials.
    /// Such errors will not go away by retrying and must be surfaced.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::StatusCode(status, message) => {
                *status == StatusCode::UNAUTHORIZED
                    || *status == StatusCode::FORBIDDEN
                    || mentions_auth(message)
            }
            Self::Transport(error) => matches!(
                error.status(),
                Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            ),
            Self::InvalidInput(message) | Self::Invariant(_, message) => mentions_auth(message),
        }
    }
}

fn mentions_auth(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTH_MESSAGE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Errors returned by the completion orchestrator.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// No provider has usable credentials.
    #[error("API key missing: configure GEMINI_API_KEY or OPENROUTER_API_KEY")]
    MissingApiKey,
    /// A provider rejected the credentials. Retrying will not help.
    #[error("AI auth error from {provider} ({model_id}): {source}")]
    Auth {
        provider: &'static str,
        model_id: String,
        #[source]
        source: LanguageModelError,
    },
    /// Every attempt failed with a transient error. Carries the last one.
    #[error("AI unresponsive after {attempts} attempts: {source}")]
    Exhausted {
        attempts: usize,
        #[source]
        source: LanguageModelError,
    },
    /// The model answered but the answer does not have the required shape.
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),
}

pub type CompletionResult<T> = Result<T, CompletionError>;

impl CompletionError {
    /// Auth and configuration errors end the request without further
    /// attempts.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::Auth { .. })
    }

    /// What the user can do about the error, if anything.
    #[must_use]
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::MissingApiKey => Some(
                "Add GEMINI_API_KEY or OPENROUTER_API_KEY to your .env file.".to_string(),
            ),
            Self::Auth { provider, .. } => Some(format!(
                "Your {} API key was rejected. Verify {} in your .env file.",
                provider_label(provider),
                provider_env_var(provider),
            )),
            Self::Exhausted { .. } | Self::MalformedOutput(_) => None,
        }
    }
}

fn provider_label(provider: &str) -> &str {
    match provider {
        "google" => "Gemini",
        "openai" => "OpenRouter",
        other => other,
    }
}

fn provider_env_var(provider: &str) -> &'static str {
    match provider {
        "google" => "GEMINI_API_KEY",
        _ => "OPENROUTER_API_KEY",
    }
}
