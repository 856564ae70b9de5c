use crate::store::StoreError;
use study_buddy_sdk::CompletionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    /// Input rejected before any work was done.
    #[error("{0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Failed to read PDF. Make sure it's not password protected.")]
    UnreadablePdf(String),
    #[error("Failed to read {name}: {source}")]
    Attachment {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type StudyResult<T> = Result<T, StudyError>;

/// Message fragments the user can act on (credentials, quotas, permissions).
const ACTIONABLE_MARKERS: [&str; 7] = [
    "ai config",
    "ai auth",
    "gemini",
    "permission",
    "quota",
    "limit",
    "key",
];

impl StudyError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the user can fix the failure themselves, e.g. by fixing a key
    /// or waiting for a quota to reset.
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        if let Self::Completion(error) = self {
            if error.is_terminal() {
                return true;
            }
        }
        let message = self.to_string().to_lowercase();
        ACTIONABLE_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }

    /// Markdown shown to the user in place of an AI answer.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_actionable() {
            let remediation = match self {
                Self::Completion(error) => error.remediation(),
                _ => None,
            }
            .unwrap_or_else(|| {
                "Please check your Gemini/OpenRouter API keys and quotas.".to_string()
            });
            format!("### ⚠️ AI Service Error\n{self}\n\n{remediation}")
        } else {
            "### ⚠️ AI Unresponsive\nThe AI service is currently unavailable or timed out. \
             Please check your connection and try again."
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_buddy_sdk::LanguageModelError;

    #[test]
    fn missing_key_is_rendered_as_service_error() {
        let message = StudyError::from(CompletionError::MissingApiKey).user_message();
        assert!(message.starts_with("### ⚠️ AI Service Error\n"));
        assert!(message.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn rate_limit_exhaustion_is_actionable() {
        let error = StudyError::from(CompletionError::Exhausted {
            attempts: 25,
            source: LanguageModelError::Invariant("openai", "Rate limit exceeded".to_string()),
        });
        assert!(error.is_actionable());
        assert!(error
            .user_message()
            .ends_with("Please check your Gemini/OpenRouter API keys and quotas."));
    }

    #[test]
    fn other_failures_are_rendered_as_unresponsive() {
        let error = StudyError::from(CompletionError::Exhausted {
            attempts: 3,
            source: LanguageModelError::Invariant("openai", "No choices in response".to_string()),
        });
        assert!(!error.is_actionable());
        assert!(error.user_message().starts_with("### ⚠️ AI Unresponsive\n"));
    }
}
