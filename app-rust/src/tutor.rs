use crate::{Attachment, ChatMessage, ChatRole, StudyResult};
use std::sync::Arc;
use study_buddy_sdk::{CompletionOrchestrator, LanguageModelInput, Message, Part};
use tracing::{info_span, warn};
use tracing_futures::Instrument;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an intelligent, emotionally aware, and highly helpful AI companion.
Your primary role is to be a Study Buddy, but you can adapt your personality perfectly to the user's needs.

GUIDELINES:
1. Emotional Intelligence: If the user wants a friendly, casual, or even a specific persona like a \"supportive partner/girlfriend\" or \"best friend\", adapt your tone to be warm, caring, and deeply conversational.
2. Academic Excellence: When helping with studies, be clear, structured, and encouraging.
3. Versatility: You are like ChatGPT but with even more personality. Feel free to use emojis, be expressive, and build a real connection.
4. Formatting: Use bold, italics, and lists to make your responses beautiful and easy to read.

Current Goal: Help the user with whatever they need, matching their energy and requested style exactly.";

const WARMTH_INSTRUCTION: &str = "\n\n[USER INSTRUCTION]: The user wants a very close, warm, and personal connection. Be extra sweet, supportive, and deeply conversational. Match their energy perfectly.";

const WARMTH_TRIGGERS: [&str; 4] = ["friendly", "girlfriend", "friend", "relationship"];

/// Prior turns sent along with a question.
pub const HISTORY_WINDOW: usize = 10;

pub const CHAT_TEMPERATURE: f64 = 0.8;

/// Conversational tutor on top of the completion orchestrator.
#[derive(Clone)]
pub struct Tutor {
    ai: Arc<CompletionOrchestrator>,
}

impl Tutor {
    #[must_use]
    pub fn new(ai: Arc<CompletionOrchestrator>) -> Self {
        Self { ai }
    }

    /// Answer `message` in the context of `history`.
    ///
    /// Text-like attachments are inlined ahead of the question and images are
    /// sent as image parts.
    pub async fn chat(
        &self,
        history: &[ChatMessage],
        message: &str,
        attachments: &[Attachment],
        custom_system_prompt: Option<&str>,
    ) -> StudyResult<String> {
        let input = build_chat_input(history, message, attachments, custom_system_prompt);
        let span = info_span!(
            "study_buddy.tutor.chat",
            history = history.len(),
            attachments = attachments.len()
        );
        let text = self.ai.complete(input).instrument(span).await?;
        Ok(text)
    }

    /// Like [`Tutor::chat`], but failures come back as the markdown notice
    /// shown in place of an answer.
    pub async fn reply(
        &self,
        history: &[ChatMessage],
        message: &str,
        attachments: &[Attachment],
        custom_system_prompt: Option<&str>,
    ) -> String {
        match self
            .chat(history, message, attachments, custom_system_prompt)
            .await
        {
            Ok(text) => text,
            Err(error) => {
                warn!(error = %error, "tutor chat failed");
                error.user_message()
            }
        }
    }
}

pub(crate) fn build_chat_input(
    history: &[ChatMessage],
    message: &str,
    attachments: &[Attachment],
    custom_system_prompt: Option<&str>,
) -> LanguageModelInput {
    let mut messages: Vec<Message> = recent_history(history, message)
        .map(|entry| match entry.role {
            ChatRole::Ai => Message::assistant(vec![Part::text(entry.content.clone())]),
            ChatRole::User => Message::user(vec![Part::text(entry.content.clone())]),
        })
        .collect();

    let mut parts = vec![Part::text(question_text(message, attachments))];
    parts.extend(
        attachments
            .iter()
            .filter(|attachment| attachment.is_image())
            .map(|attachment| {
                Part::image(attachment.content.clone(), attachment.mime_type.clone())
            }),
    );
    messages.push(Message::user(parts));

    LanguageModelInput {
        system_prompt: Some(system_prompt(message, custom_system_prompt)),
        messages,
        temperature: Some(CHAT_TEMPERATURE),
        ..LanguageModelInput::default()
    }
}

/// Stored history may already contain the message being sent; drop it, then
/// keep the last [`HISTORY_WINDOW`] entries.
fn recent_history<'a>(
    history: &'a [ChatMessage],
    message: &'a str,
) -> impl Iterator<Item = &'a ChatMessage> {
    let kept: Vec<&ChatMessage> = history
        .iter()
        .filter(|entry| entry.content != message)
        .collect();
    let skip = kept.len().saturating_sub(HISTORY_WINDOW);
    kept.into_iter().skip(skip)
}

fn question_text(message: &str, attachments: &[Attachment]) -> String {
    let context: String = attachments
        .iter()
        .filter(|attachment| attachment.is_text_like())
        .map(|attachment| {
            format!(
                "\n\n--- Context from file: {} ---\n{}\n--- End of file ---\n",
                attachment.name, attachment.content
            )
        })
        .collect();

    if context.is_empty() {
        message.to_string()
    } else {
        format!("{context}\nUser Question: {message}")
    }
}

fn system_prompt(message: &str, custom_system_prompt: Option<&str>) -> String {
    let mut prompt = custom_system_prompt
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .to_string();
    let lowercase = message.to_lowercase();
    if WARMTH_TRIGGERS
        .iter()
        .any(|trigger| lowercase.contains(trigger))
    {
        prompt.push_str(WARMTH_INSTRUCTION);
    }
    prompt
}
