use crate::{
    load_attachment,
    tutor::{CHAT_TEMPERATURE, DEFAULT_SYSTEM_PROMPT},
    Attachment, HistoryKind, StudyError, StudyResult, UserSession,
};
use std::{collections::BTreeMap, path::Path};
use study_buddy_sdk::{LanguageModelInput, Message, Part};
use tracing::info;

/// Study time credited for each summary, in hours.
const SUMMARY_STUDY_HOURS: f64 = 0.1;

const TITLE_PREVIEW_CHARS: usize = 30;

pub struct Summarizer<'a> {
    session: &'a UserSession,
}

impl<'a> Summarizer<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    /// Summarize `text` into takeaways and exam highlights, and log the
    /// activity.
    pub async fn summarize(&self, text: &str) -> StudyResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StudyError::validation("Please provide some text to summarize."));
        }

        info!(chars = text.chars().count(), "summarizing text");
        let summary = self.session.ai().complete(summary_input(text)).await?;

        self.session
            .history()
            .add(HistoryKind::Summarizer, summary_title(text), BTreeMap::new())
            .await?;
        self.session
            .analytics()
            .add_study_time(SUMMARY_STUDY_HOURS)
            .await?;

        Ok(summary)
    }

    /// Summarize an uploaded text, Markdown or PDF file.
    pub async fn summarize_attachment(&self, attachment: &Attachment) -> StudyResult<String> {
        if !attachment.is_text_like() {
            return Err(StudyError::validation(format!(
                "Cannot summarize {}: only text and PDF files are supported.",
                attachment.name
            )));
        }
        self.summarize(&attachment.content).await
    }

    pub async fn summarize_file(&self, path: impl AsRef<Path>) -> StudyResult<String> {
        let attachment = load_attachment(path).await?;
        self.summarize_attachment(&attachment).await
    }
}

fn summary_title(text: &str) -> String {
    let preview: String = text.chars().take(TITLE_PREVIEW_CHARS).collect();
    format!("Summarized {preview}...")
}

fn summary_input(text: &str) -> LanguageModelInput {
    let prompt = format!(
        "Please summarize the following content.
Format the output clearly with the following sections if applicable:
- ## 📝 Key Takeaways (Bullet points)
- **Main Concept**
- **Critical Point**
- **Conclusion**
- ### 🔑 Exam Highlights (What might appear on a test)

Content to summarize:
{text}"
    );

    LanguageModelInput {
        system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        messages: vec![Message::user(vec![Part::text(prompt)])],
        temperature: Some(CHAT_TEMPERATURE),
        ..LanguageModelInput::default()
    }
}
