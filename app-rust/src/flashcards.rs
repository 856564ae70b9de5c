use crate::{
    store::{encode, Document, DocumentPath, Query},
    types::now, Flashcard, FlashcardSet, HistoryKind, StudyError, StudyResult, UserSession,
};
use chrono::Local;
use serde_json::json;
use std::collections::BTreeMap;
use study_buddy_sdk::{CompletionError, LanguageModelInput, Message, Part};
use tracing::info;

const COLLECTION: &str = "flashcards";

const SYSTEM_PROMPT: &str = "You are a JSON generator. Response must be ONLY a raw JSON array.";

/// Study time credited for generating a set, in hours.
const GENERATION_STUDY_HOURS: f64 = 0.1;

/// `round(mastered / total * 100)`, or `None` for an empty set.
#[must_use]
pub fn mastery_percentage(mastered: usize, total: usize) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let mastered = mastered.min(total);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let percentage = ((mastered as f64 / total as f64) * 100.0).round() as u8;
    Some(percentage)
}

pub struct FlashcardService<'a> {
    session: &'a UserSession,
}

impl<'a> FlashcardService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    fn path(&self, id: &str) -> DocumentPath {
        self.session.collection(COLLECTION).doc(id)
    }

    /// Ask the AI for `count` cards on `topic`.
    pub async fn generate(
        &self,
        topic: &str,
        count: u32,
        description: Option<&str>,
    ) -> StudyResult<Vec<Flashcard>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(StudyError::validation("Please enter a topic."));
        }
        if count == 0 {
            return Err(StudyError::validation("Card count must be at least 1."));
        }

        info!(topic, count, "generating flashcards");
        let cards: Vec<Flashcard> = self
            .session
            .ai()
            .generate_json_array(generation_input(topic, count, description))
            .await?;

        let cards: Vec<Flashcard> = cards
            .into_iter()
            .filter(|card| !card.front.trim().is_empty() && !card.back.trim().is_empty())
            .collect();
        if cards.is_empty() {
            return Err(
                CompletionError::MalformedOutput("no usable flashcards in response".to_string())
                    .into(),
            );
        }
        Ok(cards)
    }

    /// Generate a set, store it, and log the activity.
    pub async fn generate_set(
        &self,
        title: &str,
        count: u32,
        description: Option<&str>,
    ) -> StudyResult<FlashcardSet> {
        let cards = self.generate(title, count, description).await?;
        let set = self
            .create_set(title, description.map(ToString::to_string), cards)
            .await?;

        let generated = u32::try_from(set.cards.len()).unwrap_or(u32::MAX);
        self.session.analytics().log_flashcards(generated).await?;
        self.session
            .analytics()
            .add_study_time(GENERATION_STUDY_HOURS)
            .await?;
        self.session
            .history()
            .add(
                HistoryKind::Flashcards,
                format!("Generated {} set", set.title),
                BTreeMap::new(),
            )
            .await?;

        Ok(set)
    }

    pub async fn create_set(
        &self,
        title: &str,
        description: Option<String>,
        cards: Vec<Flashcard>,
    ) -> StudyResult<FlashcardSet> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StudyError::validation("Set title is required."));
        }

        let mut set = FlashcardSet {
            id: String::new(),
            title: title.to_string(),
            description: description.filter(|text| !text.trim().is_empty()),
            cards,
            mastery: 0,
            last_studied: None,
            created_at: now(),
        };
        set.id = self
            .session
            .store()
            .add(&self.session.collection(COLLECTION), encode(&set)?)
            .await?;
        Ok(set)
    }

    pub async fn get(&self, id: &str) -> StudyResult<Option<FlashcardSet>> {
        let document = self.session.store().get(&self.path(id)).await?;
        Ok(document
            .map(|document| document.decode::<FlashcardSet>())
            .transpose()?)
    }

    pub async fn list(&self) -> StudyResult<Vec<FlashcardSet>> {
        let documents = self
            .session
            .store()
            .list(&self.session.collection(COLLECTION), Query::new())
            .await?;
        Ok(documents
            .iter()
            .map(Document::decode::<FlashcardSet>)
            .collect::<Result<_, _>>()?)
    }

    pub async fn delete(&self, id: &str) -> StudyResult<()> {
        self.session.store().delete(&self.path(id)).await?;
        Ok(())
    }

    /// Store a mastery percentage and mark the set as studied today.
    pub async fn update_mastery(&self, id: &str, mastery: u8) -> StudyResult<()> {
        if mastery > 100 {
            return Err(StudyError::validation(format!(
                "Mastery must be between 0 and 100, got {mastery}."
            )));
        }

        self.session
            .store()
            .update(
                &self.path(id),
                json!({
                    "mastery": mastery,
                    "lastStudied": Local::now().date_naive(),
                }),
            )
            .await?;
        Ok(())
    }

    /// Finish a study run in which `mastered` cards were known. Returns the
    /// new mastery percentage.
    pub async fn record_study(&self, id: &str, mastered: usize) -> StudyResult<u8> {
        let set = self
            .get(id)
            .await?
            .ok_or_else(|| StudyError::NotFound(format!("flashcard set {id}")))?;
        if mastered > set.cards.len() {
            return Err(StudyError::validation(format!(
                "Mastered {mastered} cards out of {}.",
                set.cards.len()
            )));
        }
        let mastery = mastery_percentage(mastered, set.cards.len())
            .ok_or_else(|| StudyError::validation("The set has no cards."))?;

        self.update_mastery(id, mastery).await?;
        self.session
            .history()
            .add(
                HistoryKind::Flashcards,
                format!("Studied {}", set.title),
                BTreeMap::from([("score".to_string(), format!("{mastery}% Mastery"))]),
            )
            .await?;

        info!(id, mastery, "flashcard set studied");
        Ok(mastery)
    }
}

fn generation_input(topic: &str, count: u32, description: Option<&str>) -> LanguageModelInput {
    let focus = description
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| format!("Focus on: {text}"))
        .unwrap_or_default();
    let prompt = format!(
        "Generate {count} flashcards for the topic \"{topic}\".
{focus}

Return STRICTLY valid JSON array of objects.
Each object must have \"front\" and \"back\".
Example: [{{\"front\": \"Q\", \"back\": \"A\"}}]"
    );

    LanguageModelInput {
        system_prompt: Some(SYSTEM_PROMPT.to_string()),
        messages: vec![Message::user(vec![Part::text(prompt)])],
        ..LanguageModelInput::default()
    }
}
