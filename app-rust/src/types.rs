use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current time at the millisecond precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Profile document stored at `users/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "id", default)]
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub chat_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

/// A file handed to the tutor alongside a question.
///
/// Text-like files (PDF text, `text/*`, Markdown) carry their extracted text
/// in `content`; images carry base64 data without a `data:` prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSet {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cards: Vec<Flashcard>,
    /// Percentage of cards mastered in the last study run, 0..=100.
    #[serde(default)]
    pub mastery: u8,
    /// `None` until the set is studied for the first time.
    #[serde(default)]
    pub last_studied: Option<NaiveDate>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizQuestion {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Chat,
    Quiz,
    Flashcards,
    Summarizer,
    Focus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Free-form extras such as `score`.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsStats {
    pub total_hours: f64,
    pub tasks_done: u32,
    pub current_streak: u32,
    pub sessions: u32,
    /// Sum of correct answers over every quiz taken.
    pub quiz_score: u32,
    pub quiz_count: u32,
    pub flashcards_generated: u32,
    pub messages_sent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityDay {
    /// Short weekday name, `Mon` through `Sun`.
    pub name: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectShare {
    pub name: String,
    pub value: f64,
}

/// The `analytics/main` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSnapshot {
    pub stats: AnalyticsStats,
    pub activity_data: Vec<ActivityDay>,
    pub subject_data: Vec<SubjectShare>,
}

pub(crate) const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl Default for AnalyticsSnapshot {
    fn default() -> Self {
        Self {
            stats: AnalyticsStats::default(),
            activity_data: WEEKDAYS
                .iter()
                .map(|name| ActivityDay {
                    name: (*name).to_string(),
                    hours: 0.0,
                })
                .collect(),
            subject_data: ["Math", "Physics", "History", "Code"]
                .iter()
                .map(|name| SubjectShare {
                    name: (*name).to_string(),
                    value: 0.0,
                })
                .collect(),
        }
    }
}

pub const DEFAULT_SESSION_COLOR: &str = "#3b82f6";

fn default_session_color() -> String {
    DEFAULT_SESSION_COLOR.to_string()
}

/// A planned study block on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default = "default_session_color")]
    pub color: String,
}

impl StudySession {
    #[must_use]
    pub fn end(&self) -> NaiveDateTime {
        self.start + TimeDelta::minutes(i64::from(self.duration_minutes))
    }
}
