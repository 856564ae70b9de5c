mod analytics;
mod attachments;
pub mod chat;
mod config;
mod errors;
pub mod flashcards;
pub mod focus;
pub mod history;
mod planner;
pub mod profiles;
mod projects;
pub mod quiz;
mod session;
pub mod store;
mod summarizer;
pub mod tutor;
mod types;
pub mod validation;

pub use analytics::AnalyticsService;
pub use attachments::load_attachment;
pub use chat::ChatService;
pub use config::*;
pub use errors::{StudyError, StudyResult};
pub use flashcards::FlashcardService;
pub use focus::{FocusEvent, FocusMode, FocusService, FocusTimer};
pub use history::{HistoryFeed, HistoryService};
pub use planner::PlannerService;
pub use profiles::ProfileService;
pub use projects::ProjectService;
pub use quiz::{AnswerOutcome, QuizService, QuizSession};
pub use session::{StudyBuddy, UserSession};
pub use summarizer::Summarizer;
pub use tutor::Tutor;
pub use types::*;
pub use validation::{validate_password, PasswordError};
