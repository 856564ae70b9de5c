use crate::{
    analytics::AnalyticsService,
    chat::{self, ChatService},
    flashcards::FlashcardService,
    focus::FocusService,
    history::HistoryService,
    planner::PlannerService,
    profiles::ProfileService,
    projects::ProjectService,
    quiz::QuizService,
    store::{CollectionPath, DocumentPath, DocumentStore},
    summarizer::Summarizer,
    ChatMessage, StudyBuddyConfig, Tutor,
};
use std::sync::{Arc, Mutex};
use study_buddy_sdk::CompletionOrchestrator;

/// Entry point: the shared AI orchestrator plus the document store.
#[derive(Clone)]
pub struct StudyBuddy {
    ai: Arc<CompletionOrchestrator>,
    store: Arc<dyn DocumentStore>,
}

impl StudyBuddy {
    pub fn new(ai: CompletionOrchestrator, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            ai: Arc::new(ai),
            store,
        }
    }

    pub fn from_config(config: &StudyBuddyConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self::new(config.build_orchestrator(), store)
    }

    #[must_use]
    pub fn tutor(&self) -> Tutor {
        Tutor::new(Arc::clone(&self.ai))
    }

    /// Open a session for an authenticated user. Everything the session
    /// reads or writes lives under `users/{uid}`.
    #[must_use]
    pub fn session(&self, uid: impl Into<String>) -> UserSession {
        UserSession {
            uid: uid.into(),
            ai: Arc::clone(&self.ai),
            store: Arc::clone(&self.store),
            global_chat: Mutex::new(vec![chat::welcome_message()]),
        }
    }
}

pub struct UserSession {
    uid: String,
    ai: Arc<CompletionOrchestrator>,
    store: Arc<dyn DocumentStore>,
    /// The global chat is never persisted.
    pub(crate) global_chat: Mutex<Vec<ChatMessage>>,
}

impl UserSession {
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) fn ai(&self) -> &CompletionOrchestrator {
        &self.ai
    }

    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub(crate) fn tutor(&self) -> Tutor {
        Tutor::new(Arc::clone(&self.ai))
    }

    /// `users/{uid}`
    pub(crate) fn user_path(&self) -> DocumentPath {
        CollectionPath::new(["users"]).doc(self.uid.clone())
    }

    /// `users/{uid}/{name}`
    pub(crate) fn collection(&self, name: &str) -> CollectionPath {
        self.user_path().child(name)
    }

    #[must_use]
    pub fn profiles(&self) -> ProfileService<'_> {
        ProfileService::new(self)
    }

    #[must_use]
    pub fn projects(&self) -> ProjectService<'_> {
        ProjectService::new(self)
    }

    #[must_use]
    pub fn chat(&self) -> ChatService<'_> {
        ChatService::new(self)
    }

    #[must_use]
    pub fn summarizer(&self) -> Summarizer<'_> {
        Summarizer::new(self)
    }

    #[must_use]
    pub fn flashcards(&self) -> FlashcardService<'_> {
        FlashcardService::new(self)
    }

    #[must_use]
    pub fn quizzes(&self) -> QuizService<'_> {
        QuizService::new(self)
    }

    #[must_use]
    pub fn planner(&self) -> PlannerService<'_> {
        PlannerService::new(self)
    }

    #[must_use]
    pub fn focus(&self) -> FocusService<'_> {
        FocusService::new(self)
    }

    #[must_use]
    pub fn history(&self) -> HistoryService<'_> {
        HistoryService::new(self)
    }

    #[must_use]
    pub fn analytics(&self) -> AnalyticsService<'_> {
        AnalyticsService::new(self)
    }
}
