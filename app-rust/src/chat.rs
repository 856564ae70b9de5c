use crate::{
    store::{encode, CollectionPath, Direction, Document, Query, StoreError},
    types::now, Attachment, ChatMessage, ChatRole, StudyError, StudyResult, UserSession,
};
use std::sync::MutexGuard;
use tracing::{info, warn};

/// Project id of the session-only chat on the home screen.
pub const GLOBAL_PROJECT: &str = "global";

pub const WELCOME_MESSAGE: &str = "Hi! I'm your AI Study Buddy 📚 How can I help you today?";

pub(crate) fn welcome_message() -> ChatMessage {
    ChatMessage {
        id: "welcome".to_string(),
        role: ChatRole::Ai,
        content: WELCOME_MESSAGE.to_string(),
        attachments: Vec::new(),
        timestamp: now(),
    }
}

fn is_global(project_id: &str) -> bool {
    project_id == GLOBAL_PROJECT
}

/// Chat transcripts: in memory for the global chat, persisted under
/// `users/{uid}/chats/{project}/messages` for projects.
pub struct ChatService<'a> {
    session: &'a UserSession,
}

impl<'a> ChatService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    fn messages_collection(&self, project_id: &str) -> CollectionPath {
        self.session
            .collection("chats")
            .doc(project_id)
            .child("messages")
    }

    /// Oldest first.
    pub async fn messages(&self, project_id: &str) -> StudyResult<Vec<ChatMessage>> {
        if is_global(project_id) {
            return Ok(self.global_messages()?.clone());
        }

        let documents = self
            .session
            .store()
            .list(
                &self.messages_collection(project_id),
                Query::new().order_by("timestamp", Direction::Ascending),
            )
            .await?;
        Ok(documents
            .iter()
            .map(Document::decode::<ChatMessage>)
            .collect::<Result<_, _>>()?)
    }

    pub async fn add_message(
        &self,
        project_id: &str,
        role: ChatRole,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> StudyResult<ChatMessage> {
        let mut message = ChatMessage {
            id: String::new(),
            role,
            content: content.into(),
            attachments,
            timestamp: now(),
        };

        if is_global(project_id) {
            let mut messages = self.global_messages()?;
            message.id = format!("local-{}", messages.len());
            messages.push(message.clone());
            return Ok(message);
        }

        message.id = self
            .session
            .store()
            .add(&self.messages_collection(project_id), encode(&message)?)
            .await?;
        Ok(message)
    }

    /// Send a user message and store the tutor's reply.
    ///
    /// Project chats are steered towards the project's topic and bump its
    /// chat count. AI failures do not fail the call: the reply then carries
    /// the error notice.
    pub async fn send(
        &self,
        project_id: &str,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> StudyResult<ChatMessage> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(StudyError::validation("Message is empty."));
        }

        let system_prompt = if is_global(project_id) {
            None
        } else {
            let project = self
                .session
                .projects()
                .get(project_id)
                .await?
                .ok_or_else(|| StudyError::NotFound(format!("project {project_id}")))?;
            Some(project_system_prompt(
                &project.name,
                project.description.as_deref(),
            ))
        };

        let history = self.messages(project_id).await?;
        self.add_message(project_id, ChatRole::User, text, attachments.clone()).await?;
        self.session.analytics().log_message().await?;
        if !is_global(project_id) {
            self.session
                .projects()
                .increment_chat_count(project_id)
                .await?;
        }

        info!(project = project_id, "sending chat message");
        let reply = self
            .session
            .tutor()
            .reply(&history, text, &attachments, system_prompt.as_deref())
            .await;

        self.add_message(project_id, ChatRole::Ai, reply, Vec::new()).await
    }

    /// Delete the transcript. The global chat starts over with the welcome
    /// message.
    pub async fn clear_history(&self, project_id: &str) -> StudyResult<()> {
        if is_global(project_id) {
            *self.global_messages()? = vec![welcome_message()];
            return Ok(());
        }

        let collection = self.messages_collection(project_id);
        let documents = self
            .session
            .store()
            .list(&collection, Query::new())
            .await?;
        for document in &documents {
            self.session
                .store()
                .delete(&collection.doc(document.id.clone()))
                .await?;
        }
        info!(project = project_id, deleted = documents.len(), "chat history cleared");
        Ok(())
    }

    fn global_messages(&self) -> StudyResult<MutexGuard<'_, Vec<ChatMessage>>> {
        self.session.global_chat.lock().map_err(|_| {
            warn!("global chat lock poisoned");
            StoreError::Backend("global chat lock poisoned".to_string()).into()
        })
    }
}

fn project_system_prompt(name: &str, description: Option<&str>) -> String {
    format!(
        "You are a Study Buddy helping a student with their project: \"{name}\".\n\
         Description: {}\n\
         Only provide information and help relevant to this project and its topics.",
        description.unwrap_or("No description provided.")
    )
}
