use crate::{
    store::{encode, Direction, Document, Query},
    types::DEFAULT_SESSION_COLOR,
    StudyError, StudyResult, StudySession, UserSession,
};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

const COLLECTION: &str = "study_sessions";

/// Calendar of planned study sessions.
pub struct PlannerService<'a> {
    session: &'a UserSession,
}

impl<'a> PlannerService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    pub async fn schedule(
        &self,
        title: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
        color: Option<&str>,
    ) -> StudyResult<StudySession> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StudyError::validation("Session title is required."));
        }
        if duration_minutes == 0 {
            return Err(StudyError::validation("Duration must be at least one minute."));
        }

        let mut session = StudySession {
            id: String::new(),
            title: title.to_string(),
            start,
            duration_minutes,
            color: color
                .map(str::trim)
                .filter(|color| !color.is_empty())
                .unwrap_or(DEFAULT_SESSION_COLOR)
                .to_string(),
        };
        session.id = self
            .session
            .store()
            .add(&self.session.collection(COLLECTION), encode(&session)?)
            .await?;
        info!(
            id = %session.id,
            title = %session.title,
            start = %session.start,
            "study session scheduled"
        );
        Ok(session)
    }

    /// Every session, earliest first.
    pub async fn list(&self) -> StudyResult<Vec<StudySession>> {
        let documents = self
            .session
            .store()
            .list(
                &self.session.collection(COLLECTION),
                Query::new().order_by("start", Direction::Ascending),
            )
            .await?;
        Ok(documents
            .iter()
            .map(Document::decode::<StudySession>)
            .collect::<Result<_, _>>()?)
    }

    /// Sessions starting on `day`.
    pub async fn on_day(&self, day: NaiveDate) -> StudyResult<Vec<StudySession>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|session| session.start.date() == day)
            .collect())
    }

    pub async fn delete(&self, id: &str) -> StudyResult<()> {
        self.session
            .store()
            .delete(&self.session.collection(COLLECTION).doc(id))
            .await?;
        Ok(())
    }
}
