use crate::{
    store::{encode, Document, DocumentPath, Query},
    types::WEEKDAYS,
    AnalyticsSnapshot, StudyResult, UserSession,
};
use chrono::{Datelike, Local, Weekday};
use futures::{stream::BoxStream, StreamExt};
use tracing::{debug, warn};

const SNAPSHOT_ID: &str = "main";

/// Counters and weekly activity stored at `users/{uid}/analytics/main`.
///
/// Every operation is a read-modify-write of the whole snapshot.
pub struct AnalyticsService<'a> {
    session: &'a UserSession,
}

impl<'a> AnalyticsService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    fn path(&self) -> DocumentPath {
        self.session.collection("analytics").doc(SNAPSHOT_ID)
    }

    /// The stored snapshot, or an empty one for new users.
    pub async fn load(&self) -> StudyResult<AnalyticsSnapshot> {
        match self.session.store().get(&self.path()).await? {
            Some(document) => Ok(document.decode()?),
            None => Ok(AnalyticsSnapshot::default()),
        }
    }

    /// Follow the snapshot as it changes: the current value first, then one
    /// per write.
    pub async fn subscribe(&self) -> StudyResult<BoxStream<'static, AnalyticsSnapshot>> {
        let path = self.path();
        let stream = self
            .session
            .store()
            .subscribe(path.collection(), Query::new())
            .await?;
        Ok(stream.map(|documents| snapshot_from(&documents)).boxed())
    }

    pub async fn save(&self, snapshot: &AnalyticsSnapshot) -> StudyResult<()> {
        self.session
            .store()
            .set(&self.path(), encode(snapshot)?)
            .await?;
        Ok(())
    }

    async fn modify<F>(&self, change: F) -> StudyResult<AnalyticsSnapshot>
    where
        F: FnOnce(&mut AnalyticsSnapshot),
    {
        let mut snapshot = self.load().await?;
        change(&mut snapshot);
        self.save(&snapshot).await?;
        Ok(snapshot)
    }

    /// Count a finished quiz. `score` is the number of correct answers.
    pub async fn log_quiz(&self, score: u32, total: u32) -> StudyResult<AnalyticsSnapshot> {
        debug!(score, total, "logging quiz");
        self.modify(|snapshot| {
            snapshot.stats.quiz_score += score;
            snapshot.stats.quiz_count += 1;
            snapshot.stats.tasks_done += 1;
        })
        .await
    }

    pub async fn log_flashcards(&self, count: u32) -> StudyResult<AnalyticsSnapshot> {
        self.modify(|snapshot| {
            snapshot.stats.flashcards_generated += count;
            snapshot.stats.tasks_done += 1;
        })
        .await
    }

    pub async fn log_message(&self) -> StudyResult<AnalyticsSnapshot> {
        self.modify(|snapshot| snapshot.stats.messages_sent += 1).await
    }

    /// Add study time to today's bar and to the total.
    pub async fn add_study_time(&self, hours: f64) -> StudyResult<AnalyticsSnapshot> {
        self.add_study_time_on(hours, Local::now().weekday()).await
    }

    pub async fn add_study_time_on(
        &self,
        hours: f64,
        weekday: Weekday,
    ) -> StudyResult<AnalyticsSnapshot> {
        self.modify(|snapshot| apply_study_time(snapshot, hours, weekday)).await
    }

    /// Count a completed focus block and credit its length as study time.
    pub async fn log_focus_session(
        &self,
        hours: f64,
        weekday: Weekday,
    ) -> StudyResult<AnalyticsSnapshot> {
        self.modify(|snapshot| {
            snapshot.stats.sessions += 1;
            apply_study_time(snapshot, hours, weekday);
        })
        .await
    }
}

fn snapshot_from(documents: &[Document]) -> AnalyticsSnapshot {
    let Some(document) = documents.iter().find(|document| document.id == SNAPSHOT_ID) else {
        return AnalyticsSnapshot::default();
    };
    document.decode().unwrap_or_else(|error| {
        warn!(error = %error, "unreadable analytics snapshot");
        AnalyticsSnapshot::default()
    })
}

fn apply_study_time(snapshot: &mut AnalyticsSnapshot, hours: f64, weekday: Weekday) {
    let name = WEEKDAYS[weekday.num_days_from_monday() as usize];
    if let Some(day) = snapshot
        .activity_data
        .iter_mut()
        .find(|day| day.name == name)
    {
        day.hours += hours;
    }
    snapshot.stats.total_hours += hours;
}
