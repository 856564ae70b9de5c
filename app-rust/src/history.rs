use crate::{
    store::{encode, Direction, Document, DocumentStream, Query},
    types::now, HistoryItem, HistoryKind, StudyResult, UserSession,
};
use futures::StreamExt;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Most recent items kept in the activity feed.
pub const HISTORY_LIMIT: usize = 50;

const COLLECTION: &str = "history";

/// The per-user activity log under `users/{uid}/history`.
pub struct HistoryService<'a> {
    session: &'a UserSession,
}

impl<'a> HistoryService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    fn feed_query() -> Query {
        Query::new()
            .order_by("timestamp", Direction::Descending)
            .limit(HISTORY_LIMIT)
    }

    /// Record an activity stamped with the current time.
    pub async fn add(
        &self,
        kind: HistoryKind,
        title: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> StudyResult<HistoryItem> {
        self.record(HistoryItem {
            id: String::new(),
            kind,
            title: title.into(),
            timestamp: now(),
            metadata,
        })
        .await
    }

    /// Store `item` as is; the returned copy carries the assigned id.
    pub async fn record(&self, mut item: HistoryItem) -> StudyResult<HistoryItem> {
        let id = self
            .session
            .store()
            .add(&self.session.collection(COLLECTION), encode(&item)?)
            .await?;
        debug!(kind = ?item.kind, title = %item.title, "history item added");
        item.id = id;
        Ok(item)
    }

    /// Newest first, at most [`HISTORY_LIMIT`] items.
    pub async fn list(&self) -> StudyResult<Vec<HistoryItem>> {
        let documents = self
            .session
            .store()
            .list(&self.session.collection(COLLECTION), Self::feed_query())
            .await?;
        Ok(decode_items(&documents))
    }

    /// Follow the feed as it changes.
    pub async fn subscribe(&self) -> StudyResult<HistoryFeed> {
        let stream = self
            .session
            .store()
            .subscribe(&self.session.collection(COLLECTION), Self::feed_query())
            .await?;
        Ok(HistoryFeed {
            stream,
            items: Vec::new(),
        })
    }
}

/// A live, locally cached view of the history feed.
pub struct HistoryFeed {
    stream: DocumentStream,
    items: Vec<HistoryItem>,
}

impl HistoryFeed {
    /// Wait for the next snapshot and cache it. Returns `None` once the
    /// store stops delivering updates.
    pub async fn next(&mut self) -> Option<&[HistoryItem]> {
        let documents = self.stream.next().await?;
        self.items = decode_items(&documents);
        Some(&self.items)
    }

    #[must_use]
    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    /// Drop the cached items, e.g. on sign-out.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

fn decode_items(documents: &[Document]) -> Vec<HistoryItem> {
    documents
        .iter()
        .filter_map(|document| match document.decode::<HistoryItem>() {
            Ok(item) => Some(item),
            Err(error) => {
                warn!(id = %document.id, error = %error, "skipping unreadable history item");
                None
            }
        })
        .collect()
}
