use super::{
    CollectionPath, Direction, Document, DocumentPath, DocumentStore, DocumentStream, Query,
    StoreError, StoreResult,
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::broadcast::{self, error::RecvError};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct Collection {
    /// id -> (insertion sequence, data)
    documents: HashMap<String, (u64, Value)>,
}

#[derive(Default)]
struct MemoryState {
    collections: BTreeMap<CollectionPath, Collection>,
    sequence: u64,
}

impl MemoryState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn snapshot(&self, collection: &CollectionPath, query: &Query) -> Vec<Document> {
        let Some(stored) = self.collections.get(collection) else {
            return Vec::new();
        };

        let mut entries: Vec<(&String, &(u64, Value))> = stored.documents.iter().collect();
        entries.sort_by_key(|(_, (sequence, _))| *sequence);

        if let Some((field, direction)) = &query.order_by {
            // equal values keep insertion order, reversed along with the field
            entries.sort_by(|(_, (a_sequence, a)), (_, (b_sequence, b))| {
                let ordering = compare_fields(a.get(field), b.get(field))
                    .then_with(|| a_sequence.cmp(b_sequence));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        entries
            .into_iter()
            .take(limit)
            .map(|(id, (_, data))| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect()
    }
}

/// Missing fields sort first, then numbers, strings and booleans by value.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// In-process [`DocumentStore`] used for tests, demos and offline runs.
///
/// Every write publishes the changed collection path on a broadcast channel,
/// which drives [`DocumentStore::subscribe`].
#[derive(Clone)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
    changes: broadcast::Sender<CollectionPath>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            changes,
        }
    }
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn notify(&self, collection: &CollectionPath) {
        // no subscribers is fine
        let _ = self.changes.send(collection.clone());
    }
}

fn require_object(path: &DocumentPath, data: &Value) -> StoreResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::InvalidDocument {
            path: path.to_string(),
            reason: "document data must be a JSON object".to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .get(path.collection())
            .and_then(|collection| collection.documents.get(path.id()))
            .map(|(_, data)| Document {
                id: path.id().to_string(),
                data: data.clone(),
            }))
    }

    async fn add(&self, collection: &CollectionPath, data: Value) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(&collection.doc(id.clone()), data).await?;
        Ok(id)
    }

    async fn set(&self, path: &DocumentPath, data: Value) -> StoreResult<()> {
        require_object(path, &data)?;
        {
            let mut state = self.lock()?;
            let sequence = state.next_sequence();
            let collection = state
                .collections
                .entry(path.collection().clone())
                .or_default();
            let sequence = collection
                .documents
                .get(path.id())
                .map_or(sequence, |(existing, _)| *existing);
            collection
                .documents
                .insert(path.id().to_string(), (sequence, data));
        }
        self.notify(path.collection());
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: Value) -> StoreResult<()> {
        require_object(path, &fields)?;
        {
            let mut state = self.lock()?;
            let (_, data) = state
                .collections
                .get_mut(path.collection())
                .and_then(|collection| collection.documents.get_mut(path.id()))
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

            if let (Value::Object(target), Value::Object(fields)) = (data, fields) {
                target.extend(fields);
            }
        }
        self.notify(path.collection());
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        let removed = {
            let mut state = self.lock()?;
            state
                .collections
                .get_mut(path.collection())
                .and_then(|collection| collection.documents.remove(path.id()))
                .is_some()
        };
        if removed {
            self.notify(path.collection());
        }
        Ok(())
    }

    async fn list(&self, collection: &CollectionPath, query: Query) -> StoreResult<Vec<Document>> {
        let state = self.lock()?;
        Ok(state.snapshot(collection, &query))
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        query: Query,
    ) -> StoreResult<DocumentStream> {
        let mut changes = self.changes.subscribe();
        let initial = self.lock()?.snapshot(collection, &query);
        let state = Arc::clone(&self.state);
        let collection = collection.clone();

        let stream = async_stream::stream! {
            yield initial;

            loop {
                match changes.recv().await {
                    Ok(changed) if changed != collection => continue,
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }

                let snapshot = match state.lock() {
                    Ok(state) => state.snapshot(&collection, &query),
                    Err(_) => break,
                };
                yield snapshot;
            }
        };

        Ok(Box::pin(stream))
    }
}
