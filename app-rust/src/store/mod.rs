//! Port to the managed document database.
//!
//! Documents are schema-less JSON objects addressed by slash-separated paths
//! (`users/{uid}/flashcards/{id}`), the way the hosted backend lays them out.
//! The backend is the source of truth; this crate only reads and writes
//! through [`DocumentStore`].

mod memory;

pub use memory::MemoryDocumentStore;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid document at {path}: {reason}")]
    InvalidDocument { path: String, reason: String },
    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Path of a collection, e.g. `users/abc/history`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

/// Path of a single document, e.g. `users/abc/history/xyz`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl CollectionPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|segment| segment.as_ref().trim_matches('/').to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self(joined)
    }

    #[must_use]
    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl DocumentPath {
    #[must_use]
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// A sub-collection nested under this document.
    #[must_use]
    pub fn child(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}/{}", self.collection, self.id, name))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering and limit applied to a collection listing. Without an order the
/// documents come back in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A stored document: its id plus the JSON object it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserialize the document into a record, injecting the document id as
    /// the `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = self.data.clone();
        if let Value::Object(map) = &mut data {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        serde_json::from_value(data).map_err(|error| StoreError::InvalidDocument {
            path: self.id.clone(),
            reason: error.to_string(),
        })
    }
}

/// Serialize a record into document data. The `id` field is dropped since the
/// path carries it.
pub fn encode<T: Serialize>(record: &T) -> StoreResult<Value> {
    let mut data = serde_json::to_value(record).map_err(|error| StoreError::InvalidDocument {
        path: String::new(),
        reason: error.to_string(),
    })?;
    match &mut data {
        Value::Object(map) => {
            map.remove("id");
            Ok(data)
        }
        _ => Err(StoreError::InvalidDocument {
            path: String::new(),
            reason: "records must serialize to JSON objects".to_string(),
        }),
    }
}

/// A live view of a collection: the current snapshot first, then a new
/// snapshot after every change to the collection.
pub type DocumentStream = BoxStream<'static, Vec<Document>>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Insert a document under a store-assigned id and return the id.
    async fn add(&self, collection: &CollectionPath, data: Value) -> StoreResult<String>;

    /// Create or replace the document at `path`.
    async fn set(&self, path: &DocumentPath, data: Value) -> StoreResult<()>;

    /// Shallow-merge `fields` into an existing document.
    async fn update(&self, path: &DocumentPath, fields: Value) -> StoreResult<()>;

    async fn delete(&self, path: &DocumentPath) -> StoreResult<()>;

    async fn list(&self, collection: &CollectionPath, query: Query) -> StoreResult<Vec<Document>>;

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        query: Query,
    ) -> StoreResult<DocumentStream>;
}
