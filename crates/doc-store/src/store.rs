use async_trait::async_trait;
use serde_json::Value;

use common::DocumentId;

use crate::document::{Document, FieldMap, WriteFields};
use crate::error::{Result, StoreError};
use crate::subscription::Subscription;

/// An equality filter on a document field.
///
/// The only filter shape the core needs (`userId == <uid>` style queries).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The field to compare.
    pub field: String,

    /// The value the field must equal.
    pub value: Value,
}

impl Filter {
    /// Creates an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns true if the field map satisfies this filter.
    pub fn matches(&self, fields: &FieldMap) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

/// Core trait for remote document store clients.
///
/// Models the hosted document database the app delegates all persistence to:
/// per-document CRUD, equality queries, and push-based change subscriptions.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by id.
    ///
    /// Returns None if the document does not exist.
    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>>;

    /// Creates or fully replaces a document at a caller-chosen id.
    async fn set(&self, collection: &str, id: &DocumentId, fields: WriteFields) -> Result<()>;

    /// Merges fields into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] if the document does not exist.
    /// Fields not named in `fields` are left untouched.
    async fn update(&self, collection: &str, id: &DocumentId, fields: WriteFields) -> Result<()>;

    /// Creates a document with a store-assigned id and returns that id.
    async fn add(&self, collection: &str, fields: WriteFields) -> Result<DocumentId>;

    /// Deletes a document. Deleting an absent document is a no-op.
    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<()>;

    /// Returns all documents in a collection matching every filter.
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>>;

    /// Subscribes to changes on documents matching every filter.
    ///
    /// The returned [`Subscription`] is a cancellation handle: dropping it
    /// detaches the listener.
    async fn subscribe(&self, collection: &str, filters: &[Filter]) -> Result<Subscription>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Returns true if the document exists.
    async fn exists(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }

    /// Fetches a document, failing with [`StoreError::NotFound`] if absent.
    async fn get_required(&self, collection: &str, id: &DocumentId) -> Result<Document> {
        self.get(collection, id).await?.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        })
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
