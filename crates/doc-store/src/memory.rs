use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{RwLock, mpsc};

use common::DocumentId;

use crate::{
    document::{Document, FieldMap, WriteFields},
    error::{Result, StoreError},
    store::{DocumentStore, Filter},
    subscription::{ChangeKind, DocumentChange, Subscription},
};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, FieldMap>>,
    fail_on_get: bool,
    fail_on_set: bool,
    fail_on_update: bool,
    fail_on_add: bool,
    fail_on_query: bool,
}

struct Subscriber {
    collection: String,
    filters: Vec<Filter>,
    sender: mpsc::UnboundedSender<DocumentChange>,
}

/// In-memory document store implementation for testing.
///
/// Provides the same interface as a hosted store client, plus fault
/// injection so callers can exercise their store-failure paths.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<State>>,
    subscribers: Arc<StdMutex<HashMap<u64, Subscriber>>>,
    next_subscriber_id: Arc<AtomicU64>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures reads to fail until reset.
    pub async fn set_fail_on_get(&self, fail: bool) {
        self.state.write().await.fail_on_get = fail;
    }

    /// Configures `set` writes to fail until reset.
    pub async fn set_fail_on_set(&self, fail: bool) {
        self.state.write().await.fail_on_set = fail;
    }

    /// Configures `update` writes to fail until reset.
    pub async fn set_fail_on_update(&self, fail: bool) {
        self.state.write().await.fail_on_update = fail;
    }

    /// Configures `add` writes to fail until reset.
    pub async fn set_fail_on_add(&self, fail: bool) {
        self.state.write().await.fail_on_add = fail;
    }

    /// Configures queries to fail until reset.
    pub async fn set_fail_on_query(&self, fail: bool) {
        self.state.write().await.fail_on_query = fail;
    }

    /// Returns the number of documents in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    /// Drops all documents and fault flags.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }

    fn notify(&self, kind: ChangeKind, collection: &str, id: &str, fields: &FieldMap) {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        subscribers.retain(|_, sub| {
            if sub.collection != collection {
                return true;
            }
            if !sub.filters.iter().all(|f| f.matches(fields)) {
                return true;
            }
            let change = DocumentChange {
                kind,
                collection: collection.to_string(),
                document: Document::new(DocumentId::new(id), fields.clone()),
            };
            // A closed receiver means the Subscription handle was dropped
            // without running its cancel hook yet; prune it here.
            sub.sender.send(change).is_ok()
        });
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        let state = self.state.read().await;
        if state.fail_on_get {
            return Err(StoreError::Unavailable("injected get failure".to_string()));
        }

        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id.as_str()))
            .map(|fields| Document::new(id.clone(), fields.clone())))
    }

    async fn set(&self, collection: &str, id: &DocumentId, fields: WriteFields) -> Result<()> {
        let (kind, resolved) = {
            let mut state = self.state.write().await;
            if state.fail_on_set {
                return Err(StoreError::Unavailable("injected set failure".to_string()));
            }

            let resolved = fields.resolve_at(Utc::now());
            let docs = state.collections.entry(collection.to_string()).or_default();
            let kind = if docs.contains_key(id.as_str()) {
                ChangeKind::Modified
            } else {
                ChangeKind::Added
            };
            docs.insert(id.as_str().to_string(), resolved.clone());
            (kind, resolved)
        };

        self.notify(kind, collection, id.as_str(), &resolved);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &DocumentId, fields: WriteFields) -> Result<()> {
        let merged = {
            let mut state = self.state.write().await;
            if state.fail_on_update {
                return Err(StoreError::Unavailable(
                    "injected update failure".to_string(),
                ));
            }

            let resolved = fields.resolve_at(Utc::now());
            let existing = state
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id.as_str()))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.clone(),
                })?;

            for (name, value) in resolved {
                existing.insert(name, value);
            }
            existing.clone()
        };

        self.notify(ChangeKind::Modified, collection, id.as_str(), &merged);
        Ok(())
    }

    async fn add(&self, collection: &str, fields: WriteFields) -> Result<DocumentId> {
        let id = DocumentId::generate();
        let resolved = {
            let mut state = self.state.write().await;
            if state.fail_on_add {
                return Err(StoreError::Unavailable("injected add failure".to_string()));
            }

            let resolved = fields.resolve_at(Utc::now());
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.as_str().to_string(), resolved.clone());
            resolved
        };

        self.notify(ChangeKind::Added, collection, id.as_str(), &resolved);
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<()> {
        let removed = {
            let mut state = self.state.write().await;
            state
                .collections
                .get_mut(collection)
                .and_then(|docs| docs.remove(id.as_str()))
        };

        if let Some(fields) = removed {
            self.notify(ChangeKind::Removed, collection, id.as_str(), &fields);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        if state.fail_on_query {
            return Err(StoreError::Unavailable(
                "injected query failure".to_string(),
            ));
        }

        let docs = state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| filters.iter().all(|f| f.matches(fields)))
                    .map(|(id, fields)| Document::new(DocumentId::new(id.clone()), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(docs)
    }

    async fn subscribe(&self, collection: &str, filters: &[Filter]) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);

        {
            let mut subscribers = match self.subscribers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            subscribers.insert(
                id,
                Subscriber {
                    collection: collection.to_string(),
                    filters: filters.to_vec(),
                    sender,
                },
            );
        }

        let registry = Arc::clone(&self.subscribers);
        Ok(Subscription::new(receiver, move || {
            let mut subscribers = match registry.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            subscribers.remove(&id);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_timestamp;
    use crate::store::DocumentStoreExt;
    use serde_json::json;

    fn profile_fields() -> WriteFields {
        WriteFields::new()
            .set("email", "ada@example.com")
            .set("displayName", "Ada")
            .set("cart", json!([]))
            .server_timestamp("createdAt")
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("uid-1");

        store.set("users", &id, profile_fields()).await.unwrap();

        let doc = store.get("users", &id).await.unwrap().unwrap();
        assert_eq!(doc.field("email"), Some(&json!("ada@example.com")));
        assert!(doc.has_field("createdAt"));
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let store = InMemoryDocumentStore::new();
        let result = store.get("users", &DocumentId::new("nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("uid-1");
        store.set("users", &id, profile_fields()).await.unwrap();

        store
            .update(
                "users",
                &id,
                WriteFields::new()
                    .set("cart", json!([{"id": "p1"}]))
                    .server_timestamp("updatedAt"),
            )
            .await
            .unwrap();

        let doc = store.get("users", &id).await.unwrap().unwrap();
        assert_eq!(doc.field("cart"), Some(&json!([{"id": "p1"}])));
        // Untouched fields survive the merge
        assert_eq!(doc.field("email"), Some(&json!("ada@example.com")));
        assert!(doc.has_field("updatedAt"));
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .update(
                "users",
                &DocumentId::new("nope"),
                WriteFields::new().set("cart", json!([])),
            )
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn add_assigns_unique_ids() {
        let store = InMemoryDocumentStore::new();

        let id1 = store
            .add("orders", WriteFields::new().set("status", "pending"))
            .await
            .unwrap();
        let id2 = store
            .add("orders", WriteFields::new().set("status", "pending"))
            .await
            .unwrap();

        assert_ne!(id1, id2);
        assert_eq!(store.document_count("orders").await, 2);
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("uid-1");
        store.set("users", &id, profile_fields()).await.unwrap();

        store.delete("users", &id).await.unwrap();
        assert!(!store.exists("users", &id).await.unwrap());

        // Deleting again is a no-op
        store.delete("users", &id).await.unwrap();
    }

    #[tokio::test]
    async fn query_applies_equality_filters() {
        let store = InMemoryDocumentStore::new();
        store
            .add(
                "orders",
                WriteFields::new().set("userId", "uid-1").set("status", "pending"),
            )
            .await
            .unwrap();
        store
            .add(
                "orders",
                WriteFields::new().set("userId", "uid-2").set("status", "pending"),
            )
            .await
            .unwrap();

        let mine = store
            .query("orders", &[Filter::eq("userId", "uid-1")])
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].field("userId"), Some(&json!("uid-1")));

        let all = store.query("orders", &[]).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn server_timestamp_is_parseable() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("uid-1");
        store.set("users", &id, profile_fields()).await.unwrap();

        let doc = store.get("users", &id).await.unwrap().unwrap();
        let created = parse_timestamp(doc.field("createdAt").unwrap()).unwrap();
        assert!(created <= Utc::now());
    }

    #[tokio::test]
    async fn subscribers_receive_matching_changes() {
        let store = InMemoryDocumentStore::new();
        let mut sub = store
            .subscribe("orders", &[Filter::eq("userId", "uid-1")])
            .await
            .unwrap();

        store
            .add("orders", WriteFields::new().set("userId", "uid-1"))
            .await
            .unwrap();
        store
            .add("orders", WriteFields::new().set("userId", "uid-2"))
            .await
            .unwrap();

        let change = sub.next_change().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Added);
        assert_eq!(change.document.field("userId"), Some(&json!("uid-1")));
        // The uid-2 order never matched the filter
        assert!(sub.try_next_change().is_none());
    }

    #[tokio::test]
    async fn subscriber_sees_modifications_and_removals() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("uid-1");
        store.set("users", &id, profile_fields()).await.unwrap();

        let mut sub = store.subscribe("users", &[]).await.unwrap();

        store
            .update("users", &id, WriteFields::new().set("cart", json!([1])))
            .await
            .unwrap();
        store.delete("users", &id).await.unwrap();

        assert_eq!(sub.next_change().await.unwrap().kind, ChangeKind::Modified);
        assert_eq!(sub.next_change().await.unwrap().kind, ChangeKind::Removed);
    }

    #[tokio::test]
    async fn dropped_subscription_detaches() {
        let store = InMemoryDocumentStore::new();
        let sub = store.subscribe("orders", &[]).await.unwrap();
        drop(sub);

        // No subscriber left to deliver to; the write must still succeed.
        store
            .add("orders", WriteFields::new().set("userId", "uid-1"))
            .await
            .unwrap();

        let subscribers = store.subscribers.lock().unwrap();
        assert!(subscribers.is_empty());
    }

    #[tokio::test]
    async fn fault_injection_fails_writes() {
        let store = InMemoryDocumentStore::new();
        let id = DocumentId::new("uid-1");
        store.set("users", &id, profile_fields()).await.unwrap();

        store.set_fail_on_update(true).await;
        let result = store
            .update("users", &id, WriteFields::new().set("cart", json!([{"id": "p1"}])))
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        // The document is untouched by the failed write
        store.set_fail_on_update(false).await;
        let doc = store.get("users", &id).await.unwrap().unwrap();
        assert_eq!(doc.field("cart"), Some(&json!([])));
    }
}
