//! Remote document store abstraction.
//!
//! The hosted document database is an external collaborator; this crate
//! models what the core needs from it — per-document CRUD with merge
//! semantics, equality queries, server timestamps, and push-based change
//! subscriptions — behind the [`DocumentStore`] trait, plus an in-memory
//! implementation with fault injection for tests.

pub mod document;
pub mod error;
pub mod memory;
pub mod store;
pub mod subscription;

pub use common::DocumentId;
pub use document::{Document, FieldMap, WriteFields, WriteValue};
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use store::{DocumentStore, DocumentStoreExt, Filter};
pub use subscription::{ChangeKind, ChangeStream, DocumentChange, Subscription};
