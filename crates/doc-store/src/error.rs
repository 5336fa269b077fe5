use thiserror::Error;

use common::DocumentId;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound {
        collection: String,
        id: DocumentId,
    },

    /// The store could not service the request (network failure, timeout,
    /// backend outage). The message is backend-specific.
    #[error("store request failed: {0}")]
    Unavailable(String),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
