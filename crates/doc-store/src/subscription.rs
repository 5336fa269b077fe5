//! Push-based change notification handles.

use std::pin::Pin;

use futures_core::Stream;
use tokio::sync::mpsc;

use crate::document::Document;

/// The kind of change a subscriber is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A document matching the subscription was created.
    Added,

    /// A matching document's fields were rewritten or merged.
    Modified,

    /// A matching document was deleted.
    Removed,
}

/// A single change delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    /// What happened to the document.
    pub kind: ChangeKind,

    /// The collection the document lives in.
    pub collection: String,

    /// The document after the change (before the change, for removals).
    pub document: Document,
}

/// A stream of document changes.
pub type ChangeStream = Pin<Box<dyn Stream<Item = DocumentChange> + Send>>;

/// A live change listener.
///
/// Acts as a cancellation handle: the listener stays attached for the
/// lifetime of this value and detaches when it is dropped, so consumers can
/// scope a subscription to a view's active lifetime.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<DocumentChange>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription from a change receiver and a cancel hook.
    ///
    /// Store implementations call this; consumers only receive it.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<DocumentChange>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Waits for the next change.
    ///
    /// Returns None once the store side has gone away.
    pub async fn next_change(&mut self) -> Option<DocumentChange> {
        self.receiver.recv().await
    }

    /// Returns the next change if one is already buffered, without waiting.
    pub fn try_next_change(&mut self) -> Option<DocumentChange> {
        self.receiver.try_recv().ok()
    }

    /// Converts the subscription into a stream of changes.
    ///
    /// The listener stays attached until the stream is dropped.
    pub fn into_stream(self) -> ChangeStream {
        Box::pin(futures_util::stream::unfold(self, |mut sub| async move {
            sub.next_change().await.map(|change| (change, sub))
        }))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::DocumentId;
    use crate::document::FieldMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn change(kind: ChangeKind) -> DocumentChange {
        DocumentChange {
            kind,
            collection: "orders".to_string(),
            document: Document::new(DocumentId::new("doc-1"), FieldMap::new()),
        }
    }

    #[tokio::test]
    async fn delivers_buffered_changes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = Subscription::new(rx, || {});

        tx.send(change(ChangeKind::Added)).unwrap();
        tx.send(change(ChangeKind::Modified)).unwrap();

        assert_eq!(sub.next_change().await.unwrap().kind, ChangeKind::Added);
        assert_eq!(sub.next_change().await.unwrap().kind, ChangeKind::Modified);
        assert!(sub.try_next_change().is_none());
    }

    #[tokio::test]
    async fn drop_runs_cancel_hook() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let (_tx, rx) = mpsc::unbounded_channel();
        let sub = Subscription::new(rx, move || flag.store(true, Ordering::SeqCst));
        drop(sub);

        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stream_ends_when_sender_dropped() {
        use futures_util::StreamExt;

        let (tx, rx) = mpsc::unbounded_channel();
        let sub = Subscription::new(rx, || {});

        tx.send(change(ChangeKind::Added)).unwrap();
        drop(tx);

        let changes: Vec<_> = sub.into_stream().collect().await;
        assert_eq!(changes.len(), 1);
    }
}
