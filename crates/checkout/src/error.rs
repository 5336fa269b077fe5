use cart::CartError;
use common::DocumentId;
use doc_store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout attempted with no authenticated principal.
    #[error("you must be logged in to checkout")]
    AuthenticationRequired,

    /// Checkout attempted with an empty cart; no store writes happened.
    #[error("your cart is empty")]
    EmptyCart,

    /// The order document could not be created; nothing was persisted.
    #[error("failed to place order")]
    OrderCreation(#[source] StoreError),

    /// The order was created but the follow-up cart clear failed.
    ///
    /// There is no compensating delete: the order identified here exists and
    /// will be fulfilled, while the cart still holds its items.
    #[error("failed to place order: order {order_id} was created but the cart could not be cleared")]
    CartNotCleared {
        order_id: DocumentId,
        #[source]
        source: CartError,
    },

    /// An order read or query failed.
    #[error("failed to load order")]
    OrderLookup(#[source] StoreError),

    /// A stored order document did not deserialize.
    #[error("order document is malformed: {0}")]
    MalformedOrder(#[from] serde_json::Error),
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
