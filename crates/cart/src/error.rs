use doc_store::StoreError;
use thiserror::Error;

/// The cart operation a store failure occurred in.
///
/// Used to phrase the user-visible message; no structured error codes are
/// surfaced beyond this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOp {
    /// Loading the cart on session start.
    Load,

    /// Adding an item.
    Add,

    /// Removing an item.
    Remove,

    /// Updating an item's quantity.
    UpdateQuantity,

    /// Clearing the cart.
    Clear,
}

impl CartOp {
    /// Returns the operation phrased for a user-visible message.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartOp::Load => "load your cart",
            CartOp::Add => "add item to cart",
            CartOp::Remove => "remove item from cart",
            CartOp::UpdateQuantity => "update item quantity",
            CartOp::Clear => "clear cart",
        }
    }
}

impl std::fmt::Display for CartOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during cart operations.
///
/// Every public operation catches failures at its own boundary; callers
/// receive one of these, never a panic or an unguarded store error.
#[derive(Debug, Error)]
pub enum CartError {
    /// A mutation was attempted with no authenticated principal.
    #[error("you must be logged in to modify your cart")]
    AuthenticationRequired,

    /// An add was requested with a zero quantity.
    #[error("item quantity must be at least 1")]
    InvalidQuantity { quantity: u32 },

    /// The store rejected or failed the operation; local state is unchanged.
    #[error("failed to {op}")]
    Store {
        op: CartOp,
        #[source]
        source: StoreError,
    },
}

impl CartError {
    /// Wraps a store failure with the operation it occurred in.
    pub fn store(op: CartOp, source: StoreError) -> Self {
        Self::Store { op, source }
    }
}

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
