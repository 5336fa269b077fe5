//! Cart aggregate manager.
//!
//! Owns the in-memory view of a principal's shopping cart, mediates every
//! mutation through the remote document store, and derives aggregate totals.
//! The cart is an embedded array field of the user document; mutations
//! replace the whole array in a single write and adopt the new list locally
//! only after the write succeeds, so the observed state never diverges from
//! a confirmed remote write.

pub mod error;
pub mod item;
pub mod loading;
pub mod manager;

pub use error::{CartError, CartOp, Result};
pub use item::{CartItem, ItemId};
pub use loading::{LoadingFlag, LoadingGuard};
pub use manager::{CART_FIELD, CartManager, USERS_COLLECTION};
