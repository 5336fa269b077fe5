//! Shared value types: principal ids, document ids, and money.

pub mod types;

pub use types::{DocumentId, Money, UserId};
