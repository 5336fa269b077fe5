//! Order creation flow.
//!
//! Converts the current cart into a persisted order document and empties the
//! cart, as two sequential, deliberately non-transactional writes: if the
//! cart clear fails after the order write succeeded, the order stays in
//! place and the failure is surfaced with the created order's id. Order
//! status is mutated by downstream fulfillment tooling, never by this flow.

pub mod error;
pub mod flow;
pub mod order;

pub use error::{CheckoutError, Result};
pub use flow::{CheckoutFlow, ORDERS_COLLECTION};
pub use order::{Order, OrderStatus};
