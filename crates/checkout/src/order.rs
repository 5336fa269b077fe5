//! Persisted orders and their status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cart::CartItem;
use common::{DocumentId, Money, UserId};
use doc_store::Document;

use crate::error::Result;

/// The status of a persisted order.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Confirmed ──► Completed
///           │
///           └──► Cancelled
/// ```
///
/// Orders are created as `Pending` by the checkout flow; every later
/// transition is driven by external fulfillment/admin tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting restaurant confirmation.
    #[default]
    Pending,

    /// Accepted by the restaurant, being prepared.
    Confirmed,

    /// Delivered (terminal state).
    Completed,

    /// Cancelled before confirmation (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can be confirmed in this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be completed in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Confirmed)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted order read back from the store.
///
/// Created once by the checkout flow and never mutated by it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Store-assigned identifier.
    pub id: DocumentId,

    /// The principal the order belongs to.
    pub user_id: UserId,

    /// Snapshot copy of the cart at checkout, not a live reference.
    pub items: Vec<CartItem>,

    /// The cart's total price at the moment of checkout.
    pub total_amount: Money,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// Store-assigned creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderFields {
    user_id: UserId,
    items: Vec<CartItem>,
    total_amount: Money,
    #[serde(default)]
    status: OrderStatus,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Parses an order from a stored document.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let fields: OrderFields = serde_json::from_value(Value::Object(doc.fields.clone()))?;
        Ok(Self {
            id: doc.id.clone(),
            user_id: fields.user_id,
            items: fields.items,
            total_amount: fields.total_amount,
            status: fields.status,
            created_at: fields.created_at,
        })
    }

    /// Returns the total quantity across the order's items.
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
