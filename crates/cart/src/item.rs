//! Cart line items.

use serde::{Deserialize, Serialize};

use common::Money;

/// Identifier of a line item within a cart.
///
/// Composed by the caller from the product id and variant, so the same dish
/// with different options occupies distinct lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an item ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the item ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A line item in a cart.
///
/// Serialized with the wire field names of the stored documents
/// (`restaurantId`, `price`, ...); optional fields are omitted when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Unique within the cart.
    pub id: ItemId,

    /// Human-readable item name.
    pub name: String,

    /// Price per unit.
    #[serde(rename = "price")]
    pub unit_price: Money,

    /// Units of this item; always at least 1 inside a cart.
    pub quantity: u32,

    /// The restaurant the item belongs to.
    pub restaurant_id: String,

    /// Restaurant name snapshot for display.
    pub restaurant_name: String,

    /// Menu category, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Image reference, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Free-form customer notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CartItem {
    /// Creates a cart item with quantity 1 and no optional fields.
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        unit_price: Money,
        restaurant_id: impl Into<String>,
        restaurant_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity: 1,
            restaurant_id: restaurant_id.into(),
            restaurant_name: restaurant_name.into(),
            category: None,
            image: None,
            notes: None,
        }
    }

    /// Sets the quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the menu category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the image reference.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets the customer notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns the total price for this line (quantity × unit price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
