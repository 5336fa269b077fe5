//! The cart aggregate manager.

use common::{DocumentId, Money, UserId};
use doc_store::{DocumentStore, WriteFields};
use serde_json::json;
use session::Principal;

use crate::error::{CartError, CartOp, Result};
use crate::item::{CartItem, ItemId};
use crate::loading::LoadingFlag;

/// Collection holding user documents, keyed by uid.
pub const USERS_COLLECTION: &str = "users";

/// Field of the user document holding the embedded cart array.
pub const CART_FIELD: &str = "cart";

/// Maintains a consistent view of one principal's cart across a session.
///
/// Every mutation follows the same two-phase pattern: compute the next full
/// item list in memory, persist it as one whole-field write to the user
/// document, then adopt it locally only after the write succeeds. A failed
/// write therefore leaves the observed state untouched; the caller retries
/// manually.
///
/// Mutations take `&mut self`, so overlapping mutations on one manager are
/// unrepresentable. Two managers sharing a user document still race
/// last-writer-wins at the store, since cart writes carry no version check.
pub struct CartManager<S: DocumentStore> {
    store: S,
    principal: Option<Principal>,
    items: Vec<CartItem>,
    loading: LoadingFlag,
}

impl<S: DocumentStore> CartManager<S> {
    /// Creates a manager with no session and an empty cart.
    pub fn new(store: S) -> Self {
        Self {
            store,
            principal: None,
            items: Vec::new(),
            loading: LoadingFlag::new(),
        }
    }

    /// Returns the current item list.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns the total quantity across all items.
    ///
    /// Recomputed on every call; never cached.
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Returns the total price across all items.
    ///
    /// Recomputed on every call; never cached.
    pub fn total_price(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Returns the signed-in principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns a handle to the loading flag for UI observation.
    pub fn loading(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Returns true while an operation is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Adopts the given principal and rehydrates their cart from the store.
    ///
    /// - user document exists with a cart field: adopt it verbatim;
    /// - exists without one: initialize the field to an empty list remotely;
    /// - missing entirely: create the document with the principal's profile
    ///   snapshot and an empty cart.
    ///
    /// On failure the session is still considered started (the principal is
    /// adopted) but the cart stays empty and the error is surfaced; the
    /// loading flag is cleared on every path.
    #[tracing::instrument(skip(self, principal), fields(uid = %principal.uid))]
    pub async fn session_started(&mut self, principal: Principal) -> Result<()> {
        let _busy = self.loading.begin();

        // The previous principal's items must not leak into this session.
        self.items.clear();
        let doc_id = DocumentId::from(&principal.uid);
        self.principal = Some(principal);

        let doc = self
            .store
            .get(USERS_COLLECTION, &doc_id)
            .await
            .map_err(|e| CartError::store(CartOp::Load, e))?;

        let items = match doc {
            Some(doc) if doc.has_field(CART_FIELD) => doc
                .parse_field::<Vec<CartItem>>(CART_FIELD)
                .map_err(|e| CartError::store(CartOp::Load, e))?
                .unwrap_or_default(),
            Some(_) => {
                // Existing profile from before carts were introduced.
                self.store
                    .update(
                        USERS_COLLECTION,
                        &doc_id,
                        WriteFields::new().set(CART_FIELD, json!([])),
                    )
                    .await
                    .map_err(|e| CartError::store(CartOp::Load, e))?;
                Vec::new()
            }
            None => {
                self.create_user_document(&doc_id).await?;
                Vec::new()
            }
        };

        self.items = items;
        tracing::debug!(count = self.items.len(), "cart rehydrated");
        Ok(())
    }

    /// Resets to the empty cart and forgets the principal.
    pub fn session_ended(&mut self) {
        self.principal = None;
        self.items.clear();
    }

    /// Adds an item to the cart.
    ///
    /// `item.quantity` is the requested amount. If an item with the same id
    /// is already present, its quantity is incremented by that amount;
    /// otherwise the item is appended.
    #[tracing::instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn add_to_cart(&mut self, item: CartItem) -> Result<()> {
        let uid = self.require_principal()?;
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity: 0 });
        }
        let _busy = self.loading.begin();

        let mut next = self.items.clone();
        match next.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity += item.quantity,
            None => next.push(item),
        }

        self.persist(&uid, &next, CartOp::Add).await?;
        self.items = next;
        metrics::counter!("cart_mutations_total", "operation" => "add").increment(1);
        Ok(())
    }

    /// Removes an item from the cart.
    ///
    /// An absent id is a no-op, not an error.
    #[tracing::instrument(skip(self))]
    pub async fn remove_from_cart(&mut self, item_id: &ItemId) -> Result<()> {
        let uid = self.require_principal()?;
        let _busy = self.loading.begin();

        let next: Vec<CartItem> = self
            .items
            .iter()
            .filter(|item| &item.id != item_id)
            .cloned()
            .collect();

        self.persist(&uid, &next, CartOp::Remove).await?;
        self.items = next;
        metrics::counter!("cart_mutations_total", "operation" => "remove").increment(1);
        Ok(())
    }

    /// Sets an item's quantity.
    ///
    /// A quantity of zero removes the item instead. An absent id is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(&mut self, item_id: &ItemId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return self.remove_from_cart(item_id).await;
        }

        let uid = self.require_principal()?;
        let _busy = self.loading.begin();

        let mut next = self.items.clone();
        if let Some(item) = next.iter_mut().find(|item| &item.id == item_id) {
            item.quantity = quantity;
        }

        self.persist(&uid, &next, CartOp::UpdateQuantity).await?;
        self.items = next;
        metrics::counter!("cart_mutations_total", "operation" => "update_quantity").increment(1);
        Ok(())
    }

    /// Empties the cart, replacing the entire stored array.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Result<()> {
        let uid = self.require_principal()?;
        let _busy = self.loading.begin();

        self.persist(&uid, &[], CartOp::Clear).await?;
        self.items.clear();
        metrics::counter!("cart_mutations_total", "operation" => "clear").increment(1);
        Ok(())
    }

    fn require_principal(&self) -> Result<UserId> {
        self.principal
            .as_ref()
            .map(|p| p.uid.clone())
            .ok_or(CartError::AuthenticationRequired)
    }

    async fn create_user_document(&self, doc_id: &DocumentId) -> Result<()> {
        let principal = self
            .principal
            .as_ref()
            .ok_or(CartError::AuthenticationRequired)?;

        let mut fields = WriteFields::new()
            .set(CART_FIELD, json!([]))
            .server_timestamp("createdAt");
        if let Some(email) = &principal.email {
            fields = fields.set("email", email.clone());
        }
        if let Some(name) = &principal.display_name {
            fields = fields.set("displayName", name.clone());
        }

        self.store
            .set(USERS_COLLECTION, doc_id, fields)
            .await
            .map_err(|e| CartError::store(CartOp::Load, e))
    }

    /// Persists the full item list as one whole-field write.
    async fn persist(&self, uid: &UserId, items: &[CartItem], op: CartOp) -> Result<()> {
        let fields = WriteFields::new()
            .set_serialized(CART_FIELD, &items)
            .map_err(|e| CartError::store(op, e))?
            .server_timestamp("updatedAt");

        self.store
            .update(USERS_COLLECTION, &DocumentId::from(uid), fields)
            .await
            .map_err(|e| {
                tracing::warn!(%uid, %op, error = %e, "cart write failed");
                metrics::counter!("cart_mutation_failures_total").increment(1);
                CartError::store(op, e)
            })
    }
}
