//! Placing orders and reading them back.

use common::{DocumentId, UserId};
use doc_store::{DocumentStore, Filter, Subscription, WriteFields};

use cart::{CartManager, LoadingFlag};

use crate::error::{CheckoutError, Result};
use crate::order::Order;

/// Collection holding order documents, store-assigned ids.
pub const ORDERS_COLLECTION: &str = "orders";

/// Turns a populated cart into a persisted order.
///
/// `place_order` is two sequential writes with no transaction around them:
/// create the order document, then clear the cart. A crash or failure
/// between the two leaves the order in place with the cart still full, and
/// a retry in that window creates a second order. This is intentional; the
/// failure carries the created order's id so the caller can reconcile.
pub struct CheckoutFlow<S: DocumentStore> {
    store: S,
    loading: LoadingFlag,
}

impl<S: DocumentStore> CheckoutFlow<S> {
    /// Creates a flow over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            loading: LoadingFlag::new(),
        }
    }

    /// Returns a handle to the loading flag for UI observation.
    pub fn loading(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Returns true while an order placement is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Creates a pending order from the cart's current contents, then
    /// empties the cart.
    ///
    /// The order captures a snapshot of the item list and the derived total
    /// at the moment of the call. Requires a signed-in principal and a
    /// non-empty cart; both checks happen before any write.
    #[tracing::instrument(skip(self, cart))]
    pub async fn place_order(&self, cart: &mut CartManager<S>) -> Result<DocumentId> {
        let principal = cart
            .principal()
            .cloned()
            .ok_or(CheckoutError::AuthenticationRequired)?;
        if cart.items().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let _busy = self.loading.begin();

        let total = cart.total_price();
        let fields = WriteFields::new()
            .set("userId", principal.uid.as_str())
            .set_serialized("items", cart.items())
            .map_err(CheckoutError::OrderCreation)?
            .set("totalAmount", total.cents())
            .set("status", "pending")
            .server_timestamp("createdAt");

        let order_id = self
            .store
            .add(ORDERS_COLLECTION, fields)
            .await
            .map_err(|e| {
                tracing::warn!(uid = %principal.uid, error = %e, "order write failed");
                metrics::counter!("order_placement_failures_total").increment(1);
                CheckoutError::OrderCreation(e)
            })?;

        tracing::info!(%order_id, total = %total, "order placed");
        metrics::counter!("orders_placed_total").increment(1);

        // Second leg: best effort. The order above is already committed.
        cart.clear_cart()
            .await
            .map_err(|source| CheckoutError::CartNotCleared {
                order_id: order_id.clone(),
                source,
            })?;

        Ok(order_id)
    }

    /// Fetches one order by id.
    ///
    /// Returns None if the order does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: &DocumentId) -> Result<Option<Order>> {
        let doc = self
            .store
            .get(ORDERS_COLLECTION, order_id)
            .await
            .map_err(CheckoutError::OrderLookup)?;

        doc.as_ref().map(Order::from_document).transpose()
    }

    /// Returns every order belonging to the given user.
    ///
    /// The store imposes no ordering on query results; callers sort by
    /// `created_at` themselves if they need newest-first.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for_user(&self, uid: &UserId) -> Result<Vec<Order>> {
        let docs = self
            .store
            .query(ORDERS_COLLECTION, &[Filter::eq("userId", uid.as_str())])
            .await
            .map_err(CheckoutError::OrderLookup)?;

        docs.iter().map(Order::from_document).collect()
    }

    /// Subscribes to changes on the given user's orders.
    ///
    /// Delivers a change for every create, status update, and delete of an
    /// order carrying the user's id. Dropping the handle detaches.
    #[tracing::instrument(skip(self))]
    pub async fn subscribe_orders(&self, uid: &UserId) -> Result<Subscription> {
        self.store
            .subscribe(ORDERS_COLLECTION, &[Filter::eq("userId", uid.as_str())])
            .await
            .map_err(CheckoutError::OrderLookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use cart::CartItem;
    use common::Money;
    use doc_store::InMemoryDocumentStore;
    use session::Principal;

    fn burger() -> CartItem {
        CartItem::new("p1", "Burger", Money::from_cents(12000), "r1", "KFC")
    }

    async fn cart_with_burger() -> (InMemoryDocumentStore, CartManager<InMemoryDocumentStore>) {
        let store = InMemoryDocumentStore::new();
        let mut cart = CartManager::new(store.clone());
        cart.session_started(Principal::new("uid-1")).await.unwrap();
        cart.add_to_cart(burger().with_quantity(2)).await.unwrap();
        (store, cart)
    }

    #[tokio::test]
    async fn place_order_requires_principal() {
        let store = InMemoryDocumentStore::new();
        let flow = CheckoutFlow::new(store.clone());
        let mut cart = CartManager::new(store);

        let result = flow.place_order(&mut cart).await;
        assert!(matches!(result, Err(CheckoutError::AuthenticationRequired)));
    }

    #[tokio::test]
    async fn place_order_rejects_empty_cart_without_writing() {
        let store = InMemoryDocumentStore::new();
        let flow = CheckoutFlow::new(store.clone());
        let mut cart = CartManager::new(store.clone());
        cart.session_started(Principal::new("uid-1")).await.unwrap();

        let result = flow.place_order(&mut cart).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(store.document_count(ORDERS_COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn placed_order_snapshots_cart_and_clears_it() {
        let (store, mut cart) = cart_with_burger().await;
        let flow = CheckoutFlow::new(store.clone());

        let order_id = flow.place_order(&mut cart).await.unwrap();

        let order = flow.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.user_id.as_str(), "uid-1");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_items(), 2);
        assert_eq!(order.total_amount.cents(), 24000);
        assert!(order.created_at.is_some());
        assert!(cart.items().is_empty());
    }

    #[tokio::test]
    async fn get_order_returns_none_for_unknown_id() {
        let flow = CheckoutFlow::new(InMemoryDocumentStore::new());
        let found = flow.get_order(&DocumentId::new("nope")).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn orders_query_filters_by_user() {
        let (store, mut cart) = cart_with_burger().await;
        let flow = CheckoutFlow::new(store.clone());
        flow.place_order(&mut cart).await.unwrap();

        let mut other = CartManager::new(store.clone());
        other
            .session_started(Principal::new("uid-2"))
            .await
            .unwrap();
        other.add_to_cart(burger()).await.unwrap();
        flow.place_order(&mut other).await.unwrap();

        let mine = flow.orders_for_user(&UserId::new("uid-1")).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id.as_str(), "uid-1");
    }
}
