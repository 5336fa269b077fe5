use tokio::sync::watch;

use crate::principal::Principal;

/// Trait for session/identity providers.
///
/// The cart and checkout flows only ever ask one question of the identity
/// layer: who is the current principal.
pub trait SessionProvider: Send + Sync {
    /// Returns the currently authenticated principal, if any.
    fn current_principal(&self) -> Option<Principal>;
}

/// An explicit session object with an observable sign-in/sign-out lifecycle.
///
/// Consumers that need to react to principal changes (the cart manager's
/// load-on-login, badge listeners) subscribe via [`Session::watch`] rather
/// than polling.
#[derive(Debug)]
pub struct Session {
    tx: watch::Sender<Option<Principal>>,
}

impl Session {
    /// Creates a signed-out session.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Marks the session as started for the given principal.
    pub fn sign_in(&self, principal: Principal) {
        tracing::info!(uid = %principal.uid, "session started");
        self.tx.send_replace(Some(principal));
    }

    /// Marks the session as ended.
    pub fn sign_out(&self) {
        if let Some(principal) = self.tx.borrow().as_ref() {
            tracing::info!(uid = %principal.uid, "session ended");
        }
        self.tx.send_replace(None);
    }

    /// Returns a receiver notified on every sign-in and sign-out.
    pub fn watch(&self) -> watch::Receiver<Option<Principal>> {
        self.tx.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for Session {
    fn current_principal(&self) -> Option<Principal> {
        self.tx.borrow().clone()
    }
}
