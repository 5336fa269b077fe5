//! Session/identity provider abstraction.
//!
//! The identity service itself is an external collaborator; this crate
//! models the one thing the core needs from it — "who, if anyone, is signed
//! in right now" — as an explicit object with an observable lifecycle,
//! instead of the ambient global provider the app previously relied on.

pub mod principal;
pub mod session;

pub use principal::Principal;
pub use session::{Session, SessionProvider};
