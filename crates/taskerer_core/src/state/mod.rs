//! Authoritative in-memory session model.
//!
//! # Responsibility
//! - Hold all users, the current user, the selected task and the
//!   selection-loading flag.
//! - Apply state changes exclusively through the closed `Action` set.
//!
//! # Invariants
//! - Every transition except the cache side effects of `SetCurrentUser` and
//!   `ClearSession` is a pure function of `(state, action)`.
//! - No transition talks to the remote store.

mod store;

pub use store::{Action, SessionState, StateStore};
