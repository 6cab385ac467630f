//! Credential boundary.
//!
//! # Responsibility
//! - Define the opaque sign-up / sign-in contract the core consumes.
//! - Provide an in-memory provider for tests and the CLI demo.
//!
//! # Invariants
//! - The core never hashes passwords or issues tokens; it only consumes the
//!   resulting `Identity` to key into the remote store.

mod provider;

pub use provider::{
    AuthError, CredentialProvider, Identity, InMemoryCredentialProvider, AUTH_EMAIL_IN_USE,
    AUTH_INVALID_CREDENTIAL, AUTH_INVALID_EMAIL, AUTH_WEAK_PASSWORD,
};
