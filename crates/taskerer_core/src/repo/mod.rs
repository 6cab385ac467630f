//! Persistence adapters used by the sync core.
//!
//! # Responsibility
//! - `remote_store`: the hosted user collection (async, single attempt).
//! - `session_cache`: the durable single-slot snapshot of the current user.
//!
//! # Invariants
//! - Adapters report semantic errors (`NotFound`, `DuplicateKey`) separately
//!   from transport/storage failures.
//! - Adapters never retry or merge.

pub mod remote_store;
pub mod session_cache;
