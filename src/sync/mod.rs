//! The boundary to the store of record.
//!
//! Commits are applied locally first, then sent as [`MutationIntent`]s to a
//! [`SyncAdapter`] running on a worker thread. The [`Ledger`] remembers what
//! each unconfirmed intent overwrote so a failure can be rolled back and a
//! stale answer can be recognised.

pub mod adapter;
pub mod client;
pub mod intent;
pub mod ledger;
pub mod local_store;

pub use adapter::SyncAdapter;
pub use client::{Completion, SyncClient};
pub use intent::{MutationIntent, SyncResponse};
pub use ledger::{EntityKey, Ledger, Restore, Snapshot};
pub use local_store::LocalStore;
