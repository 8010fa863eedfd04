use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Rejected model edits. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown sprint {0}")]
    UnknownSprint(Uuid),
    #[error("unknown lane {0}")]
    UnknownLane(Uuid),
    #[error("unknown card {0}")]
    UnknownCard(Uuid),
    #[error("sprint would last {days} day(s); at least 1 is required")]
    InvalidDuration { days: i64 },
    #[error("lane order is not a permutation of the current lanes")]
    NotAPermutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("another gesture is already in progress")]
    Busy,
}

/// Failures reported by a [`crate::sync::SyncAdapter`] or its transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("store rejected the change: {0}")]
    Rejected(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("sync worker disconnected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed board file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no home directory to place configuration in")]
    NoConfigDir,
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
