use super::intent::{MutationIntent, SyncResponse};
use crate::error::SyncError;

/// The store of record. Implementations run on the sync worker thread and
/// may block.
pub trait SyncAdapter: Send + 'static {
    fn apply(&mut self, intent: &MutationIntent) -> Result<SyncResponse, SyncError>;
}

impl<F> SyncAdapter for F
where
    F: FnMut(&MutationIntent) -> Result<SyncResponse, SyncError> + Send + 'static,
{
    fn apply(&mut self, intent: &MutationIntent) -> Result<SyncResponse, SyncError> {
        self(intent)
    }
}
