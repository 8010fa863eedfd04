use std::path::PathBuf;

use tracing::info;

use super::adapter::SyncAdapter;
use super::intent::{MutationIntent, SyncResponse};
use crate::error::SyncError;
use crate::io;
use crate::model::Board;

/// A store of record kept in memory and, when given a path, written to a
/// board file after every accepted change.
#[derive(Debug, Clone)]
pub struct LocalStore {
    board: Board,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn new(board: Board) -> Self {
        Self { board, path: None }
    }

    pub fn with_path(board: Board, path: PathBuf) -> Self {
        Self {
            board,
            path: Some(path),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

impl SyncAdapter for LocalStore {
    fn apply(&mut self, intent: &MutationIntent) -> Result<SyncResponse, SyncError> {
        let response = intent.apply_to(&mut self.board)?;
        self.board.touch();
        if let Some(path) = &self.path {
            io::save_board(&self.board, path).map_err(|e| SyncError::Unavailable(e.to_string()))?;
            info!(intent = intent.label(), path = %path.display(), "board saved");
        }
        Ok(response)
    }
}
