use std::path::Path;

use crate::error::StoreError;
use crate::model::Board;

/// Save a board to a JSON file.
pub fn save_board(board: &Board, path: &Path) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(board)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a board from a JSON file.
pub fn load_board(path: &Path) -> Result<Board, StoreError> {
    let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn board_survives_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plans").join("q3.roadmap.json");
        let board = Board::sample(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());

        save_board(&board, &path).unwrap();
        let loaded = load_board(&path).unwrap();
        assert_eq!(loaded, board);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let err = load_board(&path).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
