pub mod file;

pub use file::{load_board, save_board};
