pub mod board_canvas;
pub mod dialogs;
pub mod pool;
pub mod theme;
pub mod toolbar;
