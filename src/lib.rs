//! Roadmap grid: a planning board of sprints across the top, lanes down the
//! side and cards placed in the cells between.
//!
//! The library holds the engine: the board model, grid geometry, pointer
//! interaction sessions and the sync boundary. The `roadmap-grid` binary
//! wraps it in an egui desktop shell.

pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod io;
pub mod logging;
pub mod model;
pub mod planner;
pub mod sync;

pub use planner::{Planner, SyncEvent};
