//! Pointer gestures on the planning grid.
//!
//! A press starts a pending [`Session`]; moving past the drag threshold
//! promotes it to one of the [`Gesture`] kinds, and the release turns it
//! into an [`Outcome`]. Only one session exists at a time.

pub mod manager;
pub mod session;

pub use manager::{InteractionManager, DEFAULT_DRAG_THRESHOLD};
pub use session::{Commit, Gesture, Outcome, Phase, Session, SpanEdge};
