pub mod board;
pub mod card;
pub mod lane;
pub mod placement;
pub mod sprint;

pub use board::Board;
pub use card::{Card, CardId};
pub use lane::{Lane, LaneId, Lanes};
pub use placement::{Cell, Placement};
pub use sprint::{DateField, Sprint, SprintId, Timeline};
