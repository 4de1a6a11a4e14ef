//! Pairs detected change points with nearby dated events.

pub mod catalog;
pub mod linker;

pub use catalog::key_events;
pub use linker::{link_change_points, EventLinker, LinkerConfig};
