//! Inspection helpers for bringing up a new layout.
//!
//! - `ChainReport`: how far each pointer chain resolves
//! - `hexdump_lines`: raw bytes in hexdump format

mod chain;
mod hexdump;

pub use chain::{ChainHop, ChainReport};
pub use hexdump::hexdump_lines;
