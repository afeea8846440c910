//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod counting;
pub mod hex_utils;
pub mod hexdump;
pub mod layout_template;
pub mod name;
pub mod run;
pub mod snapshot;
pub mod status;
pub mod target;
