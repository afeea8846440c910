//! Locating the target's entity list and deciding which entities to keep.

mod filter;
mod list;

pub use filter::ClassFilter;
pub use list::{
    DecodeScheme, EntityListHandle, EntityListResolver, ListSource, ObfuscationDescriptor,
};
