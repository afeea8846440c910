//! Remote memory access.
//!
//! `Transport` is the one trust boundary: everything above it treats the
//! returned bytes as untrusted.

mod address;
mod process;
mod reader;
mod value;

#[cfg(test)]
pub mod mock;

pub use address::RemoteAddress;
pub use process::*;
pub use reader::{MemoryReader, ReadMemory, Transport, WriteMemory};
pub use value::{FStringHeader, RemoteValue};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, MockTransport};
