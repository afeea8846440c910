//! Hexdump command implementation.
//!
//! Displays raw remote bytes in traditional hexdump format, useful for
//! locating fields when bringing up a layout.

use anyhow::{Context, Result};
use scenelens_core::{MemoryReader, ProcessHandle, ReadMemory, RemoteAddress, hexdump_lines};

pub fn run(pid: i32, address: u64, size: usize, ascii: bool) -> Result<()> {
    let process = ProcessHandle::attach(pid, address)
        .with_context(|| format!("Address {:#x} is not readable in pid {}", address, pid))?;
    let reader = MemoryReader::new(&process);
    let bytes = reader.read_bytes(RemoteAddress::new(address), size)?;

    println!("Hexdump at 0x{:X} ({} bytes):", address, size);
    println!();
    for line in hexdump_lines(&bytes, ascii) {
        println!("{}", line);
    }
    Ok(())
}

