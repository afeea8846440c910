//! In-memory transport for tests.
//!
//! Memory is a sparse byte map. A read copies bytes until the first
//! unmapped address, so partially mapped requests produce the same short
//! transfers `process_vm_readv` does. Every call is logged.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use crate::math::{Transform, Vec3};

use super::reader::Transport;
use super::{MemoryReader, RemoteValue};

pub type MockMemoryReader = MemoryReader<MockTransport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCall {
    pub address: u64,
    pub len: usize,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    memory: Mutex<HashMap<u64, u8>>,
    reads: Mutex<Vec<MockCall>>,
    writes: Mutex<Vec<MockCall>>,
}

impl MockTransport {
    pub fn read_calls(&self) -> usize {
        self.reads.lock().unwrap().len()
    }

    pub fn write_calls(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Number of reads that started exactly at `address`.
    pub fn reads_at(&self, address: u64) -> usize {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.address == address)
            .count()
    }

    pub fn read_log(&self) -> Vec<MockCall> {
        self.reads.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.reads.lock().unwrap().clear();
        self.writes.lock().unwrap().clear();
    }

    /// Patch memory after construction (simulates the target mutating).
    pub fn poke(&self, address: u64, bytes: &[u8]) {
        let mut memory = self.memory.lock().unwrap();
        for (i, b) in bytes.iter().enumerate() {
            memory.insert(address + i as u64, *b);
        }
    }

    pub fn poke_value<V: RemoteValue>(&self, address: u64, value: V) {
        let mut buf = vec![0u8; V::SIZE];
        value.encode(&mut buf);
        self.poke(address, &buf);
    }
}

impl Transport for MockTransport {
    fn copy_from(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.lock().unwrap().push(MockCall {
            address,
            len: buf.len(),
        });

        let memory = self.memory.lock().unwrap();
        let mut copied = 0;
        for (i, slot) in buf.iter_mut().enumerate() {
            match memory.get(&(address + i as u64)) {
                Some(b) => {
                    *slot = *b;
                    copied += 1;
                }
                None => break,
            }
        }

        if copied == 0 {
            return Err(io::Error::from_raw_os_error(14)); // EFAULT
        }
        Ok(copied)
    }

    fn copy_to(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        self.writes.lock().unwrap().push(MockCall {
            address,
            len: data.len(),
        });

        let mut memory = self.memory.lock().unwrap();
        let mut written = 0;
        for (i, b) in data.iter().enumerate() {
            match memory.get_mut(&(address + i as u64)) {
                Some(slot) => {
                    *slot = *b;
                    written += 1;
                }
                None => break,
            }
        }

        if written == 0 {
            return Err(io::Error::from_raw_os_error(14));
        }
        Ok(written)
    }
}

#[derive(Debug, Default)]
pub struct MockMemoryBuilder {
    memory: HashMap<u64, u8>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        for (i, b) in bytes.iter().enumerate() {
            self.memory.insert(address + i as u64, *b);
        }
        self
    }

    pub fn with_value<V: RemoteValue>(self, address: u64, value: V) -> Self {
        let mut buf = vec![0u8; V::SIZE];
        value.encode(&mut buf);
        self.with_bytes(address, &buf)
    }

    pub fn with_u64(self, address: u64, value: u64) -> Self {
        self.with_value(address, value)
    }

    pub fn with_i32(self, address: u64, value: i32) -> Self {
        self.with_value(address, value)
    }

    pub fn with_f32(self, address: u64, value: f32) -> Self {
        self.with_value(address, value)
    }

    pub fn with_vec3(self, address: u64, value: Vec3) -> Self {
        self.with_value(address, value)
    }

    pub fn with_transform(self, address: u64, value: Transform) -> Self {
        self.with_value(address, value)
    }

    /// NUL-terminated ASCII string.
    pub fn with_cstr(self, address: u64, s: &str) -> Self {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.with_bytes(address, &bytes)
    }

    /// Map `len` zero bytes, e.g. to make a padded region readable.
    pub fn with_zeroed(self, address: u64, len: usize) -> Self {
        self.with_bytes(address, &vec![0u8; len])
    }

    pub fn build(self) -> MockTransport {
        MockTransport {
            memory: Mutex::new(self.memory),
            ..Default::default()
        }
    }

    pub fn build_reader(self) -> MockMemoryReader {
        MemoryReader::new(self.build())
    }
}
