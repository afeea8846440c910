//! Transport wrapper that counts remote copies.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use scenelens_core::Transport;

pub struct CountingTransport<T> {
    inner: T,
    reads: AtomicUsize,
    bytes: AtomicUsize,
}

impl<T: Transport> CountingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            bytes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl<T: Transport> Transport for CountingTransport<T> {
    fn copy_from(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let copied = self.inner.copy_from(address, buf)?;
        self.bytes.fetch_add(copied, Ordering::Relaxed);
        Ok(copied)
    }

    fn copy_to(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        self.inner.copy_to(address, data)
    }
}
