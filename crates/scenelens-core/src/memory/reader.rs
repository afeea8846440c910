use std::io;

use crate::error::{Error, Result};

use super::RemoteAddress;
use super::value::{FStringHeader, MAX_VALUE_SIZE, RemoteValue};

/// The privileged cross-process copy primitive.
///
/// Implementations report how many bytes actually moved; the guards and
/// the all-or-nothing policy live in [`MemoryReader`].
pub trait Transport {
    fn copy_from(&self, address: u64, buf: &mut [u8]) -> io::Result<usize>;

    fn copy_to(&self, address: u64, data: &[u8]) -> io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn copy_from(&self, address: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).copy_from(address, buf)
    }

    fn copy_to(&self, address: u64, data: &[u8]) -> io::Result<usize> {
        (**self).copy_to(address, data)
    }
}

/// Typed reads from the target's address space.
///
/// Every returned value is untrusted: a successful read only means the
/// bytes were transferred, not that they mean anything.
pub trait ReadMemory {
    /// Fill `buf` from `address`. Either every byte arrives or the call fails.
    fn read_into(&self, address: RemoteAddress, buf: &mut [u8]) -> Result<()>;

    fn read_bytes(&self, address: RemoteAddress, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(address, &mut buf)?;
        Ok(buf)
    }

    fn read_value<V: RemoteValue>(&self, address: RemoteAddress) -> Result<V> {
        let mut raw = [0u8; MAX_VALUE_SIZE];
        let buf = &mut raw[..V::SIZE];
        self.read_into(address, buf)?;
        Ok(V::decode(buf))
    }

    /// Read `count` consecutive values in one transfer.
    fn read_array<V: RemoteValue>(&self, address: RemoteAddress, count: usize) -> Result<Vec<V>> {
        let bytes = self.read_bytes(address, count.saturating_mul(V::SIZE))?;
        Ok(bytes.chunks_exact(V::SIZE).map(V::decode).collect())
    }

    fn read_u8(&self, address: RemoteAddress) -> Result<u8> {
        self.read_value(address)
    }

    fn read_u32(&self, address: RemoteAddress) -> Result<u32> {
        self.read_value(address)
    }

    fn read_i32(&self, address: RemoteAddress) -> Result<i32> {
        self.read_value(address)
    }

    fn read_u64(&self, address: RemoteAddress) -> Result<u64> {
        self.read_value(address)
    }

    fn read_f32(&self, address: RemoteAddress) -> Result<f32> {
        self.read_value(address)
    }

    /// Read a 64-bit pointer stored at `address`.
    fn read_ptr(&self, address: RemoteAddress) -> Result<RemoteAddress> {
        self.read_value(address)
    }

    /// Read the counted UTF-16 string whose header sits at `address`.
    ///
    /// The header is bounds-checked before any character data is fetched;
    /// units after the first NUL are ignored.
    fn read_fstring(&self, address: RemoteAddress) -> Result<String> {
        let header: FStringHeader = self.read_value(address)?;
        if !header.is_plausible() {
            return Err(Error::ImplausibleString {
                address: address.get(),
                reason: "header out of bounds",
            });
        }

        let units: Vec<u16> = self.read_array(header.data, header.count as usize)?;
        let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
        let text = String::from_utf16(&units[..end]).map_err(|_| Error::ImplausibleString {
            address: address.get(),
            reason: "invalid UTF-16",
        })?;
        if text.is_empty() {
            return Err(Error::ImplausibleString {
                address: address.get(),
                reason: "empty",
            });
        }
        Ok(text)
    }
}

/// Writes into the target's address space. Same guards as reads.
pub trait WriteMemory {
    fn write_bytes(&self, address: RemoteAddress, data: &[u8]) -> Result<()>;

    fn write_value<V: RemoteValue>(&self, address: RemoteAddress, value: &V) -> Result<()> {
        let mut raw = [0u8; MAX_VALUE_SIZE];
        let buf = &mut raw[..V::SIZE];
        value.encode(buf);
        self.write_bytes(address, buf)
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn read_into(&self, address: RemoteAddress, buf: &mut [u8]) -> Result<()> {
        (**self).read_into(address, buf)
    }
}

/// Guarded, typed access on top of a [`Transport`].
pub struct MemoryReader<T: Transport> {
    transport: T,
}

impl<T: Transport> MemoryReader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check that the module base can be read at all.
    pub fn probe(&self, base: RemoteAddress) -> Result<()> {
        self.read_u64(base)
            .map(|_| ())
            .map_err(|_| Error::ModuleBaseUnreadable(base.get()))
    }

    fn check_range(address: RemoteAddress, len: usize) -> Result<()> {
        if address.is_null() {
            return Err(Error::InvalidAddress);
        }
        if len == 0 {
            return Err(Error::EmptyRead(address.get()));
        }
        Ok(())
    }
}

impl<T: Transport> ReadMemory for MemoryReader<T> {
    fn read_into(&self, address: RemoteAddress, buf: &mut [u8]) -> Result<()> {
        Self::check_range(address, buf.len())?;

        if address.get().checked_add(buf.len() as u64).is_none() {
            return Err(Error::MemoryReadFailed {
                address: address.get(),
                message: "range wraps the address space".to_string(),
            });
        }

        match self.transport.copy_from(address.get(), buf) {
            Ok(n) if n == buf.len() => Ok(()),
            Ok(n) => Err(Error::MemoryReadFailed {
                address: address.get(),
                message: format!("short transfer: {} of {} bytes", n, buf.len()),
            }),
            Err(e) => Err(Error::MemoryReadFailed {
                address: address.get(),
                message: e.to_string(),
            }),
        }
    }
}

impl<T: Transport> WriteMemory for MemoryReader<T> {
    fn write_bytes(&self, address: RemoteAddress, data: &[u8]) -> Result<()> {
        Self::check_range(address, data.len())?;

        match self.transport.copy_to(address.get(), data) {
            Ok(n) if n == data.len() => Ok(()),
            Ok(n) => Err(Error::MemoryWriteFailed {
                address: address.get(),
                message: format!("short transfer: {} of {} bytes", n, data.len()),
            }),
            Err(e) => Err(Error::MemoryWriteFailed {
                address: address.get(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Transform, Vec3};
    use crate::memory::MockMemoryBuilder;

    fn addr(raw: u64) -> RemoteAddress {
        RemoteAddress::new(raw)
    }

    #[test]
    fn test_typed_reads_match_supplied_bytes() {
        let reader = MockMemoryBuilder::new()
            .with_u64(0x1000, 0x0123_4567_89AB_CDEF)
            .with_i32(0x2000, -7)
            .with_f32(0x3000, 1.5)
            .with_bytes(0x4000, &[0xFF])
            .build_reader();

        assert_eq!(reader.read_u64(addr(0x1000)).unwrap(), 0x0123_4567_89AB_CDEF);
        assert_eq!(reader.read_ptr(addr(0x1000)).unwrap().get(), 0x0123_4567_89AB_CDEF);
        assert_eq!(reader.read_i32(addr(0x2000)).unwrap(), -7);
        assert_eq!(reader.read_u32(addr(0x2000)).unwrap(), (-7i32) as u32);
        assert_eq!(reader.read_f32(addr(0x3000)).unwrap().to_bits(), 1.5f32.to_bits());
        assert_eq!(reader.read_u8(addr(0x4000)).unwrap(), 0xFF);
    }

    #[test]
    fn test_struct_reads() {
        let t = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let reader = MockMemoryBuilder::new()
            .with_vec3(0x100, Vec3::new(-1.0, 0.5, 9.0))
            .with_transform(0x200, t)
            .build_reader();

        assert_eq!(reader.read_value::<Vec3>(addr(0x100)).unwrap(), Vec3::new(-1.0, 0.5, 9.0));
        assert_eq!(reader.read_value::<Transform>(addr(0x200)).unwrap(), t);
    }

    #[test]
    fn test_degenerate_requests_never_reach_transport() {
        let reader = MockMemoryBuilder::new().with_u64(0x1000, 1).build_reader();

        assert!(matches!(reader.read_u64(RemoteAddress::NULL), Err(Error::InvalidAddress)));
        assert!(matches!(reader.read_bytes(addr(0x1000), 0), Err(Error::EmptyRead(0x1000))));
        assert!(matches!(reader.write_bytes(RemoteAddress::NULL, &[1]), Err(Error::InvalidAddress)));
        assert!(matches!(reader.write_bytes(addr(0x1000), &[]), Err(Error::EmptyRead(_))));

        assert_eq!(reader.transport().read_calls(), 0);
        assert_eq!(reader.transport().write_calls(), 0);
    }

    #[test]
    fn test_short_transfer_is_total_failure() {
        // Only 4 of the 8 requested bytes are mapped.
        let reader = MockMemoryBuilder::new().with_bytes(0x1000, &[1, 2, 3, 4]).build_reader();

        let err = reader.read_u64(addr(0x1000)).unwrap_err();
        assert!(matches!(err, Error::MemoryReadFailed { address: 0x1000, .. }));
        assert!(err.is_transport());
        assert_eq!(reader.transport().read_calls(), 1);
    }

    #[test]
    fn test_unmapped_read_fails() {
        let reader = MockMemoryBuilder::new().build_reader();
        assert!(reader.read_u32(addr(0x5000)).is_err());
    }

    #[test]
    fn test_wrapping_range_rejected() {
        let reader = MockMemoryBuilder::new().build_reader();
        assert!(reader.read_u64(addr(u64::MAX - 2)).is_err());
        assert_eq!(reader.transport().read_calls(), 0);
    }

    #[test]
    fn test_read_array() {
        let reader = MockMemoryBuilder::new()
            .with_u64(0x1000, 0xA)
            .with_u64(0x1008, 0)
            .with_u64(0x1010, 0xC)
            .build_reader();

        let ptrs: Vec<RemoteAddress> = reader.read_array(addr(0x1000), 3).unwrap();
        assert_eq!(ptrs, vec![addr(0xA), RemoteAddress::NULL, addr(0xC)]);
        assert_eq!(reader.transport().read_calls(), 1);
    }

    #[test]
    fn test_write_then_read() {
        let reader = MockMemoryBuilder::new().with_u64(0x1000, 0).build_reader();
        reader.write_value(addr(0x1000), &42u64).unwrap();
        assert_eq!(reader.read_u64(addr(0x1000)).unwrap(), 42);
        assert_eq!(reader.transport().write_calls(), 1);
    }

    fn with_fstring(builder: MockMemoryBuilder, at: u64, data: u64, units: &[u16]) -> MockMemoryBuilder {
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        builder
            .with_value(
                at,
                FStringHeader {
                    data: addr(data),
                    count: units.len() as i32,
                    capacity: units.len() as i32 + 4,
                },
            )
            .with_bytes(data, &bytes)
    }

    #[test]
    fn test_read_fstring() {
        let mut units: Vec<u16> = "Mörk-7".encode_utf16().collect();
        units.push(0);
        let reader = with_fstring(MockMemoryBuilder::new(), 0x1000, 0x8000, &units).build_reader();

        assert_eq!(reader.read_fstring(addr(0x1000)).unwrap(), "Mörk-7");
        assert_eq!(reader.transport().reads_at(0x8000), 1);
    }

    #[test]
    fn test_read_fstring_rejects_bad_headers_without_reading_data() {
        let reader = MockMemoryBuilder::new()
            // count too large
            .with_value(
                0x1000,
                FStringHeader { data: addr(0x8000), count: 900, capacity: 1000 },
            )
            // null data
            .with_value(0x2000, FStringHeader { data: RemoteAddress::NULL, count: 4, capacity: 8 })
            // capacity below count
            .with_value(0x3000, FStringHeader { data: addr(0x8000), count: 8, capacity: 4 })
            .with_zeroed(0x8000, 0x800)
            .build_reader();

        for at in [0x1000, 0x2000, 0x3000] {
            assert!(matches!(
                reader.read_fstring(addr(at)),
                Err(Error::ImplausibleString { .. })
            ));
        }
        assert_eq!(reader.transport().reads_at(0x8000), 0);
    }

    #[test]
    fn test_read_fstring_rejects_unpaired_surrogate_and_empty() {
        let reader = with_fstring(MockMemoryBuilder::new(), 0x1000, 0x8000, &[0x41, 0xD800])
            .build_reader();
        let err = reader.read_fstring(addr(0x1000)).unwrap_err();
        assert!(matches!(err, Error::ImplausibleString { reason: "invalid UTF-16", .. }));
        assert!(!err.is_transport());

        let reader = with_fstring(MockMemoryBuilder::new(), 0x1000, 0x8000, &[0, 0x41]).build_reader();
        assert!(reader.read_fstring(addr(0x1000)).is_err());
    }

    #[test]
    fn test_probe_maps_to_fatal_error() {
        let reader = MockMemoryBuilder::new().with_u64(0x7000, 0x464C457F).build_reader();
        assert!(reader.probe(addr(0x7000)).is_ok());
        assert!(matches!(
            reader.probe(addr(0x9000)),
            Err(Error::ModuleBaseUnreadable(0x9000))
        ));
    }
}
