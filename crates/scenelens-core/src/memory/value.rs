//! Fixed-size values decoded from little-endian remote bytes.

use crate::math::{Quat, Rotator, Transform, Vec3};

use super::RemoteAddress;

/// Largest `RemoteValue::SIZE`; reads of single values use a stack buffer
/// of this size.
pub(crate) const MAX_VALUE_SIZE: usize = 64;

/// A plain value with a fixed remote byte representation.
///
/// Decoding never validates content: enums, counts and pointers read
/// through this trait may be anything.
pub trait RemoteValue: Copy {
    const SIZE: usize;

    /// Decode from `bytes`, which is exactly `Self::SIZE` long.
    fn decode(bytes: &[u8]) -> Self;

    /// Encode into `out`, which is exactly `Self::SIZE` long.
    fn encode(&self, out: &mut [u8]);
}

macro_rules! impl_remote_value_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RemoteValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }

                fn encode(&self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_remote_value_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl RemoteValue for RemoteAddress {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        RemoteAddress::new(u64::decode(bytes))
    }

    fn encode(&self, out: &mut [u8]) {
        self.get().encode(out)
    }
}

fn f32_at(bytes: &[u8], at: usize) -> f32 {
    f32::decode(&bytes[at..at + 4])
}

impl RemoteValue for Vec3 {
    const SIZE: usize = 12;

    fn decode(bytes: &[u8]) -> Self {
        Vec3::new(f32_at(bytes, 0), f32_at(bytes, 4), f32_at(bytes, 8))
    }

    fn encode(&self, out: &mut [u8]) {
        self.x.encode(&mut out[0..4]);
        self.y.encode(&mut out[4..8]);
        self.z.encode(&mut out[8..12]);
    }
}

impl RemoteValue for Rotator {
    const SIZE: usize = 12;

    fn decode(bytes: &[u8]) -> Self {
        Rotator::new(f32_at(bytes, 0), f32_at(bytes, 4), f32_at(bytes, 8))
    }

    fn encode(&self, out: &mut [u8]) {
        self.pitch.encode(&mut out[0..4]);
        self.yaw.encode(&mut out[4..8]);
        self.roll.encode(&mut out[8..12]);
    }
}

impl RemoteValue for Quat {
    const SIZE: usize = 16;

    fn decode(bytes: &[u8]) -> Self {
        Quat::new(
            f32_at(bytes, 0),
            f32_at(bytes, 4),
            f32_at(bytes, 8),
            f32_at(bytes, 12),
        )
    }

    fn encode(&self, out: &mut [u8]) {
        self.x.encode(&mut out[0..4]);
        self.y.encode(&mut out[4..8]);
        self.z.encode(&mut out[8..12]);
        self.w.encode(&mut out[12..16]);
    }
}

// quat @0, translation @16 (+4 pad), scale @32 (+4 pad)
impl RemoteValue for Transform {
    const SIZE: usize = Transform::REMOTE_SIZE;

    fn decode(bytes: &[u8]) -> Self {
        Transform {
            rotation: Quat::decode(&bytes[0..16]),
            translation: Vec3::decode(&bytes[16..28]),
            scale: Vec3::decode(&bytes[32..44]),
        }
    }

    fn encode(&self, out: &mut [u8]) {
        out[..Self::SIZE].fill(0);
        self.rotation.encode(&mut out[0..16]);
        self.translation.encode(&mut out[16..28]);
        self.scale.encode(&mut out[32..44]);
    }
}

/// Header of a counted UTF-16 string: `{ data @0, count @8, capacity @12 }`.
///
/// `count` is in UTF-16 units and usually includes the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FStringHeader {
    pub data: RemoteAddress,
    pub count: i32,
    pub capacity: i32,
}

impl FStringHeader {
    /// Counts must stay below this.
    pub const MAX_COUNT: i32 = 64;

    /// Capacities must stay below this.
    pub const MAX_CAPACITY: i32 = 128;

    /// Whether the header describes a short, allocated string.
    pub fn is_plausible(&self) -> bool {
        !self.data.is_null()
            && self.count > 0
            && self.count < Self::MAX_COUNT
            && self.capacity >= self.count
            && self.capacity < Self::MAX_CAPACITY
    }
}

impl RemoteValue for FStringHeader {
    const SIZE: usize = 16;

    fn decode(bytes: &[u8]) -> Self {
        FStringHeader {
            data: RemoteAddress::decode(&bytes[0..8]),
            count: i32::decode(&bytes[8..12]),
            capacity: i32::decode(&bytes[12..16]),
        }
    }

    fn encode(&self, out: &mut [u8]) {
        self.data.encode(&mut out[0..8]);
        self.count.encode(&mut out[8..12]);
        self.capacity.encode(&mut out[12..16]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fstring_header_bounds() {
        let header = |data, count, capacity| FStringHeader {
            data: RemoteAddress::new(data),
            count,
            capacity,
        };
        assert!(header(0x1000, 5, 8).is_plausible());
        assert!(header(0x1000, 63, 127).is_plausible());

        assert!(!header(0, 5, 8).is_plausible());
        assert!(!header(0x1000, 0, 8).is_plausible());
        assert!(!header(0x1000, -3, 8).is_plausible());
        assert!(!header(0x1000, 64, 100).is_plausible());
        assert!(!header(0x1000, 10, 9).is_plausible());
        assert!(!header(0x1000, 10, 128).is_plausible());
    }

    #[test]
    fn test_primitive_bit_patterns() {
        let bytes = [0xEF, 0xBE, 0xAD, 0xDE, 0x78, 0x56, 0x34, 0x12];
        assert_eq!(u32::decode(&bytes[..4]), 0xDEADBEEF);
        assert_eq!(u64::decode(&bytes), 0x12345678_DEADBEEF);
        assert_eq!(i32::decode(&[0xFF, 0xFF, 0xFF, 0xFF]), -1);

        // NaN payloads survive untouched
        let nan_bits: u32 = 0x7FC0_1234;
        let f = f32::decode(&nan_bits.to_le_bytes());
        assert_eq!(f.to_bits(), nan_bits);
    }

    #[test]
    fn test_transform_layout_skips_padding() {
        let mut bytes = [0u8; 48];
        for (i, v) in [0.0f32, 0.0, 0.0, 1.0, 5.0, 6.0, 7.0].iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        // pad word at 28 holds junk
        bytes[28..32].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        for (i, v) in [2.0f32, 2.0, 2.0].iter().enumerate() {
            bytes[32 + i * 4..36 + i * 4].copy_from_slice(&v.to_le_bytes());
        }

        let t = Transform::decode(&bytes);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.translation, Vec3::new(5.0, 6.0, 7.0));
        assert_eq!(t.scale, Vec3::new(2.0, 2.0, 2.0));

        let mut out = [0xAAu8; 48];
        t.encode(&mut out);
        assert_eq!(Transform::decode(&out), t);
        assert_eq!(&out[28..32], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_sizes_fit_stack_buffer() {
        assert!(Transform::SIZE <= MAX_VALUE_SIZE);
        assert!(f64::SIZE <= MAX_VALUE_SIZE);
    }
}
