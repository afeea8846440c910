use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, FromRepr, IntoStaticStr};
use tracing::{debug, trace};

use crate::layout::{DecoderParams, LayoutTable};
use crate::memory::{ReadMemory, RemoteAddress, RemoteValue};

/// Pointer transform selected by the descriptor slot that is populated.
///
/// Discriminants are descriptor slot indices.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    EnumIter,
    IntoStaticStr,
    Display,
)]
#[repr(u8)]
#[strum(serialize_all = "snake_case")]
pub enum DecodeScheme {
    Xor = 0,
    RotateXor = 1,
    HalfSwapXor = 2,
    ByteSwapRotate = 3,
}

impl DecodeScheme {
    pub fn from_slot(slot: usize) -> Option<Self> {
        u8::try_from(slot).ok().and_then(Self::from_repr)
    }

    pub fn slot(self) -> usize {
        self as usize
    }

    /// Undo the obfuscation of `word` with this build's parameters.
    pub fn decode(self, word: u64, params: &DecoderParams) -> u64 {
        match self {
            Self::Xor => word ^ params.xor_key,
            Self::RotateXor => (word ^ params.rotate_xor_key).rotate_right(params.rotate_xor_shift),
            Self::HalfSwapXor => word.rotate_left(32) ^ params.half_swap_key,
            Self::ByteSwapRotate => word.swap_bytes().rotate_left(params.byte_swap_shift),
        }
    }
}

/// Which branch produced the entity list for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "scheme", rename_all = "snake_case")]
pub enum ListSource {
    /// No list this cycle.
    #[default]
    None,
    Plain,
    Resolved,
    Decoded(DecodeScheme),
}

impl ListSource {
    pub fn is_none(&self) -> bool {
        matches!(self, ListSource::None)
    }
}

/// Four candidate obfuscated list pointers, read as one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObfuscationDescriptor {
    pub words: [u64; 4],
}

impl ObfuscationDescriptor {
    /// The first populated slot, with its scheme.
    pub fn active(&self) -> Option<(DecodeScheme, u64)> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .and_then(|(slot, word)| DecodeScheme::from_slot(slot).map(|scheme| (scheme, *word)))
    }
}

impl RemoteValue for ObfuscationDescriptor {
    const SIZE: usize = 32;

    fn decode(bytes: &[u8]) -> Self {
        let mut words = [0u64; 4];
        for (i, word) in words.iter_mut().enumerate() {
            *word = u64::decode(&bytes[i * 8..i * 8 + 8]);
        }
        Self { words }
    }

    fn encode(&self, out: &mut [u8]) {
        for (i, word) in self.words.iter().enumerate() {
            word.encode(&mut out[i * 8..i * 8 + 8]);
        }
    }
}

/// Where this cycle's entity pointer array and its count live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityListHandle {
    pub data: RemoteAddress,
    pub count_addr: RemoteAddress,
    pub source: ListSource,
}

/// Locates the entity list inside a level. Stateless; rebuilt per attachment.
#[derive(Debug, Clone, Copy)]
pub struct EntityListResolver {
    actors_plain: u64,
    actors_encrypted: u64,
    actors_descriptor: u64,
    actors_count: u64,
    decoders: DecoderParams,
}

impl EntityListResolver {
    pub fn new(layout: &LayoutTable) -> Self {
        Self {
            actors_plain: layout.actors_plain,
            actors_encrypted: layout.actors_encrypted,
            actors_descriptor: layout.actors_descriptor,
            actors_count: layout.actors_count,
            decoders: layout.decoders,
        }
    }

    /// Resolve the list for `level`. At most one branch produces a handle.
    pub fn resolve<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        level: RemoteAddress,
    ) -> Option<EntityListHandle> {
        if level.is_null() {
            return None;
        }

        if let Some(handle) = self.plain(reader, level) {
            return Some(handle);
        }
        if self.actors_encrypted == 0 {
            trace!("no plain list and no encrypted header configured");
            return None;
        }

        let header = level.offset(self.actors_encrypted);
        let count_addr = header.offset(self.actors_count);

        if let Some(data) = reader.read_ptr(header).ok().and_then(RemoteAddress::non_null) {
            return Some(EntityListHandle {
                data,
                count_addr,
                source: ListSource::Resolved,
            });
        }

        let descriptor: ObfuscationDescriptor = reader
            .read_value(header.offset(self.actors_descriptor))
            .ok()?;
        let (scheme, word) = descriptor.active()?;
        let decoded = scheme.decode(word, &self.decoders);
        if decoded == 0 {
            debug!("{} decode of list descriptor produced null", scheme);
            return None;
        }

        Some(EntityListHandle {
            data: RemoteAddress::new(decoded),
            count_addr,
            source: ListSource::Decoded(scheme),
        })
    }

    fn plain<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        level: RemoteAddress,
    ) -> Option<EntityListHandle> {
        if self.actors_plain == 0 {
            return None;
        }
        let header = level.offset(self.actors_plain);
        let data = reader.read_ptr(header).ok()?.non_null()?;
        Some(EntityListHandle {
            data,
            count_addr: header.offset(self.actors_count),
            source: ListSource::Plain,
        })
    }
}
