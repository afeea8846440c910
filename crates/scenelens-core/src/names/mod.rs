//! Class-id to class-name resolution through the target's paged name table.
//!
//! Remote reads dominate the cost of a cycle, so both levels of the table
//! are cached for the life of the attachment: page bases per page, and the
//! final outcome per class id. Nothing is ever evicted.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::layout::{LayoutTable, names};
use crate::memory::{ReadMemory, RemoteAddress};

/// Cached outcome for one class id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameState {
    Resolved(Arc<str>),
    /// Page missing, entry missing, unreadable or non-printable. Never retried.
    Sentinel,
}

impl NameState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, NameState::Resolved(_))
    }
}

/// Cache occupancy, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameStats {
    pub resolved: usize,
    pub sentinels: usize,
    pub pages: usize,
    pub missing_pages: usize,
}

/// Single-writer name cache owned by the acquisition thread.
#[derive(Debug)]
pub struct NameResolver {
    /// Remote address of the page-pointer array.
    table: RemoteAddress,
    entry_header: u64,
    pages: HashMap<u32, RemoteAddress>,
    names: HashMap<i32, NameState>,
    sentinel: Arc<str>,
}

impl NameResolver {
    pub fn new(table: RemoteAddress, entry_header: u64) -> Self {
        Self {
            table,
            entry_header,
            pages: HashMap::new(),
            names: HashMap::new(),
            sentinel: Arc::from(names::SENTINEL),
        }
    }

    /// Resolver for the name table located at `module_base + layout.names`.
    pub fn from_layout(module_base: RemoteAddress, layout: &LayoutTable) -> Self {
        Self::new(module_base.offset(layout.names), layout.name_entry_header)
    }

    /// Read the class id stored at `actor + class_id_offset` and resolve it.
    ///
    /// `None` only when the id itself cannot be read.
    pub fn class_name_of<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        actor: RemoteAddress,
        class_id_offset: u64,
    ) -> Option<(i32, Arc<str>)> {
        let id = reader.read_i32(actor.offset(class_id_offset)).ok()?;
        Some((id, self.resolve(reader, id)))
    }

    /// Resolve `id`, answering from cache when possible.
    ///
    /// Unresolvable ids yield the sentinel; the failure is cached too.
    pub fn resolve<R: ReadMemory + ?Sized>(&mut self, reader: &R, id: i32) -> Arc<str> {
        if let Some(state) = self.names.get(&id) {
            return self.state_name(state);
        }

        let state = self.lookup(reader, id);
        match &state {
            NameState::Resolved(name) => debug!("class id {} -> {}", id, name),
            NameState::Sentinel => trace!("class id {} unresolved", id),
        }
        let name = self.state_name(&state);
        self.names.insert(id, state);
        name
    }

    /// Cached state for `id`, without any remote read.
    pub fn cached(&self, id: i32) -> Option<&NameState> {
        self.names.get(&id)
    }

    pub fn stats(&self) -> NameStats {
        let resolved = self.names.values().filter(|s| s.is_resolved()).count();
        let missing_pages = self.pages.values().filter(|p| p.is_null()).count();
        NameStats {
            resolved,
            sentinels: self.names.len() - resolved,
            pages: self.pages.len(),
            missing_pages,
        }
    }

    fn state_name(&self, state: &NameState) -> Arc<str> {
        match state {
            NameState::Resolved(name) => Arc::clone(name),
            NameState::Sentinel => Arc::clone(&self.sentinel),
        }
    }

    fn lookup<R: ReadMemory + ?Sized>(&mut self, reader: &R, id: i32) -> NameState {
        let Ok(id) = u32::try_from(id) else {
            return NameState::Sentinel;
        };

        let page = id / names::PAGE_SIZE;
        let index = id % names::PAGE_SIZE;
        if page >= names::MAX_PAGES {
            return NameState::Sentinel;
        }

        let Some(page_base) = self.page_base(reader, page).non_null() else {
            return NameState::Sentinel;
        };

        let slot = page_base.element(index as u64, names::POINTER_SIZE);
        let entry = match reader.read_ptr(slot) {
            Ok(entry) if !entry.is_null() => entry,
            _ => return NameState::Sentinel,
        };

        match read_name(reader, entry.offset(self.entry_header)) {
            Some(name) => NameState::Resolved(Arc::from(name)),
            None => NameState::Sentinel,
        }
    }

    /// Page base for `page`, fetching it on first use. Zero is cached as well.
    fn page_base<R: ReadMemory + ?Sized>(&mut self, reader: &R, page: u32) -> RemoteAddress {
        if let Some(base) = self.pages.get(&page) {
            return *base;
        }

        let slot = self.table.element(page as u64, names::POINTER_SIZE);
        let base = reader.read_ptr(slot).unwrap_or(RemoteAddress::NULL);
        if base.is_null() {
            debug!("name page {} missing", page);
        }
        self.pages.insert(page, base);
        base
    }
}

/// Target page granularity. Chunks never straddle a page so an unmapped
/// neighbour cannot sink a name that ends before it.
const TARGET_PAGE: u64 = 0x1000;

/// Read a NUL-terminated name at `address`, at most `MAX_NAME_LEN` bytes.
///
/// Returns `None` for unreadable, unterminated, empty or non-printable data.
fn read_name<R: ReadMemory + ?Sized>(reader: &R, address: RemoteAddress) -> Option<String> {
    let mut buf = [0u8; names::MAX_NAME_LEN];
    let mut filled = 0;

    while filled < names::MAX_NAME_LEN {
        let at = address.offset(filled as u64).get();
        let to_page = (TARGET_PAGE - at % TARGET_PAGE) as usize;
        let chunk = names::NAME_CHUNK.min(names::MAX_NAME_LEN - filled).min(to_page);
        let window = &mut buf[filled..filled + chunk];
        reader.read_into(address.offset(filled as u64), window).ok()?;

        if let Some(end) = memchr::memchr(0, window) {
            return validate_name(&buf[..filled + end]);
        }
        filled += chunk;
    }

    None
}

fn validate_name(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || !bytes.iter().all(|b| (0x20..0x7F).contains(b)) {
        return None;
    }
    // Printable ASCII is valid UTF-8.
    String::from_utf8(bytes.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MockMemoryBuilder, MockMemoryReader};

    const TABLE: u64 = 0x10_0000;
    const PAGE0: u64 = 0x20_0000;
    const PAGE1: u64 = 0x30_0000;
    const HEADER: u64 = 12;

    fn entry_slot(page_base: u64, index: u64) -> u64 {
        page_base + index * 8
    }

    fn reader_with_names() -> MockMemoryReader {
        MockMemoryBuilder::new()
            .with_u64(TABLE, PAGE0)
            .with_u64(TABLE + 8, PAGE1)
            .with_u64(TABLE + 16, 0)
            // id 0 -> "PlayerPawn"
            .with_u64(entry_slot(PAGE0, 0), 0x40_0000)
            .with_zeroed(0x40_0000 + HEADER, 64)
            .with_cstr(0x40_0000 + HEADER, "PlayerPawn")
            // id 1 -> null entry
            .with_u64(entry_slot(PAGE0, 1), 0)
            // id 2 -> non-printable bytes
            .with_u64(entry_slot(PAGE0, 2), 0x41_0000)
            .with_zeroed(0x41_0000 + HEADER, 64)
            .with_bytes(0x41_0000 + HEADER, &[b'A', 0x07, b'B', 0])
            // id 0x4001 -> "VehicleBase" on page 1
            .with_u64(entry_slot(PAGE1, 1), 0x42_0000)
            .with_zeroed(0x42_0000 + HEADER, 64)
            .with_cstr(0x42_0000 + HEADER, "VehicleBase")
            .build_reader()
    }

    fn resolver() -> NameResolver {
        NameResolver::new(RemoteAddress::new(TABLE), HEADER)
    }

    #[test]
    fn test_id_zero_read_counts() {
        let reader = reader_with_names();
        let mut cache = resolver();

        assert_eq!(&*cache.resolve(&reader, 0), "PlayerPawn");
        assert_eq!(reader.transport().reads_at(TABLE), 1);
        assert_eq!(reader.transport().reads_at(entry_slot(PAGE0, 0)), 1);

        let reads = reader.transport().read_calls();
        assert_eq!(&*cache.resolve(&reader, 0), "PlayerPawn");
        assert_eq!(reader.transport().read_calls(), reads);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let reader = reader_with_names();
        let mut cache = resolver();

        let first = cache.resolve(&reader, 0x4001);
        let second = cache.resolve(&reader, 0x4001);
        assert_eq!(&*first, "VehicleBase");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.transport().reads_at(TABLE + 8), 1);
    }

    #[test]
    fn test_page_cache_shared_between_ids() {
        let reader = reader_with_names();
        let mut cache = resolver();

        cache.resolve(&reader, 0);
        cache.resolve(&reader, 1);
        cache.resolve(&reader, 2);
        assert_eq!(reader.transport().reads_at(TABLE), 1);
        assert_eq!(cache.stats().pages, 1);
    }

    #[test]
    fn test_null_entry_is_cached_sentinel() {
        let reader = reader_with_names();
        let mut cache = resolver();

        assert_eq!(&*cache.resolve(&reader, 1), names::SENTINEL);
        assert_eq!(cache.cached(1), Some(&NameState::Sentinel));

        let reads = reader.transport().read_calls();
        cache.resolve(&reader, 1);
        assert_eq!(reader.transport().read_calls(), reads);
    }

    #[test]
    fn test_non_printable_name_is_sentinel() {
        let reader = reader_with_names();
        let mut cache = resolver();
        assert_eq!(&*cache.resolve(&reader, 2), names::SENTINEL);
    }

    #[test]
    fn test_missing_page_cached() {
        let reader = reader_with_names();
        let mut cache = resolver();

        // page 2 pointer is zero
        assert_eq!(&*cache.resolve(&reader, 2 * 0x4000 + 5), names::SENTINEL);
        assert_eq!(&*cache.resolve(&reader, 2 * 0x4000 + 6), names::SENTINEL);
        assert_eq!(reader.transport().reads_at(TABLE + 16), 1);

        let stats = cache.stats();
        assert_eq!(stats.missing_pages, 1);
        assert_eq!(stats.sentinels, 2);
    }

    #[test]
    fn test_unreadable_page_slot_cached_as_missing() {
        let reader = reader_with_names();
        let mut cache = resolver();

        // page 5 slot is not mapped at all
        cache.resolve(&reader, 5 * 0x4000);
        cache.resolve(&reader, 5 * 0x4000 + 1);
        assert_eq!(reader.transport().reads_at(TABLE + 40), 1);
    }

    #[test]
    fn test_out_of_range_ids_never_read() {
        let reader = reader_with_names();
        let mut cache = resolver();

        assert_eq!(&*cache.resolve(&reader, -1), names::SENTINEL);
        assert_eq!(&*cache.resolve(&reader, i32::MAX), names::SENTINEL);
        assert_eq!(reader.transport().read_calls(), 0);
    }

    #[test]
    fn test_unterminated_name_rejected() {
        let long = "A".repeat(names::MAX_NAME_LEN + 10);
        let reader = MockMemoryBuilder::new()
            .with_u64(TABLE, PAGE0)
            .with_u64(PAGE0, 0x40_0000)
            .with_bytes(0x40_0000 + HEADER, long.as_bytes())
            .build_reader();
        let mut cache = resolver();

        assert_eq!(&*cache.resolve(&reader, 0), names::SENTINEL);
    }

    #[test]
    fn test_name_spanning_chunks() {
        let name = "B".repeat(names::NAME_CHUNK + 7);
        let reader = MockMemoryBuilder::new()
            .with_u64(TABLE, PAGE0)
            .with_u64(PAGE0, 0x40_0000)
            .with_cstr(0x40_0000 + HEADER, &name)
            .with_zeroed(0x40_0000 + HEADER + name.len() as u64 + 1, 128)
            .build_reader();
        let mut cache = resolver();

        assert_eq!(&*cache.resolve(&reader, 0), name.as_str());
    }

    #[test]
    fn test_name_ending_at_page_edge() {
        // Only the bytes up to the page end are mapped.
        let start = 0x5000 - 6;
        let reader = MockMemoryBuilder::new()
            .with_u64(TABLE, PAGE0)
            .with_u64(PAGE0, start - HEADER)
            .with_cstr(start, "Crate")
            .build_reader();
        let mut cache = resolver();

        assert_eq!(&*cache.resolve(&reader, 0), "Crate");
    }

    #[test]
    fn test_class_name_of_reads_id_from_actor() {
        let reader = MockMemoryBuilder::new()
            .with_u64(TABLE + 8, PAGE1)
            .with_u64(entry_slot(PAGE1, 1), 0x42_0000)
            .with_cstr(0x42_0000 + HEADER, "VehicleBase")
            .with_zeroed(0x42_0000 + HEADER + 12, 64)
            .with_i32(0x9000 + 0x18, 0x4001)
            .build_reader();
        let mut cache = resolver();

        let (id, name) = cache
            .class_name_of(&reader, RemoteAddress::new(0x9000), 0x18)
            .unwrap();
        assert_eq!(id, 0x4001);
        assert_eq!(&*name, "VehicleBase");

        assert!(cache.class_name_of(&reader, RemoteAddress::new(0xA000), 0x18).is_none());
    }
}
