//! Two-slot snapshot exchange between the acquisition thread and a consumer.
//!
//! Each slot carries an occupancy word: the high bit marks the producer,
//! the low bits count readers. The producer claims the unpublished slot only
//! when no reader holds it, and skips the publish otherwise. A reader
//! registers on the published slot and retries if the producer got there
//! first. Neither side ever waits on the other.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::snapshot::EntitySnapshot;

const WRITER: u32 = 1 << 31;

struct Slot {
    occupancy: AtomicU32,
    snapshot: UnsafeCell<EntitySnapshot>,
}

impl Slot {
    fn new() -> Self {
        Self {
            occupancy: AtomicU32::new(0),
            snapshot: UnsafeCell::new(EntitySnapshot::new()),
        }
    }
}

/// Lock-free double buffer of [`EntitySnapshot`]s.
///
/// Intended for one producer and any number of readers.
pub struct SnapshotBuffer {
    slots: [Slot; 2],
    write_index: AtomicUsize,
    ready_index: AtomicUsize,
    published: AtomicU64,
    skipped: AtomicU64,
}

// SAFETY: a slot's contents are only touched mutably while its WRITER bit
// is held, which excludes readers, and only shared while its reader count
// is non-zero, which excludes the writer.
unsafe impl Sync for SnapshotBuffer {}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuffer {
    /// Both slots start as empty snapshots.
    pub fn new() -> Self {
        Self {
            slots: [Slot::new(), Slot::new()],
            write_index: AtomicUsize::new(1),
            ready_index: AtomicUsize::new(0),
            published: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Claim the back slot for writing.
    ///
    /// `None` when a reader still holds it; the caller should drop this
    /// cycle's publish.
    pub fn begin_write(&self) -> Option<WriteSlot<'_>> {
        let index = self.write_index.load(Ordering::Acquire);
        let claimed = self.slots[index]
            .occupancy
            .compare_exchange(0, WRITER, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();

        if !claimed {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        Some(WriteSlot {
            buffer: self,
            index,
        })
    }

    /// The most recently published snapshot.
    ///
    /// Before the first publish this is an empty snapshot with `cycle == 0`.
    pub fn read(&self) -> SnapshotGuard<'_> {
        loop {
            let index = self.ready_index.load(Ordering::Acquire);
            let occupancy = &self.slots[index].occupancy;

            let mut current = occupancy.load(Ordering::Acquire);
            while current & WRITER == 0 {
                match occupancy.compare_exchange_weak(
                    current,
                    current + 1,
                    Ordering::Acquire,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        return SnapshotGuard {
                            buffer: self,
                            index,
                        };
                    }
                    Err(actual) => current = actual,
                }
            }
            // The producer reclaimed this slot, so the other one is now published.
            std::hint::spin_loop();
        }
    }

    /// Number of completed publishes.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Number of publishes skipped because the back slot was busy.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn publish(&self, index: usize) {
        self.slots[index].occupancy.fetch_and(!WRITER, Ordering::Release);
        self.ready_index.store(index, Ordering::Release);
        self.write_index.store(1 - index, Ordering::Release);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    fn abandon(&self, index: usize) {
        self.slots[index].occupancy.fetch_and(!WRITER, Ordering::Release);
    }
}

/// Exclusive access to the back slot. Publish with [`WriteSlot::publish`];
/// dropping it instead discards the write.
pub struct WriteSlot<'a> {
    buffer: &'a SnapshotBuffer,
    index: usize,
}

impl WriteSlot<'_> {
    pub fn publish(self) {
        let this = std::mem::ManuallyDrop::new(self);
        this.buffer.publish(this.index);
    }
}

impl Deref for WriteSlot<'_> {
    type Target = EntitySnapshot;

    fn deref(&self) -> &EntitySnapshot {
        // SAFETY: WRITER bit held for this slot.
        unsafe { &*self.buffer.slots[self.index].snapshot.get() }
    }
}

impl DerefMut for WriteSlot<'_> {
    fn deref_mut(&mut self) -> &mut EntitySnapshot {
        // SAFETY: WRITER bit held for this slot.
        unsafe { &mut *self.buffer.slots[self.index].snapshot.get() }
    }
}

impl Drop for WriteSlot<'_> {
    fn drop(&mut self) {
        self.buffer.abandon(self.index);
    }
}

/// Shared access to a published snapshot. The producer cannot reuse the
/// slot until every guard on it is dropped.
pub struct SnapshotGuard<'a> {
    buffer: &'a SnapshotBuffer,
    index: usize,
}

impl Deref for SnapshotGuard<'_> {
    type Target = EntitySnapshot;

    fn deref(&self) -> &EntitySnapshot {
        // SAFETY: reader count held for this slot, so no WRITER.
        unsafe { &*self.buffer.slots[self.index].snapshot.get() }
    }
}

impl Drop for SnapshotGuard<'_> {
    fn drop(&mut self) {
        self.buffer.slots[self.index]
            .occupancy
            .fetch_sub(1, Ordering::Release);
    }
}
