//! Fixed properties of the target's data structures and of this pipeline.
//!
//! Build-specific offsets live in [`super::LayoutTable`]; these do not
//! change between target builds.

/// Name table (paged lookaside) constants
pub mod names {
    /// Entries per name-table page
    pub const PAGE_SIZE: u32 = 0x4000;

    /// Upper bound on page count (2M names / PAGE_SIZE)
    pub const MAX_PAGES: u32 = 128;

    /// Remote pointer width
    pub const POINTER_SIZE: u64 = 8;

    /// Longest name accepted before the entry is treated as corrupt
    pub const MAX_NAME_LEN: usize = 256;

    /// Bytes fetched per string read while scanning for the terminator
    pub const NAME_CHUNK: usize = 64;

    /// Cached in place of names that could not be resolved
    pub const SENTINEL: &str = "none";
}

/// Structural limits for untrusted remote data
pub mod limits {
    /// Entity counts above this are treated as a corrupt read
    pub const MAX_ENTITY_COUNT: i32 = 1000;

    /// Records kept per snapshot
    pub const SNAPSHOT_CAPACITY: usize = 200;

    /// Bone positions kept per record
    pub const MAX_BONES: usize = 16;

    /// Target units per metre (the target measures in centimetres)
    pub const UNITS_PER_METRE: f32 = 100.0;

    /// Largest POV block read in one go
    pub const MAX_POV_SPAN: usize = 256;
}

/// Timing constants for the acquisition and presentation loops
pub mod timing {
    use std::time::Duration;

    /// Default acquisition rate cap
    pub const DEFAULT_TARGET_FPS: u32 = 60;

    /// Highest accepted rate; larger requests are clamped
    pub const MAX_TARGET_FPS: u32 = 1000;

    /// How often the text presenter logs a summary
    pub const PRESENT_LOG_INTERVAL: Duration = Duration::from_secs(1);

    /// Pause between attempts when the back buffer is still being read
    pub const BUSY_SLOT_BACKOFF: Duration = Duration::from_millis(1);
}
