//! # scenelens-core
//!
//! Live scene reconstruction from outside a running process.
//!
//! This crate provides:
//! - Guarded cross-process memory reads (`process_vm_readv`)
//! - Layout tables describing where the target keeps its data
//! - A cached resolver for the target's paged class-name table
//! - Entity-list location with pluggable pointer decoding
//! - A per-cycle snapshot builder and a lock-free double buffer
//! - World-to-screen projection
//!
//! ## Feature Flags
//!
//! - `debug-tools`: Enables inspection helpers (pointer-chain reports, hexdumps).
//!   This feature is intended for CLI tools and layout bring-up, not production use.

pub mod acquisition;
pub mod buffer;
#[cfg(feature = "debug-tools")]
pub mod debug;
pub mod entity;
pub mod error;
pub mod layout;
pub mod math;
pub mod memory;
pub mod names;
pub mod snapshot;

pub use acquisition::{
    Acquisition, AcquisitionConfig, AcquisitionConfigBuilder, FrameGovernor, RateCommand,
    RateControl, RunSummary, ShutdownSignal,
};
pub use buffer::{SnapshotBuffer, SnapshotGuard, WriteSlot};
pub use entity::{
    ClassFilter, DecodeScheme, EntityListHandle, EntityListResolver, ListSource,
    ObfuscationDescriptor,
};
pub use error::{Error, Result};
pub use layout::{DecoderParams, LayoutField, LayoutTable};
pub use math::{CameraPose, Projection, Quat, RotationMatrix, Rotator, Transform, Vec3, project};
pub use memory::{
    MemoryReader, ProcessHandle, ReadMemory, RemoteAddress, RemoteValue, Transport,
    WriteMemory,
};
pub use names::{NameResolver, NameState, NameStats};
pub use snapshot::{CycleOutcome, CycleStats, EntityRecord, EntitySnapshot, SnapshotBuilder};

// Debug utilities (requires debug-tools feature)
#[cfg(feature = "debug-tools")]
pub use debug::{ChainHop, ChainReport, hexdump_lines};
