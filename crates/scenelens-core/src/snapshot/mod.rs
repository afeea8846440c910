//! Per-cycle scene snapshot and the builder that fills it.

mod builder;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::ListSource;
use crate::layout::limits;
use crate::math::{CameraPose, Rotator, Vec3};
use crate::memory::RemoteAddress;

pub use builder::{CycleOutcome, CycleStats, SnapshotBuilder};

/// One included entity as read this cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    pub address: RemoteAddress,
    pub class_id: i32,
    pub class_name: Arc<str>,
    pub position: Vec3,
    pub rotation: Rotator,
    pub health: f32,
    pub team_id: i32,
    /// Display name, when the layout locates one and it reads cleanly
    pub player_name: Option<String>,
    pub is_bot: bool,
    pub is_dead: bool,
    /// Distance to the camera in metres; `None` without a camera this cycle
    pub distance: Option<f32>,
    pub bones: [Vec3; limits::MAX_BONES],
    pub bone_count: usize,
}

impl EntityRecord {
    /// World-space bone positions that were captured.
    pub fn bones(&self) -> &[Vec3] {
        &self.bones[..self.bone_count.min(limits::MAX_BONES)]
    }
}

/// Everything the consumer needs for one frame.
///
/// Allocated once per buffer slot and overwritten in place every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub records: Vec<EntityRecord>,
    pub camera: CameraPose,
    /// Sequence number of the producing cycle; 0 means never written.
    pub cycle: u64,
    pub source: ListSource,
}

impl Default for EntitySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitySnapshot {
    pub fn new() -> Self {
        Self {
            records: Vec::with_capacity(limits::SNAPSHOT_CAPACITY),
            camera: CameraPose::default(),
            cycle: 0,
            source: ListSource::None,
        }
    }

    /// Reset for reuse. Keeps the record allocation.
    pub fn clear(&mut self) {
        self.records.clear();
        self.camera = CameraPose::default();
        self.cycle = 0;
        self.source = ListSource::None;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= limits::SNAPSHOT_CAPACITY
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
