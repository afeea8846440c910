use std::fmt;

use serde::Serialize;

use crate::entity::{EntityListResolver, ListSource};
use crate::layout::{LayoutField, LayoutTable};
use crate::memory::{ReadMemory, RemoteAddress};

/// One dereference along a pointer chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainHop {
    pub field: &'static str,
    /// Where the pointer was read from
    pub slot: RemoteAddress,
    /// `None` if the read failed or returned zero
    pub target: Option<RemoteAddress>,
}

/// How far each chain in a layout resolves against a live target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChainReport {
    pub world: Vec<ChainHop>,
    pub camera: Vec<ChainHop>,
    pub list: ListSource,
    pub entity_count: Option<i32>,
}

impl ChainReport {
    /// Walk the world, camera and entity-list chains once.
    pub fn walk<R: ReadMemory + ?Sized>(
        reader: &R,
        module_base: RemoteAddress,
        layout: &LayoutTable,
    ) -> Self {
        let mut report = ChainReport::default();

        let world = hop(&mut report.world, reader, LayoutField::World, module_base.offset(layout.world));
        let Some(world) = world else {
            return report;
        };
        let level = hop(
            &mut report.world,
            reader,
            LayoutField::PersistentLevel,
            world.offset(layout.persistent_level),
        );

        if layout.has_camera_chain() {
            walk_camera(&mut report.camera, reader, world, layout);
        }

        if let Some(handle) = level.and_then(|level| EntityListResolver::new(layout).resolve(reader, level)) {
            report.list = handle.source;
            report.entity_count = reader.read_i32(handle.count_addr).ok();
        }
        report
    }

    /// Whether every configured chain reached its end.
    pub fn is_complete(&self) -> bool {
        let resolved = |hops: &[ChainHop]| hops.iter().all(|h| h.target.is_some());
        self.world.len() == 2
            && resolved(&self.world)
            && resolved(&self.camera)
            && !self.list.is_none()
    }
}

fn walk_camera<R: ReadMemory + ?Sized>(
    hops: &mut Vec<ChainHop>,
    reader: &R,
    world: RemoteAddress,
    layout: &LayoutTable,
) {
    let steps = [
        (LayoutField::GameInstance, layout.game_instance),
        (LayoutField::LocalPlayers, layout.local_players),
        // First element of the local player array.
        (LayoutField::LocalPlayers, 0),
        (LayoutField::PlayerController, layout.player_controller),
        (LayoutField::CameraManager, layout.camera_manager),
    ];

    let mut current = world;
    for (field, offset) in steps {
        match hop(hops, reader, field, current.offset(offset)) {
            Some(next) => current = next,
            None => return,
        }
    }
}

fn hop<R: ReadMemory + ?Sized>(
    hops: &mut Vec<ChainHop>,
    reader: &R,
    field: LayoutField,
    slot: RemoteAddress,
) -> Option<RemoteAddress> {
    let target = reader.read_ptr(slot).ok().and_then(RemoteAddress::non_null);
    hops.push(ChainHop {
        field: field.into(),
        slot,
        target,
    });
    target
}

impl fmt::Display for ChainHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "{:<18} [{}] -> {}", self.field, self.slot, target),
            None => write!(f, "{:<18} [{}] -> (null)", self.field, self.slot),
        }
    }
}
