use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::entity::{ClassFilter, EntityListHandle, EntityListResolver, ListSource};
use crate::layout::{LayoutTable, limits};
use crate::math::{CameraPose, Rotator, Transform, Vec3};
use crate::memory::{ReadMemory, RemoteAddress, RemoteValue};
use crate::names::NameResolver;

use super::{EntityRecord, EntitySnapshot};

/// How far a cycle got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "outcome", content = "count", rename_all = "snake_case")]
pub enum CycleOutcome {
    #[default]
    Complete,
    NoWorld,
    NoLevel,
    /// No list branch matched, or its count was unreadable.
    NoList,
    /// Count outside `0..=MAX_ENTITY_COUNT`; the snapshot was left empty.
    CorruptCount(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CycleStats {
    pub cycle: u64,
    pub outcome: CycleOutcome,
    pub source: ListSource,
    pub camera: bool,
    /// Non-null entity slots looked at.
    pub examined: usize,
    pub included: usize,
    /// Rejected by the class filter.
    pub filtered: usize,
    /// Dropped because one of their reads failed or was implausible.
    pub dropped: usize,
}

/// Fills an [`EntitySnapshot`] from the target once per cycle.
///
/// Owns the name cache; only the acquisition thread may use it.
pub struct SnapshotBuilder {
    layout: Arc<LayoutTable>,
    module_base: RemoteAddress,
    lists: EntityListResolver,
    names: NameResolver,
    filter: ClassFilter,
    cycle: u64,
    last_outcome: CycleOutcome,
}

impl SnapshotBuilder {
    pub fn new(layout: Arc<LayoutTable>, module_base: RemoteAddress, filter: ClassFilter) -> Self {
        Self {
            lists: EntityListResolver::new(&layout),
            names: NameResolver::from_layout(module_base, &layout),
            layout,
            module_base,
            filter,
            cycle: 0,
            last_outcome: CycleOutcome::Complete,
        }
    }

    pub fn layout(&self) -> &LayoutTable {
        &self.layout
    }

    pub fn names(&self) -> &NameResolver {
        &self.names
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run one cycle, overwriting `out` completely.
    pub fn build<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        out: &mut EntitySnapshot,
    ) -> CycleStats {
        out.clear();
        self.cycle += 1;
        out.cycle = self.cycle;

        let mut stats = CycleStats {
            cycle: self.cycle,
            ..Default::default()
        };
        let outcome = self.fill(reader, out, &mut stats);
        stats.outcome = outcome;
        stats.source = out.source;
        stats.included = out.records.len();

        self.note_outcome(stats.outcome);
        stats
    }

    fn fill<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        out: &mut EntitySnapshot,
        stats: &mut CycleStats,
    ) -> CycleOutcome {
        let Some(world) = read_non_null(reader, self.module_base.offset(self.layout.world)) else {
            return CycleOutcome::NoWorld;
        };

        if let Some(camera) = self.read_camera(reader, world) {
            out.camera = camera;
            stats.camera = true;
        }

        let Some(level) = read_non_null(reader, world.offset(self.layout.persistent_level)) else {
            return CycleOutcome::NoLevel;
        };
        let Some(handle) = self.lists.resolve(reader, level) else {
            return CycleOutcome::NoList;
        };
        out.source = handle.source;

        let Ok(count) = reader.read_i32(handle.count_addr) else {
            return CycleOutcome::NoList;
        };
        if !(0..=limits::MAX_ENTITY_COUNT).contains(&count) {
            return CycleOutcome::CorruptCount(count);
        }

        let pointers = read_pointers(reader, &handle, count as usize);
        for actor in pointers {
            if out.is_full() {
                break;
            }
            if actor.is_null() {
                continue;
            }
            stats.examined += 1;

            let Some((class_id, class_name)) =
                self.names.class_name_of(reader, actor, self.layout.class_id)
            else {
                trace!("{}: class id unreadable", actor);
                stats.dropped += 1;
                continue;
            };
            if !self.filter.admits(&class_name) {
                stats.filtered += 1;
                continue;
            }

            let camera = stats.camera.then_some(&out.camera);
            match self.read_record(reader, actor, class_id, class_name, camera) {
                Some(record) => out.records.push(record),
                None => {
                    trace!("{}: dropped", actor);
                    stats.dropped += 1;
                }
            }
        }

        CycleOutcome::Complete
    }

    /// Follow the camera chain from the world to the POV block.
    fn read_camera<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        world: RemoteAddress,
    ) -> Option<CameraPose> {
        let layout = &*self.layout;
        if !layout.has_camera_chain() {
            return None;
        }

        let instance = read_non_null(reader, world.offset(layout.game_instance))?;
        let players = read_non_null(reader, instance.offset(layout.local_players))?;
        let player = read_non_null(reader, players)?;
        let controller = read_non_null(reader, player.offset(layout.player_controller))?;
        let manager = read_non_null(reader, controller.offset(layout.camera_manager))?;

        let pov = manager.offset(layout.camera_cache).offset(layout.pov);
        let block = reader.read_bytes(pov, layout.pov_span()?).ok()?;

        let camera = CameraPose::new(
            decode_at::<Vec3>(&block, layout.pov_location)?,
            decode_at::<Rotator>(&block, layout.pov_rotation)?,
            decode_at::<f32>(&block, layout.pov_fov)?,
        );
        if !camera.is_plausible() {
            debug!("implausible camera pose: {:?}", camera);
            return None;
        }
        Some(camera)
    }

    fn read_record<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        actor: RemoteAddress,
        class_id: i32,
        class_name: Arc<str>,
        camera: Option<&CameraPose>,
    ) -> Option<EntityRecord> {
        let layout = &*self.layout;

        let root = read_non_null(reader, actor.offset(layout.root_component))?;
        let position: Vec3 = reader.read_value(root.offset(layout.relative_location)).ok()?;
        let rotation: Rotator = reader.read_value(root.offset(layout.relative_rotation)).ok()?;
        if !position.is_finite() || !rotation.is_finite() {
            return None;
        }

        let health = if layout.health != 0 {
            reader.read_f32(actor.offset(layout.health)).ok()?
        } else {
            0.0
        };
        let team_id = if layout.team_id != 0 {
            reader.read_i32(actor.offset(layout.team_id)).ok()?
        } else {
            0
        };
        let is_bot = layout.is_bot != 0 && reader.read_u8(actor.offset(layout.is_bot)).ok()? != 0;
        let is_dead =
            layout.is_dead != 0 && reader.read_u8(actor.offset(layout.is_dead)).ok()? != 0;

        // A missing name keeps the entity.
        let player_name = if layout.player_name != 0 {
            reader
                .read_fstring(actor.offset(layout.player_name))
                .inspect_err(|e| trace!("{}: no player name ({})", actor, e))
                .ok()
        } else {
            None
        };

        let mut record = EntityRecord {
            address: actor,
            class_id,
            class_name,
            position,
            rotation,
            health,
            team_id,
            player_name,
            is_bot,
            is_dead,
            distance: camera.map(|c| c.location.distance(position) / limits::UNITS_PER_METRE),
            ..Default::default()
        };

        if layout.captures_bones() {
            self.read_bones(reader, actor, &mut record)?;
        }
        Some(record)
    }

    fn read_bones<R: ReadMemory + ?Sized>(
        &self,
        reader: &R,
        actor: RemoteAddress,
        record: &mut EntityRecord,
    ) -> Option<()> {
        let layout = &*self.layout;

        let mesh = read_non_null(reader, actor.offset(layout.mesh))?;
        let component: Transform = reader.read_value(mesh.offset(layout.component_to_world)).ok()?;
        if !component.is_valid() {
            return None;
        }
        let bones = read_non_null(reader, mesh.offset(layout.bone_array))?;

        for (slot, index) in layout.bone_indices.iter().take(limits::MAX_BONES).enumerate() {
            let bone: Transform = reader
                .read_value(bones.element(*index as u64, Transform::REMOTE_SIZE as u64))
                .ok()?;
            let world = component.transform_position(bone.translation);
            if !world.is_finite() {
                return None;
            }
            record.bones[slot] = world;
            record.bone_count = slot + 1;
        }
        Some(())
    }

    /// Corrupt counts are logged once per run of them, not every cycle.
    fn note_outcome(&mut self, outcome: CycleOutcome) {
        match outcome {
            CycleOutcome::CorruptCount(count)
                if !matches!(self.last_outcome, CycleOutcome::CorruptCount(_)) =>
            {
                warn!("Entity count {} out of range, publishing empty snapshot", count);
            }
            CycleOutcome::Complete if self.last_outcome != CycleOutcome::Complete => {
                debug!("cycle {} recovered from {:?}", self.cycle, self.last_outcome);
            }
            _ => {}
        }
        self.last_outcome = outcome;
    }
}

fn read_non_null<R: ReadMemory + ?Sized>(reader: &R, slot: RemoteAddress) -> Option<RemoteAddress> {
    reader.read_ptr(slot).ok()?.non_null()
}

/// Entity pointers in one bulk read, slot by slot if that fails.
fn read_pointers<R: ReadMemory + ?Sized>(
    reader: &R,
    handle: &EntityListHandle,
    count: usize,
) -> Vec<RemoteAddress> {
    if count == 0 {
        return Vec::new();
    }
    match reader.read_array::<RemoteAddress>(handle.data, count) {
        Ok(pointers) => pointers,
        Err(e) => {
            debug!("bulk pointer read failed ({}), reading per slot", e);
            (0..count as u64)
                .map(|i| {
                    reader
                        .read_ptr(handle.data.element(i, 8))
                        .unwrap_or(RemoteAddress::NULL)
                })
                .collect()
        }
    }
}

fn decode_at<V: RemoteValue>(block: &[u8], offset: u64) -> Option<V> {
    let start = usize::try_from(offset).ok()?;
    block.get(start..start.checked_add(V::SIZE)?).map(V::decode)
}
