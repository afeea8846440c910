//! Layout knowledge: byte offsets of the fields this pipeline reads.
//!
//! A [`LayoutTable`] is built for one target build, loaded once at startup
//! and never mutated afterwards. Callers share it as `Arc<LayoutTable>`.

pub mod constants;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::debug;

use crate::error::{Error, Result};

pub use constants::*;

/// Semantic name of every offset in a [`LayoutTable`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum LayoutField {
    World,
    Names,
    PersistentLevel,
    GameInstance,
    LocalPlayers,
    PlayerController,
    CameraManager,
    CameraCache,
    Pov,
    PovLocation,
    PovRotation,
    PovFov,
    ActorsPlain,
    ActorsEncrypted,
    ActorsDescriptor,
    ActorsCount,
    ClassId,
    RootComponent,
    RelativeLocation,
    RelativeRotation,
    Health,
    TeamId,
    PlayerName,
    IsBot,
    IsDead,
    Mesh,
    ComponentToWorld,
    BoneArray,
    NameEntryHeader,
}

/// Parameters for the four entity-list decoding schemes.
///
/// These are per-build values. Zero keys make every scheme a no-op or a
/// plain bit permutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderParams {
    /// Scheme 0: `value ^ xor_key`
    #[serde(with = "hex_u64")]
    pub xor_key: u64,
    /// Scheme 1: `(value ^ rotate_xor_key).rotate_right(rotate_xor_shift)`
    #[serde(with = "hex_u64")]
    pub rotate_xor_key: u64,
    pub rotate_xor_shift: u32,
    /// Scheme 2: 32-bit halves swapped, then `^ half_swap_key`
    #[serde(with = "hex_u64")]
    pub half_swap_key: u64,
    /// Scheme 3: byte order reversed, then `rotate_left(byte_swap_shift)`
    pub byte_swap_shift: u32,
}

/// Offsets for one target build.
///
/// `world` and `names` are relative to the module base; everything else is
/// relative to the struct it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTable {
    pub version: String,

    // Globals
    pub world: u64,
    pub names: u64,

    // World -> level / camera chain
    pub persistent_level: u64,
    pub game_instance: u64,
    pub local_players: u64,
    pub player_controller: u64,
    pub camera_manager: u64,
    pub camera_cache: u64,
    pub pov: u64,
    pub pov_location: u64,
    pub pov_rotation: u64,
    pub pov_fov: u64,

    // Level -> entity list
    pub actors_plain: u64,
    pub actors_encrypted: u64,
    pub actors_descriptor: u64,
    pub actors_count: u64,

    // Entity fields
    pub class_id: u64,
    pub root_component: u64,
    pub relative_location: u64,
    pub relative_rotation: u64,
    pub health: u64,
    pub team_id: u64,
    /// Counted UTF-16 name header
    pub player_name: u64,
    /// One-byte flags
    pub is_bot: u64,
    pub is_dead: u64,
    pub mesh: u64,
    pub component_to_world: u64,
    pub bone_array: u64,

    // Name table
    pub name_entry_header: u64,

    /// Bone indices whose world positions are captured per entity.
    pub bone_indices: Vec<u32>,

    pub decoders: DecoderParams,
}

impl Default for LayoutTable {
    /// Engine-generic values only; build-specific offsets are zero.
    fn default() -> Self {
        Self {
            version: String::new(),
            world: 0,
            names: 0,
            persistent_level: 0,
            game_instance: 0,
            local_players: 0,
            player_controller: 0,
            camera_manager: 0,
            camera_cache: 0,
            pov: 0x10,
            pov_location: 0,
            pov_rotation: 0x0C,
            pov_fov: 0x18,
            actors_plain: 0x98,
            actors_encrypted: 0,
            actors_descriptor: 0,
            actors_count: 0x08,
            class_id: 0x18,
            root_component: 0,
            relative_location: 0,
            relative_rotation: 0,
            health: 0,
            team_id: 0,
            player_name: 0,
            is_bot: 0,
            is_dead: 0,
            mesh: 0,
            component_to_world: 0,
            bone_array: 0,
            name_entry_header: 4 + names::POINTER_SIZE,
            bone_indices: Vec::new(),
            decoders: DecoderParams::default(),
        }
    }
}

impl LayoutTable {
    /// Offset by semantic field name.
    pub fn offset(&self, field: LayoutField) -> u64 {
        match field {
            LayoutField::World => self.world,
            LayoutField::Names => self.names,
            LayoutField::PersistentLevel => self.persistent_level,
            LayoutField::GameInstance => self.game_instance,
            LayoutField::LocalPlayers => self.local_players,
            LayoutField::PlayerController => self.player_controller,
            LayoutField::CameraManager => self.camera_manager,
            LayoutField::CameraCache => self.camera_cache,
            LayoutField::Pov => self.pov,
            LayoutField::PovLocation => self.pov_location,
            LayoutField::PovRotation => self.pov_rotation,
            LayoutField::PovFov => self.pov_fov,
            LayoutField::ActorsPlain => self.actors_plain,
            LayoutField::ActorsEncrypted => self.actors_encrypted,
            LayoutField::ActorsDescriptor => self.actors_descriptor,
            LayoutField::ActorsCount => self.actors_count,
            LayoutField::ClassId => self.class_id,
            LayoutField::RootComponent => self.root_component,
            LayoutField::RelativeLocation => self.relative_location,
            LayoutField::RelativeRotation => self.relative_rotation,
            LayoutField::Health => self.health,
            LayoutField::TeamId => self.team_id,
            LayoutField::PlayerName => self.player_name,
            LayoutField::IsBot => self.is_bot,
            LayoutField::IsDead => self.is_dead,
            LayoutField::Mesh => self.mesh,
            LayoutField::ComponentToWorld => self.component_to_world,
            LayoutField::BoneArray => self.bone_array,
            LayoutField::NameEntryHeader => self.name_entry_header,
        }
    }

    /// Override one offset. Only meant for startup (CLI `--set`).
    pub fn set_offset(&mut self, field: LayoutField, value: u64) {
        let slot = match field {
            LayoutField::World => &mut self.world,
            LayoutField::Names => &mut self.names,
            LayoutField::PersistentLevel => &mut self.persistent_level,
            LayoutField::GameInstance => &mut self.game_instance,
            LayoutField::LocalPlayers => &mut self.local_players,
            LayoutField::PlayerController => &mut self.player_controller,
            LayoutField::CameraManager => &mut self.camera_manager,
            LayoutField::CameraCache => &mut self.camera_cache,
            LayoutField::Pov => &mut self.pov,
            LayoutField::PovLocation => &mut self.pov_location,
            LayoutField::PovRotation => &mut self.pov_rotation,
            LayoutField::PovFov => &mut self.pov_fov,
            LayoutField::ActorsPlain => &mut self.actors_plain,
            LayoutField::ActorsEncrypted => &mut self.actors_encrypted,
            LayoutField::ActorsDescriptor => &mut self.actors_descriptor,
            LayoutField::ActorsCount => &mut self.actors_count,
            LayoutField::ClassId => &mut self.class_id,
            LayoutField::RootComponent => &mut self.root_component,
            LayoutField::RelativeLocation => &mut self.relative_location,
            LayoutField::RelativeRotation => &mut self.relative_rotation,
            LayoutField::Health => &mut self.health,
            LayoutField::TeamId => &mut self.team_id,
            LayoutField::PlayerName => &mut self.player_name,
            LayoutField::IsBot => &mut self.is_bot,
            LayoutField::IsDead => &mut self.is_dead,
            LayoutField::Mesh => &mut self.mesh,
            LayoutField::ComponentToWorld => &mut self.component_to_world,
            LayoutField::BoneArray => &mut self.bone_array,
            LayoutField::NameEntryHeader => &mut self.name_entry_header,
        };
        *slot = value;
    }

    /// All fields with their current offsets, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (LayoutField, u64)> + '_ {
        LayoutField::iter().map(|field| (field, self.offset(field)))
    }

    /// Whether the camera chain is configured at all.
    pub fn has_camera_chain(&self) -> bool {
        self.game_instance != 0
            && self.local_players != 0
            && self.player_controller != 0
            && self.camera_manager != 0
            && self.camera_cache != 0
    }

    /// Whether bone positions should be captured.
    pub fn captures_bones(&self) -> bool {
        !self.bone_indices.is_empty() && self.mesh != 0 && self.bone_array != 0
    }

    /// Bytes covering location, rotation and fov in one read.
    ///
    /// `None` when an offset is so large the end does not fit.
    pub fn pov_span(&self) -> Option<usize> {
        let end = self
            .pov_location
            .checked_add(12)?
            .max(self.pov_rotation.checked_add(12)?)
            .max(self.pov_fov.checked_add(4)?);
        usize::try_from(end).ok()
    }

    /// Reject tables that cannot drive a cycle. Fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::InvalidLayout("version is empty".to_string()));
        }
        if self.world == 0 {
            return Err(Error::InvalidLayout("world offset is zero".to_string()));
        }
        if self.names == 0 {
            return Err(Error::InvalidLayout("names offset is zero".to_string()));
        }
        if self.actors_plain == 0 && self.actors_encrypted == 0 {
            return Err(Error::InvalidLayout(
                "both actors_plain and actors_encrypted are zero".to_string(),
            ));
        }
        if self.bone_indices.len() > limits::MAX_BONES {
            return Err(Error::InvalidLayout(format!(
                "{} bone indices configured, at most {} supported",
                self.bone_indices.len(),
                limits::MAX_BONES
            )));
        }
        match self.pov_span() {
            Some(span) if span <= limits::MAX_POV_SPAN => {}
            Some(span) => {
                return Err(Error::InvalidLayout(format!("pov fields span {} bytes", span)));
            }
            None => {
                return Err(Error::InvalidLayout("pov field offsets overflow".to_string()));
            }
        }
        Ok(())
    }

    /// Load from a `.toml` file, or JSON for any other extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let table: LayoutTable = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        debug!("Loaded layout {} from {}", table.version, path.display());
        Ok(table)
    }

    /// Load and validate in one step.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self> {
        let table = Self::load(path)?;
        table.validate()?;
        Ok(table)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        fs::write(path, content)?;
        Ok(())
    }
}

/// Full-width keys as `"0x..."` strings; TOML integers stop at `i64::MAX`.
mod hex_u64 {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => Ok(v),
            Raw::Str(s) => {
                let digits = s.trim_start_matches("0x").trim_start_matches("0X");
                u64::from_str_radix(digits, 16)
                    .map_err(|e| D::Error::custom(format!("invalid hex key '{}': {}", s, e)))
            }
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::Builder;

    fn sample() -> LayoutTable {
        LayoutTable {
            version: "build-4512".to_string(),
            world: 0xDC1_0FF0,
            names: 0xD66_B2C0,
            persistent_level: 0x30,
            actors_plain: 0xA0,
            bone_indices: vec![5, 6, 7],
            ..Default::default()
        }
    }

    #[test]
    fn test_field_names_round_trip() {
        assert_eq!(LayoutField::from_str("camera_cache").unwrap(), LayoutField::CameraCache);
        assert_eq!(LayoutField::NameEntryHeader.to_string(), "name_entry_header");
        assert!(LayoutField::from_str("not_a_field").is_err());
    }

    #[test]
    fn test_offset_and_set_offset_agree() {
        let mut table = sample();
        for (i, field) in LayoutField::iter().enumerate() {
            table.set_offset(field, 0x1000 + i as u64);
        }
        for (i, (field, value)) in table.entries().enumerate() {
            assert_eq!(value, 0x1000 + i as u64, "{}", field);
        }
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut t = sample();
        t.version.clear();
        assert!(matches!(t.validate(), Err(Error::InvalidLayout(_))));

        let mut t = sample();
        t.world = 0;
        assert!(t.validate().is_err());

        let mut t = sample();
        t.actors_plain = 0;
        t.actors_encrypted = 0;
        assert!(t.validate().is_err());

        let mut t = sample();
        t.bone_indices = vec![0; limits::MAX_BONES + 1];
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_toml_file_with_partial_fields() {
        let file = Builder::new().suffix(".toml").tempfile().unwrap();
        fs::write(
            file.path(),
            r#"
version = "build-1"
world = 0x1000
names = 0x2000
persistent_level = 0x30
bone_indices = [1, 2]

[decoders]
xor_key = 0xFF
"#,
        )
        .unwrap();

        let table = LayoutTable::load_validated(file.path()).unwrap();
        assert_eq!(table.world, 0x1000);
        assert_eq!(table.class_id, 0x18);
        assert_eq!(table.actors_plain, 0x98);
        assert_eq!(table.decoders.xor_key, 0xFF);
        assert_eq!(table.decoders.byte_swap_shift, 0);
        assert_eq!(table.bone_indices, vec![1, 2]);
    }

    #[test]
    fn test_json_save_and_load() {
        let file = Builder::new().suffix(".json").tempfile().unwrap();
        let table = sample();
        table.save(file.path()).unwrap();
        let loaded = LayoutTable::load(file.path()).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_full_width_keys_survive_toml() {
        let file = Builder::new().suffix(".toml").tempfile().unwrap();
        let mut table = sample();
        table.decoders.half_swap_key = 0xDEAD_BEEF_1234_5678;
        table.save(file.path()).unwrap();

        let loaded = LayoutTable::load(file.path()).unwrap();
        assert_eq!(loaded.decoders.half_swap_key, 0xDEAD_BEEF_1234_5678);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = LayoutTable::load("/nonexistent/layout.toml").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_pov_span() {
        let table = LayoutTable::default();
        // location @0, rotation @0x0C, fov @0x18
        assert_eq!(table.pov_span(), Some(0x1C));
    }

    #[test]
    fn test_huge_pov_offset_is_invalid_not_a_panic() {
        let mut t = sample();
        t.pov_fov = u64::MAX - 1;
        assert_eq!(t.pov_span(), None);
        assert!(matches!(t.validate(), Err(Error::InvalidLayout(_))));

        let mut t = sample();
        t.pov_location = 0x1000;
        assert!(matches!(t.validate(), Err(Error::InvalidLayout(_))));
    }
}
