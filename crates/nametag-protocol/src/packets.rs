//! Packet types relevant to entity identity, position, metadata and
//! interaction. Everything else travels through [`OpaquePacket`] untouched.

use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, PlayerId, Position};
use crate::metadata::MetadataEntry;

// ---------------------------------------------------------------------------
// Clientbound
// ---------------------------------------------------------------------------

/// A packet travelling from the server to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Clientbound {
    /// A player entity appears for the viewer.
    SpawnPlayer(SpawnPlayer),
    /// A non-player entity appears for the viewer.
    SpawnEntity(SpawnEntity),
    /// Entity metadata update.
    SetEntityData(SetEntityData),
    /// Relative move, optionally with rotation.
    MoveEntity(MoveEntity),
    /// Rotation-only update.
    RotateEntity(RotateEntity),
    /// Absolute position update.
    TeleportEntity(TeleportEntity),
    /// Batch removal of entities.
    RemoveEntities(RemoveEntities),
    /// Any packet the overlay does not inspect.
    Other(OpaquePacket),
}

impl Clientbound {
    /// Short name for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SpawnPlayer(_) => "spawn_player",
            Self::SpawnEntity(_) => "spawn_entity",
            Self::SetEntityData(_) => "set_entity_data",
            Self::MoveEntity(_) => "move_entity",
            Self::RotateEntity(_) => "rotate_entity",
            Self::TeleportEntity(_) => "teleport_entity",
            Self::RemoveEntities(_) => "remove_entities",
            Self::Other(_) => "other",
        }
    }
}

/// Spawns a player entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnPlayer {
    /// Entity id of the player.
    pub entity_id: EntityId,
    /// Stable player identifier.
    pub player_id: PlayerId,
    /// Spawn position.
    pub position: Position,
}

/// Spawns a non-player entity such as a marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpawnEntity {
    /// Entity id.
    pub entity_id: EntityId,
    /// Version-specific entity type id.
    pub type_id: i32,
    /// Spawn position.
    pub position: Position,
    /// Inline metadata. Only legacy clients read it; empty otherwise.
    pub metadata: Vec<MetadataEntry>,
}

/// Updates entity metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetEntityData {
    /// Entity id.
    pub entity_id: EntityId,
    /// Changed entries.
    pub metadata: Vec<MetadataEntry>,
}

/// Relative move in blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoveEntity {
    /// Entity id.
    pub entity_id: EntityId,
    /// Displacement since the last position the client knows.
    pub delta: Position,
    /// Whether the entity is on the ground.
    pub on_ground: bool,
}

/// Rotation-only update; never carries a position change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotateEntity {
    /// Entity id.
    pub entity_id: EntityId,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
}

/// Absolute position update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeleportEntity {
    /// Entity id.
    pub entity_id: EntityId,
    /// New position.
    pub position: Position,
    /// Whether the entity is on the ground.
    pub on_ground: bool,
}

/// Removes a batch of entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoveEntities {
    /// Entity ids to remove.
    pub entity_ids: Vec<EntityId>,
}

/// A packet the overlay passes through without decoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpaquePacket {
    /// Protocol packet id.
    pub packet_id: i32,
    /// Raw body.
    pub body: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Serverbound
// ---------------------------------------------------------------------------

/// A packet travelling from a client to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Serverbound {
    /// The client interacted with or attacked an entity.
    Interact(Interact),
    /// Any packet the overlay does not inspect.
    Other(OpaquePacket),
}

/// What the client did to the target entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InteractAction {
    /// Right click.
    Interact,
    /// Left click.
    Attack,
    /// Right click at a specific point on the entity.
    InteractAt,
}

/// Interaction with an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interact {
    /// Target entity id.
    pub entity_id: EntityId,
    /// Interaction kind.
    pub action: InteractAction,
    /// Whether the client was sneaking.
    pub sneaking: bool,
}
