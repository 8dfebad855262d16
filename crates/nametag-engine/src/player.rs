//! Snapshot of a connected player as the engine observes it.

use nametag_protocol::{EntityId, PlayerId, Position, ProtocolVersion};

use crate::pose::{Mount, PoseFlags};

/// A connected player. Owned by the session layer; the engine only reads
/// snapshots handed out by the [`PlayerRegistry`](crate::PlayerRegistry).
#[derive(Debug, Clone, PartialEq)]
pub struct RealPlayer {
    /// Stable identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Real entity id of the player's body.
    pub entity_id: EntityId,
    /// Zone (world) the player is in.
    pub zone: String,
    /// Current position.
    pub position: Position,
    /// Current pose flags.
    pub pose: PoseFlags,
    /// Vehicle seat, if riding.
    pub mount: Option<Mount>,
    /// Client protocol version.
    pub protocol: ProtocolVersion,
}

impl RealPlayer {
    /// A standing player at the origin of zone `"world"` on a current client.
    pub fn new(id: PlayerId, entity_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            entity_id,
            zone: "world".to_string(),
            position: Position::default(),
            pose: PoseFlags::default(),
            mount: None,
            protocol: ProtocolVersion::V1_19,
        }
    }

    /// Sets the zone.
    pub fn in_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = zone.into();
        self
    }

    /// Sets the position.
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets the protocol version.
    pub fn with_protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }

    /// Sets the pose flags.
    pub fn with_pose(mut self, pose: PoseFlags) -> Self {
        self.pose = pose;
        self
    }

    /// Sets the mount.
    pub fn riding(mut self, mount: Mount) -> Self {
        self.mount = Some(mount);
        self
    }
}
