//! A single synthetic overlay entity and the packets that describe it.

use nametag_protocol::{
    Clientbound, EntityCodec, EntityId, MarkerAppearance, MoveEntity, PlayerId, Position,
    SetEntityData, SpawnEntity, TeleportEntity,
};

/// One invisible armor stand carrying one label line.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntity {
    /// Synthetic entity id.
    pub id: EntityId,
    /// Player the label belongs to.
    pub owner_id: PlayerId,
    /// Configured line name.
    pub line: String,
    /// Static height of this line above the owner.
    pub base_height: f64,
    /// Pose/mount-derived offset shared by the whole set.
    pub vertical_offset: f64,
    /// Resolved label text.
    pub display_text: String,
    template: String,
}

impl MarkerEntity {
    /// Creates a marker for line `line` rendered from `template`.
    pub fn new(
        id: EntityId,
        owner_id: PlayerId,
        line: impl Into<String>,
        template: impl Into<String>,
        base_height: f64,
    ) -> Self {
        Self {
            id,
            owner_id,
            line: line.into(),
            base_height,
            vertical_offset: 0.0,
            display_text: String::new(),
            template: template.into(),
        }
    }

    /// Placeholder template of this line.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Total height above the owner's position.
    pub fn height(&self) -> f64 {
        self.base_height + self.vertical_offset
    }

    /// Marker position for an owner standing at `owner_position`.
    pub fn position_for(&self, owner_position: Position) -> Position {
        owner_position.raised(self.height())
    }

    fn appearance(&self, sneaking: bool) -> MarkerAppearance {
        MarkerAppearance {
            text: self.display_text.clone(),
            sneaking,
        }
    }

    /// Spawn packet, followed by a metadata packet when the codec keeps
    /// metadata out of spawns.
    pub fn spawn_packets(
        &self,
        owner_position: Position,
        sneaking: bool,
        codec: &dyn EntityCodec,
    ) -> Vec<Clientbound> {
        let metadata = self.appearance(sneaking).to_metadata(codec);
        let spawn = |metadata| {
            Clientbound::SpawnEntity(SpawnEntity {
                entity_id: self.id,
                type_id: codec.armor_stand_type_id(),
                position: self.position_for(owner_position),
                metadata,
            })
        };

        if codec.metadata_in_spawn() {
            vec![spawn(metadata)]
        } else {
            vec![
                spawn(Vec::new()),
                Clientbound::SetEntityData(SetEntityData {
                    entity_id: self.id,
                    metadata,
                }),
            ]
        }
    }

    /// Metadata packet reflecting current text and sneaking state.
    pub fn metadata_packet(&self, sneaking: bool, codec: &dyn EntityCodec) -> Clientbound {
        Clientbound::SetEntityData(SetEntityData {
            entity_id: self.id,
            metadata: self.appearance(sneaking).to_metadata(codec),
        })
    }

    /// Absolute move for an owner at `owner_position`.
    pub fn teleport_packet(&self, owner_position: Position, on_ground: bool) -> Clientbound {
        Clientbound::TeleportEntity(TeleportEntity {
            entity_id: self.id,
            position: self.position_for(owner_position),
            on_ground,
        })
    }

    /// Relative move by an already-encoded `delta`.
    pub fn move_packet(&self, delta: Position, on_ground: bool) -> Clientbound {
        Clientbound::MoveEntity(MoveEntity {
            entity_id: self.id,
            delta,
            on_ground,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nametag_protocol::{ProtocolVersion, codec_for};

    fn marker() -> MarkerEntity {
        let mut marker = MarkerEntity::new(EntityId(2_000_000_000), PlayerId(1), "nametag", "%name%", 0.26);
        marker.display_text = "Steve".to_string();
        marker
    }

    #[test]
    fn test_height_combines_base_and_offset() {
        let mut m = marker();
        m.vertical_offset = -0.45;
        assert!((m.height() - (0.26 - 0.45)).abs() < 1e-12);
        let pos = m.position_for(Position::new(1.0, 64.0, 2.0));
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.z, 2.0);
    }

    #[test]
    fn test_legacy_spawn_is_single_packet() {
        let packets = marker().spawn_packets(Position::default(), false, codec_for(ProtocolVersion::V1_8));
        assert_eq!(packets.len(), 1);
        let Clientbound::SpawnEntity(spawn) = &packets[0] else {
            panic!("expected spawn");
        };
        assert_eq!(spawn.type_id, 30);
        assert!(!spawn.metadata.is_empty());
    }

    #[test]
    fn test_modern_spawn_is_followed_by_metadata() {
        let packets = marker().spawn_packets(Position::default(), false, codec_for(ProtocolVersion::V1_19));
        assert_eq!(packets.len(), 2);
        assert!(matches!(&packets[0], Clientbound::SpawnEntity(s) if s.metadata.is_empty()));
        assert!(matches!(&packets[1], Clientbound::SetEntityData(d) if d.entity_id == EntityId(2_000_000_000)));
    }

    #[test]
    fn test_teleport_targets_marker_position() {
        let packet = marker().teleport_packet(Position::new(0.0, 70.0, 0.0), true);
        let Clientbound::TeleportEntity(tp) = packet else {
            panic!("expected teleport");
        };
        assert!((tp.position.y - 70.26).abs() < 1e-9);
        assert!(tp.on_ground);
    }
}
