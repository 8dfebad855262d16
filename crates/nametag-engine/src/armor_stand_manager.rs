//! The marker set attached to one player.
//!
//! An [`ArmorStandManager`] owns every [`MarkerEntity`] of its player, the
//! current pose and mount, and the explicit set of viewers that are tracking
//! the set. It never talks to the network itself: every state change returns
//! a [`Reposition`] describing what the viewers need, and the packet builders
//! turn that into packets for a given codec.

use std::collections::HashSet;

use nametag_config::NameTagConfig;
use nametag_protocol::{
    Clientbound, CodecError, EntityCodec, EntityId, PlayerId, Position, RemoveEntities,
};

use crate::collaborators::PlaceholderResolver;
use crate::error::EngineError;
use crate::id_space::IdentifierSpace;
use crate::marker::MarkerEntity;
use crate::player::RealPlayer;
use crate::pose::{Mount, OffsetTable, Placement, PoseFlags};

// ---------------------------------------------------------------------------
// Reposition
// ---------------------------------------------------------------------------

/// What viewers must be told after a pose or mount change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reposition {
    /// Nothing observable changed.
    Unchanged,
    /// The set became hidden; viewers must remove the markers.
    Hide,
    /// The set became visible again; viewers must spawn the markers.
    Show,
    /// The set stays visible but moved, restyled, or both.
    Update {
        /// The vertical offset changed; viewers need teleports.
        moved: bool,
        /// The sneaking flag changed; viewers need metadata.
        restyled: bool,
    },
}

/// Marker ids each viewer must remove after a set is destroyed.
pub type Removals = Vec<(PlayerId, Vec<EntityId>)>;

// ---------------------------------------------------------------------------
// ArmorStandManager
// ---------------------------------------------------------------------------

/// Owner of one player's marker set.
#[derive(Debug)]
pub struct ArmorStandManager {
    owner: PlayerId,
    owner_entity: EntityId,
    markers: Vec<MarkerEntity>,
    pose: PoseFlags,
    mount: Option<Mount>,
    placement: Placement,
    /// Viewers tracking this set. While hidden they hold no markers but stay
    /// tracked so the set can be re-shown to them.
    viewers: HashSet<PlayerId>,
    destroyed: bool,
}

impl ArmorStandManager {
    /// Allocates one marker per configured line and resolves its text. On
    /// failure every id allocated so far is released again.
    pub fn new(
        owner: &RealPlayer,
        config: &NameTagConfig,
        offsets: &OffsetTable,
        ids: &IdentifierSpace,
        resolver: &dyn PlaceholderResolver,
    ) -> Result<Self, EngineError> {
        let mut markers: Vec<MarkerEntity> = Vec::with_capacity(config.lines.len());
        for (index, line) in config.lines.iter().enumerate() {
            let id = match ids.allocate() {
                Ok(id) => id,
                Err(err) => {
                    for marker in &markers {
                        ids.release(marker.id);
                    }
                    return Err(err);
                }
            };
            let mut marker = MarkerEntity::new(
                id,
                owner.id,
                line.name.as_str(),
                line.template.as_str(),
                config.base_height + index as f64 * config.line_spacing,
            );
            marker.display_text = resolver.resolve(&line.template, owner);
            markers.push(marker);
        }

        let mut manager = Self {
            owner: owner.id,
            owner_entity: owner.entity_id,
            markers,
            pose: owner.pose,
            mount: owner.mount.clone(),
            placement: Placement::Hidden,
            viewers: HashSet::new(),
            destroyed: false,
        };
        manager.placement = offsets.placement(manager.pose, manager.mount.as_ref());
        if let Placement::Offset(offset) = manager.placement {
            manager.set_vertical_offset(offset);
        }
        Ok(manager)
    }

    /// Player owning this set.
    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Real entity id of the owner when the set was created.
    pub fn owner_entity(&self) -> EntityId {
        self.owner_entity
    }

    /// Markers, bottom line first.
    pub fn markers(&self) -> &[MarkerEntity] {
        &self.markers
    }

    /// Ids of every marker in the set.
    pub fn marker_ids(&self) -> Vec<EntityId> {
        self.markers.iter().map(|m| m.id).collect()
    }

    /// Whether `id` is one of this set's markers.
    pub fn has_marker_with_id(&self, id: EntityId) -> bool {
        self.markers.iter().any(|m| m.id == id)
    }

    /// Whether [`destroy`](Self::destroy) ran. Events that still hold a
    /// handle to a destroyed set must leave it alone.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Current mount, if any.
    pub fn mount(&self) -> Option<&Mount> {
        self.mount.as_ref()
    }

    /// Current pose flags.
    pub fn pose(&self) -> PoseFlags {
        self.pose
    }

    /// Whether the set is hidden (sleeping).
    pub fn is_hidden(&self) -> bool {
        self.placement == Placement::Hidden
    }

    /// Current pose/mount offset, `None` while hidden.
    pub fn vertical_offset(&self) -> Option<f64> {
        match self.placement {
            Placement::Hidden => None,
            Placement::Offset(offset) => Some(offset),
        }
    }

    fn set_vertical_offset(&mut self, offset: f64) {
        for marker in &mut self.markers {
            marker.vertical_offset = offset;
        }
    }

    // -- State transitions ------------------------------------------------

    /// Applies new pose flags. Calling it again with the same flags returns
    /// [`Reposition::Unchanged`].
    pub fn on_pose_changed(&mut self, flags: PoseFlags, offsets: &OffsetTable) -> Reposition {
        let was_sneaking = self.pose.sneaking;
        self.pose = flags;
        self.replace(offsets, was_sneaking)
    }

    /// Seats the owner in a vehicle. A mount overrides the pose offset.
    pub fn on_mount(&mut self, mount: Mount, offsets: &OffsetTable) -> Reposition {
        let was_sneaking = self.pose.sneaking;
        self.mount = Some(mount);
        self.replace(offsets, was_sneaking)
    }

    /// Removes the owner from their vehicle and falls back to the pose offset.
    pub fn on_dismount(&mut self, offsets: &OffsetTable) -> Reposition {
        let was_sneaking = self.pose.sneaking;
        self.mount = None;
        self.replace(offsets, was_sneaking)
    }

    fn replace(&mut self, offsets: &OffsetTable, was_sneaking: bool) -> Reposition {
        let before = self.placement;
        let after = offsets.placement(self.pose, self.mount.as_ref());
        let restyled = was_sneaking != self.pose.sneaking;
        self.placement = after;

        match (before, after) {
            (Placement::Hidden, Placement::Hidden) => Reposition::Unchanged,
            (Placement::Offset(_), Placement::Hidden) => Reposition::Hide,
            (Placement::Hidden, Placement::Offset(offset)) => {
                self.set_vertical_offset(offset);
                Reposition::Show
            }
            (Placement::Offset(old), Placement::Offset(new)) => {
                let moved = old != new;
                if moved {
                    self.set_vertical_offset(new);
                }
                if moved || restyled {
                    Reposition::Update { moved, restyled }
                } else {
                    Reposition::Unchanged
                }
            }
        }
    }

    /// Re-resolves every line and returns the ids whose text changed.
    pub fn refresh_text(
        &mut self,
        owner: &RealPlayer,
        resolver: &dyn PlaceholderResolver,
    ) -> Vec<EntityId> {
        let mut changed = Vec::new();
        for marker in &mut self.markers {
            let text = resolver.resolve(marker.template(), owner);
            if text != marker.display_text {
                marker.display_text = text;
                changed.push(marker.id);
            }
        }
        changed
    }

    // -- Viewers ----------------------------------------------------------

    /// Starts tracking `viewer`. Returns `false` if it already was.
    pub fn add_viewer(&mut self, viewer: PlayerId) -> bool {
        self.viewers.insert(viewer)
    }

    /// Stops tracking `viewer`. Returns `false` if it was not tracked.
    pub fn remove_viewer(&mut self, viewer: PlayerId) -> bool {
        self.viewers.remove(&viewer)
    }

    /// Whether `viewer` is tracking this set.
    pub fn is_viewer(&self, viewer: PlayerId) -> bool {
        self.viewers.contains(&viewer)
    }

    /// Current viewers in no particular order.
    pub fn viewers(&self) -> Vec<PlayerId> {
        self.viewers.iter().copied().collect()
    }

    /// Whether `viewer` actually holds the markers client-side.
    pub fn is_shown_to(&self, viewer: PlayerId) -> bool {
        !self.is_hidden() && self.is_viewer(viewer)
    }

    // -- Packets ----------------------------------------------------------

    /// Spawns every marker for an owner at `owner_position`. Empty while
    /// hidden.
    pub fn spawn_packets(&self, owner_position: Position, codec: &dyn EntityCodec) -> Vec<Clientbound> {
        if self.is_hidden() {
            return Vec::new();
        }
        self.markers
            .iter()
            .flat_map(|m| m.spawn_packets(owner_position, self.pose.sneaking, codec))
            .collect()
    }

    /// Absolute moves for every marker.
    pub fn teleport_packets(&self, owner_position: Position, on_ground: bool) -> Vec<Clientbound> {
        self.markers
            .iter()
            .map(|m| m.teleport_packet(owner_position, on_ground))
            .collect()
    }

    /// Relative moves for every marker, or an error when the codec cannot
    /// carry `delta`.
    pub fn move_packets(
        &self,
        delta: Position,
        on_ground: bool,
        codec: &dyn EntityCodec,
    ) -> Result<Vec<Clientbound>, CodecError> {
        let encoded = codec.encode_relative_move(delta)?;
        Ok(self
            .markers
            .iter()
            .map(|m| m.move_packet(encoded, on_ground))
            .collect())
    }

    /// Metadata for the markers in `ids`, or all markers when `ids` is `None`.
    pub fn metadata_packets(
        &self,
        ids: Option<&[EntityId]>,
        codec: &dyn EntityCodec,
    ) -> Vec<Clientbound> {
        self.markers
            .iter()
            .filter(|m| ids.is_none_or(|ids| ids.contains(&m.id)))
            .map(|m| m.metadata_packet(self.pose.sneaking, codec))
            .collect()
    }

    /// One removal packet for the whole set.
    pub fn destroy_packet(&self) -> Clientbound {
        Clientbound::RemoveEntities(RemoveEntities {
            entity_ids: self.marker_ids(),
        })
    }

    /// Packets a viewer needs after `change`, for an owner at
    /// `owner_position`.
    pub fn reposition_packets(
        &self,
        change: Reposition,
        owner_position: Position,
        codec: &dyn EntityCodec,
    ) -> Vec<Clientbound> {
        match change {
            Reposition::Unchanged => Vec::new(),
            Reposition::Hide => vec![self.destroy_packet()],
            Reposition::Show => self.spawn_packets(owner_position, codec),
            Reposition::Update { moved, restyled } => {
                let mut packets = Vec::new();
                if moved {
                    packets.extend(self.teleport_packets(owner_position, false));
                }
                if restyled {
                    packets.extend(self.metadata_packets(None, codec));
                }
                packets
            }
        }
    }

    /// Releases every marker id and forgets all viewers. Returns the marker
    /// ids each viewer must remove; viewers of a hidden set hold nothing.
    pub fn destroy(&mut self, ids: &IdentifierSpace) -> Removals {
        self.destroyed = true;
        let marker_ids = self.marker_ids();
        let hidden = self.is_hidden();
        for id in &marker_ids {
            ids.release(*id);
        }
        self.markers.clear();

        let viewers: Vec<PlayerId> = self.viewers.drain().collect();
        if hidden || marker_ids.is_empty() {
            return Vec::new();
        }
        viewers
            .into_iter()
            .map(|viewer| (viewer, marker_ids.clone()))
            .collect()
    }
}
