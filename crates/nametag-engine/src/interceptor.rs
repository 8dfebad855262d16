//! Protocol hooks.
//!
//! [`PacketInterceptor::intercept_outbound`] runs for every entity packet
//! headed to a viewer and returns the packet followed by whatever marker
//! packets keep the overlay consistent with it, in one batch.
//! [`PacketInterceptor::intercept_inbound`] points interactions aimed at a
//! marker back at the player wearing it.
//!
//! Both hooks are synchronous and never fail: anything unexpected degrades
//! to forwarding the original packet.

use std::sync::Arc;

use nametag_protocol::{
    Clientbound, EntityId, Interact, MoveEntity, PlayerId, Position, RemoveEntities,
    Serverbound, SpawnEntity, SpawnPlayer, TeleportEntity, codec_for,
};

use crate::context::Shared;
use crate::player::RealPlayer;
use crate::state::lock;

/// How a real entity moved.
#[derive(Debug, Clone, Copy)]
enum Motion {
    Relative { delta: Position, on_ground: bool },
    Absolute { position: Position, on_ground: bool },
}

/// Packet rewriting for both directions.
#[derive(Clone)]
pub struct PacketInterceptor {
    shared: Arc<Shared>,
}

impl PacketInterceptor {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Rewrites one packet headed to `viewer`. The original packet always
    /// comes first in the returned batch.
    pub fn intercept_outbound(&self, viewer: PlayerId, packet: Clientbound) -> Vec<Clientbound> {
        match &packet {
            Clientbound::SpawnPlayer(_)
            | Clientbound::SpawnEntity(_)
            | Clientbound::MoveEntity(_)
            | Clientbound::TeleportEntity(_)
            | Clientbound::RemoveEntities(_) => {}
            Clientbound::SetEntityData(_) | Clientbound::RotateEntity(_) | Clientbound::Other(_) => {
                return vec![packet];
            }
        }

        if let Clientbound::SpawnEntity(SpawnEntity { entity_id, .. }) = &packet {
            self.observe(*entity_id);
            return vec![packet];
        }
        if let Clientbound::SpawnPlayer(SpawnPlayer { entity_id, .. }) = &packet {
            self.observe(*entity_id);
        }

        let Some(viewer) = self.shared.players.player(viewer) else {
            tracing::trace!(%viewer, kind = packet.kind(), "unknown viewer, passing through");
            return vec![packet];
        };
        if !viewer.protocol.supports_markers() || !self.shared.feature_enabled(&viewer) {
            return vec![packet];
        }

        match packet {
            Clientbound::SpawnPlayer(spawn) => self.on_spawn(&viewer, spawn),
            Clientbound::MoveEntity(movement) => self.on_move(&viewer, movement),
            Clientbound::TeleportEntity(teleport) => self.on_teleport(&viewer, teleport),
            Clientbound::RemoveEntities(remove) => self.on_remove(&viewer, remove),
            other => vec![other],
        }
    }

    /// Reserves real entity ids that land inside the synthetic range.
    fn observe(&self, entity_id: EntityId) {
        if self.shared.state.marker_owner(entity_id).is_none() {
            self.shared.state.ids.observe_real_id(entity_id);
        }
    }

    fn on_spawn(&self, viewer: &RealPlayer, spawn: SpawnPlayer) -> Vec<Clientbound> {
        let owner_id = spawn.player_id;
        let position = spawn.position;
        let mut out = vec![Clientbound::SpawnPlayer(spawn)];

        let Some(manager) = self.shared.state.manager(owner_id) else {
            return out;
        };
        let Some(owner) = self.shared.players.player(owner_id) else {
            return out;
        };
        if !self.shared.is_visible(&owner, viewer) {
            return out;
        }

        let mut manager = lock(&manager);
        if !manager.is_destroyed() && manager.add_viewer(viewer.id) {
            out.extend(manager.spawn_packets(position, codec_for(viewer.protocol)));
        }
        out
    }

    fn on_move(&self, viewer: &RealPlayer, movement: MoveEntity) -> Vec<Clientbound> {
        let entity_id = movement.entity_id;
        let motion = Motion::Relative {
            delta: movement.delta,
            on_ground: movement.on_ground,
        };
        let mut out = vec![Clientbound::MoveEntity(movement)];
        self.follow_entity(viewer, entity_id, motion, &mut out);
        out
    }

    fn on_teleport(&self, viewer: &RealPlayer, teleport: TeleportEntity) -> Vec<Clientbound> {
        let entity_id = teleport.entity_id;
        let motion = Motion::Absolute {
            position: teleport.position,
            on_ground: teleport.on_ground,
        };
        let mut out = vec![Clientbound::TeleportEntity(teleport)];
        self.follow_entity(viewer, entity_id, motion, &mut out);
        out
    }

    /// Appends marker packets for the player whose body is `entity_id` and
    /// for every player seated in it.
    fn follow_entity(
        &self,
        viewer: &RealPlayer,
        entity_id: EntityId,
        motion: Motion,
        out: &mut Vec<Clientbound>,
    ) {
        if let Some(owner) = self.shared.state.entity_owner(entity_id) {
            self.follow(viewer, owner, motion, false, out);
        }
        for passenger in self.shared.state.passengers_of(entity_id) {
            self.follow(viewer, passenger, motion, true, out);
        }
    }

    /// Moves, spawns or removes one owner's markers for `viewer`. Absolute
    /// positions of a vehicle are not the passenger's, so passengers are
    /// teleported to their own registry position.
    fn follow(
        &self,
        viewer: &RealPlayer,
        owner_id: PlayerId,
        motion: Motion,
        as_passenger: bool,
        out: &mut Vec<Clientbound>,
    ) {
        if owner_id == viewer.id {
            return;
        }
        let Some(manager) = self.shared.state.manager(owner_id) else {
            return;
        };
        let Some(owner) = self.shared.players.player(owner_id) else {
            return;
        };
        let visible = self.shared.is_visible(&owner, viewer);
        let codec = codec_for(viewer.protocol);
        let owner_position = match motion {
            Motion::Absolute { position, .. } if !as_passenger => position,
            _ => owner.position,
        };

        let mut manager = lock(&manager);
        if manager.is_destroyed() {
            return;
        }
        match (manager.is_viewer(viewer.id), visible) {
            (true, true) => {
                if manager.is_hidden() {
                    return;
                }
                match motion {
                    Motion::Relative { delta, on_ground } => {
                        match manager.move_packets(delta, on_ground, codec) {
                            Ok(packets) => out.extend(packets),
                            Err(err) => {
                                tracing::debug!(
                                    owner = %owner_id,
                                    %err,
                                    "relative move not encodable, teleporting markers"
                                );
                                out.extend(manager.teleport_packets(owner.position, on_ground));
                            }
                        }
                    }
                    Motion::Absolute { on_ground, .. } => {
                        out.extend(manager.teleport_packets(owner_position, on_ground));
                    }
                }
            }
            (true, false) => {
                let shown = manager.is_shown_to(viewer.id);
                manager.remove_viewer(viewer.id);
                if shown {
                    out.push(manager.destroy_packet());
                }
            }
            (false, true) => {
                manager.add_viewer(viewer.id);
                out.extend(manager.spawn_packets(owner_position, codec));
            }
            (false, false) => {}
        }
    }

    fn on_remove(&self, viewer: &RealPlayer, remove: RemoveEntities) -> Vec<Clientbound> {
        let mut entity_ids = remove.entity_ids;
        let mut appended = Vec::new();
        for id in &entity_ids {
            let Some(owner) = self.shared.state.entity_owner(*id) else {
                continue;
            };
            let Some(manager) = self.shared.state.manager(owner) else {
                continue;
            };
            let mut manager = lock(&manager);
            manager.remove_viewer(viewer.id);
            appended.extend(manager.marker_ids());
        }
        for id in appended {
            if !entity_ids.contains(&id) {
                entity_ids.push(id);
            }
        }
        vec![Clientbound::RemoveEntities(RemoveEntities { entity_ids })]
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Points an interaction aimed at a marker at the marker's owner. Any
    /// packet that cannot be resolved is returned unchanged.
    pub fn intercept_inbound(&self, viewer: PlayerId, packet: Serverbound) -> Serverbound {
        let Serverbound::Interact(interact) = packet else {
            return packet;
        };
        Serverbound::Interact(self.resolve_interact(viewer, interact))
    }

    fn resolve_interact(&self, viewer: PlayerId, mut interact: Interact) -> Interact {
        let target = interact.entity_id;
        let Some(owner_id) = self.shared.state.marker_owner(target) else {
            if self.shared.state.ids.contains(target) && !self.shared.state.ids.is_live(target) {
                tracing::debug!(%viewer, %target, "interaction with stale marker id");
            }
            return interact;
        };
        if owner_id == viewer {
            return interact;
        }
        let Some(owner) = self.shared.players.player(owner_id) else {
            tracing::debug!(%viewer, %target, owner = %owner_id, "marker owner offline");
            return interact;
        };
        tracing::trace!(%viewer, from = %target, to = %owner.entity_id, "rewrote interaction");
        interact.entity_id = owner.entity_id;
        interact
    }
}

#[cfg(test)]
#[path = "interceptor_tests.rs"]
mod tests;
