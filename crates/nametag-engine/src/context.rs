//! Services and state shared by the interceptor, the synchronizer and the
//! engine facade, plus the edge reconciliation they all build on.

use std::sync::Arc;

use nametag_config::NameTagConfig;
use nametag_protocol::{Clientbound, EntityId, PlayerId, RemoveEntities, codec_for};

use crate::armor_stand_manager::{ArmorStandManager, Removals};
use crate::collaborators::{EnablementRule, PacketSink, PlaceholderResolver, PlayerRegistry};
use crate::error::EngineError;
use crate::player::RealPlayer;
use crate::pose::OffsetTable;
use crate::state::{OverlayState, SharedManager, lock};
use crate::visibility::{VisibilityEdge, VisibilityFilter};

pub(crate) struct Shared {
    pub config: NameTagConfig,
    pub offsets: OffsetTable,
    pub filter: VisibilityFilter,
    pub players: Arc<dyn PlayerRegistry>,
    pub resolver: Arc<dyn PlaceholderResolver>,
    pub enablement: Arc<dyn EnablementRule>,
    pub sink: Arc<dyn PacketSink>,
    pub state: OverlayState,
}

impl Shared {
    /// Zone rule and personal toggle combined.
    pub fn feature_enabled(&self, player: &RealPlayer) -> bool {
        !self.state.is_disabled(player.id) && self.enablement.is_enabled_in(&player.zone)
    }

    pub fn is_visible(&self, owner: &RealPlayer, viewer: &RealPlayer) -> bool {
        self.filter.is_visible(&VisibilityEdge {
            owner,
            viewer,
            owner_enabled: self.feature_enabled(owner),
            viewer_enabled: self.feature_enabled(viewer),
            viewer_can_see_owner: self.players.can_see(viewer.id, owner.id),
        })
    }

    // -- Lifecycle --------------------------------------------------------

    /// Creates `player`'s marker set unless it already has one. Concurrent
    /// calls for the same player build at most one set.
    pub fn create_overlay(&self, player: &RealPlayer) -> Result<SharedManager, EngineError> {
        self.state.ids.observe_real_id(player.entity_id);
        self.state.get_or_try_insert_with(player.id, || {
            let manager = ArmorStandManager::new(
                player,
                &self.config,
                &self.offsets,
                &self.state.ids,
                self.resolver.as_ref(),
            )?;
            tracing::debug!(
                player = %player.id,
                markers = ?manager.marker_ids(),
                "created marker set"
            );
            Ok(manager)
        })
    }

    /// Unregisters and destroys `owner`'s marker set, telling every viewer
    /// that held it.
    pub fn destroy_overlay(&self, owner: PlayerId) {
        let Some(removals) = self.state.remove(owner) else {
            return;
        };
        tracing::debug!(player = %owner, viewers = removals.len(), "destroyed marker set");
        self.deliver_removals(removals);
    }

    /// Sends each viewer one removal packet for the ids it must drop.
    pub fn deliver_removals(&self, removals: Removals) {
        for (viewer, entity_ids) in removals {
            self.dispatch(
                viewer,
                vec![Clientbound::RemoveEntities(RemoveEntities { entity_ids })],
            );
        }
    }

    /// Hands engine-initiated packets to the sink, dropping them if the
    /// viewer went offline in the meantime.
    pub fn dispatch(&self, viewer: PlayerId, packets: Vec<Clientbound>) {
        if packets.is_empty() {
            return;
        }
        if self.players.player(viewer).is_none() {
            tracing::trace!(%viewer, count = packets.len(), "viewer offline, dropping packets");
            return;
        }
        self.sink.send(viewer, packets);
    }

    // -- Reconciliation ---------------------------------------------------

    /// Brings one (owner, viewer) relation in line with the filter: spawns
    /// for a newly visible viewer, removes for one that stopped being visible.
    pub fn reconcile_edge(&self, owner: &RealPlayer, viewer: &RealPlayer) {
        let Some(manager) = self.state.manager(owner.id) else {
            return;
        };
        let visible = self.is_visible(owner, viewer);
        let packets = {
            let mut manager = lock(&manager);
            if manager.is_destroyed() {
                return;
            }
            match (manager.is_viewer(viewer.id), visible) {
                (false, true) => {
                    manager.add_viewer(viewer.id);
                    manager.spawn_packets(owner.position, codec_for(viewer.protocol))
                }
                (true, false) => {
                    let shown = manager.is_shown_to(viewer.id);
                    manager.remove_viewer(viewer.id);
                    if shown {
                        vec![manager.destroy_packet()]
                    } else {
                        Vec::new()
                    }
                }
                _ => Vec::new(),
            }
        };
        self.dispatch(viewer.id, packets);
    }

    /// Reconciles `owner` against every other online player.
    pub fn reconcile_owner(&self, owner: &RealPlayer) {
        if !self.state.has_manager(owner.id) {
            return;
        }
        for viewer_id in self.players.online_players() {
            if viewer_id == owner.id {
                continue;
            }
            if let Some(viewer) = self.players.player(viewer_id) {
                self.reconcile_edge(owner, &viewer);
            }
        }
    }

    /// Reconciles `viewer` against every marker set.
    pub fn reconcile_viewer(&self, viewer: &RealPlayer) {
        for (owner_id, _) in self.state.all_managers() {
            if owner_id == viewer.id {
                continue;
            }
            if let Some(owner) = self.players.player(owner_id) {
                self.reconcile_edge(&owner, viewer);
            }
        }
    }

    /// Removes `viewer` from every marker set and returns the marker ids it
    /// was actually holding.
    pub fn untrack_viewer_everywhere(&self, viewer: PlayerId) -> Vec<EntityId> {
        let mut held = Vec::new();
        for (_, manager) in self.state.all_managers() {
            let mut manager = lock(&manager);
            if manager.is_shown_to(viewer) {
                held.extend(manager.marker_ids());
            }
            manager.remove_viewer(viewer);
        }
        held
    }

    /// Tells every viewer of `owner`'s set to drop it and forgets them.
    pub fn untrack_owner_viewers(&self, owner: PlayerId) {
        let Some(manager) = self.state.manager(owner) else {
            return;
        };
        let removals: Vec<(PlayerId, Clientbound)> = {
            let mut manager = lock(&manager);
            let hidden = manager.is_hidden();
            let viewers = manager.viewers();
            for viewer in &viewers {
                manager.remove_viewer(*viewer);
            }
            if hidden {
                Vec::new()
            } else {
                viewers
                    .into_iter()
                    .map(|viewer| (viewer, manager.destroy_packet()))
                    .collect()
            }
        };
        for (viewer, packet) in removals {
            self.dispatch(viewer, vec![packet]);
        }
    }
}
