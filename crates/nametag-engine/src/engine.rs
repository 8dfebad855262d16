//! The engine facade handed to the host.

use std::sync::Arc;

use nametag_config::Config;
use nametag_protocol::{Clientbound, EntityId, PlayerId, RemoveEntities, Serverbound, codec_for};

use crate::collaborators::{
    EnablementRule, PacketSink, PlaceholderResolver, PlayerRegistry, ZoneRule,
};
use crate::context::Shared;
use crate::error::EngineError;
use crate::id_space::IdentifierSpace;
use crate::interceptor::PacketInterceptor;
use crate::player::RealPlayer;
use crate::pose::{Mount, OffsetTable, PoseFlags};
use crate::state::{OverlayState, lock};
use crate::synchronizer::{
    CommandHandler, LifecycleObserver, MountObserver, MoveObserver, PoseObserver,
    PoseSynchronizer,
};
use crate::visibility::VisibilityFilter;

/// Marker overlay engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct NameTagEngine {
    shared: Arc<Shared>,
    interceptor: PacketInterceptor,
    synchronizer: PoseSynchronizer,
}

impl NameTagEngine {
    /// Creates an engine whose zone rule comes from `config.nametags`.
    pub fn new(
        config: &Config,
        players: Arc<dyn PlayerRegistry>,
        resolver: Arc<dyn PlaceholderResolver>,
        sink: Arc<dyn PacketSink>,
    ) -> Self {
        let enablement = Arc::new(ZoneRule::from_config(&config.nametags));
        Self::with_enablement(config, players, resolver, enablement, sink)
    }

    /// Creates an engine with a custom enablement rule.
    pub fn with_enablement(
        config: &Config,
        players: Arc<dyn PlayerRegistry>,
        resolver: Arc<dyn PlaceholderResolver>,
        enablement: Arc<dyn EnablementRule>,
        sink: Arc<dyn PacketSink>,
    ) -> Self {
        let shared = Arc::new(Shared {
            config: config.nametags.clone(),
            offsets: OffsetTable::from_config(&config.nametags),
            filter: VisibilityFilter::new(config.nametags.view_distance),
            players,
            resolver,
            enablement,
            sink,
            state: OverlayState::new(IdentifierSpace::from_config(&config.identifiers)),
        });
        tracing::info!(
            view_distance = config.nametags.view_distance,
            lines = config.nametags.lines.len(),
            disabled_zones = ?config.nametags.disabled_zones,
            "name tag engine ready"
        );
        Self {
            interceptor: PacketInterceptor::new(Arc::clone(&shared)),
            synchronizer: PoseSynchronizer::new(Arc::clone(&shared)),
            shared,
        }
    }

    /// Protocol hook for packets headed to `viewer`.
    pub fn intercept_outbound(&self, viewer: PlayerId, packet: Clientbound) -> Vec<Clientbound> {
        self.interceptor.intercept_outbound(viewer, packet)
    }

    /// Protocol hook for packets coming from `viewer`.
    pub fn intercept_inbound(&self, viewer: PlayerId, packet: Serverbound) -> Serverbound {
        self.interceptor.intercept_inbound(viewer, packet)
    }

    /// The packet interceptor, for hosts that wire it separately.
    pub fn interceptor(&self) -> &PacketInterceptor {
        &self.interceptor
    }

    /// The pose synchronizer, for hosts that wire it separately.
    pub fn synchronizer(&self) -> &PoseSynchronizer {
        &self.synchronizer
    }

    /// Marker ids currently attached to `player`, bottom line first.
    pub fn marker_ids(&self, player: PlayerId) -> Vec<EntityId> {
        self.shared
            .state
            .manager(player)
            .map(|manager| lock(&manager).marker_ids())
            .unwrap_or_default()
    }

    /// Current pose/mount offset of `player`'s markers, `None` when they have
    /// no markers or the markers are hidden.
    pub fn vertical_offset(&self, player: PlayerId) -> Option<f64> {
        let manager = self.shared.state.manager(player)?;
        lock(&manager).vertical_offset()
    }

    /// Whether `viewer` is currently holding `owner`'s markers.
    pub fn is_shown_to(&self, owner: PlayerId, viewer: PlayerId) -> bool {
        self.shared
            .state
            .manager(owner)
            .is_some_and(|manager| lock(&manager).is_shown_to(viewer))
    }

    /// Number of players with a marker set.
    pub fn overlay_count(&self) -> usize {
        self.shared.state.len()
    }

    /// Number of synthetic ids in use.
    pub fn live_marker_ids(&self) -> usize {
        self.shared.state.ids.live_count()
    }

    /// Re-resolves `player`'s label templates and pushes metadata for the
    /// lines whose text changed.
    pub fn refresh_labels(&self, player: PlayerId) {
        let Some(manager) = self.shared.state.manager(player) else {
            return;
        };
        let Some(owner) = self.shared.players.player(player) else {
            return;
        };
        let batches: Vec<(PlayerId, Vec<Clientbound>)> = {
            let mut manager = lock(&manager);
            if manager.is_destroyed() {
                return;
            }
            let changed = manager.refresh_text(&owner, self.shared.resolver.as_ref());
            if changed.is_empty() || manager.is_hidden() {
                return;
            }
            manager
                .viewers()
                .into_iter()
                .filter_map(|viewer_id| {
                    let viewer = self.shared.players.player(viewer_id)?;
                    let codec = codec_for(viewer.protocol);
                    Some((viewer_id, manager.metadata_packets(Some(changed.as_slice()), codec)))
                })
                .collect()
        };
        for (viewer, packets) in batches {
            self.shared.dispatch(viewer, packets);
        }
    }

    /// Full reconciliation pass: drops marker sets of players who are gone
    /// and re-evaluates every (owner, viewer) pair. Suitable for a periodic
    /// host task.
    pub fn refresh_visibility(&self) {
        for (owner_id, _) in self.shared.state.all_managers() {
            match self.shared.players.player(owner_id) {
                Some(owner) if self.shared.feature_enabled(&owner) => {
                    self.shared.reconcile_owner(&owner);
                }
                Some(_) => self.shared.destroy_overlay(owner_id),
                None => {
                    tracing::debug!(player = %owner_id, "dropping marker set of departed player");
                    self.shared.destroy_overlay(owner_id);
                }
            }
        }
    }

    /// Creates `player`'s overlay, logging instead of failing.
    fn try_create(&self, player: &RealPlayer) -> bool {
        match self.shared.create_overlay(player) {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(player = %player.id, %err, "overlay disabled for player");
                false
            }
        }
    }

    fn known_player(&self, id: PlayerId) -> Option<RealPlayer> {
        let player = self.shared.players.player(id);
        if player.is_none() {
            tracing::warn!(err = %EngineError::UnknownPlayer(id), "lifecycle event ignored");
        }
        player
    }
}

impl LifecycleObserver for NameTagEngine {
    /// Creates the joining player's markers. Viewers pick them up when the
    /// game spawns the player for them.
    fn on_join(&self, player: PlayerId) {
        let Some(player) = self.known_player(player) else {
            return;
        };
        if self.shared.feature_enabled(&player) {
            self.try_create(&player);
        } else {
            self.shared.state.ids.observe_real_id(player.entity_id);
        }
    }

    fn on_disconnect(&self, player: PlayerId) {
        self.shared.destroy_overlay(player);
        self.shared.untrack_viewer_everywhere(player);
        tracing::debug!(%player, "player disconnected, overlay state cleared");
    }

    /// Clears every viewer relation of the player in both directions. The
    /// game respawns entities in the new zone and the interceptor attaches
    /// markers to those spawns.
    fn on_zone_change(&self, player: PlayerId, from: &str, to: &str) {
        let Some(player) = self.known_player(player) else {
            return;
        };
        tracing::debug!(player = %player.id, from, to, "zone change");

        self.shared.untrack_owner_viewers(player.id);
        self.shared.untrack_viewer_everywhere(player.id);

        let enabled = self.shared.feature_enabled(&player);
        match (self.shared.state.has_manager(player.id), enabled) {
            (true, false) => self.shared.destroy_overlay(player.id),
            (false, true) => {
                self.try_create(&player);
            }
            _ => {}
        }
    }
}

impl CommandHandler for NameTagEngine {
    fn set_feature_disabled(&self, player: PlayerId, disabled: bool) {
        self.shared.state.set_disabled(player, disabled);
        tracing::info!(%player, disabled, "overlay toggled");

        if disabled {
            self.shared.destroy_overlay(player);
            let held = self.shared.untrack_viewer_everywhere(player);
            if !held.is_empty() {
                self.shared.dispatch(
                    player,
                    vec![Clientbound::RemoveEntities(RemoveEntities { entity_ids: held })],
                );
            }
            return;
        }

        let Some(player) = self.shared.players.player(player) else {
            return;
        };
        if self.shared.feature_enabled(&player) && self.try_create(&player) {
            self.shared.reconcile_owner(&player);
        }
        self.shared.reconcile_viewer(&player);
    }

    fn is_feature_enabled(&self, player: PlayerId) -> bool {
        self.shared
            .players
            .player(player)
            .is_some_and(|player| self.shared.feature_enabled(&player))
    }
}

impl PoseObserver for NameTagEngine {
    fn on_pose_changed(&self, player: PlayerId, flags: PoseFlags) {
        self.synchronizer.on_pose_changed(player, flags);
    }
}

impl MountObserver for NameTagEngine {
    fn on_mount(&self, player: PlayerId, mount: Mount) {
        self.synchronizer.on_mount(player, mount);
    }

    fn on_dismount(&self, player: PlayerId) {
        self.synchronizer.on_dismount(player);
    }
}

impl MoveObserver for NameTagEngine {
    fn on_move(&self, player: PlayerId) {
        self.synchronizer.on_move(player);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
