//! Event-driven marker updates.
//!
//! The host's event layer calls into narrow observer traits, one per event
//! family. [`PoseSynchronizer`] implements the ones that change marker
//! geometry; the engine facade implements the lifecycle and command traits
//! on top of it.

use std::sync::Arc;

use nametag_protocol::{Clientbound, PlayerId, codec_for};

use crate::armor_stand_manager::{ArmorStandManager, Reposition};
use crate::context::Shared;
use crate::pose::{Mount, OffsetTable, PoseFlags};
use crate::state::lock;

// ---------------------------------------------------------------------------
// Observer traits
// ---------------------------------------------------------------------------

/// Pose flag changes (sneak, swim, glide, sleep).
pub trait PoseObserver {
    /// `player`'s pose flags are now `flags`.
    fn on_pose_changed(&self, player: PlayerId, flags: PoseFlags);
}

/// Player movement, after the registry reflects the new position.
pub trait MoveObserver {
    /// `player` moved.
    fn on_move(&self, player: PlayerId);
}

/// Vehicle seating.
pub trait MountObserver {
    /// `player` took a seat.
    fn on_mount(&self, player: PlayerId, mount: Mount);
    /// `player` left their vehicle.
    fn on_dismount(&self, player: PlayerId);
}

/// Session lifecycle.
pub trait LifecycleObserver {
    /// `player` joined and is present in the registry.
    fn on_join(&self, player: PlayerId);
    /// `player` left. The registry may or may not still list them.
    fn on_disconnect(&self, player: PlayerId);
    /// `player` moved from zone `from` to zone `to`.
    fn on_zone_change(&self, player: PlayerId, from: &str, to: &str);
}

/// Per-player toggle used by the command subsystem.
pub trait CommandHandler {
    /// Turns the overlay off (`true`) or back on (`false`) for `player`.
    fn set_feature_disabled(&self, player: PlayerId, disabled: bool);
    /// Whether the overlay is active for `player`.
    fn is_feature_enabled(&self, player: PlayerId) -> bool;
}

// ---------------------------------------------------------------------------
// PoseSynchronizer
// ---------------------------------------------------------------------------

/// Applies pose, mount and movement events to the marker sets and flushes
/// the resulting packets to current viewers.
#[derive(Clone)]
pub struct PoseSynchronizer {
    shared: Arc<Shared>,
}

impl PoseSynchronizer {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Runs `change` under `player`'s manager lock, then sends each viewer
    /// what it needs. Nothing is sent when the change is a no-op.
    fn apply<F>(&self, player: PlayerId, change: F)
    where
        F: FnOnce(&mut ArmorStandManager, &OffsetTable) -> Reposition,
    {
        let Some(manager) = self.shared.state.manager(player) else {
            tracing::trace!(%player, "no marker set, ignoring event");
            return;
        };
        let Some(owner) = self.shared.players.player(player) else {
            tracing::trace!(%player, "player offline, ignoring event");
            return;
        };

        let batches: Vec<(PlayerId, Vec<Clientbound>)> = {
            let mut manager = lock(&manager);
            if manager.is_destroyed() {
                tracing::trace!(%player, "marker set destroyed, ignoring event");
                return;
            }
            let reposition = change(&mut manager, &self.shared.offsets);
            if reposition == Reposition::Unchanged {
                return;
            }
            tracing::debug!(%player, ?reposition, "marker set repositioned");
            manager
                .viewers()
                .into_iter()
                .filter_map(|viewer_id| {
                    let viewer = self.shared.players.player(viewer_id)?;
                    let packets = manager.reposition_packets(
                        reposition,
                        owner.position,
                        codec_for(viewer.protocol),
                    );
                    Some((viewer_id, packets))
                })
                .collect()
        };

        for (viewer, packets) in batches {
            self.shared.dispatch(viewer, packets);
        }
    }
}

impl PoseObserver for PoseSynchronizer {
    fn on_pose_changed(&self, player: PlayerId, flags: PoseFlags) {
        self.apply(player, |manager, offsets| manager.on_pose_changed(flags, offsets));
    }
}

impl MountObserver for PoseSynchronizer {
    fn on_mount(&self, player: PlayerId, mount: Mount) {
        let state = &self.shared.state;
        self.apply(player, |manager, offsets| {
            if let Some(previous) = manager.mount() {
                state.remove_passenger(previous.vehicle_id, player);
            }
            state.add_passenger(mount.vehicle_id, player);
            manager.on_mount(mount, offsets)
        });
    }

    fn on_dismount(&self, player: PlayerId) {
        let state = &self.shared.state;
        self.apply(player, |manager, offsets| {
            if let Some(previous) = manager.mount() {
                state.remove_passenger(previous.vehicle_id, player);
            }
            manager.on_dismount(offsets)
        });
    }
}

impl MoveObserver for PoseSynchronizer {
    /// Re-evaluates visibility in both directions so players entering or
    /// leaving range gain or lose markers. The markers' own motion rides on
    /// the intercepted movement packets.
    fn on_move(&self, player: PlayerId) {
        let Some(mover) = self.shared.players.player(player) else {
            return;
        };
        self.shared.reconcile_owner(&mover);
        self.shared.reconcile_viewer(&mover);
    }
}
