//! A simulated game session driving the overlay engine the way a server's
//! packet pipeline and event layer would.

use std::sync::Arc;

use nametag_config::Config;
use nametag_engine::{
    CommandHandler, InMemoryPlayerRegistry, LifecycleObserver, Mount, MountObserver,
    MoveObserver, NameTagEngine, PlayerRegistry, PoseFlags, PoseObserver, RealPlayer,
    RecordingSink, TemplateResolver,
};
use nametag_protocol::{
    Clientbound, EntityId, Interact, InteractAction, MoveEntity, PlayerId, Position,
    ProtocolVersion, RemoveEntities, Serverbound, SpawnPlayer,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::{debug, info, warn};

/// Entity id of the boat players ride in the simulation.
const BOAT: EntityId = EntityId(9_000);

/// Counters collected while the session runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Packets handed to the outbound hook.
    pub outbound_in: usize,
    /// Packets the outbound hook returned.
    pub outbound_out: usize,
    /// Packets the engine pushed through the sink on its own.
    pub engine_initiated: usize,
    /// Interactions redirected from a marker to its owner.
    pub rewritten_interactions: usize,
    /// Pose changes raised.
    pub pose_changes: usize,
}

/// Players, collaborators and the engine under simulation.
pub struct Session {
    engine: NameTagEngine,
    players: Arc<InMemoryPlayerRegistry>,
    resolver: Arc<TemplateResolver>,
    sink: Arc<RecordingSink>,
    rng: Xoshiro256StarStar,
    online: Vec<PlayerId>,
    stats: SessionStats,
}

impl Session {
    /// Joins `player_count` players at random spots around the origin. Every
    /// second player runs a legacy client.
    pub fn new(config: &Config, player_count: u32) -> Self {
        let players = Arc::new(InMemoryPlayerRegistry::new());
        let resolver = Arc::new(TemplateResolver::new());
        let sink = Arc::new(RecordingSink::new());
        let engine = NameTagEngine::new(
            config,
            Arc::clone(&players) as _,
            Arc::clone(&resolver) as _,
            Arc::clone(&sink) as _,
        );

        let mut session = Self {
            engine,
            players,
            resolver,
            sink,
            rng: Xoshiro256StarStar::seed_from_u64(42), // Fixed seed for a reproducible run
            online: Vec::new(),
            stats: SessionStats::default(),
        };

        for index in 0..u64::from(player_count) {
            let protocol = if index % 2 == 1 {
                ProtocolVersion::V1_8
            } else {
                ProtocolVersion::V1_19
            };
            let position = Position::new(
                session.rng.gen_range(-30.0..30.0),
                64.0,
                session.rng.gen_range(-30.0..30.0),
            );
            let id = index + 1;
            let Ok(entity_id) = i32::try_from(id) else {
                warn!(players = player_count, "entity ids exhausted, joining fewer players");
                break;
            };
            let player = RealPlayer::new(PlayerId(id), EntityId(entity_id), format!("Player{id}"))
                .at(position)
                .with_protocol(protocol);
            session.resolver.set("health", "20");
            session.players.insert(player.clone());
            session.engine.on_join(player.id);
            session.online.push(player.id);
            info!(player = %player.id, %protocol, "joined");
        }

        session.spawn_everyone();
        session
    }

    /// The engine under simulation.
    pub fn engine(&self) -> &NameTagEngine {
        &self.engine
    }

    /// Players still online.
    pub fn online(&self) -> &[PlayerId] {
        &self.online
    }

    /// Counters so far.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    fn outbound(&mut self, viewer: PlayerId, packet: Clientbound) -> Vec<Clientbound> {
        self.stats.outbound_in += 1;
        let out = self.engine.intercept_outbound(viewer, packet);
        self.stats.outbound_out += out.len();
        out
    }

    fn snapshot(&self, id: PlayerId) -> Option<RealPlayer> {
        self.players.player(id)
    }

    /// The game spawns every player for every other player.
    fn spawn_everyone(&mut self) {
        for owner in self.online.clone() {
            let Some(snapshot) = self.snapshot(owner) else {
                continue;
            };
            for viewer in self.online.clone() {
                if viewer == owner {
                    continue;
                }
                let packet = Clientbound::SpawnPlayer(SpawnPlayer {
                    entity_id: snapshot.entity_id,
                    player_id: owner,
                    position: snapshot.position,
                });
                self.outbound(viewer, packet);
            }
        }
    }

    /// Runs `ticks` ticks of random movement and pose changes, with one
    /// boat ride and a zone change along the way.
    pub fn run(&mut self, ticks: u32) {
        for tick in 0..ticks {
            self.move_players();

            if self.rng.gen_bool(0.1) {
                self.toggle_sneak();
            }
            if tick == ticks / 3 {
                self.board_boat();
            }
            if tick > ticks / 3 && tick < 2 * ticks / 3 {
                self.move_boat();
            }
            if tick == 2 * ticks / 3 {
                self.leave_boat();
            }
            if tick == ticks / 2 {
                self.change_zone();
            }
            if tick % 20 == 0 {
                self.refresh_labels();
            }
            if self.rng.gen_bool(0.05) {
                self.interact_with_random_marker();
            }
        }
        self.stats.engine_initiated += self.sink.take().len();
    }

    fn move_players(&mut self) {
        for mover in self.online.clone() {
            let delta = Position::new(
                self.rng.gen_range(-0.6..0.6),
                0.0,
                self.rng.gen_range(-0.6..0.6),
            );
            let mut entity_id = None;
            self.players.update(mover, |p| {
                p.position = Position::new(
                    p.position.x + delta.x,
                    p.position.y,
                    p.position.z + delta.z,
                );
                entity_id = Some(p.entity_id);
            });
            let Some(entity_id) = entity_id else {
                continue;
            };
            for viewer in self.online.clone() {
                if viewer != mover {
                    self.outbound(
                        viewer,
                        Clientbound::MoveEntity(MoveEntity {
                            entity_id,
                            delta,
                            on_ground: true,
                        }),
                    );
                }
            }
            self.engine.on_move(mover);
        }
    }

    fn toggle_sneak(&mut self) {
        if self.online.is_empty() {
            return;
        }
        let index = self.rng.gen_range(0..self.online.len());
        let player = self.online[index];
        let mut flags = PoseFlags::default();
        self.players.update(player, |p| {
            p.pose.sneaking = !p.pose.sneaking;
            flags = p.pose;
        });
        self.engine.on_pose_changed(player, flags);
        self.stats.pose_changes += 1;
        debug!(%player, sneaking = flags.sneaking, "pose changed");
    }

    fn board_boat(&mut self) {
        for (seat, player) in self.online.iter().take(2).enumerate() {
            let mount = Mount::new(BOAT, "boat", seat);
            self.players.update(*player, |p| p.mount = Some(mount.clone()));
            self.engine.on_mount(*player, mount);
            info!(player = %player, seat, "boarded boat");
        }
    }

    fn move_boat(&mut self) {
        let delta = Position::new(0.4, 0.0, 0.0);
        let riders: Vec<PlayerId> = self.online.iter().take(2).copied().collect();
        for rider in &riders {
            self.players.update(*rider, |p| {
                p.position = Position::new(p.position.x + delta.x, p.position.y, p.position.z);
            });
        }
        for viewer in self.online.clone() {
            self.outbound(
                viewer,
                Clientbound::MoveEntity(MoveEntity {
                    entity_id: BOAT,
                    delta,
                    on_ground: false,
                }),
            );
        }
    }

    fn leave_boat(&mut self) {
        for player in self.online.clone().into_iter().take(2) {
            self.players.update(player, |p| p.mount = None);
            self.engine.on_dismount(player);
        }
    }

    fn change_zone(&mut self) {
        let Some(&traveller) = self.online.get(2) else {
            return;
        };
        self.players.update(traveller, |p| p.zone = "nether".to_string());
        self.engine.on_zone_change(traveller, "world", "nether");
        info!(player = %traveller, "moved to the nether");
    }

    fn refresh_labels(&mut self) {
        let health = self.rng.gen_range(1..=20);
        self.resolver.set("health", health.to_string());
        for player in self.online.clone() {
            self.engine.refresh_labels(player);
        }
    }

    fn interact_with_random_marker(&mut self) {
        if self.online.len() < 2 {
            return;
        }
        let viewer = self.online[0];
        let owner = self.online[self.rng.gen_range(1..self.online.len())];
        let Some(&marker) = self.engine.marker_ids(owner).first() else {
            return;
        };
        let packet = Serverbound::Interact(Interact {
            entity_id: marker,
            action: InteractAction::Attack,
            sneaking: false,
        });
        if let Serverbound::Interact(rewritten) = self.engine.intercept_inbound(viewer, packet)
            && rewritten.entity_id != marker
        {
            self.stats.rewritten_interactions += 1;
            debug!(%viewer, %owner, from = %marker, to = %rewritten.entity_id, "attack redirected");
        }
    }

    /// Toggles the overlay off and on again for the first player.
    pub fn toggle_feature(&mut self) {
        let Some(&player) = self.online.first() else {
            return;
        };
        self.engine.set_feature_disabled(player, true);
        info!(%player, enabled = self.engine.is_feature_enabled(player), "overlay toggled off");
        self.engine.set_feature_disabled(player, false);
        info!(%player, enabled = self.engine.is_feature_enabled(player), "overlay toggled on");
        self.stats.engine_initiated += self.sink.take().len();
    }

    /// Disconnects the last player: the game despawns them everywhere, then
    /// the lifecycle hook runs.
    pub fn disconnect_last(&mut self) {
        let Some(leaver) = self.online.pop() else {
            return;
        };
        let Some(snapshot) = self.snapshot(leaver) else {
            return;
        };
        for viewer in self.online.clone() {
            let out = self.outbound(
                viewer,
                Clientbound::RemoveEntities(RemoveEntities {
                    entity_ids: vec![snapshot.entity_id],
                }),
            );
            if let Some(Clientbound::RemoveEntities(batch)) = out.first() {
                debug!(%viewer, removed = batch.entity_ids.len(), "despawn batch");
            }
        }
        self.players.remove(leaver);
        self.engine.on_disconnect(leaver);
        self.stats.engine_initiated += self.sink.take().len();
        info!(player = %leaver, "disconnected");
    }
}
