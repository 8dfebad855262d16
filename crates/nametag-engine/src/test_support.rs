//! Shared fixtures for the engine test suites.

use std::sync::Arc;

use nametag_config::Config;
use nametag_protocol::{
    Clientbound, EntityId, MoveEntity, PlayerId, Position, SpawnPlayer, TeleportEntity,
};

use crate::engine::NameTagEngine;
use crate::memory::{InMemoryPlayerRegistry, RecordingSink, TemplateResolver};
use crate::player::RealPlayer;
use crate::synchronizer::LifecycleObserver;

pub(crate) struct Harness {
    pub engine: NameTagEngine,
    pub players: Arc<InMemoryPlayerRegistry>,
    pub resolver: Arc<TemplateResolver>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let players = Arc::new(InMemoryPlayerRegistry::new());
        let resolver = Arc::new(TemplateResolver::new());
        let sink = Arc::new(RecordingSink::new());
        let engine = NameTagEngine::new(
            &config,
            Arc::clone(&players) as _,
            Arc::clone(&resolver) as _,
            Arc::clone(&sink) as _,
        );
        Self {
            engine,
            players,
            resolver,
            sink,
        }
    }

    /// Player `id` with entity id `100 + id`, standing at `(x, 64, 0)`.
    pub fn player(id: u64, x: f64) -> RealPlayer {
        RealPlayer::new(PlayerId(id), entity_of(id), format!("p{id}"))
            .at(Position::new(x, 64.0, 0.0))
    }

    /// Registers and joins a player.
    pub fn join(&self, player: RealPlayer) -> RealPlayer {
        self.players.insert(player.clone());
        self.engine.on_join(player.id);
        player
    }

    /// Joins player `id` at `(x, 64, 0)`.
    pub fn join_at(&self, id: u64, x: f64) -> RealPlayer {
        self.join(Self::player(id, x))
    }

    /// Lets the game spawn `owner` for `viewer`.
    pub fn spawn(&self, viewer: &RealPlayer, owner: &RealPlayer) -> Vec<Clientbound> {
        self.engine.intercept_outbound(
            viewer.id,
            Clientbound::SpawnPlayer(SpawnPlayer {
                entity_id: owner.entity_id,
                player_id: owner.id,
                position: owner.position,
            }),
        )
    }

    /// Moves `player` in the registry.
    pub fn place(&self, player: PlayerId, position: Position) {
        self.players.update(player, |p| p.position = position);
    }

    pub fn move_packet(entity_id: EntityId, delta: Position) -> Clientbound {
        Clientbound::MoveEntity(MoveEntity {
            entity_id,
            delta,
            on_ground: true,
        })
    }

    pub fn teleport_packet(entity_id: EntityId, position: Position) -> Clientbound {
        Clientbound::TeleportEntity(TeleportEntity {
            entity_id,
            position,
            on_ground: true,
        })
    }
}

pub(crate) fn entity_of(id: u64) -> EntityId {
    EntityId(100 + id as i32)
}

/// Entity ids touched by packets of the given kind.
pub(crate) fn ids_of(packets: &[Clientbound], kind: &str) -> Vec<EntityId> {
    packets
        .iter()
        .filter(|p| p.kind() == kind)
        .flat_map(|p| match p {
            Clientbound::SpawnEntity(s) => vec![s.entity_id],
            Clientbound::SetEntityData(d) => vec![d.entity_id],
            Clientbound::MoveEntity(m) => vec![m.entity_id],
            Clientbound::TeleportEntity(t) => vec![t.entity_id],
            Clientbound::RemoveEntities(r) => r.entity_ids.clone(),
            Clientbound::SpawnPlayer(s) => vec![s.entity_id],
            Clientbound::RotateEntity(r) => vec![r.entity_id],
            Clientbound::Other(_) => Vec::new(),
        })
        .collect()
}

/// Packets the sink recorded for `viewer`, drained.
pub(crate) fn drain_for(sink: &RecordingSink, viewer: PlayerId) -> Vec<Clientbound> {
    sink.take()
        .into_iter()
        .filter(|(to, _)| *to == viewer)
        .map(|(_, packet)| packet)
        .collect()
}
