//! Interfaces of the services the engine depends on. All of them are
//! injected at construction.

use std::collections::HashSet;

use nametag_config::NameTagConfig;
use nametag_protocol::{Clientbound, PlayerId};

use crate::player::RealPlayer;

/// Read access to connected players.
pub trait PlayerRegistry: Send + Sync {
    /// Ids of every connected player.
    fn online_players(&self) -> Vec<PlayerId>;

    /// Current snapshot of a connected player, `None` once disconnected.
    fn player(&self, id: PlayerId) -> Option<RealPlayer>;

    /// The game's own visibility rule (vanish and similar).
    fn can_see(&self, viewer: PlayerId, target: PlayerId) -> bool;
}

/// Resolves label templates into text. Treated as synchronous and cheap.
pub trait PlaceholderResolver: Send + Sync {
    /// Resolves `template` for `player`.
    fn resolve(&self, template: &str, player: &RealPlayer) -> String;
}

/// Decides in which zones the overlay runs.
pub trait EnablementRule: Send + Sync {
    /// Whether the overlay is enabled in `zone`.
    fn is_enabled_in(&self, zone: &str) -> bool;
}

/// Delivers packets the engine initiates itself (pose changes, toggles,
/// disconnect cleanup). Must not block.
pub trait PacketSink: Send + Sync {
    /// Queues `packets` for `viewer` in order.
    fn send(&self, viewer: PlayerId, packets: Vec<Clientbound>);
}

/// Enablement by a fixed list of disabled zones.
#[derive(Debug, Clone, Default)]
pub struct ZoneRule {
    disabled: HashSet<String>,
}

impl ZoneRule {
    /// Disables the overlay in each of `zones`.
    pub fn new<I, S>(zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disabled: zones.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads `disabled_zones` from configuration.
    pub fn from_config(config: &NameTagConfig) -> Self {
        Self::new(config.disabled_zones.iter().cloned())
    }
}

impl EnablementRule for ZoneRule {
    fn is_enabled_in(&self, zone: &str) -> bool {
        !self.disabled.contains(zone)
    }
}
