//! In-memory collaborators for tests, demos and hosts without their own
//! player store.

use std::sync::{Mutex, PoisonError};

use dashmap::{DashMap, DashSet};
use nametag_protocol::{Clientbound, PlayerId};

use crate::collaborators::{PacketSink, PlaceholderResolver, PlayerRegistry};
use crate::player::RealPlayer;

// ---------------------------------------------------------------------------
// InMemoryPlayerRegistry
// ---------------------------------------------------------------------------

/// Player registry backed by concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryPlayerRegistry {
    players: DashMap<PlayerId, RealPlayer>,
    /// `(viewer, target)` pairs where the viewer cannot see the target.
    hidden: DashSet<(PlayerId, PlayerId)>,
}

impl InMemoryPlayerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a player.
    pub fn insert(&self, player: RealPlayer) {
        self.players.insert(player.id, player);
    }

    /// Removes a player and every hide relation involving them.
    pub fn remove(&self, id: PlayerId) -> Option<RealPlayer> {
        self.hidden.retain(|(viewer, target)| *viewer != id && *target != id);
        self.players.remove(&id).map(|(_, player)| player)
    }

    /// Mutates a player in place. Returns `false` if unknown.
    pub fn update(&self, id: PlayerId, f: impl FnOnce(&mut RealPlayer)) -> bool {
        match self.players.get_mut(&id) {
            Some(mut player) => {
                f(player.value_mut());
                true
            }
            None => false,
        }
    }

    /// Hides `target` from `viewer`, as vanish would.
    pub fn hide(&self, viewer: PlayerId, target: PlayerId) {
        self.hidden.insert((viewer, target));
    }

    /// Reverts [`hide`](Self::hide).
    pub fn show(&self, viewer: PlayerId, target: PlayerId) {
        self.hidden.remove(&(viewer, target));
    }
}

impl PlayerRegistry for InMemoryPlayerRegistry {
    fn online_players(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.players.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    fn player(&self, id: PlayerId) -> Option<RealPlayer> {
        self.players.get(&id).map(|player| player.value().clone())
    }

    fn can_see(&self, viewer: PlayerId, target: PlayerId) -> bool {
        !self.hidden.contains(&(viewer, target))
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Packet sink that records everything it is handed, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(PlayerId, Clientbound)>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains everything recorded so far.
    pub fn take(&self) -> Vec<(PlayerId, Clientbound)> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Packets recorded for `viewer`, without draining.
    pub fn sent_to(&self, viewer: PlayerId) -> Vec<Clientbound> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(to, _)| *to == viewer)
            .map(|(_, packet)| packet.clone())
            .collect()
    }

    /// Number of packets recorded.
    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PacketSink for RecordingSink {
    fn send(&self, viewer: PlayerId, packets: Vec<Clientbound>) {
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        sent.extend(packets.into_iter().map(|packet| (viewer, packet)));
    }
}

// ---------------------------------------------------------------------------
// TemplateResolver
// ---------------------------------------------------------------------------

/// Resolves `%key%` placeholders. `%name%` and `%zone%` come from the
/// player; other keys from values set with [`set`](Self::set). Unknown keys
/// resolve to nothing.
#[derive(Debug, Default)]
pub struct TemplateResolver {
    values: DashMap<String, String>,
}

impl TemplateResolver {
    /// Creates a resolver with no custom values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of `%key%`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    fn lookup(&self, key: &str, player: &RealPlayer) -> String {
        match key {
            "name" => player.name.clone(),
            "zone" => player.zone.clone(),
            _ => self
                .values
                .get(key)
                .map(|value| value.value().clone())
                .unwrap_or_default(),
        }
    }
}

impl PlaceholderResolver for TemplateResolver {
    fn resolve(&self, template: &str, player: &RealPlayer) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('%') {
                Some(end) => {
                    out.push_str(&self.lookup(&after[..end], player));
                    rest = &after[end + 1..];
                }
                None => {
                    // Unterminated; keep the tail as written.
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
