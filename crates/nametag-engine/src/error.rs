//! Engine error types.

use nametag_protocol::PlayerId;

/// Failures that disable the overlay for a single player. They never reach
/// the connection pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Every id in the synthetic partition is live or reserved.
    #[error("synthetic entity id range {start}..={end} exhausted")]
    IdentifierExhausted {
        /// First id of the partition.
        start: i32,
        /// Last id of the partition.
        end: i32,
    },

    /// The player registry does not know the player.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
}
