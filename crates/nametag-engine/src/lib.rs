//! Synthetic marker overlay for player name labels.
//!
//! Each connected player gets a stack of invisible armor stands, one per
//! label line, that only exist in the packet stream. The engine:
//!
//! - allocates their entity ids from a reserved partition ([`IdentifierSpace`]),
//! - keeps their height in step with the owner's pose and vehicle seat
//!   ([`ArmorStandManager`], [`OffsetTable`]),
//! - decides per (owner, viewer) pair who sees them ([`VisibilityFilter`]),
//! - rides along on the owner's spawn, move, teleport and destroy packets and
//!   points interactions with a marker back at the owner ([`PacketInterceptor`]),
//! - reacts to pose, mount, movement and lifecycle events
//!   ([`PoseSynchronizer`], [`NameTagEngine`]).
//!
//! Collaborators (player registry, placeholder resolver, enablement rule and
//! packet sink) are injected at construction.

pub mod armor_stand_manager;
pub mod collaborators;
mod context;
pub mod engine;
pub mod error;
pub mod id_space;
pub mod interceptor;
pub mod marker;
pub mod memory;
pub mod player;
pub mod pose;
pub mod state;
pub mod synchronizer;
#[cfg(test)]
mod test_support;
pub mod visibility;

pub use armor_stand_manager::{ArmorStandManager, Removals, Reposition};
pub use collaborators::{EnablementRule, PacketSink, PlaceholderResolver, PlayerRegistry, ZoneRule};
pub use engine::NameTagEngine;
pub use error::EngineError;
pub use id_space::IdentifierSpace;
pub use interceptor::PacketInterceptor;
pub use marker::MarkerEntity;
pub use memory::{InMemoryPlayerRegistry, RecordingSink, TemplateResolver};
pub use player::RealPlayer;
pub use pose::{Mount, OffsetTable, Placement, Pose, PoseFlags};
pub use state::OverlayState;
pub use synchronizer::{
    CommandHandler, LifecycleObserver, MountObserver, MoveObserver, PoseObserver,
    PoseSynchronizer,
};
pub use visibility::{VisibilityEdge, VisibilityFilter};
