//! Typed view of the entity packets the overlay rewrites, plus the
//! per-protocol-version codecs that decide how marker entities are encoded.
//!
//! Byte-level framing is the host's job. This crate models field layouts
//! (32-bit signed entity ids, double positions, quantized relative moves)
//! so the engine can rewrite packets without knowing the client version.

pub mod ids;
pub mod metadata;
pub mod packets;
pub mod version;

pub use ids::{EntityId, PlayerId, Position};
pub use metadata::{MarkerAppearance, MetadataEntry, MetadataValue};
pub use packets::{
    Clientbound, Interact, InteractAction, MoveEntity, OpaquePacket, RemoveEntities,
    RotateEntity, Serverbound, SetEntityData, SpawnEntity, SpawnPlayer, TeleportEntity,
};
pub use version::{CodecError, EntityCodec, ProtocolVersion, codec_for};
