//! Protocol versions and the versioned entity codecs.
//!
//! Each client connection is bound to one [`EntityCodec`] chosen by
//! [`codec_for`] from the client's [`ProtocolVersion`]. The codec answers
//! every version-dependent question about marker entities: entity type id,
//! metadata layout, whether metadata rides inside the spawn packet, and how
//! relative moves are quantized.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::Position;
use crate::metadata::MetadataValue;

// ---------------------------------------------------------------------------
// ProtocolVersion
// ---------------------------------------------------------------------------

/// Network protocol number announced by the client at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProtocolVersion(pub i32);

impl ProtocolVersion {
    /// 1.7.10, the last release without armor stands.
    pub const V1_7: Self = Self(5);
    /// 1.8.x
    pub const V1_8: Self = Self(47);
    /// 1.9
    pub const V1_9: Self = Self(107);
    /// 1.13
    pub const V1_13: Self = Self(393);
    /// 1.14
    pub const V1_14: Self = Self(477);
    /// 1.15
    pub const V1_15: Self = Self(573);
    /// 1.17
    pub const V1_17: Self = Self(755);
    /// 1.19
    pub const V1_19: Self = Self(759);

    /// Whether clients of this version can render marker entities at all.
    pub fn supports_markers(self) -> bool {
        self >= Self::V1_8
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while encoding entity fields for a specific version.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The displacement does not fit the version's relative-move fields.
    #[error("relative move {delta} exceeds encodable range {max}")]
    RelativeMoveOutOfRange {
        /// Largest absolute component of the requested displacement.
        delta: f64,
        /// Largest displacement the version can encode.
        max: f64,
    },
}

// ---------------------------------------------------------------------------
// EntityCodec
// ---------------------------------------------------------------------------

/// Version-specific encoding of marker entities.
pub trait EntityCodec: Send + Sync + fmt::Debug {
    /// Human-readable codec name.
    fn name(&self) -> &'static str;

    /// Entity type id of an armor stand.
    fn armor_stand_type_id(&self) -> i32;

    /// Metadata index of the armor stand flags byte.
    fn armor_stand_flags_index(&self) -> u8;

    /// Whether the zero-hitbox marker flag should be set.
    fn uses_marker_flag(&self) -> bool;

    /// Whether spawn packets carry metadata inline. When `false` a separate
    /// metadata packet must follow every spawn.
    fn metadata_in_spawn(&self) -> bool;

    /// Encodes a custom name.
    fn custom_name(&self, text: &str) -> MetadataValue;

    /// Encodes the custom-name-visible slot.
    fn name_visible(&self, visible: bool) -> MetadataValue;

    /// Fixed-point units per block in relative moves.
    fn relative_scale(&self) -> f64;

    /// Inclusive integer range of one relative-move component.
    fn relative_range(&self) -> (i32, i32);

    /// Largest displacement a single relative move can carry.
    fn max_relative_move(&self) -> f64 {
        let (_, max) = self.relative_range();
        f64::from(max) / self.relative_scale()
    }

    /// Quantizes `delta` to the version's fixed-point grid, or fails when a
    /// component falls outside the encodable range.
    fn encode_relative_move(&self, delta: Position) -> Result<Position, CodecError> {
        let scale = self.relative_scale();
        let (min, max) = self.relative_range();
        let quantize = |component: f64| -> Result<f64, CodecError> {
            let units = (component * scale).round();
            if units < f64::from(min) || units > f64::from(max) {
                return Err(CodecError::RelativeMoveOutOfRange {
                    delta: delta.max_abs_component(),
                    max: self.max_relative_move(),
                });
            }
            Ok(units / scale)
        };
        Ok(Position::new(
            quantize(delta.x)?,
            quantize(delta.y)?,
            quantize(delta.z)?,
        ))
    }
}

/// Codec for 1.8 clients: byte-sized 1/32 relative moves, string names,
/// metadata inside the spawn packet.
#[derive(Debug)]
pub struct LegacyCodec;

impl EntityCodec for LegacyCodec {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn armor_stand_type_id(&self) -> i32 {
        30
    }

    fn armor_stand_flags_index(&self) -> u8 {
        10
    }

    fn uses_marker_flag(&self) -> bool {
        // Marker stands on 1.8 draw the name at foot level.
        false
    }

    fn metadata_in_spawn(&self) -> bool {
        true
    }

    fn custom_name(&self, text: &str) -> MetadataValue {
        MetadataValue::String(text.to_string())
    }

    fn name_visible(&self, visible: bool) -> MetadataValue {
        MetadataValue::Byte(u8::from(visible))
    }

    fn relative_scale(&self) -> f64 {
        32.0
    }

    fn relative_range(&self) -> (i32, i32) {
        (i32::from(i8::MIN), i32::from(i8::MAX))
    }
}

/// Codec for 1.9+ clients: short-sized 1/4096 relative moves. The remaining
/// differences between releases are table-driven.
#[derive(Debug)]
pub struct ModernCodec {
    name: &'static str,
    type_id: i32,
    flags_index: u8,
    metadata_in_spawn: bool,
    component_names: bool,
}

impl EntityCodec for ModernCodec {
    fn name(&self) -> &'static str {
        self.name
    }

    fn armor_stand_type_id(&self) -> i32 {
        self.type_id
    }

    fn armor_stand_flags_index(&self) -> u8 {
        self.flags_index
    }

    fn uses_marker_flag(&self) -> bool {
        true
    }

    fn metadata_in_spawn(&self) -> bool {
        self.metadata_in_spawn
    }

    fn custom_name(&self, text: &str) -> MetadataValue {
        if self.component_names {
            MetadataValue::OptionalComponent(Some(serde_json::json!({ "text": text }).to_string()))
        } else {
            MetadataValue::String(text.to_string())
        }
    }

    fn name_visible(&self, visible: bool) -> MetadataValue {
        MetadataValue::Bool(visible)
    }

    fn relative_scale(&self) -> f64 {
        4096.0
    }

    fn relative_range(&self) -> (i32, i32) {
        (i32::from(i16::MIN), i32::from(i16::MAX))
    }
}

static LEGACY: LegacyCodec = LegacyCodec;

static MODERN_1_9: ModernCodec = ModernCodec {
    name: "1.9-1.12",
    type_id: 30,
    flags_index: 11,
    metadata_in_spawn: true,
    component_names: false,
};

static MODERN_1_13: ModernCodec = ModernCodec {
    name: "1.13",
    type_id: 1,
    flags_index: 11,
    metadata_in_spawn: true,
    component_names: true,
};

static MODERN_1_14: ModernCodec = ModernCodec {
    name: "1.14",
    type_id: 1,
    flags_index: 13,
    metadata_in_spawn: true,
    component_names: true,
};

static MODERN_1_15: ModernCodec = ModernCodec {
    name: "1.15-1.16",
    type_id: 1,
    flags_index: 14,
    metadata_in_spawn: false,
    component_names: true,
};

static MODERN_1_17: ModernCodec = ModernCodec {
    name: "1.17-1.18",
    type_id: 1,
    flags_index: 15,
    metadata_in_spawn: false,
    component_names: true,
};

static MODERN_1_19: ModernCodec = ModernCodec {
    name: "1.19+",
    type_id: 2,
    flags_index: 15,
    metadata_in_spawn: false,
    component_names: true,
};

/// Selects the codec for a client version. Called once per connection.
pub fn codec_for(version: ProtocolVersion) -> &'static dyn EntityCodec {
    let codec: &'static dyn EntityCodec = if version < ProtocolVersion::V1_9 {
        &LEGACY
    } else if version < ProtocolVersion::V1_13 {
        &MODERN_1_9
    } else if version < ProtocolVersion::V1_14 {
        &MODERN_1_13
    } else if version < ProtocolVersion::V1_15 {
        &MODERN_1_14
    } else if version < ProtocolVersion::V1_17 {
        &MODERN_1_15
    } else if version < ProtocolVersion::V1_19 {
        &MODERN_1_17
    } else {
        &MODERN_1_19
    };
    tracing::trace!(%version, codec = codec.name(), "selected entity codec");
    codec
}
