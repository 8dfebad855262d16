//! Entity metadata entries and the marker appearance they encode.

use serde::{Deserialize, Serialize};

use crate::version::EntityCodec;

/// Base entity flag: entity renders crouched; dims the floating name.
pub const FLAG_SNEAKING: u8 = 0x02;
/// Base entity flag: entity body is invisible.
pub const FLAG_INVISIBLE: u8 = 0x20;
/// Armor stand flag: zero-size hitbox.
pub const ARMOR_STAND_MARKER: u8 = 0x10;

/// Index of the base entity flags byte.
pub const INDEX_FLAGS: u8 = 0;
/// Index of the custom name entry.
pub const INDEX_CUSTOM_NAME: u8 = 2;
/// Index of the custom-name-visible entry.
pub const INDEX_NAME_VISIBLE: u8 = 3;

/// A single typed metadata value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MetadataValue {
    /// Raw byte.
    Byte(u8),
    /// Boolean.
    Bool(bool),
    /// Plain string (legacy custom names).
    String(String),
    /// Optional JSON text component (modern custom names).
    OptionalComponent(Option<String>),
}

/// One metadata slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataEntry {
    /// Slot index.
    pub index: u8,
    /// Slot value.
    pub value: MetadataValue,
}

impl MetadataEntry {
    /// Creates an entry.
    pub fn new(index: u8, value: MetadataValue) -> Self {
        Self { index, value }
    }
}

/// Everything that decides how a marker looks to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkerAppearance {
    /// Resolved label text. Empty text hides the name.
    pub text: String,
    /// Mirrors the owner's sneaking state.
    pub sneaking: bool,
}

impl MarkerAppearance {
    /// Encodes the appearance with the viewer's codec.
    pub fn to_metadata(&self, codec: &dyn EntityCodec) -> Vec<MetadataEntry> {
        let mut flags = FLAG_INVISIBLE;
        if self.sneaking {
            flags |= FLAG_SNEAKING;
        }

        let mut entries = vec![
            MetadataEntry::new(INDEX_FLAGS, MetadataValue::Byte(flags)),
            MetadataEntry::new(INDEX_CUSTOM_NAME, codec.custom_name(&self.text)),
            MetadataEntry::new(INDEX_NAME_VISIBLE, codec.name_visible(!self.text.is_empty())),
        ];
        if codec.uses_marker_flag() {
            entries.push(MetadataEntry::new(
                codec.armor_stand_flags_index(),
                MetadataValue::Byte(ARMOR_STAND_MARKER),
            ));
        }
        entries
    }
}
