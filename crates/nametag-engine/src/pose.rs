//! Player pose and mount state, and the table that turns them into marker
//! placement.

use std::collections::BTreeMap;
use std::fmt;

use nametag_config::NameTagConfig;
use nametag_protocol::EntityId;

/// Raw pose flags as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoseFlags {
    /// Crouching.
    pub sneaking: bool,
    /// Swimming (horizontal body).
    pub swimming: bool,
    /// Elytra gliding (horizontal body).
    pub gliding: bool,
    /// In a bed.
    pub sleeping: bool,
}

impl PoseFlags {
    /// Flags with only `sneaking` set.
    pub const fn sneaking() -> Self {
        Self {
            sneaking: true,
            swimming: false,
            gliding: false,
            sleeping: false,
        }
    }
}

/// The effective pose. When several flags are set the most specific one wins:
/// sleeping, then gliding, then swimming, then sneaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pose {
    /// Upright.
    Standing,
    /// Crouching.
    Sneaking,
    /// Swimming.
    Swimming,
    /// Gliding.
    Gliding,
    /// Sleeping; markers are hidden.
    Sleeping,
}

impl Pose {
    /// Derives the effective pose from raw flags.
    pub fn from_flags(flags: PoseFlags) -> Self {
        if flags.sleeping {
            Self::Sleeping
        } else if flags.gliding {
            Self::Gliding
        } else if flags.swimming {
            Self::Swimming
        } else if flags.sneaking {
            Self::Sneaking
        } else {
            Self::Standing
        }
    }

    /// Key used in the configured offset table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standing => "standing",
            Self::Sneaking => "sneaking",
            Self::Swimming => "swimming",
            Self::Gliding => "gliding",
            Self::Sleeping => "sleeping",
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's seat in a vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    /// Entity id of the vehicle.
    pub vehicle_id: EntityId,
    /// Vehicle kind, the key into the vehicle offset table.
    pub vehicle_kind: String,
    /// Zero-based passenger seat.
    pub seat_index: usize,
}

impl Mount {
    /// Creates a mount record.
    pub fn new(vehicle_id: EntityId, vehicle_kind: impl Into<String>, seat_index: usize) -> Self {
        Self {
            vehicle_id,
            vehicle_kind: vehicle_kind.into(),
            seat_index,
        }
    }
}

/// Where a marker set goes for a given pose and mount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Markers are not shown at all.
    Hidden,
    /// Markers are shown, shifted vertically by this many blocks.
    Offset(f64),
}

/// Pose and vehicle offsets from configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OffsetTable {
    poses: BTreeMap<String, f64>,
    vehicles: BTreeMap<String, f64>,
    seat_spacing: f64,
}

impl OffsetTable {
    /// Builds the table from name tag configuration.
    pub fn from_config(config: &NameTagConfig) -> Self {
        Self {
            poses: config.pose_offsets.clone(),
            vehicles: config.vehicle_offsets.clone(),
            seat_spacing: config.seat_spacing,
        }
    }

    /// Resolves placement. A mount overrides the pose. Missing table entries
    /// fall back to a zero offset with a configuration warning.
    pub fn placement(&self, flags: PoseFlags, mount: Option<&Mount>) -> Placement {
        if let Some(mount) = mount {
            let vehicle = match self.vehicles.get(&mount.vehicle_kind) {
                Some(offset) => *offset,
                None => {
                    tracing::warn!(
                        vehicle = %mount.vehicle_kind,
                        "no offset configured for vehicle kind, using 0"
                    );
                    0.0
                }
            };
            return Placement::Offset(vehicle + mount.seat_index as f64 * self.seat_spacing);
        }

        let pose = Pose::from_flags(flags);
        if pose == Pose::Sleeping {
            return Placement::Hidden;
        }
        match self.poses.get(pose.as_str()) {
            Some(offset) => Placement::Offset(*offset),
            None => {
                tracing::warn!(%pose, "no offset configured for pose, using 0");
                Placement::Offset(0.0)
            }
        }
    }
}
