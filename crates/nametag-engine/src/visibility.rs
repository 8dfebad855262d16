//! Per-pair visibility of marker sets.

use crate::player::RealPlayer;

// ---------------------------------------------------------------------------
// VisibilityEdge
// ---------------------------------------------------------------------------

/// Everything needed to decide whether `viewer` should see `owner`'s markers.
/// Built fresh from current snapshots each time a decision is needed.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityEdge<'a> {
    /// Player wearing the markers.
    pub owner: &'a RealPlayer,
    /// Player who would receive them.
    pub viewer: &'a RealPlayer,
    /// Overlay enabled for the owner (zone rule and personal toggle).
    pub owner_enabled: bool,
    /// Overlay enabled for the viewer.
    pub viewer_enabled: bool,
    /// The game's own can-see relation.
    pub viewer_can_see_owner: bool,
}

// ---------------------------------------------------------------------------
// VisibilityFilter
// ---------------------------------------------------------------------------

/// Stateless visibility rule parameterized by view distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityFilter {
    /// Maximum horizontal distance in blocks, inclusive.
    pub view_distance: f64,
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        Self {
            view_distance: 48.0,
        }
    }
}

impl VisibilityFilter {
    /// Creates a filter with the given view distance.
    pub fn new(view_distance: f64) -> Self {
        Self { view_distance }
    }

    /// Returns `true` if the viewer should currently see the owner's markers.
    pub fn is_visible(&self, edge: &VisibilityEdge<'_>) -> bool {
        let VisibilityEdge {
            owner,
            viewer,
            owner_enabled,
            viewer_enabled,
            viewer_can_see_owner,
        } = *edge;

        if owner.id == viewer.id {
            return false;
        }
        if !viewer.protocol.supports_markers() {
            return false;
        }
        if owner.zone != viewer.zone {
            return false;
        }
        if !owner_enabled || !viewer_enabled || !viewer_can_see_owner {
            return false;
        }
        owner.position.horizontal_distance(&viewer.position) <= self.view_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nametag_protocol::{EntityId, PlayerId, Position, ProtocolVersion};

    fn owner() -> RealPlayer {
        RealPlayer::new(PlayerId(1), EntityId(10), "owner")
    }

    fn viewer_at(x: f64) -> RealPlayer {
        RealPlayer::new(PlayerId(2), EntityId(20), "viewer").at(Position::new(x, 0.0, 0.0))
    }

    fn edge<'a>(owner: &'a RealPlayer, viewer: &'a RealPlayer) -> VisibilityEdge<'a> {
        VisibilityEdge {
            owner,
            viewer,
            owner_enabled: true,
            viewer_enabled: true,
            viewer_can_see_owner: true,
        }
    }

    #[test]
    fn test_distance_boundary_is_inclusive() {
        let filter = VisibilityFilter::new(48.0);
        let owner = owner();
        for (x, expected) in [(47.9, true), (48.0, true), (48.1, false)] {
            let viewer = viewer_at(x);
            assert_eq!(filter.is_visible(&edge(&owner, &viewer)), expected, "distance {x}");
        }
    }

    #[test]
    fn test_height_does_not_count() {
        let filter = VisibilityFilter::default();
        let owner = owner();
        let viewer = viewer_at(10.0).at(Position::new(10.0, 300.0, 0.0));
        assert!(filter.is_visible(&edge(&owner, &viewer)));
    }

    #[test]
    fn test_never_visible_to_self() {
        let filter = VisibilityFilter::default();
        let owner = owner();
        assert!(!filter.is_visible(&edge(&owner, &owner)));
    }

    #[test]
    fn test_zone_and_protocol_gate() {
        let filter = VisibilityFilter::default();
        let owner = owner();
        let elsewhere = viewer_at(1.0).in_zone("nether");
        assert!(!filter.is_visible(&edge(&owner, &elsewhere)));

        let old_client = viewer_at(1.0).with_protocol(ProtocolVersion::V1_7);
        assert!(!filter.is_visible(&edge(&owner, &old_client)));
    }

    #[test]
    fn test_enablement_and_vanish_veto() {
        let filter = VisibilityFilter::default();
        let owner = owner();
        let viewer = viewer_at(1.0);

        let mut e = edge(&owner, &viewer);
        e.owner_enabled = false;
        assert!(!filter.is_visible(&e));

        let mut e = edge(&owner, &viewer);
        e.viewer_enabled = false;
        assert!(!filter.is_visible(&e));

        let mut e = edge(&owner, &viewer);
        e.viewer_can_see_owner = false;
        assert!(!filter.is_visible(&e));
    }
}
