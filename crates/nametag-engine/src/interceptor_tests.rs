//! Unit tests for packet interception.

use super::*;
use nametag_config::Config;
use nametag_protocol::{InteractAction, OpaquePacket, ProtocolVersion, RotateEntity};

use crate::pose::Mount;
use crate::synchronizer::{LifecycleObserver, MountObserver};
use crate::test_support::{Harness, entity_of, ids_of};

fn interact(entity_id: EntityId) -> Serverbound {
    Serverbound::Interact(Interact {
        entity_id,
        action: InteractAction::Attack,
        sneaking: false,
    })
}

fn target_of(packet: &Serverbound) -> EntityId {
    match packet {
        Serverbound::Interact(interact) => interact.entity_id,
        Serverbound::Other(_) => panic!("expected an interaction"),
    }
}

// -- Spawn ----------------------------------------------------------------

#[test]
fn test_spawn_appends_marker_spawns_after_original() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);

    let packets = h.spawn(&viewer, &owner);
    assert!(matches!(&packets[0], Clientbound::SpawnPlayer(s) if s.player_id == owner.id));

    let markers = h.engine.marker_ids(owner.id);
    assert_eq!(markers.len(), 3);
    assert_eq!(ids_of(&packets, "spawn_entity"), markers);
    // Modern clients get metadata in a separate packet per marker.
    assert_eq!(ids_of(&packets, "set_entity_data"), markers);
    assert!(h.engine.is_shown_to(owner.id, viewer.id));
}

#[test]
fn test_legacy_spawn_carries_metadata_inline() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join(Harness::player(2, 5.0).with_protocol(ProtocolVersion::V1_8));

    let packets = h.spawn(&viewer, &owner);
    assert_eq!(packets.len(), 1 + 3);
    assert!(ids_of(&packets, "set_entity_data").is_empty());
}

#[test]
fn test_spawn_out_of_range_is_untouched() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 200.0);

    assert_eq!(h.spawn(&viewer, &owner).len(), 1);
    assert!(!h.engine.is_shown_to(owner.id, viewer.id));
}

#[test]
fn test_respawn_for_tracking_viewer_does_not_duplicate() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);

    assert_eq!(h.spawn(&viewer, &owner).len(), 7);
    assert_eq!(h.spawn(&viewer, &owner).len(), 1);
}

#[test]
fn test_viewer_without_marker_support_is_untouched() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join(Harness::player(2, 5.0).with_protocol(ProtocolVersion::V1_7));

    assert_eq!(h.spawn(&viewer, &owner).len(), 1);
    let moved = h.engine.intercept_outbound(
        viewer.id,
        Harness::move_packet(owner.entity_id, Position::new(0.5, 0.0, 0.0)),
    );
    assert_eq!(moved.len(), 1);
}

#[test]
fn test_unknown_viewer_passes_through() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let ghost = Harness::player(9, 1.0);
    assert_eq!(h.spawn(&ghost, &owner).len(), 1);
}

// -- Movement -------------------------------------------------------------

#[test]
fn test_owner_move_moves_markers_for_visible_viewers_only() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let near = h.join_at(2, 10.0);
    let vanished = h.join_at(3, 10.0);
    let far = h.join_at(4, 200.0);
    h.players.hide(vanished.id, owner.id);

    for viewer in [&near, &vanished, &far] {
        h.spawn(viewer, &owner);
    }

    let markers = h.engine.marker_ids(owner.id);
    let delta = Position::new(0.25, 0.0, 0.5);
    for (viewer, expected) in [(&near, markers.len()), (&vanished, 0), (&far, 0)] {
        let packets = h
            .engine
            .intercept_outbound(viewer.id, Harness::move_packet(owner.entity_id, delta));
        assert!(matches!(&packets[0], Clientbound::MoveEntity(m) if m.entity_id == owner.entity_id));
        let marker_moves: Vec<_> = ids_of(&packets, "move_entity")
            .into_iter()
            .filter(|id| markers.contains(id))
            .collect();
        assert_eq!(marker_moves.len(), expected, "viewer {}", viewer.id);
    }
}

#[test]
fn test_marker_moves_carry_owner_delta() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);
    h.spawn(&viewer, &owner);

    let delta = Position::new(0.25, -0.5, 1.0);
    let packets = h
        .engine
        .intercept_outbound(viewer.id, Harness::move_packet(owner.entity_id, delta));
    for packet in &packets[1..] {
        let Clientbound::MoveEntity(movement) = packet else {
            panic!("expected only moves, got {}", packet.kind());
        };
        assert_eq!(movement.delta, delta);
    }
}

#[test]
fn test_leaving_range_destroys_markers_in_same_batch() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 40.0);
    h.spawn(&viewer, &owner);

    h.place(owner.id, Position::new(-10.0, 64.0, 0.0));
    let packets = h.engine.intercept_outbound(
        viewer.id,
        Harness::move_packet(owner.entity_id, Position::new(-3.0, 0.0, 0.0)),
    );
    assert_eq!(packets.len(), 2);
    assert_eq!(ids_of(&packets, "remove_entities"), h.engine.marker_ids(owner.id));
    assert!(!h.engine.is_shown_to(owner.id, viewer.id));
}

#[test]
fn test_entering_range_spawns_markers() {
    let h = Harness::new();
    let owner = h.join_at(1, 100.0);
    let viewer = h.join_at(2, 0.0);
    assert_eq!(h.spawn(&viewer, &owner).len(), 1);

    h.place(owner.id, Position::new(30.0, 64.0, 0.0));
    let packets = h.engine.intercept_outbound(
        viewer.id,
        Harness::teleport_packet(owner.entity_id, Position::new(30.0, 64.0, 0.0)),
    );
    assert_eq!(ids_of(&packets, "spawn_entity"), h.engine.marker_ids(owner.id));
    assert!(h.engine.is_shown_to(owner.id, viewer.id));
}

#[test]
fn test_unencodable_move_falls_back_to_teleport() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join(Harness::player(2, 10.0).with_protocol(ProtocolVersion::V1_8));
    h.spawn(&viewer, &owner);

    h.place(owner.id, Position::new(6.0, 64.0, 0.0));
    let packets = h.engine.intercept_outbound(
        viewer.id,
        Harness::move_packet(owner.entity_id, Position::new(6.0, 0.0, 0.0)),
    );
    assert_eq!(ids_of(&packets, "teleport_entity"), h.engine.marker_ids(owner.id));
    assert!(ids_of(&packets[1..], "move_entity").is_empty());
}

#[test]
fn test_teleport_places_markers_above_packet_position() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);
    h.spawn(&viewer, &owner);

    let target = Position::new(3.0, 80.0, -4.0);
    let packets = h
        .engine
        .intercept_outbound(viewer.id, Harness::teleport_packet(owner.entity_id, target));
    let heights: Vec<f64> = packets[1..]
        .iter()
        .map(|p| match p {
            Clientbound::TeleportEntity(t) => {
                assert_eq!((t.position.x, t.position.z), (3.0, -4.0));
                t.position.y - target.y
            }
            other => panic!("unexpected {}", other.kind()),
        })
        .collect();
    assert_eq!(heights.len(), 3);
    assert!((heights[0] - 0.0).abs() < 1e-9);
    assert!((heights[1] - 0.26).abs() < 1e-9);
    assert!((heights[2] - 0.52).abs() < 1e-9);
}

#[test]
fn test_rotation_and_opaque_packets_pass_through() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);
    h.spawn(&viewer, &owner);

    let rotate = Clientbound::RotateEntity(RotateEntity {
        entity_id: owner.entity_id,
        yaw: 90.0,
        pitch: 0.0,
    });
    assert_eq!(h.engine.intercept_outbound(viewer.id, rotate.clone()), vec![rotate]);

    let opaque = Clientbound::Other(OpaquePacket {
        packet_id: 0x21,
        body: vec![1, 2, 3],
    });
    assert_eq!(h.engine.intercept_outbound(viewer.id, opaque.clone()), vec![opaque]);
}

#[test]
fn test_zero_delta_move_still_moves_every_marker() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);
    h.spawn(&viewer, &owner);
    let markers = h.engine.marker_ids(owner.id);

    let landing = Clientbound::MoveEntity(MoveEntity {
        entity_id: owner.entity_id,
        delta: Position::default(),
        on_ground: false,
    });
    let packets = h.engine.intercept_outbound(viewer.id, landing.clone());
    assert_eq!(packets[0], landing);
    assert_eq!(ids_of(&packets[1..], "move_entity"), markers);
    for packet in &packets[1..] {
        let Clientbound::MoveEntity(movement) = packet else {
            panic!("expected only moves, got {}", packet.kind());
        };
        assert_eq!(movement.delta, Position::default());
        assert!(!movement.on_ground);
    }
}

#[test]
fn test_vehicle_move_carries_passenger_markers() {
    let h = Harness::new();
    let boat = EntityId(500);
    let front = h.join_at(1, 0.0);
    let back = h.join_at(3, 0.0);
    let viewer = h.join_at(2, 10.0);
    h.engine.on_mount(front.id, Mount::new(boat, "boat", 0));
    h.engine.on_mount(back.id, Mount::new(boat, "boat", 1));
    h.spawn(&viewer, &front);
    h.spawn(&viewer, &back);

    let packets = h
        .engine
        .intercept_outbound(viewer.id, Harness::move_packet(boat, Position::new(1.0, 0.0, 0.0)));
    let moved = ids_of(&packets[1..], "move_entity");
    let mut expected = h.engine.marker_ids(front.id);
    expected.extend(h.engine.marker_ids(back.id));
    assert_eq!(moved, expected);

    h.engine.on_dismount(back.id);
    let packets = h
        .engine
        .intercept_outbound(viewer.id, Harness::move_packet(boat, Position::new(1.0, 0.0, 0.0)));
    assert_eq!(ids_of(&packets[1..], "move_entity"), h.engine.marker_ids(front.id));
}

// -- Destroy --------------------------------------------------------------

#[test]
fn test_destroy_batch_includes_every_owner_marker() {
    let h = Harness::new();
    let owner1 = h.join_at(1, 0.0);
    let owner2 = h.join_at(2, 5.0);
    let viewer = h.join_at(3, 10.0);
    h.spawn(&viewer, &owner1);
    h.spawn(&viewer, &owner2);

    let batch = Clientbound::RemoveEntities(RemoveEntities {
        entity_ids: vec![owner1.entity_id, owner2.entity_id, EntityId(7)],
    });
    let packets = h.engine.intercept_outbound(viewer.id, batch);
    assert_eq!(packets.len(), 1);

    let removed = ids_of(&packets, "remove_entities");
    assert_eq!(&removed[..3], &[owner1.entity_id, owner2.entity_id, EntityId(7)]);
    for id in h
        .engine
        .marker_ids(owner1.id)
        .into_iter()
        .chain(h.engine.marker_ids(owner2.id))
    {
        assert!(removed.contains(&id), "marker {id} missing from batch");
    }
    assert_eq!(removed.len(), 3 + 6);
    assert!(!h.engine.is_shown_to(owner1.id, viewer.id));
    assert!(!h.engine.is_shown_to(owner2.id, viewer.id));
}

#[test]
fn test_destroy_of_unrelated_entities_is_untouched() {
    let h = Harness::new();
    let viewer = h.join_at(3, 10.0);
    let batch = Clientbound::RemoveEntities(RemoveEntities {
        entity_ids: vec![EntityId(7), EntityId(8)],
    });
    assert_eq!(h.engine.intercept_outbound(viewer.id, batch.clone()), vec![batch]);
}

#[test]
fn test_respawn_after_destroy_spawns_markers_again() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);
    h.spawn(&viewer, &owner);
    h.engine.intercept_outbound(
        viewer.id,
        Clientbound::RemoveEntities(RemoveEntities {
            entity_ids: vec![owner.entity_id],
        }),
    );
    assert_eq!(h.spawn(&viewer, &owner).len(), 7);
}

// -- Identifier space -----------------------------------------------------

#[test]
fn test_real_ids_inside_partition_are_reserved() {
    let mut config = Config::default();
    config.identifiers.range_start = 1_000;
    config.identifiers.range_end = 1_100;
    let h = Harness::with_config(config);
    let first = h.join_at(1, 0.0);
    assert_eq!(
        h.engine.marker_ids(first.id),
        vec![EntityId(1_000), EntityId(1_001), EntityId(1_002)]
    );

    let viewer = h.join_at(2, 5.0);
    // The host spawned a real entity whose id falls in the partition.
    h.engine.intercept_outbound(
        viewer.id,
        Clientbound::SpawnEntity(SpawnEntity {
            entity_id: EntityId(1_006),
            type_id: 12,
            position: Position::default(),
            metadata: Vec::new(),
        }),
    );
    assert_eq!(
        h.engine.marker_ids(viewer.id),
        vec![EntityId(1_003), EntityId(1_004), EntityId(1_005)]
    );
    let third = h.join_at(3, 5.0);
    assert_eq!(
        h.engine.marker_ids(third.id),
        vec![EntityId(1_007), EntityId(1_008), EntityId(1_009)]
    );
}

#[test]
fn test_echo_of_released_marker_spawn_keeps_id_recyclable() {
    let mut config = Config::default();
    config.identifiers.range_start = 1_000;
    config.identifiers.range_end = 1_005;
    let h = Harness::with_config(config);
    let leaver = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 5.0);
    let released = h.engine.marker_ids(leaver.id);

    h.players.remove(leaver.id);
    h.engine.on_disconnect(leaver.id);
    h.engine.intercept_outbound(
        viewer.id,
        Clientbound::SpawnEntity(SpawnEntity {
            entity_id: released[0],
            type_id: 1,
            position: Position::default(),
            metadata: Vec::new(),
        }),
    );

    let newcomer = h.join_at(3, 5.0);
    assert_eq!(h.engine.marker_ids(newcomer.id), released);
}

// -- Inbound --------------------------------------------------------------

#[test]
fn test_interact_with_marker_targets_owner() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);

    for marker in h.engine.marker_ids(owner.id) {
        let rewritten = h.engine.intercept_inbound(viewer.id, interact(marker));
        assert_eq!(target_of(&rewritten), owner.entity_id);
    }
}

#[test]
fn test_interact_with_unknown_id_is_unchanged() {
    let h = Harness::new();
    h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);

    for id in [EntityId(42), EntityId(2_100_000_000)] {
        let packet = interact(id);
        assert_eq!(h.engine.intercept_inbound(viewer.id, packet.clone()), packet);
    }
    let other = Serverbound::Other(OpaquePacket {
        packet_id: 3,
        body: Vec::new(),
    });
    assert_eq!(h.engine.intercept_inbound(viewer.id, other.clone()), other);
}

#[test]
fn test_interact_with_own_marker_is_unchanged() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let marker = h.engine.marker_ids(owner.id)[0];
    let packet = interact(marker);
    assert_eq!(h.engine.intercept_inbound(owner.id, packet.clone()), packet);
}

#[test]
fn test_interact_with_offline_owner_fails_open() {
    let h = Harness::new();
    let owner = h.join_at(1, 0.0);
    let viewer = h.join_at(2, 10.0);
    let marker = h.engine.marker_ids(owner.id)[0];
    // Gone from the registry but the disconnect hook has not run yet.
    h.players.remove(owner.id);

    let packet = interact(marker);
    assert_eq!(h.engine.intercept_inbound(viewer.id, packet.clone()), packet);
    assert_ne!(target_of(&packet), entity_of(1));
}
