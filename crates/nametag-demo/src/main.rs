//! Demo binary that runs a simulated multiplayer session through the name
//! tag overlay engine.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p nametag-demo` to simulate the default session.
//! Run with `cargo run -p nametag-demo -- --players 8 --ticks 400 --view-distance 32`
//! to override the session size and view distance.

mod session;

use std::path::PathBuf;

use clap::Parser;
use nametag_config::{CliArgs, Config};
use nametag_protocol::{ProtocolVersion, codec_for};
use tracing::{info, warn};

use session::Session;

/// Logs which codec each supported client generation gets.
fn demonstrate_codec_selection() {
    for version in [
        ProtocolVersion::V1_7,
        ProtocolVersion::V1_8,
        ProtocolVersion::V1_9,
        ProtocolVersion::V1_13,
        ProtocolVersion::V1_14,
        ProtocolVersion::V1_15,
        ProtocolVersion::V1_17,
        ProtocolVersion::V1_19,
    ] {
        let codec = codec_for(version);
        info!(
            %version,
            codec = codec.name(),
            markers = version.supports_markers(),
            armor_stand_type = codec.armor_stand_type_id(),
            max_relative_move = codec.max_relative_move(),
            "codec selection"
        );
    }
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .map(|dir| dir.join("nametag"))
            .unwrap_or_else(|| PathBuf::from(".nametag"))
    });

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    // Initialize logging with config and debug settings
    let log_dir = config_dir.join("logs");
    nametag_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        config_dir = %config_dir.display(),
        view_distance = config.nametags.view_distance,
        players = args.players,
        ticks = args.ticks,
        "starting name tag overlay demo"
    );

    demonstrate_codec_selection();

    if args.players < 2 {
        warn!(players = args.players, "fewer than two players, nobody will see a name tag");
    }

    let mut session = Session::new(&config, args.players);
    session.run(args.ticks);
    session.toggle_feature();
    session.disconnect_last();

    let stats = session.stats();
    info!(
        online = session.online().len(),
        overlays = session.engine().overlay_count(),
        live_marker_ids = session.engine().live_marker_ids(),
        outbound_in = stats.outbound_in,
        outbound_out = stats.outbound_out,
        engine_initiated = stats.engine_initiated,
        pose_changes = stats.pose_changes,
        rewritten_interactions = stats.rewritten_interactions,
        "session finished"
    );

    match config.reload(&config_dir) {
        Ok(Some(_)) => info!("config.ron changed on disk during the session"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "could not re-read config.ron"),
    }
}
