//! Command-line argument parsing for the overlay demo host.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Overlay command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "nametag", about = "Name tag overlay engine")]
pub struct CliArgs {
    /// Maximum horizontal distance at which name tags are shown.
    #[arg(long)]
    pub view_distance: Option<f64>,

    /// Zone in which the overlay is turned off. May be repeated.
    #[arg(long = "disable-zone")]
    pub disabled_zones: Vec<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of simulated players.
    #[arg(long, default_value_t = 4)]
    pub players: u32,

    /// Number of simulated ticks.
    #[arg(long, default_value_t = 100)]
    pub ticks: u32,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(distance) = args.view_distance {
            self.nametags.view_distance = distance;
        }
        for zone in &args.disabled_zones {
            if !self.nametags.disabled_zones.contains(zone) {
                self.nametags.disabled_zones.push(zone.clone());
            }
        }
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            view_distance: None,
            disabled_zones: Vec::new(),
            log_level: None,
            config: None,
            players: 4,
            ticks: 100,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            view_distance: Some(16.0),
            log_level: Some("debug".to_string()),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.nametags.view_distance, 16.0);
        assert_eq!(config.logging.level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.nametags.line_spacing, 0.26);
    }

    #[test]
    fn test_cli_disabled_zones_deduplicated() {
        let mut config = Config::default();
        config.nametags.disabled_zones.push("lobby".to_string());
        let args = CliArgs {
            disabled_zones: vec!["lobby".to_string(), "arena".to_string()],
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.nametags.disabled_zones, vec!["lobby", "arena"]);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "nametag",
            "--view-distance",
            "32",
            "--disable-zone",
            "lobby",
            "--players",
            "8",
        ]);
        assert_eq!(args.view_distance, Some(32.0));
        assert_eq!(args.disabled_zones, vec!["lobby"]);
        assert_eq!(args.players, 8);
        assert_eq!(args.ticks, 100);
    }
}
