//! Configuration structs with sensible defaults and RON persistence.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level overlay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Name tag lines, geometry and visibility settings.
    pub nametags: NameTagConfig,
    /// Synthetic entity identifier partition.
    pub identifiers: IdentifierConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// One label line rendered by one marker entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineConfig {
    /// Line name, e.g. `"nametag"` or `"abovename"`.
    pub name: String,
    /// Placeholder template handed to the placeholder resolver.
    pub template: String,
}

impl LineConfig {
    /// Creates a line from a name and template.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// Name tag geometry, lines and visibility rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NameTagConfig {
    /// Maximum horizontal distance (blocks) at which markers are sent. Inclusive.
    pub view_distance: f64,
    /// Zones (worlds) in which the overlay is turned off.
    pub disabled_zones: Vec<String>,
    /// Label lines from bottom to top. One marker entity per line.
    pub lines: Vec<LineConfig>,
    /// Vertical distance between stacked lines.
    pub line_spacing: f64,
    /// Height of the bottom line above the owner's position.
    pub base_height: f64,
    /// Vertical offset per pose name (`standing`, `sneaking`, `swimming`, `gliding`).
    pub pose_offsets: BTreeMap<String, f64>,
    /// Vertical offset per vehicle kind while mounted (`boat`, `horse`, ...).
    pub vehicle_offsets: BTreeMap<String, f64>,
    /// Extra height per passenger seat index so co-passengers' labels stack.
    pub seat_spacing: f64,
}

impl Default for NameTagConfig {
    fn default() -> Self {
        let pose_offsets = [
            ("standing", 0.0),
            ("sneaking", -0.45),
            ("swimming", -1.22),
            ("gliding", -1.22),
        ]
        .into_iter()
        .map(|(pose, offset)| (pose.to_string(), offset))
        .collect();

        let vehicle_offsets = [
            ("boat", -0.9),
            ("minecart", -0.9),
            ("horse", 0.85),
            ("pig", 0.3),
        ]
        .into_iter()
        .map(|(kind, offset)| (kind.to_string(), offset))
        .collect();

        Self {
            view_distance: 48.0,
            disabled_zones: Vec::new(),
            lines: vec![
                LineConfig::new("belowname", "%health%"),
                LineConfig::new("nametag", "%prefix%%name%%suffix%"),
                LineConfig::new("abovename", ""),
            ],
            line_spacing: 0.26,
            base_height: 0.0,
            pose_offsets,
            vehicle_offsets,
            seat_spacing: 0.26,
        }
    }
}

/// Partition of the 32-bit entity id space reserved for synthetic entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentifierConfig {
    /// First synthetic id (inclusive).
    pub range_start: i32,
    /// Last synthetic id (inclusive).
    pub range_end: i32,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            range_start: 2_000_000_000,
            range_end: i32::MAX,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
