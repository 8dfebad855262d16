//! Configuration for the name tag overlay engine.
//!
//! Settings persist to disk as a RON file. Supports CLI overrides via clap,
//! hot-reload detection, and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, IdentifierConfig, LineConfig, LoggingConfig, NameTagConfig};
pub use error::ConfigError;
