//! Errors raised while persisting the overlay's `config.ron`.

/// Failures of [`Config::load_or_create`](crate::Config::load_or_create),
/// [`Config::save`](crate::Config::save) and
/// [`Config::reload`](crate::Config::reload). The demo host falls back to
/// defaults on any of them; the engine never sees one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `config.ron` exists but could not be read.
    #[error("cannot read config.ron: {0}")]
    ReadError(#[source] std::io::Error),

    /// The config directory or `config.ron` could not be written.
    #[error("cannot write config.ron: {0}")]
    WriteError(#[source] std::io::Error),

    /// `config.ron` is not valid RON for [`Config`](crate::Config), e.g. a
    /// mistyped offset table or a non-numeric view distance.
    #[error("invalid config.ron: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// The in-memory settings could not be rendered as RON.
    #[error("cannot serialize name tag settings: {0}")]
    SerializeError(#[source] ron::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(nametags: (view_distance: \"far\"))")
            .unwrap();
        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().starts_with("invalid config.ron"));
    }

    #[test]
    fn test_reload_of_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::default().reload(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
