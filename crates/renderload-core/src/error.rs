//! Error types for catalog loading, configuration and run plan assembly

use thiserror::Error;

/// Result type alias for renderload core operations
pub type Result<T> = std::result::Result<T, RenderLoadError>;

/// Errors that can occur before a run starts.
///
/// Query generation itself never fails once a generator exists; every
/// variant here is a startup failure.
#[derive(Error, Debug)]
pub enum RenderLoadError {
    // === Catalog ===
    /// Catalog file could not be opened or read
    #[error("Failed to read target catalog {path}: {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Catalog contents are not valid CSV
    #[error("Failed to parse target catalog: {0}")]
    CatalogParse(#[from] csv::Error),

    /// A catalog row did not have exactly one column
    #[error("Target catalog line {line}: expected 1 column, found {found}")]
    ColumnCount { line: u64, found: usize },

    /// The catalog holds no targets after the header is discarded
    #[error("Target catalog is empty")]
    EmptyCatalog,

    // === Configuration ===
    /// Two groups share a name (names key the per-group metrics)
    #[error("Duplicate query group name: {0}")]
    DuplicateGroup(String),

    /// A concurrency override named a group the plan does not define
    #[error("Unknown query group: {0}")]
    UnknownGroup(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read
    #[error("Failed to read configuration {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for `RunConfig`
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl RenderLoadError {
    /// Whether the error comes from the target catalog rather than configuration
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            Self::CatalogIo { .. }
                | Self::CatalogParse(_)
                | Self::ColumnCount { .. }
                | Self::EmptyCatalog
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderLoadError::ColumnCount { line: 4, found: 2 };
        let msg = format!("{}", err);
        assert!(msg.contains("line 4"));
        assert!(msg.contains("found 2"));
    }

    #[test]
    fn test_catalog_errors() {
        assert!(RenderLoadError::EmptyCatalog.is_catalog_error());
        assert!(!RenderLoadError::DuplicateGroup("1 Hour".into()).is_catalog_error());
    }
}
