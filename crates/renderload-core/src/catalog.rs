//! Target catalog loaded from a single-column CSV file

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{RenderLoadError, Result};

/// Comment marker for catalog lines
const COMMENT: u8 = b'#';

/// Immutable ordered list of render targets.
///
/// Cloning is cheap: every clone shares the same backing slice, so one
/// catalog can feed every generator of a run without copying.
#[derive(Debug, Clone)]
pub struct TargetCatalog {
    targets: Arc<[String]>,
}

impl TargetCatalog {
    /// Build a catalog from already known targets
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a catalog from a CSV file.
    ///
    /// The first non-comment row is a header and is discarded. Every other
    /// row must contain exactly one column.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| RenderLoadError::CatalogIo {
            path: path.display().to_string(),
            source,
        })?;

        let catalog = Self::from_reader(file)?;
        info!(
            "Loaded {} targets from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse a catalog from any CSV reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(COMMENT))
            .flexible(true)
            .from_reader(reader);

        let header = reader.headers()?.clone();
        if !header.is_empty() && header.len() != 1 {
            return Err(RenderLoadError::ColumnCount {
                line: header.position().map(|p| p.line()).unwrap_or(1),
                found: header.len(),
            });
        }

        let mut targets = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() != 1 {
                return Err(RenderLoadError::ColumnCount {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    found: record.len(),
                });
            }
            targets.push(record[0].to_string());
        }

        debug!("Parsed {} catalog rows", targets.len());
        Ok(Self::new(targets))
    }

    /// Number of targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the catalog holds no targets
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Target at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.targets.get(index).map(String::as_str)
    }
}
