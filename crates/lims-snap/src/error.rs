//! Error types for lims-snap
//!
//! Every failure aborts the whole assembly; there is no partial payload.

use std::path::PathBuf;
use thiserror::Error;

use crate::path::PathParseError;

/// Result type alias for assembly operations
pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Errors raised while assembling snapping inputs
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// The image-dimension query returned no rows
    #[error("image series {series_id} not found (no Biocytin image)")]
    MissingSeries { series_id: i64 },

    /// A required cortical surface is absent
    #[error("missing required surface '{label}'")]
    MissingSurface { label: String },

    /// A cortical surface was drawn more than once
    #[error("surface '{label}' returned {count} times; expected exactly one")]
    DuplicateSurface { label: String, count: usize },

    /// Several Biocytin images disagree on their dimensions
    #[error("image series {series_id} has conflicting image dimensions")]
    AmbiguousDimensions { series_id: i64 },

    /// Width or height is not a positive finite number
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    /// A stored point list could not be parsed
    #[error("malformed path for '{name}': {source}")]
    MalformedPath {
        name: String,
        #[source]
        source: PathParseError,
    },

    /// A result row lacks a column or holds the wrong type
    #[error("unexpected value in column '{column}': expected {expected}")]
    UnexpectedColumn {
        column: &'static str,
        expected: &'static str,
    },

    /// Two images would be written to the same output path
    #[error("output path collision: {}", path.display())]
    OutputPathCollision { path: PathBuf },

    /// The query capability failed (network, auth, syntax)
    #[error(transparent)]
    Connectivity(#[from] lims_rdbc::Error),
}

impl AssemblyError {
    /// True when the failure came from the database layer rather than the data
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}
