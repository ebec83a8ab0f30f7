//! Error kinds raised while inspecting a template

use std::path::PathBuf;
use thiserror::Error;

/// Failures that end an inspection run.
///
/// A missing template file is not listed here: it is reported through
/// [`crate::inspect::Inspection::Missing`] instead.
#[derive(Debug, Error)]
pub enum InspectError {
    /// A probe address that is not a valid A1-style reference
    #[error("invalid cell reference '{0}'")]
    InvalidCellReference(String),

    /// A scan bound of zero rows or columns
    #[error("invalid {what} scan bound: {value} (must be at least 1)")]
    InvalidScan { what: &'static str, value: u32 },

    /// The workbook was parsed but contains no worksheets
    #[error("workbook has no worksheets: {}", path.display())]
    NoSheets { path: PathBuf },

    /// The workbook could not be parsed
    #[error("failed to load workbook: {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A style descriptor could not be rendered
    #[error("failed to serialize style descriptor")]
    Style(#[from] serde_json::Error),
}
