//! Configuration for an inspection run

use crate::error::InspectError;
use crate::reference::CellReference;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Template inspected when no path is given
pub const DEFAULT_TEMPLATE_PATH: &str = "templates/アセスメントシート原本.xlsx";

/// Sheet label looked up first; the first sheet is used when it is missing
pub const DEFAULT_TARGET_SHEET: &str = "ｱｾｽﾒﾝﾄｼｰﾄ";

pub const DEFAULT_PROBE_CELLS: [&str; 5] = ["D3", "H3", "P3", "B11", "B18"];

pub const DEFAULT_SCAN_LIMIT: u32 = 20;

/// Name of the configuration file picked up from the working directory
pub const CONFIG_FILE_NAME: &str = "sheetprobe.toml";

/// Main inspector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InspectorConfig {
    /// Path of the workbook to inspect
    pub template: PathBuf,
    /// Worksheet to inspect in detail
    pub target_sheet: String,
    /// Cells whose value, formula and style are printed
    pub probe_cells: Vec<String>,
    /// Rows 1..=max_row are scanned for explicit heights
    pub max_row: u32,
    /// Columns 1..=max_column are scanned for explicit widths
    pub max_column: u32,
}

impl InspectorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: InspectorConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Parse the probe addresses in order
    pub fn probe_references(&self) -> Result<Vec<CellReference>, InspectError> {
        self.probe_cells
            .iter()
            .map(|cell| CellReference::parse(cell))
            .collect()
    }

    /// Check every setting before any file is touched
    pub fn validate(&self) -> Result<(), InspectError> {
        self.probe_references()?;

        if self.max_row == 0 {
            return Err(InspectError::InvalidScan {
                what: "row",
                value: self.max_row,
            });
        }
        if self.max_column == 0 {
            return Err(InspectError::InvalidScan {
                what: "column",
                value: self.max_column,
            });
        }

        Ok(())
    }
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            target_sheet: DEFAULT_TARGET_SHEET.to_string(),
            probe_cells: DEFAULT_PROBE_CELLS.iter().map(|c| c.to_string()).collect(),
            max_row: DEFAULT_SCAN_LIMIT,
            max_column: DEFAULT_SCAN_LIMIT,
        }
    }
}
