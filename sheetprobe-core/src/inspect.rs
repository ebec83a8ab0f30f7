//! Template inspection: turns a workbook on disk into a diagnostic report

use crate::config::InspectorConfig;
use crate::error::InspectError;
use crate::reader::{self, Sheet, SheetVisibility, Workbook};
use crate::reference::{CellRange, CellReference};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Source of parsed workbooks
pub trait WorkbookLoader {
    fn load(&self, path: &Path) -> anyhow::Result<Workbook>;
}

/// Loads workbooks from disk with [`reader::read_workbook`]
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxLoader;

impl WorkbookLoader for XlsxLoader {
    fn load(&self, path: &Path) -> anyhow::Result<Workbook> {
        reader::read_workbook(path)
    }
}

/// Size and timestamps of the template file
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub size: u64,
    /// Not every platform or filesystem records a creation time
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
}

impl FileMetadata {
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let local = |time: std::io::Result<SystemTime>| time.ok().map(DateTime::<Local>::from);

        Ok(Self {
            size: metadata.len(),
            created: local(metadata.created()),
            modified: local(metadata.modified()),
        })
    }
}

/// One line per worksheet in the workbook overview
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSummary {
    /// 1-based position in the workbook
    pub index: usize,
    pub name: String,
    pub visibility: SheetVisibility,
    pub row_count: u32,
    pub column_count: u32,
    pub merge_count: usize,
    /// Bounding box of cells holding a value or formula. Row and column
    /// counts also include formatted but empty rows and cells, so they can
    /// extend past it.
    pub used_range: Option<CellRange>,
    /// Why formulas could not be read; values are still reported
    pub formula_error: Option<String>,
}

impl SheetSummary {
    fn from_sheet(index: usize, sheet: &Sheet) -> Self {
        Self {
            index: index + 1,
            name: sheet.name.clone(),
            visibility: sheet.visibility,
            row_count: sheet.row_count,
            column_count: sheet.column_count,
            merge_count: sheet.merged_cells.len(),
            used_range: sheet.used_range,
            formula_error: sheet.formula_parsing_error.clone(),
        }
    }
}

/// Which worksheet the detailed sections describe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelection {
    /// The configured target sheet was found
    Target { name: String },
    /// The target sheet is missing; the first sheet is used instead
    Fallback { requested: String, name: String },
}

impl SheetSelection {
    pub fn name(&self) -> &str {
        match self {
            SheetSelection::Target { name } | SheetSelection::Fallback { name, .. } => name,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SheetSelection::Fallback { .. })
    }
}

/// Value, formula and style of one probed cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellProbe {
    pub reference: CellReference,
    pub value: String,
    /// Empty when the cell holds no formula
    pub formula: String,
    /// Style descriptor as pretty-printed JSON
    pub style: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    /// 1-based position in the sheet's merge list
    pub index: usize,
    pub range: CellRange,
    /// Display value of the top-left cell
    pub anchor_value: String,
}

/// Explicit row and column sizing within the scanned bounds (1-based)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    pub default_row_height: Option<f64>,
    pub default_column_width: Option<f64>,
    pub row_heights: Vec<(u32, f64)>,
    pub column_widths: Vec<(u32, f64)>,
    pub hidden_rows: Vec<u32>,
    pub hidden_columns: Vec<u32>,
}

/// Everything printed about one template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateReport {
    pub path: PathBuf,
    pub metadata: FileMetadata,
    pub sheets: Vec<SheetSummary>,
    pub selection: SheetSelection,
    pub probes: Vec<CellProbe>,
    pub merges: Vec<MergeSummary>,
    pub layout: LayoutReport,
}

/// Outcome of an inspection run
#[derive(Debug, Clone, PartialEq)]
pub enum Inspection {
    /// Nothing exists at the template path; no parsing was attempted
    Missing { path: PathBuf },
    Report(Box<TemplateReport>),
}

/// Main inspector interface
pub struct Inspector<L = XlsxLoader> {
    config: InspectorConfig,
    loader: L,
}

impl Inspector<XlsxLoader> {
    /// Create a new inspector with default configuration
    pub fn new() -> Self {
        Self::with_config(InspectorConfig::default())
    }

    /// Create a new inspector with custom configuration
    pub fn with_config(config: InspectorConfig) -> Self {
        Self::with_loader(config, XlsxLoader)
    }
}

impl Default for Inspector<XlsxLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: WorkbookLoader> Inspector<L> {
    pub fn with_loader(config: InspectorConfig, loader: L) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    /// Inspect the configured template
    pub fn inspect(&self) -> Result<Inspection, InspectError> {
        self.config.validate()?;
        let probes = self.config.probe_references()?;
        let path = self.config.template.as_path();

        if !path.is_file() {
            warn!(path = %path.display(), "template file not found");
            return Ok(Inspection::Missing {
                path: path.to_path_buf(),
            });
        }

        let metadata = FileMetadata::from_path(path).map_err(|e| InspectError::Load {
            path: path.to_path_buf(),
            source: anyhow::Error::new(e).context("Failed to read file metadata"),
        })?;
        debug!(size = metadata.size, "template metadata read");

        info!(path = %path.display(), "loading workbook");
        let workbook = self
            .loader
            .load(path)
            .map_err(|source| InspectError::Load {
                path: path.to_path_buf(),
                source,
            })?;

        let report = self.build_report(path, metadata, &workbook, &probes)?;
        Ok(Inspection::Report(Box::new(report)))
    }

    fn build_report(
        &self,
        path: &Path,
        metadata: FileMetadata,
        workbook: &Workbook,
        probes: &[CellReference],
    ) -> Result<TemplateReport, InspectError> {
        let sheets = workbook
            .sheets
            .iter()
            .enumerate()
            .map(|(index, sheet)| SheetSummary::from_sheet(index, sheet))
            .collect();

        let (sheet, selection) = self.select_sheet(workbook)?;
        info!(sheet = %sheet.name, fallback = selection.is_fallback(), "sheet selected");

        let probes = probes
            .iter()
            .map(|&reference| probe_cell(sheet, reference))
            .collect::<Result<Vec<_>, _>>()?;

        let merges = sheet
            .merged_cells
            .iter()
            .enumerate()
            .map(|(index, &range)| MergeSummary {
                index: index + 1,
                range,
                anchor_value: sheet.value_at(range.anchor()).to_string(),
            })
            .collect();

        Ok(TemplateReport {
            path: path.to_path_buf(),
            metadata,
            sheets,
            selection,
            probes,
            merges,
            layout: self.layout_report(sheet),
        })
    }

    fn select_sheet<'a>(
        &self,
        workbook: &'a Workbook,
    ) -> Result<(&'a Sheet, SheetSelection), InspectError> {
        let requested = &self.config.target_sheet;
        if let Some(sheet) = workbook.get_sheet(requested) {
            let selection = SheetSelection::Target {
                name: sheet.name.clone(),
            };
            return Ok((sheet, selection));
        }

        let first = workbook
            .sheets
            .first()
            .ok_or_else(|| InspectError::NoSheets {
                path: workbook.path.clone(),
            })?;
        warn!(
            requested = %requested,
            using = %first.name,
            available = ?workbook.sheet_names(),
            "target sheet not found"
        );

        let selection = SheetSelection::Fallback {
            requested: requested.clone(),
            name: first.name.clone(),
        };
        Ok((first, selection))
    }

    fn layout_report(&self, sheet: &Sheet) -> LayoutReport {
        let layout = &sheet.layout;
        let rows = 1..=self.config.max_row;
        let columns = 1..=self.config.max_column;

        LayoutReport {
            default_row_height: layout.default_row_height,
            default_column_width: layout.default_column_width,
            row_heights: rows
                .clone()
                .filter_map(|row| layout.row_height(row - 1).map(|h| (row, h)))
                .collect(),
            column_widths: columns
                .clone()
                .filter_map(|col| layout.column_width(col - 1).map(|w| (col, w)))
                .collect(),
            hidden_rows: rows
                .filter(|row| layout.hidden_rows.contains(&(row - 1)))
                .collect(),
            hidden_columns: columns
                .filter(|col| layout.hidden_columns.contains(&(col - 1)))
                .collect(),
        }
    }
}

fn probe_cell(sheet: &Sheet, reference: CellReference) -> Result<CellProbe, InspectError> {
    let cell = sheet.cell_at(reference);

    let style = match cell.and_then(|c| c.style.as_ref()) {
        Some(style) => serde_json::to_string_pretty(style)?,
        None => "{}".to_string(),
    };

    Ok(CellProbe {
        reference,
        value: cell.map(|c| c.value.to_string()).unwrap_or_default(),
        formula: cell.and_then(|c| c.formula.clone()).unwrap_or_default(),
        style,
    })
}
