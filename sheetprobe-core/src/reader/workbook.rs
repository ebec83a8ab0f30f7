//! Workbook data structures

use super::styles::CellStyle;
use crate::reference::{CellRange, CellReference};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

/// Represents a complete workbook
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Get a sheet by name
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get all sheet names
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Sheet tab state as declared in `xl/workbook.xml`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetVisibility {
    pub fn from_state(state: &str) -> Self {
        match state {
            "hidden" => SheetVisibility::Hidden,
            "veryHidden" => SheetVisibility::VeryHidden,
            _ => SheetVisibility::Visible,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetVisibility::Visible => "visible",
            SheetVisibility::Hidden => "hidden",
            SheetVisibility::VeryHidden => "veryHidden",
        }
    }
}

/// Represents a worksheet
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub visibility: SheetVisibility,
    pub cells: HashMap<(u32, u32), Cell>,
    /// Last used row number (1-based count of rows)
    pub row_count: u32,
    /// Last used column number (1-based count of columns)
    pub column_count: u32,
    /// Bounding box of cells holding a value or formula
    pub used_range: Option<CellRange>,
    /// Merged cell ranges in document order
    pub merged_cells: Vec<CellRange>,
    pub layout: SheetLayout,
    /// Error message if there was an error parsing formulas for this sheet
    pub formula_parsing_error: Option<String>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a cell at the given position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn cell_at(&self, reference: CellReference) -> Option<&Cell> {
        self.get_cell(reference.row, reference.col)
    }

    /// Value of the cell at `reference`, empty when the cell does not exist
    pub fn value_at(&self, reference: CellReference) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cell_at(reference).map(|c| &c.value).unwrap_or(&EMPTY)
    }
}

/// Explicit sizing and visibility of rows and columns (0-based keys)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    pub default_row_height: Option<f64>,
    pub default_column_width: Option<f64>,
    /// Row heights in points, only for rows that declare one
    pub row_heights: BTreeMap<u32, f64>,
    /// Column widths in characters, only for columns that declare one
    pub column_widths: BTreeMap<u32, f64>,
    pub hidden_rows: BTreeSet<u32>,
    pub hidden_columns: BTreeSet<u32>,
}

impl SheetLayout {
    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }
}

/// Represents a single cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    /// Literal value, or the cached result when the cell holds a formula
    pub value: CellValue,
    /// Formula text without the leading `=`
    pub formula: Option<String>,
    /// Resolved style; `None` when the workbook carries no style table
    pub style: Option<CellStyle>,
}

impl Cell {
    pub fn new(row: u32, col: u32, value: CellValue) -> Self {
        Self {
            row,
            col,
            value,
            formula: None,
            style: None,
        }
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Error(e) => f.write_str(e),
        }
    }
}
