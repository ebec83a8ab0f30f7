//! sheetprobe-core: read-only inspection of Excel spreadsheet templates
//!
//! The reader combines calamine (cell values and formulas) with direct
//! OOXML parsing (merges, row/column layout, sheet visibility and styles).
//! [`Inspector`] turns a loaded workbook into a [`TemplateReport`] that a
//! front end can print.

pub mod config;
pub mod error;
pub mod inspect;
pub mod reader;
pub mod reference;

pub use config::InspectorConfig;
pub use error::InspectError;
pub use inspect::{
    CellProbe, FileMetadata, Inspection, Inspector, LayoutReport, MergeSummary, SheetSelection,
    SheetSummary, TemplateReport, WorkbookLoader, XlsxLoader,
};
pub use reader::{Workbook, read_workbook};
pub use reference::{CellRange, CellReference};
