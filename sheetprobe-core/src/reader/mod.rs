//! Excel file reader using calamine, plus direct XML parsing for the
//! metadata calamine does not expose (merges, layout, visibility, styles)

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use chrono::NaiveTime;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

pub mod styles;
pub mod workbook;
pub mod xml_parser;

use crate::reference::CellRange;
pub use styles::{CellStyle, StyleTable};
pub use workbook::{Cell, CellValue, Sheet, SheetLayout, SheetVisibility, Workbook};
use xml_parser::{SheetDetails, SheetEntry};

/// Read a workbook from a file path
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();
    // Open workbook with calamine
    let mut excel: Sheets<_> = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    // OOXML parts are read straight from the archive
    let is_xlsx = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("xlsx") || s.eq_ignore_ascii_case("xlsm"))
        .unwrap_or(false);

    let mut archive = if is_xlsx {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        Some(ZipArchive::new(BufReader::new(file)).context("Failed to open zip archive")?)
    } else {
        debug!(path = %path.display(), "not an OOXML package, reading values only");
        None
    };

    let (entries, styles) = match archive.as_mut() {
        Some(archive) => {
            let entries = xml_parser::read_sheet_entries(archive)?;
            let styles = styles::parse_styles(archive).unwrap_or_else(|e| {
                warn!("Ignoring unreadable style table: {:#}", e);
                StyleTable::default()
            });
            (entries, styles)
        }
        None => (Vec::new(), StyleTable::default()),
    };
    debug!(styles = styles.len(), "style table loaded");

    let sheet_names = excel.sheet_names();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in &sheet_names {
        // Get both values and formulas
        let range = excel
            .worksheet_range(sheet_name)
            .with_context(|| format!("Failed to read sheet {}", sheet_name))?;

        let (formula_range, formula_error) = match excel.worksheet_formula(sheet_name) {
            Ok(range) => (Some(range), None),
            Err(e) => {
                warn!(sheet = %sheet_name, "Failed to read formulas: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let mut sheet = parse_sheet(
            sheet_name,
            Some(&range),
            formula_range.as_ref(),
            formula_error,
        );

        let entry = entries.iter().find(|e| &e.name == sheet_name);
        if let (Some(archive), Some(entry)) = (archive.as_mut(), entry) {
            apply_sheet_entry(archive, entry, &styles, &mut sheet);
        }

        debug!(
            sheet = %sheet.name,
            rows = sheet.row_count,
            columns = sheet.column_count,
            merges = sheet.merged_cells.len(),
            "sheet loaded"
        );
        sheets.push(sheet);
    }

    Ok(Workbook {
        path: path.to_path_buf(),
        sheets,
    })
}

/// Merge the XML-only metadata of a sheet into what calamine produced
fn apply_sheet_entry(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
    entry: &SheetEntry,
    styles: &StyleTable,
    sheet: &mut Sheet,
) {
    sheet.visibility = entry.visibility;

    let Some(sheet_path) = entry.path.as_deref() else {
        warn!(sheet = %sheet.name, "no worksheet part found for sheet");
        return;
    };

    match xml_parser::extract_sheet_details(archive, sheet_path) {
        Ok(details) => apply_sheet_details(sheet, details, styles),
        Err(e) => warn!(sheet = %sheet.name, "Ignoring sheet metadata: {:#}", e),
    }
}

fn apply_sheet_details(sheet: &mut Sheet, details: SheetDetails, styles: &StyleTable) {
    let SheetDetails {
        merged_cells,
        layout,
        cell_styles,
        last_row,
        last_col,
    } = details;

    sheet.merged_cells = merged_cells;
    sheet.layout = layout;

    if let Some(last_row) = last_row {
        sheet.row_count = sheet.row_count.max(last_row + 1);
    }
    if let Some(last_col) = last_col {
        sheet.column_count = sheet.column_count.max(last_col + 1);
    }

    // Styled cells exist in the sheet even without a value
    for ((row, col), style_index) in cell_styles {
        let cell = sheet
            .cells
            .entry((row, col))
            .or_insert_with(|| Cell::new(row, col, CellValue::Empty));
        cell.style = styles.get(style_index).cloned();
    }
}

fn parse_sheet(
    name: &str,
    range: Option<&Range<Data>>,
    formula_range: Option<&Range<String>>,
    formula_parsing_error: Option<String>,
) -> Sheet {
    let mut sheet = Sheet::new(name);
    sheet.formula_parsing_error = formula_parsing_error;

    // Determine valid bounds for values
    let (r_start, r_end) = match range.and_then(|r| Some((r.start()?, r.end()?))) {
        Some(bounds) => bounds,
        None => ((u32::MAX, u32::MAX), (0, 0)),
    };

    // Determine valid bounds for formulas
    let (f_start, f_end) = match formula_range.and_then(|f| Some((f.start()?, f.end()?))) {
        Some(bounds) => bounds,
        None => ((u32::MAX, u32::MAX), (0, 0)),
    };

    // Calculate global bounding box (union of both ranges)
    let min_row = r_start.0.min(f_start.0);
    let min_col = r_start.1.min(f_start.1);
    let max_row = r_end.0.max(f_end.0);
    let max_col = r_end.1.max(f_end.1);

    // If no valid range, return early
    if min_row > max_row || min_col > max_col {
        return sheet;
    }

    let mut cells = HashMap::new();
    let mut used: Option<CellRange> = None;

    for row in min_row..=max_row {
        for col in min_col..=max_col {
            let value = range
                .and_then(|r| r.get_value((row, col)))
                .filter(|data| !matches!(data, Data::Empty))
                .map(parse_cell_value);

            let formula = formula_range
                .and_then(|f| f.get_value((row, col)))
                .filter(|formula| !formula.is_empty())
                .cloned();

            // Create cell if we have either a value or a formula
            if value.is_none() && formula.is_none() {
                continue;
            }

            used = Some(match used {
                Some(r) => CellRange::new(
                    r.top.min(row),
                    r.left.min(col),
                    r.bottom.max(row),
                    r.right.max(col),
                ),
                None => CellRange::new(row, col, row, col),
            });

            let mut cell = Cell::new(row, col, value.unwrap_or(CellValue::Empty));
            cell.formula = formula;
            cells.insert((row, col), cell);
        }
    }

    sheet.cells = cells;
    sheet.used_range = used;
    if let Some(used) = used {
        sheet.row_count = used.bottom + 1;
        sheet.column_count = used.right + 1;
    }
    sheet
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) => match dt.as_datetime().filter(|_| !dt.is_duration()) {
            Some(ndt) if ndt.time() == NaiveTime::MIN => {
                CellValue::Text(ndt.date().format("%Y-%m-%d").to_string())
            }
            Some(ndt) => CellValue::Text(ndt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
