//! XML parsing utilities for extracting metadata from XLSX files

use super::workbook::{SheetLayout, SheetVisibility};
use crate::reference::{CellRange, MAX_COLUMNS, parse_cell_range, parse_cell_ref};
use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::str::FromStr;
use zip::ZipArchive;

/// Raw attribute value, unescaped
pub(crate) fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

pub(crate) fn attr_parse<T: FromStr>(e: &BytesStart, key: &[u8]) -> Option<T> {
    attr_value(e, key).and_then(|v| v.trim().parse().ok())
}

/// OOXML booleans are written as 1/0 or true/false
pub(crate) fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    match attr_value(e, key)?.to_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// A `<sheet>` entry of `xl/workbook.xml` with its resolved part path
#[derive(Debug, Clone, PartialEq)]
pub struct SheetEntry {
    pub name: String,
    pub visibility: SheetVisibility,
    /// Path of the worksheet part inside the archive, when the relationship resolves
    pub path: Option<String>,
}

/// Read the sheet list of `xl/workbook.xml` and resolve each sheet's XML path
/// through `xl/_rels/workbook.xml.rels`.
pub fn read_sheet_entries(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
) -> Result<Vec<SheetEntry>> {
    let rels = {
        let rels_xml = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .context("Failed to find xl/_rels/workbook.xml.rels")?;
        parse_relationships(BufReader::new(rels_xml))?
    };

    let workbook_xml = archive
        .by_name("xl/workbook.xml")
        .context("Failed to find xl/workbook.xml")?;
    let sheets = parse_workbook_sheets(BufReader::new(workbook_xml))?;

    Ok(sheets
        .into_iter()
        .map(|(name, visibility, rid)| {
            let path = rid
                .and_then(|rid| rels.get(&rid))
                .map(|target| resolve_target(target));
            SheetEntry {
                name,
                visibility,
                path,
            }
        })
        .collect())
}

/// Targets are relative to `xl/` unless they are absolute part names
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn parse_relationships<R: BufRead>(source: R) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(target)) =
                        (attr_value(&e, b"Id"), attr_value(&e, b"Target"))
                    {
                        rels.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

type RawSheet = (String, SheetVisibility, Option<String>);

fn parse_workbook_sheets<R: BufRead>(source: R) -> Result<Vec<RawSheet>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut in_sheets = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"sheets" => in_sheets = true,
                b"sheet" if in_sheets => {
                    if let Some(name) = attr_value(&e, b"name") {
                        let visibility = attr_value(&e, b"state")
                            .map(|state| SheetVisibility::from_state(&state))
                            .unwrap_or_default();
                        sheets.push((name, visibility, attr_value(&e, b"r:id")));
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"sheets" {
                    in_sheets = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// Metadata of one worksheet part that calamine does not expose
#[derive(Debug, Clone, Default)]
pub struct SheetDetails {
    pub merged_cells: Vec<CellRange>,
    pub layout: SheetLayout,
    /// Style index of every `<c>` element, 0 when it has no `s` attribute
    pub cell_styles: HashMap<(u32, u32), usize>,
    /// Last row index (0-based) seen on a `<row>` or `<c>` element
    pub last_row: Option<u32>,
    /// Last column index (0-based) seen on a `<c>` element
    pub last_col: Option<u32>,
}

/// Extract merges, layout and per-cell style indices from a worksheet part
pub fn extract_sheet_details(
    archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>,
    sheet_path: &str,
) -> Result<SheetDetails> {
    let sheet_xml = archive
        .by_name(sheet_path)
        .with_context(|| format!("Failed to find {}", sheet_path))?;
    parse_sheet_details(BufReader::new(sheet_xml))
        .with_context(|| format!("Failed to parse {}", sheet_path))
}

pub(crate) fn parse_sheet_details<R: BufRead>(source: R) -> Result<SheetDetails> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut details = SheetDetails::default();
    // Rows and cells may omit `r`; they then follow the previous one
    let mut current_row: Option<u32> = None;
    let mut current_col: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"sheetFormatPr" => {
                    details.layout.default_row_height = attr_parse(&e, b"defaultRowHeight");
                    details.layout.default_column_width = attr_parse(&e, b"defaultColWidth");
                }
                b"col" => {
                    let min = attr_parse::<u32>(&e, b"min").unwrap_or(1);
                    let max = attr_parse::<u32>(&e, b"max").unwrap_or(min);
                    // Convert to 0-based
                    let first = min.saturating_sub(1);
                    let last = max.min(MAX_COLUMNS).saturating_sub(1);
                    let width = attr_parse::<f64>(&e, b"width");
                    let hidden = attr_bool(&e, b"hidden").unwrap_or(false);

                    for col in first..=last {
                        if let Some(width) = width {
                            details.layout.column_widths.insert(col, width);
                        }
                        if hidden {
                            details.layout.hidden_columns.insert(col);
                        }
                    }
                }
                b"row" => {
                    let row = attr_parse::<u32>(&e, b"r")
                        .map(|r| r.saturating_sub(1))
                        .unwrap_or_else(|| current_row.map_or(0, |r| r + 1));
                    current_row = Some(row);
                    current_col = None;
                    details.last_row = details.last_row.max(Some(row));

                    if let Some(height) = attr_parse::<f64>(&e, b"ht") {
                        details.layout.row_heights.insert(row, height);
                    }
                    if attr_bool(&e, b"hidden").unwrap_or(false) {
                        details.layout.hidden_rows.insert(row);
                    }
                }
                b"c" => {
                    let (row, col) = match attr_value(&e, b"r").and_then(|r| parse_cell_ref(&r)) {
                        Some(position) => position,
                        None => (
                            current_row.unwrap_or(0),
                            current_col.map_or(0, |c| c + 1),
                        ),
                    };
                    current_col = Some(col);
                    details.last_row = details.last_row.max(Some(row));
                    details.last_col = details.last_col.max(Some(col));

                    let style_index = attr_parse::<usize>(&e, b"s").unwrap_or(0);
                    details.cell_styles.insert((row, col), style_index);
                }
                b"mergeCell" => {
                    if let Some(range) = attr_value(&e, b"ref").and_then(|r| parse_cell_range(&r))
                    {
                        details.merged_cells.push(range);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "XML parsing error at position {}: {}",
                    reader.error_position(),
                    e
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(details)
}
