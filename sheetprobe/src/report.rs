//! Human-readable rendering of inspection reports

use chrono::{DateTime, Local};
use colored::*;
use sheetprobe_core::reader::SheetVisibility;
use sheetprobe_core::{SheetSelection, SheetSummary, TemplateReport};
use std::io::{self, Write};
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Print the absence message for a template that does not exist
pub fn write_missing(out: &mut impl Write, path: &Path) -> io::Result<()> {
    writeln!(
        out,
        "{} {}",
        "Template file not found:".red().bold(),
        path.display()
    )
}

/// Print a full report with colored section headers
pub fn write_report(out: &mut impl Write, report: &TemplateReport) -> io::Result<()> {
    writeln!(
        out,
        "{}",
        format!("Inspecting: {}", report.path.display()).bold()
    )?;
    writeln!(out)?;

    write_file_info(out, report)?;
    write_sheets(out, &report.sheets)?;
    write_selection(out, &report.selection)?;
    write_probes(out, report)?;
    write_merges(out, report)?;
    write_layout(out, report)?;

    writeln!(out, "{}", "✓ Inspection complete".green().bold())
}

fn write_file_info(out: &mut impl Write, report: &TemplateReport) -> io::Result<()> {
    let metadata = &report.metadata;
    writeln!(out, "{}", "File:".bold().underline())?;
    writeln!(out, "  {} {} bytes", "Size:".bold(), metadata.size)?;
    writeln!(
        out,
        "  {} {}",
        "Created:".bold(),
        format_timestamp(metadata.created)
    )?;
    writeln!(
        out,
        "  {} {}",
        "Modified:".bold(),
        format_timestamp(metadata.modified)
    )?;
    writeln!(out)
}

fn format_timestamp(time: Option<DateTime<Local>>) -> String {
    match time {
        Some(time) => time.format(TIMESTAMP_FORMAT).to_string(),
        None => "unavailable".to_string(),
    }
}

fn write_sheets(out: &mut impl Write, sheets: &[SheetSummary]) -> io::Result<()> {
    writeln!(
        out,
        "{} {}",
        "Sheets:".bold().underline(),
        sheets.len()
    )?;

    for sheet in sheets {
        let used = sheet
            .used_range
            .map(|range| range.to_string())
            .unwrap_or_else(|| "-".to_string());

        // rows/cols count formatted cells too; data= spans values and formulas only
        write!(
            out,
            "  {}. {} rows={} cols={} merges={} data={}",
            sheet.index,
            sheet.name.cyan().bold(),
            sheet.row_count,
            sheet.column_count,
            sheet.merge_count,
            used
        )?;
        if sheet.visibility != SheetVisibility::Visible {
            write!(out, " {}", format!("({})", sheet.visibility.as_str()).yellow())?;
        }
        writeln!(out)?;
        if let Some(error) = &sheet.formula_error {
            writeln!(
                out,
                "     {} formulas unreadable: {}",
                "WARN".yellow().bold(),
                error
            )?;
        }
    }
    writeln!(out)
}

fn write_selection(out: &mut impl Write, selection: &SheetSelection) -> io::Result<()> {
    match selection {
        SheetSelection::Target { name } => {
            writeln!(out, "{} {}", "Sheet:".bold(), name.cyan().bold())?;
        }
        SheetSelection::Fallback { requested, name } => {
            writeln!(
                out,
                "{} sheet '{}' not found, using first sheet",
                "WARN".yellow().bold(),
                requested
            )?;
            writeln!(out, "{} {}", "Sheet:".bold(), name.cyan().bold())?;
        }
    }
    writeln!(out)
}

fn write_probes(out: &mut impl Write, report: &TemplateReport) -> io::Result<()> {
    writeln!(out, "{}", "Cells:".bold().underline())?;
    for probe in &report.probes {
        writeln!(out, "  {} {}", "Cell:".bold(), probe.reference.to_string().yellow())?;
        writeln!(out, "    value:   {}", probe.value)?;
        writeln!(out, "    formula: {}", probe.formula)?;
        writeln!(out, "    style:   {}", indent_continuation(&probe.style, 4))?;
    }
    writeln!(out)
}

/// Indent every line after the first so multi-line JSON stays under its label
fn indent_continuation(text: &str, indent: usize) -> String {
    text.replace('\n', &format!("\n{}", " ".repeat(indent)))
}

fn write_merges(out: &mut impl Write, report: &TemplateReport) -> io::Result<()> {
    if report.merges.is_empty() {
        return Ok(());
    }

    writeln!(
        out,
        "{} {}",
        "Merged cells:".bold().underline(),
        report.merges.len()
    )?;
    for merge in &report.merges {
        let range = merge.range;
        writeln!(
            out,
            "  {}. {} rows {}-{}, cols {}-{}: {}",
            merge.index,
            range.to_string().yellow(),
            range.top + 1,
            range.bottom + 1,
            range.left + 1,
            range.right + 1,
            merge.anchor_value
        )?;
    }
    writeln!(out)
}

fn write_layout(out: &mut impl Write, report: &TemplateReport) -> io::Result<()> {
    let layout = &report.layout;

    writeln!(out, "{}", "Row heights:".bold().underline())?;
    if let Some(height) = layout.default_row_height {
        writeln!(out, "  default: {}", height)?;
    }
    for (row, height) in &layout.row_heights {
        writeln!(out, "  row {}: {}", row, height)?;
    }
    if !layout.hidden_rows.is_empty() {
        writeln!(out, "  {} {}", "hidden:".bright_black(), join(&layout.hidden_rows))?;
    }
    writeln!(out)?;

    writeln!(out, "{}", "Column widths:".bold().underline())?;
    if let Some(width) = layout.default_column_width {
        writeln!(out, "  default: {}", width)?;
    }
    for (col, width) in &layout.column_widths {
        writeln!(out, "  col {}: {}", col, width)?;
    }
    if !layout.hidden_columns.is_empty() {
        writeln!(
            out,
            "  {} {}",
            "hidden:".bright_black(),
            join(&layout.hidden_columns)
        )?;
    }
    writeln!(out)
}

fn join(values: &[u32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
