use sheetprobe_core::reader::{CellValue, SheetVisibility};
use sheetprobe_core::{
    CellRange, InspectError, Inspection, Inspector, InspectorConfig, TemplateReport, Workbook,
    WorkbookLoader, read_workbook,
};
use std::cell::Cell;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

struct MockSheet<'a> {
    name: &'a str,
    state: Option<&'a str>,
    xml: String,
}

impl<'a> MockSheet<'a> {
    fn new(name: &'a str, body: &str) -> Self {
        Self {
            name,
            state: None,
            xml: format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{}</worksheet>"#,
                body
            ),
        }
    }

    fn hidden(mut self) -> Self {
        self.state = Some("hidden");
        self
    }
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="0.0&quot;pt&quot;"/></numFmts>
<fonts count="2">
<font><sz val="11"/><name val="Calibri"/></font>
<font><b/><sz val="16"/><color rgb="FF1F4E79"/><name val="Meiryo"/></font>
</fonts>
<fills count="3">
<fill><patternFill patternType="none"/></fill>
<fill><patternFill patternType="gray125"/></fill>
<fill><patternFill patternType="solid"><fgColor rgb="FFDDEBF7"/><bgColor indexed="64"/></patternFill></fill>
</fills>
<borders count="2">
<border><left/><right/><top/><bottom/><diagonal/></border>
<border><left style="thin"><color auto="1"/></left><right style="thin"><color auto="1"/></right><top style="thin"><color auto="1"/></top><bottom style="thin"><color auto="1"/></bottom><diagonal/></border>
</borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="3">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1" applyFill="1" applyBorder="1"><alignment horizontal="center" vertical="center"/></xf>
<xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
</cellXfs>
</styleSheet>"#;

// Helper to create a minimal valid XLSX file for testing
fn create_mock_xlsx(path: &Path, sheets: &[MockSheet], shared_strings: &[&str]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)?;
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
    }
    content_types.push_str("</Types>");
    zip.write_all(content_types.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>
"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        let state = sheet
            .state
            .map(|s| format!(r#" state="{}""#, s))
            .unwrap_or_default();
        workbook_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
            sheet.name,
            i + 1,
            state,
            i + 1
        ));
    }
    workbook_xml.push_str("</sheets></workbook>");
    zip.write_all(workbook_xml.as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    let mut rels_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1, i + 1
        ));
    }
    let next = sheets.len() + 1;
    rels_xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        next
    ));
    rels_xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        next + 1
    ));
    rels_xml.push_str("</Relationships>");
    zip.write_all(rels_xml.as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    zip.start_file("xl/sharedStrings.xml", options)?;
    let mut sst = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        shared_strings.len()
    );
    for s in shared_strings {
        sst.push_str(&format!("<si><t>{}</t></si>", s));
    }
    sst.push_str("</sst>");
    zip.write_all(sst.as_bytes())?;

    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(sheet.xml.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

const TARGET: &str = "ｱｾｽﾒﾝﾄｼｰﾄ";

// Shared strings: 0 = "X", 1 = "Name", 2 = "Notes"
fn assessment_sheet() -> String {
    r#"<dimension ref="A1:D11"/>
<sheetFormatPr defaultRowHeight="13.5"/>
<cols><col min="1" max="2" width="4.625" customWidth="1"/><col min="4" max="4" width="20" customWidth="1"/><col min="30" max="30" width="3"/></cols>
<sheetData>
<row r="1" ht="24" customHeight="1"><c r="A1" s="1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2" s="1"/></row>
<row r="3" ht="18.75" customHeight="1"><c r="A3"><v>1</v></c><c r="D3" s="1" t="s"><v>0</v></c></row>
<row r="11"><c r="B11" s="2"><f>A3*2</f><v>2</v></c></row>
<row r="25" ht="40" customHeight="1"><c r="A25"><v>5</v></c></row>
</sheetData>
<mergeCells count="2"><mergeCell ref="A2:B3"/><mergeCell ref="A1:D1"/></mergeCells>"#
        .to_string()
}

fn write_template(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("template.xlsx");
    create_mock_xlsx(
        &path,
        &[
            MockSheet::new(
                "Cover",
                r#"<sheetData><row r="1"><c r="A1"><v>1</v></c><c r="B1"><v>2</v></c></row><row r="2"><c r="B2"><v>3</v></c></row></sheetData>"#,
            ),
            MockSheet::new(TARGET, &assessment_sheet()),
            MockSheet::new("Lists", r#"<sheetData/>"#).hidden(),
        ],
        &["X", "Name", "Notes"],
    )
    .unwrap();
    path
}

fn inspect(config: InspectorConfig) -> TemplateReport {
    match Inspector::with_config(config).inspect().unwrap() {
        Inspection::Report(report) => *report,
        Inspection::Missing { path } => panic!("template unexpectedly missing: {}", path.display()),
    }
}

#[test]
fn test_missing_file_skips_parsing() {
    struct CountingLoader<'a>(&'a Cell<usize>);

    impl WorkbookLoader for CountingLoader<'_> {
        fn load(&self, _path: &Path) -> anyhow::Result<Workbook> {
            self.0.set(self.0.get() + 1);
            Ok(Workbook::default())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("templates").join("absent.xlsx");
    let calls = Cell::new(0);
    let config = InspectorConfig {
        template: missing.clone(),
        ..Default::default()
    };

    let inspection = Inspector::with_loader(config, CountingLoader(&calls))
        .inspect()
        .unwrap();

    assert_eq!(inspection, Inspection::Missing { path: missing });
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_reader_loads_values_formulas_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let workbook = read_workbook(write_template(dir.path())).unwrap();

    assert_eq!(workbook.sheet_names(), vec!["Cover", TARGET, "Lists"]);

    let sheet = workbook.get_sheet(TARGET).unwrap();
    assert_eq!(
        sheet.get_cell(2, 3).unwrap().value,
        CellValue::Text("X".to_string())
    );
    let formula_cell = sheet.get_cell(10, 1).unwrap();
    assert_eq!(formula_cell.formula.as_deref(), Some("A3*2"));
    assert_eq!(formula_cell.value, CellValue::Number(2.0));

    assert_eq!(sheet.merged_cells.len(), 2);
    assert_eq!(sheet.layout.row_height(0), Some(24.0));
    assert_eq!(sheet.layout.column_width(3), Some(20.0));

    // B2 has a style but no value
    let styled = sheet.get_cell(1, 1).unwrap();
    assert!(styled.value.is_empty());
    assert!(styled.style.is_some());

    assert_eq!(
        workbook.get_sheet("Lists").unwrap().visibility,
        SheetVisibility::Hidden
    );
}

#[test]
fn test_sheet_summaries_match_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let report = inspect(InspectorConfig {
        template: write_template(dir.path()),
        ..Default::default()
    });

    assert_eq!(report.sheets.len(), 3);
    let names: Vec<_> = report.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Cover", TARGET, "Lists"]);

    let cover = &report.sheets[0];
    assert_eq!(cover.index, 1);
    assert_eq!(cover.row_count, 2);
    assert_eq!(cover.column_count, 2);
    assert_eq!(cover.merge_count, 0);
    assert_eq!(cover.used_range, Some(CellRange::new(0, 0, 1, 1)));

    let target = &report.sheets[1];
    assert_eq!(target.row_count, 25);
    assert_eq!(target.column_count, 4);
    assert_eq!(target.merge_count, 2);
    assert_eq!(target.used_range, Some(CellRange::new(0, 0, 24, 3)));
    assert_eq!(target.formula_error, None);

    let lists = &report.sheets[2];
    assert_eq!(lists.visibility, SheetVisibility::Hidden);
    assert_eq!(lists.row_count, 0);
    assert_eq!(lists.used_range, None);

    assert!(report.metadata.size > 0);
    assert!(report.metadata.modified.is_some());
}

#[test]
fn test_target_sheet_selected_and_probed() {
    let dir = tempfile::tempdir().unwrap();
    let report = inspect(InspectorConfig {
        template: write_template(dir.path()),
        ..Default::default()
    });

    assert!(!report.selection.is_fallback());
    assert_eq!(report.selection.name(), TARGET);

    let refs: Vec<_> = report.probes.iter().map(|p| p.reference.to_string()).collect();
    assert_eq!(refs, vec!["D3", "H3", "P3", "B11", "B18"]);

    let d3 = &report.probes[0];
    assert_eq!(d3.value, "X");
    assert_eq!(d3.formula, "");
    let style: serde_json::Value = serde_json::from_str(&d3.style).unwrap();
    assert_eq!(style["font"]["bold"], true);
    assert_eq!(style["font"]["name"], "Meiryo");
    assert_eq!(style["fill"]["fgColor"]["argb"], "FFDDEBF7");
    assert_eq!(style["border"]["left"]["style"], "thin");
    assert_eq!(style["alignment"]["horizontal"], "center");

    let b11 = &report.probes[3];
    assert_eq!(b11.formula, "A3*2");
    assert_eq!(b11.value, "2");
    let style: serde_json::Value = serde_json::from_str(&b11.style).unwrap();
    assert_eq!(style["numFmt"], "0.0\"pt\"");

    let h3 = &report.probes[1];
    assert_eq!(h3.value, "");
    assert_eq!(h3.style, "{}");
}

#[test]
fn test_fallback_to_first_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let report = inspect(InspectorConfig {
        template: write_template(dir.path()),
        target_sheet: "Does not exist".to_string(),
        probe_cells: vec!["B2".to_string()],
        ..Default::default()
    });

    assert!(report.selection.is_fallback());
    assert_eq!(report.selection.name(), "Cover");
    assert_eq!(report.probes[0].value, "3");
    assert!(report.merges.is_empty());
}

#[test]
fn test_merge_regions_report_anchor_values() {
    let dir = tempfile::tempdir().unwrap();
    let report = inspect(InspectorConfig {
        template: write_template(dir.path()),
        ..Default::default()
    });

    assert_eq!(report.merges.len(), 2);

    // Rows 2-3, columns 1-2
    let first = &report.merges[0];
    assert_eq!(first.index, 1);
    assert_eq!(
        (first.range.top + 1, first.range.left + 1, first.range.bottom + 1, first.range.right + 1),
        (2, 1, 3, 2)
    );
    assert_eq!(first.anchor_value, "Notes");

    assert_eq!(report.merges[1].range.to_string(), "A1:D1");
    assert_eq!(report.merges[1].anchor_value, "Name");
}

#[test]
fn test_only_explicit_sizes_within_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let report = inspect(InspectorConfig {
        template: write_template(dir.path()),
        ..Default::default()
    });

    let layout = &report.layout;
    assert_eq!(layout.default_row_height, Some(13.5));
    assert_eq!(layout.row_heights, vec![(1, 24.0), (3, 18.75)]);
    assert_eq!(layout.column_widths, vec![(1, 4.625), (2, 4.625), (4, 20.0)]);

    let wide = inspect(InspectorConfig {
        template: write_template(dir.path()),
        max_row: 30,
        max_column: 30,
        ..Default::default()
    });
    assert_eq!(wide.layout.row_heights.last(), Some(&(25, 40.0)));
    assert_eq!(wide.layout.column_widths.last(), Some(&(30, 3.0)));
}

#[test]
fn test_corrupt_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"this is not a zip archive").unwrap();

    let result = Inspector::with_config(InspectorConfig {
        template: path.clone(),
        ..Default::default()
    })
    .inspect();

    match result {
        Err(InspectError::Load { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("expected a load error, got {:?}", other),
    }
}

#[test]
fn test_truncated_sheet_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.xlsx");
    let truncated = MockSheet {
        name: "Broken",
        state: None,
        xml: r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1"><v>1</v></c></row><row r="2"><c r="B2"><v>1"#
            .to_string(),
    };
    create_mock_xlsx(&path, &[truncated], &[]).unwrap();

    assert!(read_workbook(&path).is_err());

    let result = Inspector::with_config(InspectorConfig {
        template: path.clone(),
        target_sheet: "Broken".to_string(),
        ..Default::default()
    })
    .inspect();

    match result {
        Err(InspectError::Load { path: failed, source }) => {
            assert_eq!(failed, path);
            assert!(format!("{:#}", source).contains("Failed to read sheet Broken"));
        }
        other => panic!("expected a load error, got {:?}", other),
    }
}
