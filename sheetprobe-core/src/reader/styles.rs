//! Style table parsing for XLSX files
//!
//! `xl/styles.xml` stores fonts, fills, borders and number formats in separate
//! lists; each `cellXfs/xf` entry points into those lists by index. The
//! parser resolves every `xf` into a self-contained [`CellStyle`] so cells can
//! carry their formatting without referring back to the table.

use super::xml_parser::{attr_bool, attr_parse, attr_value};
use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use zip::ZipArchive;

/// Color reference as written in SpreadsheetML
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
}

impl Color {
    fn from_element(e: &BytesStart) -> Option<Self> {
        let color = Color {
            argb: attr_value(e, b"rgb"),
            theme: attr_parse(e, b"theme"),
            indexed: attr_parse(e, b"indexed"),
            tint: attr_parse(e, b"tint"),
            auto: attr_bool(e, b"auto"),
        };
        (color != Color::default()).then_some(color)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vert_align: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    /// "pattern" or "gradient"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fg_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BorderEdge {
    pub style: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Border {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagonal: Option<BorderEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagonal_up: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagonal_down: Option<bool>,
}

impl Border {
    fn is_empty(&self) -> bool {
        self == &Border::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrap_text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrink_to_fit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_rotation: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_order: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Protection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// Fully resolved formatting of one cell
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_fmt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
}

/// Resolved `cellXfs` entries, indexed by the `s` attribute of `<c>`
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    xfs: Vec<CellStyle>,
}

impl StyleTable {
    pub fn get(&self, index: usize) -> Option<&CellStyle> {
        self.xfs.get(index)
    }

    pub fn len(&self) -> usize {
        self.xfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xfs.is_empty()
    }
}

/// Built-in number formats that are not written to `styles.xml`
fn builtin_num_fmt(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// Parse `xl/styles.xml`; a workbook without one yields an empty table
pub fn parse_styles(archive: &mut ZipArchive<impl std::io::Read + std::io::Seek>) -> Result<StyleTable> {
    let styles_xml = match archive.by_name("xl/styles.xml") {
        Ok(file) => file,
        Err(_) => return Ok(StyleTable::default()),
    };

    parse_styles_xml(BufReader::new(styles_xml))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
}

#[derive(Debug, Default)]
struct RawXf {
    num_fmt_id: u32,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    border_id: Option<usize>,
    alignment: Option<Alignment>,
    protection: Option<Protection>,
}

#[derive(Default)]
struct StyleSheetBuilder {
    section: Option<Section>,
    num_fmts: HashMap<u32, String>,
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    xfs: Vec<RawXf>,
    font: Option<Font>,
    fill: Option<Fill>,
    in_gradient_stop: bool,
    border: Option<Border>,
    edge: Option<(Vec<u8>, BorderEdge)>,
    xf: Option<RawXf>,
}

impl StyleSheetBuilder {
    fn open(&mut self, e: &BytesStart, empty: bool) {
        let name = e.local_name();
        let name = name.as_ref();

        let section = match name {
            b"numFmts" => Some(Section::NumFmts),
            b"fonts" => Some(Section::Fonts),
            b"fills" => Some(Section::Fills),
            b"borders" => Some(Section::Borders),
            b"cellXfs" => Some(Section::CellXfs),
            _ => None,
        };
        if let Some(section) = section {
            if !empty {
                self.section = Some(section);
            }
            return;
        }

        match self.section {
            Some(Section::NumFmts) if name == b"numFmt" => {
                let id = attr_parse::<u32>(e, b"numFmtId");
                let code = attr_value(e, b"formatCode");
                if let (Some(id), Some(code)) = (id, code) {
                    self.num_fmts.insert(id, code);
                }
            }
            Some(Section::Fonts) => self.open_font_part(name, e, empty),
            Some(Section::Fills) => self.open_fill_part(name, e, empty),
            Some(Section::Borders) => self.open_border_part(name, e, empty),
            Some(Section::CellXfs) => self.open_xf_part(name, e, empty),
            _ => {}
        }
    }

    fn open_font_part(&mut self, name: &[u8], e: &BytesStart, empty: bool) {
        if name == b"font" {
            if empty {
                self.fonts.push(Font::default());
            } else {
                self.font = Some(Font::default());
            }
            return;
        }

        let Some(font) = self.font.as_mut() else {
            return;
        };
        // Toggle elements like <b/> are on unless val says otherwise
        let flag = || attr_bool(e, b"val").unwrap_or(true);
        match name {
            b"b" => font.bold = Some(flag()),
            b"i" => font.italic = Some(flag()),
            b"strike" => font.strike = Some(flag()),
            b"u" => {
                font.underline = Some(attr_value(e, b"val").unwrap_or_else(|| "single".to_string()))
            }
            b"sz" => font.size = attr_parse(e, b"val"),
            b"name" | b"rFont" => font.name = attr_value(e, b"val"),
            b"family" => font.family = attr_parse(e, b"val"),
            b"charset" => font.charset = attr_parse(e, b"val"),
            b"scheme" => font.scheme = attr_value(e, b"val"),
            b"vertAlign" => font.vert_align = attr_value(e, b"val"),
            b"color" => font.color = Color::from_element(e),
            _ => {}
        }
    }

    fn open_fill_part(&mut self, name: &[u8], e: &BytesStart, empty: bool) {
        if name == b"fill" {
            if empty {
                self.fills.push(Fill::default());
            } else {
                self.fill = Some(Fill::default());
            }
            return;
        }

        let Some(fill) = self.fill.as_mut() else {
            return;
        };
        match name {
            b"patternFill" => {
                fill.kind = "pattern".to_string();
                fill.pattern = attr_value(e, b"patternType");
            }
            b"gradientFill" => {
                fill.kind = "gradient".to_string();
                fill.degree = attr_parse(e, b"degree");
            }
            b"fgColor" => fill.fg_color = Color::from_element(e),
            b"bgColor" => fill.bg_color = Color::from_element(e),
            // Gradient stops: first stop is the start color, last one the end color
            b"stop" if !empty => self.in_gradient_stop = true,
            b"color" if self.in_gradient_stop => {
                if fill.fg_color.is_none() {
                    fill.fg_color = Color::from_element(e);
                } else {
                    fill.bg_color = Color::from_element(e);
                }
            }
            _ => {}
        }
    }

    fn open_border_part(&mut self, name: &[u8], e: &BytesStart, empty: bool) {
        if name == b"border" {
            let border = Border {
                diagonal_up: attr_bool(e, b"diagonalUp"),
                diagonal_down: attr_bool(e, b"diagonalDown"),
                ..Default::default()
            };
            if empty {
                self.borders.push(border);
            } else {
                self.border = Some(border);
            }
            return;
        }

        if self.border.is_none() {
            return;
        }
        match name {
            b"left" | b"right" | b"top" | b"bottom" | b"diagonal" | b"start" | b"end" => {
                let Some(style) = attr_value(e, b"style") else {
                    return;
                };
                let edge = BorderEdge { style, color: None };
                if empty {
                    self.assign_edge(name, edge);
                } else {
                    self.edge = Some((name.to_vec(), edge));
                }
            }
            b"color" => {
                if let Some((_, edge)) = self.edge.as_mut() {
                    edge.color = Color::from_element(e);
                }
            }
            _ => {}
        }
    }

    fn assign_edge(&mut self, name: &[u8], edge: BorderEdge) {
        let Some(border) = self.border.as_mut() else {
            return;
        };
        match name {
            b"left" | b"start" => border.left = Some(edge),
            b"right" | b"end" => border.right = Some(edge),
            b"top" => border.top = Some(edge),
            b"bottom" => border.bottom = Some(edge),
            b"diagonal" => border.diagonal = Some(edge),
            _ => {}
        }
    }

    fn open_xf_part(&mut self, name: &[u8], e: &BytesStart, empty: bool) {
        match name {
            b"xf" => {
                let xf = RawXf {
                    num_fmt_id: attr_parse(e, b"numFmtId").unwrap_or(0),
                    font_id: attr_parse(e, b"fontId"),
                    fill_id: attr_parse(e, b"fillId"),
                    border_id: attr_parse(e, b"borderId"),
                    alignment: None,
                    protection: None,
                };
                if empty {
                    self.xfs.push(xf);
                } else {
                    self.xf = Some(xf);
                }
            }
            b"alignment" => {
                if let Some(xf) = self.xf.as_mut() {
                    xf.alignment = Some(Alignment {
                        horizontal: attr_value(e, b"horizontal"),
                        vertical: attr_value(e, b"vertical"),
                        wrap_text: attr_bool(e, b"wrapText"),
                        shrink_to_fit: attr_bool(e, b"shrinkToFit"),
                        indent: attr_parse(e, b"indent"),
                        text_rotation: attr_parse(e, b"textRotation"),
                        reading_order: attr_parse(e, b"readingOrder"),
                    });
                }
            }
            b"protection" => {
                if let Some(xf) = self.xf.as_mut() {
                    xf.protection = Some(Protection {
                        locked: attr_bool(e, b"locked"),
                        hidden: attr_bool(e, b"hidden"),
                    });
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs" => self.section = None,
            b"font" => {
                if let Some(font) = self.font.take() {
                    self.fonts.push(font);
                }
            }
            b"fill" => {
                self.in_gradient_stop = false;
                if let Some(fill) = self.fill.take() {
                    self.fills.push(fill);
                }
            }
            b"left" | b"right" | b"top" | b"bottom" | b"diagonal" | b"start" | b"end" => {
                if let Some((edge_name, edge)) = self.edge.take() {
                    self.assign_edge(&edge_name, edge);
                }
            }
            b"border" => {
                if let Some(border) = self.border.take() {
                    self.borders.push(border);
                }
            }
            b"xf" => {
                if let Some(xf) = self.xf.take() {
                    self.xfs.push(xf);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> StyleTable {
        let xfs = self
            .xfs
            .iter()
            .map(|xf| CellStyle {
                num_fmt: self.resolve_num_fmt(xf.num_fmt_id),
                font: xf.font_id.and_then(|id| self.fonts.get(id)).cloned(),
                fill: xf
                    .fill_id
                    .and_then(|id| self.fills.get(id))
                    .filter(|fill| !fill.kind.is_empty())
                    .cloned(),
                border: xf
                    .border_id
                    .and_then(|id| self.borders.get(id))
                    .filter(|border| !border.is_empty())
                    .cloned(),
                alignment: xf.alignment.clone(),
                protection: xf.protection.clone(),
            })
            .collect();

        StyleTable { xfs }
    }

    /// General (id 0) is left implicit
    fn resolve_num_fmt(&self, id: u32) -> Option<String> {
        if id == 0 {
            return None;
        }
        self.num_fmts
            .get(&id)
            .cloned()
            .or_else(|| builtin_num_fmt(id).map(str::to_string))
    }
}

/// Parse the contents of a `styles.xml` part
pub(crate) fn parse_styles_xml<R: BufRead>(source: R) -> Result<StyleTable> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut builder = StyleSheetBuilder::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => builder.open(&e, false),
            Ok(Event::Empty(e)) => builder.open(&e, true),
            Ok(Event::End(e)) => builder.close(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "XML parsing error in styles at position {}: {}",
                    reader.error_position(),
                    e
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(builder.finish())
}
