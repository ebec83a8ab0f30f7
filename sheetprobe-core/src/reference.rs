//! A1-style cell references and rectangular ranges

use crate::error::InspectError;
use regex::Regex;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::OnceLock;

/// Last column allowed by the XLSX format (XFD)
pub const MAX_COLUMNS: u32 = 16_384;

/// Last row allowed by the XLSX format
pub const MAX_ROWS: u32 = 1_048_576;

fn a1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").expect("valid regex"))
}

/// Cell reference (e.g., A1, B2), stored 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellReference {
    pub row: u32,
    pub col: u32,
}

impl CellReference {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Strictly parse an A1 reference such as `D3` or `$B$11`.
    pub fn parse(text: &str) -> Result<Self, InspectError> {
        let invalid = || InspectError::InvalidCellReference(text.to_string());
        let caps = a1_pattern().captures(text.trim()).ok_or_else(invalid)?;

        let col = column_index(&caps[1]).ok_or_else(invalid)?;
        let row: u32 = caps[2].parse().map_err(|_| invalid())?;
        if row == 0 || row > MAX_ROWS || col >= MAX_COLUMNS {
            return Err(invalid());
        }

        Ok(Self::new(row - 1, col))
    }

    /// Convert to Excel-style reference (e.g., "A1")
    pub fn to_excel_ref(&self) -> String {
        format!("{}{}", col_to_letter(self.col), self.row + 1)
    }
}

impl FromStr for CellReference {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialOrd for CellReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then_with(|| self.col.cmp(&other.col))
    }
}

impl std::fmt::Display for CellReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_excel_ref())
    }
}

/// Rectangle of cells, stored 0-based and inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl CellRange {
    pub fn new(top: u32, left: u32, bottom: u32, right: u32) -> Self {
        Self {
            top: top.min(bottom),
            left: left.min(right),
            bottom: top.max(bottom),
            right: left.max(right),
        }
    }

    /// Top-left cell of the range
    pub fn anchor(&self) -> CellReference {
        CellReference::new(self.top, self.left)
    }
}

impl std::fmt::Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            CellReference::new(self.top, self.left),
            CellReference::new(self.bottom, self.right)
        )
    }
}

/// Convert column number to letter (0 -> A, 1 -> B, etc.)
pub fn col_to_letter(mut col: u32) -> String {
    let mut result = String::new();
    loop {
        result.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    result
}

/// Convert column letters to a 0-based index ("A" -> 0, "AA" -> 26)
fn column_index(letters: &str) -> Option<u32> {
    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    col.checked_sub(1)
}

/// Lenient parse of a reference found in sheet XML, as 0-based (row, col)
pub(crate) fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    let mut col = 0u32;
    let mut row_str = String::new();

    for ch in cell_ref.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        } else if ch.is_ascii_digit() {
            row_str.push(ch);
        }
    }

    if row_str.is_empty() {
        return None;
    }

    let row = row_str.parse::<u32>().ok()?;

    // Convert to 0-based
    Some((row.saturating_sub(1), col.saturating_sub(1)))
}

/// Parse a range like "A1:B2"; a single reference yields a one-cell range
pub(crate) fn parse_cell_range(range: &str) -> Option<CellRange> {
    match range.split_once(':') {
        Some((start, end)) => {
            let (top, left) = parse_cell_ref(start)?;
            let (bottom, right) = parse_cell_ref(end)?;
            Some(CellRange::new(top, left, bottom, right))
        }
        None => {
            let (row, col) = parse_cell_ref(range)?;
            Some(CellRange::new(row, col, row, col))
        }
    }
}
