//! A1-notation helpers: column letters, sheet-qualified ranges and cell addresses.

use std::fmt;

/// Convert a zero-based column index to its letter form (`0 → A`, `25 → Z`, `26 → AA`).
///
/// Bijective base-26 with no zero digit, so every index has exactly one spelling.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    // Only ASCII uppercase bytes were pushed.
    String::from_utf8(letters).unwrap_or_default()
}

/// Parse column letters back to a zero-based index. Case-insensitive.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |acc, c| {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?
            .checked_add((c as u8 - b'A') as usize + 1)
    })
    .map(|n| n - 1)
}

/// Quote a sheet name for use in A1 notation when it is not a plain identifier.
pub fn quote_sheet_name(sheet: &str) -> String {
    let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// A range on a named sheet, e.g. `RESULTADOS!A:Z` or `'ANALISE MERCADO'!A3:M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetRange {
    pub sheet: &'static str,
    pub cells: &'static str,
}

impl SheetRange {
    pub const fn new(sheet: &'static str, cells: &'static str) -> Self {
        Self { sheet, cells }
    }

    /// The 1-based sheet row of the first fetched row.
    ///
    /// Open ranges such as `A:Z` start at row 1; `A3:M` starts at row 3.
    pub fn first_row(&self) -> u32 {
        let start = self.cells.split(':').next().unwrap_or("");
        let digits: String = start.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
        digits.parse().ok().filter(|&row| row > 0).unwrap_or(1)
    }

    /// Address of a single cell on this range's sheet.
    pub fn cell(&self, column: usize, row: u32) -> CellAddress {
        CellAddress {
            sheet: self.sheet,
            column,
            row,
        }
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet_name(self.sheet), self.cells)
    }
}

/// A single cell, `column` zero-based and `row` 1-based as in the sheet UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    pub sheet: &'static str,
    pub column: usize,
    pub row: u32,
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}{}",
            quote_sheet_name(self.sheet),
            column_letter(self.column),
            self.row
        )
    }
}
