//! Linear row lookup by composite business key.
//!
//! The store has no row identity beyond position, so a located row is only
//! meaningful for the exact snapshot it was computed from.

use super::a1::SheetRange;

/// A row found in a fetched snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRowRef {
    pub sheet_name: &'static str,
    /// Absolute 1-based sheet row, as shown in the spreadsheet UI.
    pub row_number: u32,
    pub raw_cells: Vec<String>,
}

/// Find the first data row whose cells at `key_columns` equal `key_values`.
///
/// `rows[0]` is the header and is never matched. Returns the 1-based position
/// of the match within `rows` (`array_index + 1`), which is the sheet row
/// number when the fetched range starts at row 1. Comparison is exact: no
/// trimming or case folding. An empty key, a key containing an empty value,
/// or mismatched column/value counts never match.
pub fn locate<S: AsRef<str>>(
    rows: &[Vec<String>],
    key_columns: &[usize],
    key_values: &[S],
) -> Option<usize> {
    let key_values: Vec<&str> = key_values.iter().map(|v| v.as_ref()).collect();
    if key_columns.is_empty()
        || key_columns.len() != key_values.len()
        || key_values.iter().any(|v| v.is_empty())
    {
        return None;
    }

    rows.iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| {
            key_columns
                .iter()
                .zip(&key_values)
                .all(|(&column, &expected)| row.get(column).map(String::as_str) == Some(expected))
        })
        .map(|(index, _)| index + 1)
}

/// Locate a row in a snapshot fetched from `range`, translating its position
/// into an absolute sheet row using the range's first row.
pub fn locate_row<S: AsRef<str>>(
    range: &SheetRange,
    rows: &[Vec<String>],
    key_columns: &[usize],
    key_values: &[S],
) -> Option<SheetRowRef> {
    let position = locate(rows, key_columns, key_values)?;
    let row_number = range.first_row() + (position as u32 - 1);
    Some(SheetRowRef {
        sheet_name: range.sheet,
        row_number,
        raw_cells: rows[position - 1].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    /// A PEX results sheet: unit in column A, quarter in column X.
    fn pex_rows() -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let keys = [
            ("Unidade", "Quarter"),
            ("UnitB", "1"),
            ("UnitA", "1"),
            ("UnitA", "2"),
            ("UnitA", "2"),
        ];
        for (unit, quarter) in keys {
            let mut cells = vec![String::new(); 24];
            cells[0] = unit.to_string();
            cells[23] = quarter.to_string();
            rows.push(cells);
        }
        rows
    }

    #[test]
    fn composite_key_returns_one_based_position() {
        let rows = pex_rows();
        // Array index 3 → sheet row 4; the duplicate at index 4 loses.
        assert_eq!(locate(&rows, &[0, 23], &["UnitA", "2"]), Some(4));
        assert_eq!(locate(&rows, &[0, 23], &["UnitA", "1"]), Some(3));
    }

    #[test]
    fn repeated_lookups_agree() {
        let rows = pex_rows();
        let first = locate(&rows, &[0, 23], &["UnitB", "1"]);
        assert_eq!(first, locate(&rows, &[0, 23], &["UnitB", "1"]));
        assert_eq!(first, Some(2));
    }

    #[test]
    fn header_row_is_never_matched() {
        let rows = pex_rows();
        assert_eq!(locate(&rows, &[0], &["Unidade"]), None);
    }

    #[test]
    fn comparison_is_exact() {
        let rows = vec![row(&["ID", "Nome"]), row(&["br-01", "Centro"])];
        assert_eq!(locate(&rows, &[0], &["br-01"]), Some(2));
        assert_eq!(locate(&rows, &[0], &["BR-01"]), None);
        assert_eq!(locate(&rows, &[0], &[" br-01"]), None);
    }

    #[test]
    fn empty_or_malformed_keys_do_not_match() {
        let rows = vec![row(&["ID", "Nome"]), row(&["", "sem id"]), row(&["7"])];
        assert_eq!(locate(&rows, &[0], &[""]), None);
        assert_eq!(locate::<&str>(&rows, &[], &[]), None);
        assert_eq!(locate(&rows, &[0, 1], &["7"]), None);
        // Short rows are treated as missing cells.
        assert_eq!(locate(&rows, &[0, 1], &["7", "x"]), None);
        assert_eq!(locate(&[], &[0], &["7"]), None);
    }

    #[test]
    fn absolute_row_follows_range_origin() {
        let rows = vec![
            row(&["Cidade", "Pop"]),
            row(&["Recife", "1,6"]),
            row(&["Natal", "0,9"]),
        ];

        let from_top = SheetRange::new("MERCADO", "A:M");
        let found = locate_row(&from_top, &rows, &[0], &["Natal"]).unwrap();
        assert_eq!(found.row_number, 3);
        assert_eq!(found.raw_cells, row(&["Natal", "0,9"]));

        let offset = SheetRange::new("ANALISE MERCADO", "A3:M");
        let found = locate_row(&offset, &rows, &[0], &["Natal"]).unwrap();
        assert_eq!(found.row_number, 5);
        assert_eq!(found.sheet_name, "ANALISE MERCADO");
    }
}
