use crate::error::{LedgerError, Result};
use crate::record::{Column, InvoiceRecord};
use calamine::{Data, Reader, open_workbook_auto, open_workbook_auto_from_rs};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Raw sheet contents, one `Vec<String>` per row, header row first
pub type Grid = Vec<Vec<String>>;

/// Read one sheet of a workbook on disk
///
/// Returns `Ok(None)` when the workbook exists but has no sheet by that name.
///
/// # Examples
/// ```no_run
/// use invoice_ledger::loader::read_sheet;
///
/// match read_sheet("data.xlsx", "Sheet1") {
///     Ok(Some(grid)) => println!("{} rows including header", grid.len()),
///     Ok(None) => println!("no such sheet"),
///     Err(e) => eprintln!("Error reading workbook: {}", e),
/// }
/// ```
pub fn read_sheet(path: impl AsRef<Path>, sheet: &str) -> Result<Option<Grid>> {
    let mut workbook = open_workbook_auto(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Ok(None);
    }
    let range = workbook.worksheet_range(sheet)?;
    Ok(Some(range.rows().map(row_text).collect()))
}

/// Read every sheet of a workbook, in workbook order
///
/// Unlike [`read_sheet`], each grid is anchored at A1: rows and cells above
/// and left of the first used cell are filled with empty strings, so the
/// grid can be written back without moving the data.
pub fn read_all_sheets(path: impl AsRef<Path>) -> Result<Vec<(String, Grid)>> {
    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let (top, left) = range.start().unwrap_or((0, 0));
        let mut grid: Grid = vec![Vec::new(); top as usize];
        for row in range.rows() {
            let mut cells = vec![String::new(); left as usize];
            cells.extend(row.iter().map(cell_text));
            grid.push(cells);
        }
        sheets.push((name, grid));
    }
    Ok(sheets)
}

pub fn sheet_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    Ok(open_workbook_auto(path)?.sheet_names())
}

/// Decode the first sheet of an uploaded workbook or CSV file
///
/// The format is chosen from the file name's extension; `.xlsx` and `.xls`
/// go through calamine, `.csv` through the text parser below.
pub fn read_upload(file_name: &str, bytes: Vec<u8>) -> Result<Grid> {
    match extension(file_name).as_deref() {
        Some("csv") => {
            let text = String::from_utf8(bytes)
                .map_err(|e| LedgerError::Parse(format!("CSV is not UTF-8: {e}")))?;
            Ok(parse_csv(&text))
        }
        Some("xlsx") | Some("xls") => {
            let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
            let first = workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| LedgerError::Parse("workbook has no sheets".into()))?;
            let range = workbook.worksheet_range(&first)?;
            Ok(range.rows().map(row_text).collect())
        }
        Some(ext) => Err(LedgerError::UnsupportedFormat(ext.to_string())),
        None => Err(LedgerError::UnsupportedFormat(file_name.to_string())),
    }
}

/// Read a workbook or CSV file from disk, picking the format by extension
pub fn load_file(path: impl AsRef<Path>) -> Result<Grid> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    read_upload(&name, fs::read(path)?)
}

/// Turn a header-first grid into records
///
/// Columns are matched by header text, so order does not matter and unknown
/// columns are dropped. Rows with every cell blank are skipped. An empty
/// grid yields no records; a non-empty grid whose first row names none of
/// the known columns is rejected.
pub fn records_from_grid(grid: &[Vec<String>]) -> Result<Vec<InvoiceRecord>> {
    let Some((header, body)) = grid.split_first() else {
        return Ok(Vec::new());
    };

    let mapping: Vec<Option<Column>> = header.iter().map(|h| Column::from_header(h)).collect();
    if mapping.iter().all(Option::is_none) {
        return Err(LedgerError::Parse(
            "header row does not name any invoice column".into(),
        ));
    }

    let mut records = Vec::new();
    for row in body {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut record = InvoiceRecord::default();
        for (cell, column) in row.iter().zip(&mapping) {
            if let Some(column) = column {
                record.set(*column, cell.trim());
            }
        }
        records.push(record);
    }

    Ok(records)
}

/// The string form of a cell as the table sees it
///
/// Whole numbers lose their trailing `.0` so that an S.No. written as a
/// number reads back as `1`, not `1.0`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(stamp) if stamp.time() == chrono::NaiveTime::MIN => {
                stamp.format("%Y-%m-%d").to_string()
            }
            Some(stamp) => stamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => float_text(dt.as_f64()),
        },
        Data::Error(e) => format!("{e:?}"),
    }
}

fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

fn row_text(row: &[Data]) -> Vec<String> {
    row.iter().map(cell_text).collect()
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Parse CSV text into a grid
///
/// Handles quoted fields with embedded commas, doubled quotes and line
/// breaks. Blank lines outside quotes are skipped.
pub fn parse_csv(text: &str) -> Grid {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn csv_handles_quotes_and_crlf() {
        let text = "S.No.,Customer\r\n1,\"Acme, Ltd\"\r\n2,\"Say \"\"hi\"\"\"\r\n";
        assert_eq!(
            parse_csv(text),
            grid(&[&["S.No.", "Customer"], &["1", "Acme, Ltd"], &["2", "Say \"hi\""]])
        );
    }

    #[test]
    fn csv_keeps_newlines_inside_quotes_and_skips_blank_lines() {
        let text = "Customer,Destination\n\n\"Line one\nline two\",Pune";
        assert_eq!(
            parse_csv(text),
            grid(&[&["Customer", "Destination"], &["Line one\nline two", "Pune"]])
        );
    }

    #[test]
    fn csv_trailing_empty_field_is_kept() {
        assert_eq!(parse_csv("a,b,\n"), grid(&[&["a", "b", ""]]));
    }

    #[test]
    fn grid_columns_match_by_header_in_any_order() {
        let g = grid(&[
            &["Customer", "Remarks", "s.no.", "Freight Charges"],
            &["Acme", "ignored", "4", "1500"],
            &["", "", "", ""],
            &["Bharat", "", "", "900"],
        ]);
        let records = records_from_grid(&g).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sno, 4);
        assert_eq!(records[0].customer, "Acme");
        assert_eq!(records[0].freight_charges, "1500");
        assert_eq!(records[1].sno, 0);
        assert_eq!(records[1].invoice_no, "");
    }

    #[test]
    fn grid_without_known_header_is_rejected() {
        let g = grid(&[&["a", "b"], &["1", "2"]]);
        assert!(matches!(records_from_grid(&g), Err(LedgerError::Parse(_))));
        assert!(records_from_grid(&[]).unwrap().is_empty());
    }

    #[test]
    fn whole_floats_drop_fraction() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_text(&Data::Int(12)), "12");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn unsupported_upload_extension() {
        assert!(matches!(
            read_upload("notes.txt", b"hello".to_vec()),
            Err(LedgerError::UnsupportedFormat(ext)) if ext == "txt"
        ));
        assert!(matches!(
            read_upload("noext", Vec::new()),
            Err(LedgerError::UnsupportedFormat(_))
        ));
    }
}
