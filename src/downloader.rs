use crate::error::Result;
use crate::loader::Grid;
use crate::record::Column;
use crate::store::RecordStore;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

/// Content of one worksheet in an exported workbook
pub enum SheetData<'a> {
    /// An invoice table, written with typed S.No. cells and a bold header
    Table(&'a RecordStore),
    /// Cell text carried over from another sheet of the same workbook
    Raw(&'a Grid),
}

/// Convert the table to CSV
///
/// The first line is the schema's header row. Fields containing commas,
/// quotes or line breaks are quoted with inner quotes doubled.
///
/// # Examples
/// ```
/// use invoice_ledger::downloader::to_csv;
/// use invoice_ledger::record::Schema;
/// use invoice_ledger::store::RecordStore;
///
/// let store = RecordStore::new(Schema::Standard);
/// let csv = to_csv(&store);
/// assert!(csv.starts_with("S.No.,Invoice Date"));
/// ```
pub fn to_csv(store: &RecordStore) -> String {
    let columns = store.schema().columns();
    let mut csv_content = String::new();

    push_csv_line(&mut csv_content, columns.iter().map(|c| c.header()));
    for row in store.rows() {
        let values: Vec<_> = columns.iter().map(|&c| row.get(c)).collect();
        push_csv_line(&mut csv_content, values.iter().map(|v| &**v));
    }

    csv_content
}

fn push_csv_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, value) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
        {
            let escaped = value.replace('"', "\"\"");
            out.push_str(&format!("\"{}\"", escaped));
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Convert the table to a single-sheet XLSX workbook
///
/// # Examples
/// ```
/// use invoice_ledger::downloader::to_xlsx;
/// use invoice_ledger::record::Schema;
/// use invoice_ledger::store::RecordStore;
///
/// let store = RecordStore::new(Schema::Standard);
/// let bytes = to_xlsx(&store, "Sheet1").unwrap();
/// assert!(!bytes.is_empty());
/// ```
pub fn to_xlsx(store: &RecordStore, sheet_name: &str) -> Result<Vec<u8>> {
    workbook_bytes(&[(sheet_name, SheetData::Table(store))])
}

/// Build a workbook with the given sheets, in order
pub fn workbook_bytes(sheets: &[(&str, SheetData<'_>)]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    for (name, data) in sheets {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(*name)?;
        match data {
            SheetData::Table(store) => write_table(&mut worksheet, store)?,
            SheetData::Raw(grid) => write_grid(&mut worksheet, grid)?,
        }
        workbook.push_worksheet(worksheet);
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_table(worksheet: &mut Worksheet, store: &RecordStore) -> Result<()> {
    let header_format = Format::new().set_bold();
    let columns = store.schema().columns();

    for (c, column) in columns.iter().enumerate() {
        let col = c as u16;
        worksheet.write_string_with_format(0, col, column.header(), &header_format)?;
        let width = if *column == Column::SNo { 8.0 } else { 18.0 };
        worksheet.set_column_width(col, width)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (r, row) in store.rows().iter().enumerate() {
        let sheet_row = r as u32 + 1;
        for (c, &column) in columns.iter().enumerate() {
            let col = c as u16;
            if column == Column::SNo {
                worksheet.write_number(sheet_row, col, row.sno as f64)?;
                continue;
            }
            let value = row.get(column);
            if !value.is_empty() {
                worksheet.write_string(sheet_row, col, &*value)?;
            }
        }
    }

    Ok(())
}

fn write_grid(worksheet: &mut Worksheet, grid: &Grid) -> Result<()> {
    for (r, row) in grid.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(r as u32, c as u16, value.as_str())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{parse_csv, records_from_grid};
    use crate::record::{InvoiceRecord, Schema};

    fn sample() -> RecordStore {
        let mut store = RecordStore::new(Schema::Standard);
        store.append(InvoiceRecord {
            invoice_no: "INV-1".into(),
            customer: "Acme, Ltd".into(),
            freight_charges: "1500".into(),
            ..Default::default()
        })
        .unwrap();
        store.append(InvoiceRecord {
            invoice_no: "INV-2".into(),
            customer: "Say \"hi\"".into(),
            ..Default::default()
        })
        .unwrap();
        store
    }

    #[test]
    fn csv_has_header_and_escapes_fields() {
        let csv = to_csv(&sample());
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("S.No.,Invoice Date,Invoice No,Customer,Destination,Dispatch Date,Transporter,Vehicle,Freight Charges")
        );
        assert_eq!(lines.next(), Some("1,,INV-1,\"Acme, Ltd\",,,,,1500"));
        assert_eq!(lines.next(), Some("2,,INV-2,\"Say \"\"hi\"\"\",,,,,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_reads_back_into_same_rows() {
        let store = sample();
        let records = records_from_grid(&parse_csv(&to_csv(&store))).unwrap();
        assert_eq!(records, store.rows());
    }

    #[test]
    fn vehicle_schema_exports_extra_columns() {
        let mut store = RecordStore::new(Schema::Vehicle);
        store.append(InvoiceRecord {
            product: "Coil".into(),
            quantity: "12".into(),
            ..Default::default()
        })
        .unwrap();
        let csv = to_csv(&store);
        assert!(csv.lines().next().unwrap_or_default().contains("Vehicle Capacity,Product,Quantity"));
        assert!(csv.contains(",Coil,12,"));
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&sample(), "Sheet1").unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
