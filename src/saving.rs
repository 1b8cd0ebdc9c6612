use crate::downloader::{SheetData, workbook_bytes};
use crate::error::Result;
use crate::loader::{self, Grid};
use crate::partition::Location;
use crate::record::Schema;
use crate::store::RecordStore;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Load the table stored at `location`
///
/// Returns `Ok(None)` if the workbook or the sheet does not exist yet.
pub fn load_table(location: &Location, schema: Schema) -> Result<Option<RecordStore>> {
    if !location.path.exists() {
        return Ok(None);
    }
    let Some(grid) = loader::read_sheet(&location.path, &location.sheet)? else {
        return Ok(None);
    };
    let records = loader::records_from_grid(&grid)?;
    RecordStore::from_rows(schema, records).map(Some)
}

/// Load the table at `location`, writing an empty one first if it is missing
pub fn load_or_create(location: &Location, schema: Schema) -> Result<RecordStore> {
    if let Some(store) = load_table(location, schema)? {
        return Ok(store);
    }
    let store = RecordStore::new(schema);
    save_table(location, &store)?;
    debug!(
        "created empty sheet '{}' in {}",
        location.sheet,
        location.path.display()
    );
    Ok(store)
}

/// Write the whole table back to `location`
///
/// The workbook is rewritten in full. Other sheets already in the workbook
/// keep their cell text, the cell each value sits in and their place in
/// the sheet order; a new sheet is appended at the end. Formatting,
/// formulas and column widths of those sheets are not kept.
pub fn save_table(location: &Location, store: &RecordStore) -> Result<()> {
    let existing: Vec<(String, Grid)> = if location.path.exists() {
        loader::read_all_sheets(&location.path)?
    } else {
        Vec::new()
    };

    let mut sheets: Vec<(&str, SheetData<'_>)> = Vec::with_capacity(existing.len() + 1);
    let mut placed = false;
    for (name, grid) in &existing {
        if *name == location.sheet {
            sheets.push((name.as_str(), SheetData::Table(store)));
            placed = true;
        } else {
            sheets.push((name.as_str(), SheetData::Raw(grid)));
        }
    }
    if !placed {
        sheets.push((location.sheet.as_str(), SheetData::Table(store)));
    }

    let bytes = workbook_bytes(&sheets)?;
    write_atomically(&location.path, &bytes)
}

/// Replace the file at `path` with `bytes`
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the target, so readers never see a half-written workbook.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
