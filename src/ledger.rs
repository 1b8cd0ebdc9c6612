use crate::downloader;
use crate::error::{LedgerError, Result};
use crate::events::{CalendarEvent, calendar_events};
use crate::loader;
use crate::partition::{Location, Partition, Period};
use crate::record::{InvoiceRecord, Schema};
use crate::saving;
use crate::store::RecordStore;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

/// Where and how a ledger keeps its workbooks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerOptions {
    pub data_dir: PathBuf,
    /// File name without extension; monthly partitions append `_YYYY_MM`
    pub file_stem: String,
    pub partition: Partition,
    pub schema: Schema,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        LedgerOptions {
            data_dir: PathBuf::from("."),
            file_stem: "data".to_string(),
            partition: Partition::Single,
            schema: Schema::Standard,
        }
    }
}

/// The invoice log as seen by the web and terminal front ends
///
/// A `Ledger` holds no rows itself. Every operation loads the selected
/// period's table from disk, works on it in memory and, for mutations,
/// writes the whole table back. Callers that may run operations
/// concurrently must serialise them.
#[derive(Clone, Debug)]
pub struct Ledger {
    options: LedgerOptions,
}

impl Ledger {
    pub fn new(options: LedgerOptions) -> Self {
        Ledger { options }
    }

    pub fn schema(&self) -> Schema {
        self.options.schema
    }

    pub fn partition(&self) -> Partition {
        self.options.partition
    }

    pub fn location(&self, period: Period) -> Location {
        self.options
            .partition
            .locate(&self.options.data_dir, &self.options.file_stem, period)
    }

    /// The table for `period`, creating an empty workbook/sheet if needed
    pub fn load(&self, period: Period) -> Result<RecordStore> {
        saving::load_or_create(&self.location(period), self.options.schema)
    }

    /// Append a row and return its S.No.
    pub fn append(&self, period: Period, record: InvoiceRecord) -> Result<u32> {
        let location = self.location(period);
        let mut store = saving::load_or_create(&location, self.options.schema)?;
        let sno = store.append(record)?;
        saving::save_table(&location, &store)?;
        info!("added record {} to {}", sno, location.path.display());
        Ok(sno)
    }

    /// Delete a row by S.No. and renumber the remainder
    ///
    /// A missing key returns `LedgerError::NotFound` without touching the file.
    pub fn delete(&self, period: Period, sno: u32) -> Result<InvoiceRecord> {
        let location = self.location(period);
        let mut store = saving::load_or_create(&location, self.options.schema)?;
        let removed = match store.delete(sno) {
            Ok(removed) => removed,
            Err(e @ LedgerError::NotFound(_)) => {
                warn!("delete of missing record {} in {}", sno, location.path.display());
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        saving::save_table(&location, &store)?;
        info!(
            "deleted record {} from {}, {} rows remain",
            sno,
            location.path.display(),
            store.len()
        );
        Ok(removed)
    }

    /// Rows of `period` matching `query`, see [`RecordStore::filter`]
    pub fn filter(&self, period: Period, query: &str) -> Result<Vec<InvoiceRecord>> {
        let store = self.load(period)?;
        Ok(store.filter(query).into_iter().cloned().collect())
    }

    /// The whole table of `period` as a single-sheet XLSX workbook
    pub fn export_xlsx(&self, period: Period) -> Result<Vec<u8>> {
        let location = self.location(period);
        let store = saving::load_or_create(&location, self.options.schema)?;
        downloader::to_xlsx(&store, &location.sheet)
    }

    pub fn export_csv(&self, period: Period) -> Result<String> {
        Ok(downloader::to_csv(&self.load(period)?))
    }

    /// Replace the table of `period` with the contents of an uploaded file
    ///
    /// Rows are renumbered 1..N in file order. Nothing is written if the
    /// file cannot be decoded. Returns the number of rows imported.
    pub fn import(&self, period: Period, file_name: &str, bytes: Vec<u8>) -> Result<usize> {
        let grid = loader::read_upload(file_name, bytes)?;
        let records = loader::records_from_grid(&grid)?;

        let location = self.location(period);
        let mut store = RecordStore::new(self.options.schema);
        store.replace_all(records);
        saving::save_table(&location, &store)?;
        info!(
            "imported {} rows from {} into {}",
            store.len(),
            file_name,
            location.path.display()
        );
        Ok(store.len())
    }

    pub fn events(&self, period: Period) -> Result<Vec<CalendarEvent>> {
        Ok(calendar_events(self.load(period)?.rows()))
    }

    /// Periods that already have a workbook or sheet, oldest first
    ///
    /// Always empty for a single-file ledger.
    pub fn periods(&self) -> Result<Vec<Period>> {
        let mut periods = match self.options.partition {
            Partition::Single => Vec::new(),
            Partition::MonthlyFiles => {
                if !self.options.data_dir.exists() {
                    return Ok(Vec::new());
                }
                let mut found = Vec::new();
                for entry in fs::read_dir(&self.options.data_dir)? {
                    let name = entry?.file_name();
                    if let Some(period) = name
                        .to_str()
                        .and_then(|n| Partition::period_from_file_name(&self.options.file_stem, n))
                    {
                        found.push(period);
                    }
                }
                found
            }
            Partition::MonthlySheets => {
                let path = self
                    .options
                    .data_dir
                    .join(format!("{}.xlsx", self.options.file_stem));
                if !path.exists() {
                    return Ok(Vec::new());
                }
                loader::sheet_names(&path)?
                    .iter()
                    .filter_map(|name| Period::from_sheet_name(name))
                    .collect()
            }
        };
        periods.sort();
        periods.dedup();
        Ok(periods)
    }
}
