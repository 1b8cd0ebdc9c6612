/*!
# Invoice Ledger

A form-based invoice and vehicle-entry log kept in an Excel workbook, with a
small browser front end and an interactive terminal front end.

## Overview

Each row records one dispatched invoice: invoice date and number, customer,
destination, dispatch date, transporter, vehicle and freight charges (plus
vehicle capacity, product and quantity for the vehicle-entry schema). Rows
are keyed by a sequential **S.No.** which is always a dense `1..N` sequence
once a row has been deleted.

## Architecture

### Storage
- The workbook is the only state. Every operation reads the whole sheet,
  changes it in memory and writes the whole workbook back.
- A **partition** picks the workbook and sheet: a single `data.xlsx`, one
  workbook per month, or one sheet per month inside a single workbook.
- Writes go to a temporary file that is renamed over the workbook.

### Front ends
- **website** (`web` feature): axum routes for the table view, add, delete,
  search, download, upload and a calendar event feed.
- **ledger-cli** (`cli` feature): a prompt-driven loop over the same
  operations.

## Modules

- **record**: `InvoiceRecord`, columns and schemas
- **store**: the in-memory table with append, delete-and-renumber and filter
- **loader**: reading workbooks and CSV into records
- **downloader**: writing records to XLSX and CSV
- **saving**: whole-workbook persistence
- **partition**: monthly file / sheet selection
- **ledger**: load-mutate-save operations over a partitioned workbook
- **events**: calendar events derived from rows
- **config**: command-line and environment settings
- **app**: routing and handlers

## REST API Endpoints

- `GET /` - Table view, `?query=` filters, `?period=YYYY-MM` picks the month
- `POST /add` - Append a row from form data
- `POST /delete/{sno}` - Delete a row and renumber
- `GET /download` - Export as XLSX, or CSV with `?format=csv`
- `POST /upload` - Replace the table with an uploaded workbook or CSV
- `GET /events` - Rows as calendar events
- `GET /api/records` - Filtered rows as JSON
*/

pub mod downloader;
pub mod error;
pub mod events;
pub mod ledger;
pub mod loader;
pub mod partition;
pub mod record;
pub mod saving;
pub mod store;

#[cfg(feature = "cli")]
pub mod config;

#[cfg(feature = "web")]
pub mod app;

pub use error::{LedgerError, Result};
pub use ledger::{Ledger, LedgerOptions};
pub use partition::{Partition, Period};
pub use record::{Column, InvoiceRecord, RecordForm, Schema};
pub use store::RecordStore;
