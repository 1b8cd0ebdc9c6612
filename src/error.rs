use thiserror::Error;

/// Errors raised by ledger operations
///
/// `NotFound` is the only error a user is expected to trigger during normal
/// use; everything else means the backing workbook could not be read or written.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No row carries the requested S.No.
    #[error("record {0} not found")]
    NotFound(u32),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook could not be opened or a sheet could not be decoded
    #[error("failed to read workbook: {0}")]
    Read(#[from] calamine::Error),

    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    /// Text content that is neither a valid CSV table nor a header row we recognise
    #[error("failed to parse table: {0}")]
    Parse(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    /// The table already holds S.No. `u32::MAX`, so no next key exists
    #[error("no S.No. left after {0}")]
    KeysExhausted(u32),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
