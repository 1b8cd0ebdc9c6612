use crate::error::{LedgerError, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Sheet name used when a workbook holds a single table
pub const DEFAULT_SHEET: &str = "Sheet1";

/// A calendar month, written `YYYY-MM`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(LedgerError::InvalidPeriod(format!("{year}-{month}")));
        }
        Ok(Period { year, month })
    }

    /// The month containing today's local date
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        Period {
            year: today.year(),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    fn first_day(&self) -> NaiveDate {
        // year and month are range-checked on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Sheet label used by monthly-sheet workbooks, e.g. `Oct-2026`
    pub fn sheet_name(&self) -> String {
        self.first_day().format("%b-%Y").to_string()
    }

    pub fn from_sheet_name(name: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(&format!("01-{}", name.trim()), "%d-%b-%Y").ok()?;
        Some(Period {
            year: date.year(),
            month: date.month(),
        })
    }

    /// `_YYYY_MM`, appended to file stems by monthly partitions
    pub fn file_suffix(&self) -> String {
        format!("_{:04}_{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LedgerError::InvalidPeriod(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Period::new(year, month).map_err(|_| invalid())
    }
}

/// How invoices are split across workbooks and sheets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Partition {
    /// One workbook, one sheet, all months together
    #[default]
    Single,
    /// One workbook per month: `<stem>_YYYY_MM.xlsx`
    MonthlyFiles,
    /// One workbook with a sheet per month named like `Oct-2026`
    MonthlySheets,
}

/// Where one period's table lives
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub sheet: String,
}

impl Partition {
    pub fn is_monthly(self) -> bool {
        !matches!(self, Partition::Single)
    }

    /// Resolve the workbook and sheet holding `period`
    ///
    /// `Single` ignores the period.
    pub fn locate(self, dir: &Path, stem: &str, period: Period) -> Location {
        match self {
            Partition::Single => Location {
                path: dir.join(format!("{stem}.xlsx")),
                sheet: DEFAULT_SHEET.to_string(),
            },
            Partition::MonthlyFiles => Location {
                path: dir.join(format!("{stem}{}.xlsx", period.file_suffix())),
                sheet: DEFAULT_SHEET.to_string(),
            },
            Partition::MonthlySheets => Location {
                path: dir.join(format!("{stem}.xlsx")),
                sheet: period.sheet_name(),
            },
        }
    }

    /// Recover the period from a monthly workbook's file name
    pub fn period_from_file_name(stem: &str, file_name: &str) -> Option<Period> {
        let rest = file_name.strip_prefix(stem)?.strip_suffix(".xlsx")?;
        let rest = rest.strip_prefix('_')?;
        let (year, month) = rest.split_once('_')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        Period::new(year.parse().ok()?, month.parse().ok()?).ok()
    }

    /// File name offered to the browser when exporting
    pub fn download_name(self, period: Period, extension: &str) -> String {
        match self {
            Partition::Single => format!("invoice_data.{extension}"),
            _ => format!("invoice_data{}.{extension}", period.file_suffix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_and_displays() {
        let p: Period = "2026-10".parse().unwrap();
        assert_eq!((p.year(), p.month()), (2026, 10));
        assert_eq!(p.to_string(), "2026-10");
        assert_eq!("2026-3".parse::<Period>().unwrap().to_string(), "2026-03");
    }

    #[test]
    fn period_rejects_garbage() {
        for bad in ["", "2026", "2026-13", "2026-00", "26-10", "abcd-ef", "2026-100"] {
            assert!(bad.parse::<Period>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn sheet_names_round_trip() {
        let p = Period::new(2026, 10).unwrap();
        assert_eq!(p.sheet_name(), "Oct-2026");
        assert_eq!(Period::from_sheet_name("Oct-2026"), Some(p));
        assert_eq!(Period::from_sheet_name(DEFAULT_SHEET), None);
    }

    #[test]
    fn locate_per_partition() {
        let dir = Path::new("/srv/ledger");
        let p = Period::new(2026, 2).unwrap();

        let single = Partition::Single.locate(dir, "data", p);
        assert_eq!(single.path, dir.join("data.xlsx"));
        assert_eq!(single.sheet, "Sheet1");

        let files = Partition::MonthlyFiles.locate(dir, "data", p);
        assert_eq!(files.path, dir.join("data_2026_02.xlsx"));
        assert_eq!(files.sheet, "Sheet1");

        let sheets = Partition::MonthlySheets.locate(dir, "data", p);
        assert_eq!(sheets.path, dir.join("data.xlsx"));
        assert_eq!(sheets.sheet, "Feb-2026");
    }

    #[test]
    fn monthly_file_names_parse_back() {
        assert_eq!(
            Partition::period_from_file_name("data", "data_2026_02.xlsx"),
            Period::new(2026, 2).ok()
        );
        assert_eq!(Partition::period_from_file_name("data", "data.xlsx"), None);
        assert_eq!(Partition::period_from_file_name("data", "other_2026_02.xlsx"), None);
        assert_eq!(Partition::period_from_file_name("data", "data_2026_2.xlsx"), None);
    }

    #[test]
    fn download_names() {
        let p = Period::new(2026, 10).unwrap();
        assert_eq!(Partition::Single.download_name(p, "xlsx"), "invoice_data.xlsx");
        assert_eq!(
            Partition::MonthlyFiles.download_name(p, "csv"),
            "invoice_data_2026_10.csv"
        );
    }
}
