use crate::ledger::LedgerOptions;
use crate::partition::Partition;
use crate::record::Schema;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line and environment configuration shared by the binaries
///
/// Every flag can also be set through the `LEDGER_*` variable shown in
/// `--help`; flags win over the environment.
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Invoice and vehicle-entry log backed by an Excel workbook")]
pub struct Config {
    /// Directory holding the workbooks
    #[arg(long, env = "LEDGER_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Workbook file name without extension
    #[arg(long, env = "LEDGER_FILE_STEM", default_value = "data")]
    pub file_stem: String,

    /// How rows are split across workbooks and sheets
    #[arg(long, env = "LEDGER_PARTITION", value_enum, default_value_t = Partition::Single)]
    pub partition: Partition,

    /// Column set of the table
    #[arg(long, env = "LEDGER_SCHEMA", value_enum, default_value_t = Schema::Standard)]
    pub schema: Schema,

    /// Address the web server listens on
    #[arg(long, env = "LEDGER_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,
}

impl Config {
    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            data_dir: self.data_dir.clone(),
            file_stem: self.file_stem.clone(),
            partition: self.partition,
            schema: self.schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_standard_ledger() {
        let config = Config::try_parse_from(["website"]).unwrap();
        assert_eq!(config.ledger_options(), LedgerOptions::default());
        assert_eq!(config.bind.port(), 3000);
    }

    #[test]
    fn flags_select_partition_and_schema() {
        let config = Config::try_parse_from([
            "website",
            "--partition",
            "monthly-sheets",
            "--schema",
            "vehicle",
            "--file-stem",
            "dispatch",
        ])
        .unwrap();
        assert_eq!(config.partition, Partition::MonthlySheets);
        assert_eq!(config.schema, Schema::Vehicle);
        assert_eq!(config.file_stem, "dispatch");
    }
}
