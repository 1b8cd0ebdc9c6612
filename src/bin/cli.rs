#![cfg(not(tarpaulin_include))]

use clap::Parser;
use invoice_ledger::config::Config;
use invoice_ledger::{Column, InvoiceRecord, Ledger, LedgerError, Period, loader};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::parse();
    let ledger = Ledger::new(config.ledger_options());
    let mut period = Period::current();
    ledger.load(period)?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut status = String::from("ok");
    let mut start_time = Instant::now();

    loop {
        let elapsed_time = start_time.elapsed().as_secs_f64();
        if ledger.partition().is_monthly() {
            print!("[{:.1}] {} ({}) > ", elapsed_time, period, status);
        } else {
            print!("[{:.1}] ({}) > ", elapsed_time, status);
        }
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let command = line.trim();
        start_time = Instant::now();

        if command.is_empty() {
            status = String::from("invalid command");
            continue;
        }

        let (verb, arg) = match command.split_once(' ') {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (command, ""),
        };

        let outcome: Result<String, LedgerError> = match verb {
            "q" | "quit" => break,
            "help" => {
                print_help();
                Ok(String::from("ok"))
            }
            "list" => ledger.filter(period, "").map(|rows| {
                print_table(&ledger, &rows);
                String::from("ok")
            }),
            "find" => ledger.filter(period, arg).map(|rows| {
                print_table(&ledger, &rows);
                format!("{} matches", rows.len())
            }),
            "add" => {
                let record = prompt_record(&ledger, &mut lines)?;
                ledger
                    .append(period, record)
                    .map(|sno| format!("added {}", sno))
            }
            "del" | "delete" => match arg.parse::<u32>() {
                Ok(sno) => ledger.delete(period, sno).map(|_| format!("deleted {}", sno)),
                Err(_) => Ok(String::from("usage: del <S.No.>")),
            },
            "export" if !arg.is_empty() => export(&ledger, period, Path::new(arg)),
            "import" if !arg.is_empty() => fs::read(arg)
                .map_err(LedgerError::from)
                .and_then(|bytes| {
                    let name = Path::new(arg)
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or(arg);
                    ledger.import(period, name, bytes)
                })
                .map(|count| format!("imported {}", count)),
            "period" => arg.parse::<Period>().map(|p| {
                period = p;
                String::from("ok")
            }),
            "periods" => ledger.periods().map(|periods| {
                for p in &periods {
                    println!("{}", p);
                }
                format!("{} periods", periods.len())
            }),
            _ => Ok(String::from("invalid command")),
        };

        status = match outcome {
            Ok(message) => message,
            Err(LedgerError::NotFound(sno)) => format!("{} not found", sno),
            Err(e) => format!("error: {}", e),
        };
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  list: Show every row");
    println!("  find <text>: Show rows containing <text>");
    println!("  add: Enter a new row field by field");
    println!("  del <S.No.>: Delete a row and renumber");
    println!("  export <file.xlsx|file.csv>: Write the table to a file");
    println!("  import <file.xlsx|file.xls|file.csv>: Replace the table from a file");
    println!("  period <YYYY-MM>: Switch month (monthly partitions)");
    println!("  periods: List months with data");
}

fn prompt_record(
    ledger: &Ledger,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> io::Result<InvoiceRecord> {
    let mut record = InvoiceRecord::default();
    for &column in ledger.schema().columns() {
        if column == Column::SNo {
            continue;
        }
        print!("  {}: ", column);
        io::stdout().flush()?;
        let value = lines.next().transpose()?.unwrap_or_default();
        record.set(column, value.trim());
    }
    Ok(record)
}

fn export(ledger: &Ledger, period: Period, path: &Path) -> Result<String, LedgerError> {
    let bytes = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => ledger.export_csv(period)?.into_bytes(),
        Some("xlsx") => ledger.export_xlsx(period)?,
        other => {
            return Err(LedgerError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            ));
        }
    };
    fs::write(path, &bytes)?;
    // Read it back so a broken export is caught here rather than by the recipient
    let rows = loader::records_from_grid(&loader::load_file(path)?)?.len();
    Ok(format!("wrote {} rows to {}", rows, path.display()))
}

fn print_table(ledger: &Ledger, rows: &[InvoiceRecord]) {
    let columns = ledger.schema().columns();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.header().len()).collect();
    for row in rows {
        for (w, &c) in widths.iter_mut().zip(columns) {
            *w = (*w).max(row.get(c).chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<w$}", cell, w = w))
            .collect();
        println!("{}", padded.join(" | "));
    };

    line(columns.iter().map(|c| c.header().to_string()).collect());
    println!(
        "{}",
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in rows {
        line(columns.iter().map(|&c| row.get(c).into_owned()).collect());
    }
}
