//! CSV report writer.
//!
//! Output layout inside the report directory:
//! - `equity_curve.csv` (`date,value`)
//! - `rebalance_log.csv` (`date,symbol`), only when a log was supplied
//! - `portfolio_summary.csv`, one row
//! - `benchmark_summary.csv`, one row, only when a benchmark was supplied
//! - `transactions.csv`, via [`ReportPort::write_with_transactions`]

use crate::domain::analyzer::ResultAnalyzer;
use crate::domain::equity::{EquityCurve, EquityPoint};
use crate::domain::error::EquisimError;
use crate::domain::rebalance::{RebalanceEntry, RebalanceLog};
use crate::domain::transaction::Transaction;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

pub const EQUITY_CURVE_FILE: &str = "equity_curve.csv";
pub const REBALANCE_LOG_FILE: &str = "rebalance_log.csv";
pub const PORTFOLIO_SUMMARY_FILE: &str = "portfolio_summary.csv";
pub const BENCHMARK_SUMMARY_FILE: &str = "benchmark_summary.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";

pub struct CsvReportAdapter;

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), EquisimError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, analyzer: &ResultAnalyzer, output_dir: &Path) -> Result<(), EquisimError> {
        fs::create_dir_all(output_dir)?;

        write_rows(&output_dir.join(EQUITY_CURVE_FILE), analyzer.equity().points())?;
        if let Some(log) = analyzer.rebalance_log() {
            write_rows(&output_dir.join(REBALANCE_LOG_FILE), log.entries())?;
        }
        write_rows(
            &output_dir.join(PORTFOLIO_SUMMARY_FILE),
            &[analyzer.portfolio_summary()],
        )?;
        if let Some(summary) = analyzer.benchmark_summary() {
            write_rows(&output_dir.join(BENCHMARK_SUMMARY_FILE), &[summary])?;
        }

        info!("report written to {}", output_dir.display());
        Ok(())
    }

    fn write_with_transactions(
        &self,
        analyzer: &ResultAnalyzer,
        transactions: &[Transaction],
        output_dir: &Path,
    ) -> Result<(), EquisimError> {
        self.write(analyzer, output_dir)?;
        write_rows(&output_dir.join(TRANSACTIONS_FILE), transactions)
    }
}

/// Read a `date,value` curve as written by [`CsvReportAdapter`].
pub fn read_equity_curve(path: &Path) -> Result<EquityCurve, EquisimError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let points = rdr
        .deserialize::<EquityPoint>()
        .collect::<Result<Vec<_>, _>>()?;
    EquityCurve::new(points)
}

/// Read a `date,symbol` rebalance log.
pub fn read_rebalance_log(path: &Path) -> Result<RebalanceLog, EquisimError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let entries = rdr
        .deserialize::<RebalanceEntry>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RebalanceLog::new(entries))
}
