//! On-disk CSV cache of daily price bars, one file per symbol.
//!
//! Files use the Yahoo download layout (`Date,Open,High,Low,Close,Adj
//! Close,Volume`), matched by header name so column order does not matter.

use crate::domain::error::EquisimError;
use crate::domain::price::{PriceBar, PriceSeries};
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const INVALID_SYMBOLS_FILE: &str = "invalid_symbols.txt";

#[derive(Debug, Deserialize)]
struct CachedBar {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Adj Close", default)]
    adj_close: Option<f64>,
    #[serde(rename = "Volume", default)]
    volume: f64,
}

impl CachedBar {
    fn into_bar(self, symbol: &str) -> Result<PriceBar, EquisimError> {
        // pandas may append a time component to the date
        let day = self.date.get(..10).unwrap_or(&self.date);
        let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
            EquisimError::PriceData {
                symbol: symbol.to_string(),
                reason: format!("invalid date '{}': {}", self.date, e),
            }
        })?;
        Ok(PriceBar {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            adj_close: self.adj_close,
            volume: self.volume.max(0.0) as u64,
        })
    }
}

pub struct CsvPriceCache {
    cache_dir: PathBuf,
}

impl CsvPriceCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", symbol))
    }

    fn read_series(&self, symbol: &str, path: &Path) -> Result<PriceSeries, EquisimError> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut bars = Vec::new();
        for row in rdr.deserialize::<CachedBar>() {
            bars.push(row?.into_bar(symbol)?);
        }
        Ok(PriceSeries::new(symbol, bars))
    }

    /// Cached series for `symbol`; a missing or unreadable file is a miss.
    ///
    /// Unreadable files are deleted so the next download replaces them.
    pub fn load(&self, symbol: &str) -> Result<Option<PriceSeries>, EquisimError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            debug!(symbol, "price cache miss");
            return Ok(None);
        }
        match self.read_series(symbol, &path) {
            Ok(series) => Ok(Some(series)),
            Err(e) => {
                warn!(symbol, "could not read cache {}: {}", path.display(), e);
                fs::remove_file(&path)?;
                Ok(None)
            }
        }
    }
}

impl PricePort for CsvPriceCache {
    fn fetch_prices(&self, symbol: &str) -> Result<Option<PriceSeries>, EquisimError> {
        self.load(symbol)
    }

    /// Remember a symbol the upstream source has no data for.
    ///
    /// Index symbols (`^NSEI`) are never recorded.
    fn record_invalid_symbol(&self, symbol: &str) -> Result<(), EquisimError> {
        if symbol.starts_with('^') {
            return Ok(());
        }
        fs::create_dir_all(&self.cache_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.cache_dir.join(INVALID_SYMBOLS_FILE))?;
        writeln!(file, "{}", symbol)?;
        Ok(())
    }

    fn invalid_symbols(&self) -> Result<HashSet<String>, EquisimError> {
        let path = self.cache_dir.join(INVALID_SYMBOLS_FILE);
        if !path.exists() {
            return Ok(HashSet::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let yahoo_layout = "Date,Adj Close,Close,High,Low,Open,Volume\n\
            2024-01-16,2705.5,2710.0,2725.0,2690.0,2700.0,5100000\n\
            2024-01-15,2695.0,2700.0,2715.0,2680.0,2690.0,4800000\n";
        fs::write(path.join("RELIANCE.NS.csv"), yahoo_layout).unwrap();
        fs::write(
            path.join("TCS.NS.csv"),
            "Date,Open,High,Low,Close,Volume\n2024-01-15 00:00:00,3800,3850,3790,3840,1200000.0\n",
        )
        .unwrap();
        fs::write(path.join("BROKEN.NS.csv"), "Date,Close\nnot-a-date,abc\n").unwrap();

        (dir, path)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn load_reads_yahoo_layout() {
        let (_dir, path) = setup_test_data();
        let cache = CsvPriceCache::new(path);

        let series = cache.load("RELIANCE.NS").unwrap().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[0].date, d(15));
        let bar = series.get_bar(d(16)).unwrap();
        assert_eq!(bar.close, 2710.0);
        assert_eq!(bar.adj_close, Some(2705.5));
        assert_eq!(bar.volume, 5_100_000);
    }

    #[test]
    fn load_accepts_timestamps_and_missing_adj_close() {
        let (_dir, path) = setup_test_data();
        let cache = CsvPriceCache::new(path);

        let series = cache.load("TCS.NS").unwrap().unwrap();
        let bar = series.get_bar(d(15)).unwrap();
        assert_eq!(bar.close, 3840.0);
        assert_eq!(bar.adj_close, None);
        assert_eq!(bar.volume, 1_200_000);
    }

    #[test]
    fn load_missing_file_is_a_miss() {
        let (_dir, path) = setup_test_data();
        let cache = CsvPriceCache::new(path);
        assert!(cache.load("INFY.NS").unwrap().is_none());
    }

    #[test]
    fn load_removes_unreadable_file() {
        let (_dir, path) = setup_test_data();
        let cache = CsvPriceCache::new(path.clone());

        assert!(cache.load("BROKEN.NS").unwrap().is_none());
        assert!(!path.join("BROKEN.NS.csv").exists());
    }

    #[test]
    fn fetch_through_port() {
        let (_dir, path) = setup_test_data();
        let cache = CsvPriceCache::new(path);
        let port: &dyn PricePort = &cache;
        let series = port.fetch_prices("TCS.NS").unwrap().unwrap();
        assert_eq!(series.symbol, "TCS.NS");
        assert!(port.fetch_prices("INFY.NS").unwrap().is_none());
    }

    #[test]
    fn invalid_symbols_skip_indices() {
        let dir = TempDir::new().unwrap();
        let cache = CsvPriceCache::new(dir.path().to_path_buf());
        cache.record_invalid_symbol("FAKE.NS").unwrap();
        cache.record_invalid_symbol("^NSEI").unwrap();
        cache.record_invalid_symbol("GONE.NS").unwrap();

        let invalid = cache.invalid_symbols().unwrap();
        assert_eq!(invalid.len(), 2);
        assert!(invalid.contains("FAKE.NS"));
        assert!(!invalid.contains("^NSEI"));
    }
}
