#![allow(dead_code)]

use chrono::NaiveDate;
use equisim::domain::backtest::{BacktestConfig, OrderRequest};
use equisim::domain::error::EquisimError;
pub use equisim::domain::price::{PriceBar, PriceBook, PriceSeries};
use equisim::domain::transaction::Action;
use equisim::ports::price_port::PricePort;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::Write;

pub struct MockPricePort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub requested: RefCell<Vec<String>>,
    pub invalid: RefCell<HashSet<String>>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requested: RefCell::new(Vec::new()),
            invalid: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_invalid(self, symbol: &str) -> Self {
        self.invalid.borrow_mut().insert(symbol.to_string());
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn fetch_prices(&self, symbol: &str) -> Result<Option<PriceSeries>, EquisimError> {
        self.requested.borrow_mut().push(symbol.to_string());
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EquisimError::PriceData {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| PriceSeries::new(symbol, bars.clone())))
    }

    fn invalid_symbols(&self) -> Result<HashSet<String>, EquisimError> {
        Ok(self.invalid.borrow().clone())
    }

    fn record_invalid_symbol(&self, symbol: &str) -> Result<(), EquisimError> {
        self.invalid.borrow_mut().insert(symbol.to_string());
        Ok(())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> PriceBar {
    PriceBar {
        date: date(date_str),
        open: close,
        high: close,
        low: close,
        close,
        adj_close: Some(close),
        volume: 1_000,
    }
}

/// Bars on consecutive January 2024 days starting at the 1st.
pub fn january_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(&format!("2024-01-{:02}", i + 1), close))
        .collect()
}

pub fn make_book(series: &[(&str, Vec<PriceBar>)]) -> PriceBook {
    let mut book = PriceBook::default();
    for (symbol, bars) in series {
        book.insert(PriceSeries::new(symbol, bars.clone()));
    }
    book
}

pub fn make_order(date_str: &str, symbol: &str, action: Action, quantity: i64) -> OrderRequest {
    OrderRequest {
        date: date(date_str),
        symbol: symbol.to_string(),
        action,
        quantity,
        price: None,
    }
}

pub fn january_config(initial_capital: f64) -> BacktestConfig {
    BacktestConfig::new(date("2024-01-01"), date("2024-01-31"), initial_capital)
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
