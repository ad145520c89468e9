//! Daily price bars, per-symbol series and the price book used for valuation.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_MARKET_SUFFIX: &str = ".NS";

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: Option<f64>,
    pub volume: u64,
}

/// All bars of one symbol, sorted by date, with a date lookup index.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    pub fn new(symbol: &str, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            symbol: symbol.to_string(),
            bars,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.get_bar(date).map(|bar| bar.close)
    }
}

/// Price series keyed by symbol.
///
/// Lookups try the bare symbol first and then the symbol with the market
/// suffix appended, so `RELIANCE` resolves to a series stored as
/// `RELIANCE.NS`.
#[derive(Debug, Clone)]
pub struct PriceBook {
    series: HashMap<String, PriceSeries>,
    market_suffix: String,
}

impl Default for PriceBook {
    fn default() -> Self {
        Self::new(DEFAULT_MARKET_SUFFIX)
    }
}

impl PriceBook {
    pub fn new(market_suffix: &str) -> Self {
        Self {
            series: HashMap::new(),
            market_suffix: market_suffix.to_string(),
        }
    }

    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.symbol.clone(), series);
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn market_suffix(&self) -> &str {
        &self.market_suffix
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series
            .get(symbol)
            .or_else(|| self.series.get(&format!("{}{}", symbol, self.market_suffix)))
    }

    pub fn close_on(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        self.get(symbol).and_then(|s| s.close_on(date))
    }

    /// Sorted union of every date any series has a bar for.
    pub fn timeline(&self) -> Vec<NaiveDate> {
        let unique_dates: BTreeSet<NaiveDate> = self
            .series
            .values()
            .flat_map(|s| s.bars.iter().map(|bar| bar.date))
            .collect();
        unique_dates.into_iter().collect()
    }
}
