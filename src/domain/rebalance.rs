//! Rebalance log: portfolio membership recorded at each rebalance date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceEntry {
    pub date: NaiveDate,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RebalanceLog {
    entries: Vec<RebalanceEntry>,
}

impl RebalanceLog {
    pub fn new(entries: Vec<RebalanceEntry>) -> Self {
        Self { entries }
    }

    /// Record the full membership chosen on `date`.
    pub fn record<I, S>(&mut self, date: NaiveDate, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.extend(symbols.into_iter().map(|s| RebalanceEntry {
            date,
            symbol: s.into(),
        }));
    }

    pub fn entries(&self) -> &[RebalanceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Member set per rebalance date, in date order.
    pub fn by_date(&self) -> Vec<(NaiveDate, BTreeSet<&str>)> {
        let mut grouped: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
        for entry in &self.entries {
            grouped
                .entry(entry.date)
                .or_default()
                .insert(entry.symbol.as_str());
        }
        grouped.into_iter().collect()
    }
}
