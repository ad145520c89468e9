//! Equity curves: date-indexed portfolio (or benchmark) values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::EquisimError;
use super::price::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A value series with strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new(points: Vec<EquityPoint>) -> Result<Self, EquisimError> {
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(EquisimError::InvalidSeries {
                reason: format!(
                    "dates must be strictly increasing: {} followed by {}",
                    w[0].date, w[1].date
                ),
            });
        }
        Ok(Self { points })
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, EquisimError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| EquityPoint { date, value })
                .collect(),
        )
    }

    /// Closing prices of a series, used as a buy-and-hold benchmark.
    pub fn from_closes(series: &PriceSeries) -> Self {
        // PriceSeries is already sorted and de-duplicated
        Self {
            points: series
                .bars
                .iter()
                .map(|bar| EquityPoint {
                    date: bar.date,
                    value: bar.close,
                })
                .collect(),
        }
    }

    /// Append a point; it must be later than the current last point.
    pub fn push(&mut self, date: NaiveDate, value: f64) -> Result<(), EquisimError> {
        if let Some(last) = self.points.last() {
            if date <= last.date {
                return Err(EquisimError::InvalidSeries {
                    reason: format!("{} is not after last point {}", date, last.date),
                });
            }
        }
        self.points.push(EquityPoint { date, value });
        Ok(())
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&EquityPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.points.last()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Day-over-day percentage changes, skipping undefined ones.
    pub fn pct_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| (w[1].value - w[0].value) / w[0].value)
            .filter(|r| r.is_finite())
            .collect()
    }
}
