//! Backtest parameters and the order replay loop.
//!
//! Signal generation happens elsewhere; the replay loop takes the resulting
//! order list, feeds it to a [`SimulatedBroker`] one date at a time and marks
//! the portfolio to market after each date.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::broker::{DEFAULT_COST_RATE, OrderId, SimulatedBroker};
use super::equity::EquityCurve;
use super::error::EquisimError;
use super::price::PriceBook;
use super::transaction::Action;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub cost_rate: f64,
    pub risk_free_rate: f64,
    pub benchmark: Option<String>,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, initial_capital: f64) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            initial_capital,
            cost_rate: DEFAULT_COST_RATE,
            risk_free_rate: super::analyzer::DEFAULT_RISK_FREE_RATE,
            benchmark: None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    pub fn broker(&self) -> SimulatedBroker {
        SimulatedBroker::with_cost_rate(self.initial_capital, self.cost_rate)
    }
}

/// One order to submit on `date`. Without a price the order fills at that
/// date's close.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRequest {
    pub date: NaiveDate,
    pub symbol: String,
    pub action: Action,
    pub quantity: i64,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOrder {
    pub order: OrderRequest,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub equity_curve: EquityCurve,
    pub filled: Vec<OrderId>,
    pub rejected: Vec<RejectedOrder>,
}

/// Replay `orders` through `broker` over every price date in the configured
/// window (plus any order date the price book lacks).
///
/// Orders dated outside the window are ignored. Orders on the same date run
/// in input order. Rejected orders are collected, never fatal.
pub fn replay(
    broker: &mut SimulatedBroker,
    orders: &[OrderRequest],
    prices: &PriceBook,
    config: &BacktestConfig,
) -> Result<ReplayResult, EquisimError> {
    let mut pending: Vec<&OrderRequest> = orders
        .iter()
        .filter(|o| config.contains(o.date))
        .collect();
    pending.sort_by_key(|o| o.date);

    let timeline: BTreeSet<NaiveDate> = prices
        .timeline()
        .into_iter()
        .filter(|d| config.contains(*d))
        .chain(pending.iter().map(|o| o.date))
        .collect();

    let mut equity_curve = EquityCurve::default();
    let mut filled = Vec::new();
    let mut rejected = Vec::new();
    let mut next = 0;

    for &date in &timeline {
        while let Some(order) = pending.get(next).filter(|o| o.date == date) {
            next += 1;
            let Some(price) = order.price.or_else(|| prices.close_on(&order.symbol, date)) else {
                rejected.push(RejectedOrder {
                    order: (*order).clone(),
                    reason: format!("no price for {} on {}", order.symbol, date),
                });
                continue;
            };
            let result =
                broker.place_market_order(&order.symbol, order.quantity, order.action, price, date);
            match result {
                Ok(id) => {
                    debug!(order_id = %id, "filled");
                    filled.push(id);
                }
                Err(rejection) => rejected.push(RejectedOrder {
                    order: (*order).clone(),
                    reason: rejection.to_string(),
                }),
            }
        }
        equity_curve.push(date, broker.portfolio_value(prices, date))?;
    }

    info!(
        days = equity_curve.len(),
        filled = filled.len(),
        rejected = rejected.len(),
        "replay complete"
    );

    Ok(ReplayResult {
        equity_curve,
        filled,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::{PriceBar, PriceSeries};
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_config() -> BacktestConfig {
        BacktestConfig {
            cost_rate: 0.0,
            ..BacktestConfig::new(d(1), d(31), 10_000.0)
        }
    }

    fn book(closes: &[(u32, f64)]) -> PriceBook {
        let bars = closes
            .iter()
            .map(|&(day, close)| PriceBar {
                date: d(day),
                open: close,
                high: close,
                low: close,
                close,
                adj_close: None,
                volume: 0,
            })
            .collect();
        PriceBook::default().with_series(PriceSeries::new("INFY.NS", bars))
    }

    fn order(day: u32, action: Action, quantity: i64, price: Option<f64>) -> OrderRequest {
        OrderRequest {
            date: d(day),
            symbol: "INFY".into(),
            action,
            quantity,
            price,
        }
    }

    #[test]
    fn config_defaults() {
        let c = BacktestConfig::new(d(1), d(31), 100_000.0);
        assert_relative_eq!(c.cost_rate, 0.001190);
        assert_relative_eq!(c.risk_free_rate, 0.05);
        assert!(c.benchmark.is_none());
        assert!(c.contains(d(1)) && c.contains(d(31)));
        assert!(!c.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
    }

    #[test]
    fn replay_marks_to_market_each_date() {
        let config = sample_config();
        let mut broker = config.broker();
        let prices = book(&[(2, 100.0), (3, 110.0), (4, 120.0)]);
        let orders = vec![order(2, Action::Buy, 10, None), order(4, Action::Sell, 10, None)];

        let result = replay(&mut broker, &orders, &prices, &config).unwrap();

        let values: Vec<f64> = result.equity_curve.values().collect();
        assert_eq!(values, vec![10_000.0, 10_100.0, 10_200.0]);
        assert_eq!(result.filled.len(), 2);
        assert!(result.rejected.is_empty());
        assert!(broker.holdings().is_empty());
    }

    #[test]
    fn replay_uses_explicit_price() {
        let config = sample_config();
        let mut broker = config.broker();
        let prices = book(&[(2, 100.0)]);
        let orders = vec![order(2, Action::Buy, 10, Some(90.0))];

        replay(&mut broker, &orders, &prices, &config).unwrap();
        assert_relative_eq!(broker.cash_balance(), 9_100.0);
    }

    #[test]
    fn replay_collects_rejections() {
        let config = sample_config();
        let mut broker = config.broker();
        let prices = book(&[(2, 100.0), (3, 100.0)]);
        let orders = vec![
            order(2, Action::Sell, 5, None),
            order(3, Action::Buy, 1_000, None),
            order(5, Action::Buy, 1, None),
        ];

        let result = replay(&mut broker, &orders, &prices, &config).unwrap();
        assert_eq!(result.rejected.len(), 3);
        assert!(result.rejected[0].reason.contains("insufficient shares"));
        assert!(result.rejected[1].reason.contains("insufficient funds"));
        assert!(result.rejected[2].reason.contains("no price"));
        // the order-only date still gets an equity point
        assert_eq!(result.equity_curve.len(), 3);
        assert_relative_eq!(broker.cash_balance(), 10_000.0);
    }

    #[test]
    fn replay_ignores_orders_outside_window() {
        let config = BacktestConfig {
            start_date: d(3),
            ..sample_config()
        };
        let mut broker = config.broker();
        let prices = book(&[(2, 100.0), (3, 100.0)]);
        let orders = vec![order(2, Action::Buy, 1, None)];

        let result = replay(&mut broker, &orders, &prices, &config).unwrap();
        assert!(result.filled.is_empty());
        assert_eq!(result.equity_curve.len(), 1);
        assert_eq!(result.equity_curve.first().unwrap().date, d(3));
    }
}
