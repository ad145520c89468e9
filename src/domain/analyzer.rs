//! Performance metrics over a finished run.
//!
//! [`ResultAnalyzer`] owns a frozen snapshot of the equity curve, the optional
//! benchmark curve and the optional rebalance log. Every metric is a pure
//! function of that snapshot. Metrics that are mathematically undefined for
//! the given input (zero-length span, zero variance, missing benchmark) come
//! back as `None` rather than NaN.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::equity::EquityCurve;
use super::rebalance::RebalanceLog;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct ResultAnalyzer {
    equity: EquityCurve,
    benchmark: Option<EquityCurve>,
    rebalance_log: Option<RebalanceLog>,
    risk_free_rate: f64,
}

impl ResultAnalyzer {
    pub fn new(equity: EquityCurve) -> Self {
        ResultAnalyzer {
            equity,
            benchmark: None,
            rebalance_log: None,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }

    pub fn with_benchmark(mut self, benchmark: EquityCurve) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    pub fn with_rebalance_log(mut self, log: RebalanceLog) -> Self {
        self.rebalance_log = Some(log);
        self
    }

    /// Annual rate used by the Sharpe and Sortino columns of the summary.
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    pub fn equity(&self) -> &EquityCurve {
        &self.equity
    }

    pub fn benchmark(&self) -> Option<&EquityCurve> {
        self.benchmark.as_ref()
    }

    pub fn rebalance_log(&self) -> Option<&RebalanceLog> {
        self.rebalance_log.as_ref()
    }

    pub fn cagr(&self) -> Option<f64> {
        cagr(&self.equity)
    }

    pub fn max_drawdown(&self) -> f64 {
        max_drawdown(&self.equity)
    }

    pub fn volatility(&self) -> Option<f64> {
        volatility(&self.equity)
    }

    pub fn absolute_return(&self) -> Option<f64> {
        absolute_return(&self.equity)
    }

    /// Annualized mean excess daily return over its standard deviation.
    pub fn sharpe(&self, risk_free_rate: f64) -> Option<f64> {
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let excess: Vec<f64> = self
            .equity
            .pct_returns()
            .into_iter()
            .map(|r| r - daily_rf)
            .collect();
        let stddev = sample_stddev(&excess).filter(|&s| s > 0.0)?;
        Some(mean(&excess)? / stddev * TRADING_DAYS_PER_YEAR.sqrt())
    }

    /// Like [`sharpe`](Self::sharpe), but divided by the standard deviation
    /// of the negative daily returns only.
    pub fn sortino(&self, risk_free_rate: f64) -> Option<f64> {
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let returns = self.equity.pct_returns();
        let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let downside_dev = sample_stddev(&downside).filter(|&s| s > 0.0)?;
        let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
        Some(mean(&excess)? / downside_dev * TRADING_DAYS_PER_YEAR.sqrt())
    }

    /// Strategy CAGR minus benchmark CAGR.
    pub fn alpha(&self) -> Option<f64> {
        let benchmark = self.benchmark.as_ref()?;
        Some(self.cagr()? - cagr(benchmark)?)
    }

    /// Mean number of symbols dropped between consecutive rebalances.
    pub fn average_churn(&self) -> f64 {
        let Some(log) = &self.rebalance_log else {
            return 0.0;
        };
        let grouped = log.by_date();
        let churn: Vec<f64> = grouped
            .windows(2)
            .map(|w| w[0].1.difference(&w[1].1).count() as f64)
            .collect();
        mean(&churn).map(round2).unwrap_or(0.0)
    }

    /// Mean length, in rebalance periods, of each contiguous membership run.
    ///
    /// A run exits on the first rebalance that no longer contains the
    /// symbol; runs still open at the end close at the last rebalance.
    pub fn average_holding_period(&self) -> f64 {
        let Some(log) = &self.rebalance_log else {
            return 0.0;
        };
        let grouped = log.by_date();
        let mut active: BTreeMap<&str, usize> = BTreeMap::new();
        let mut durations: Vec<f64> = Vec::new();

        for (idx, (_, members)) in grouped.iter().enumerate() {
            for &symbol in members {
                active.entry(symbol).or_insert(idx);
            }
            active.retain(|symbol, entry| {
                if members.contains(symbol) {
                    true
                } else {
                    durations.push((idx - *entry) as f64);
                    false
                }
            });
        }

        if let Some(last) = grouped.len().checked_sub(1) {
            durations.extend(active.values().map(|&entry| (last - entry) as f64));
        }

        mean(&durations).map(round2).unwrap_or(0.0)
    }

    pub fn portfolio_summary(&self) -> PortfolioSummary {
        PortfolioSummary {
            cagr: self.cagr(),
            absolute_return: self.absolute_return(),
            max_drawdown: self.max_drawdown(),
            volatility: self.volatility(),
            sharpe_ratio: self.sharpe(self.risk_free_rate),
            sortino_ratio: self.sortino(self.risk_free_rate),
            alpha: self.alpha(),
            avg_churn: self.average_churn(),
            avg_holding_period: self.average_holding_period(),
        }
    }

    /// `None` when no benchmark was supplied or it has no points.
    pub fn benchmark_summary(&self) -> Option<BenchmarkSummary> {
        let benchmark = self.benchmark.as_ref().filter(|b| !b.is_empty())?;
        let absolute_return = match absolute_return(benchmark) {
            Some(r) => format!("{:.2}% ({:.2}x)", r * 100.0, 1.0 + r),
            None => "n/a".to_string(),
        };
        Some(BenchmarkSummary {
            cagr: cagr(benchmark).map(round4),
            absolute_return,
            max_drawdown: round4(max_drawdown(benchmark)),
            volatility: volatility(benchmark).map(round4),
        })
    }
}

/// `(last/first)^(365.25/days) - 1` over the curve's calendar span.
pub fn cagr(curve: &EquityCurve) -> Option<f64> {
    let (first, last) = (curve.first()?, curve.last()?);
    let days = (last.date - first.date).num_days();
    if days <= 0 || first.value <= 0.0 || last.value < 0.0 {
        return None;
    }
    let years = days as f64 / CALENDAR_DAYS_PER_YEAR;
    Some((last.value / first.value).powf(1.0 / years) - 1.0)
}

/// Deepest fall from a running peak, as a fraction `<= 0`.
pub fn max_drawdown(curve: &EquityCurve) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for value in curve.values() {
        peak = peak.max(value);
        if peak > 0.0 {
            max_dd = max_dd.min((value - peak) / peak);
        }
    }
    max_dd
}

/// Annualized sample standard deviation of daily returns.
pub fn volatility(curve: &EquityCurve) -> Option<f64> {
    sample_stddev(&curve.pct_returns()).map(|s| s * TRADING_DAYS_PER_YEAR.sqrt())
}

pub fn absolute_return(curve: &EquityCurve) -> Option<f64> {
    let (first, last) = (curve.first()?, curve.last()?);
    if first.value == 0.0 {
        return None;
    }
    Some(last.value / first.value - 1.0)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with Bessel's correction; undefined below two samples.
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "n/a".to_string(),
    }
}

/// Single-row report of the strategy's metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    #[serde(rename = "CAGR")]
    pub cagr: Option<f64>,
    #[serde(rename = "Absolute Return")]
    pub absolute_return: Option<f64>,
    #[serde(rename = "Max Drawdown")]
    pub max_drawdown: f64,
    #[serde(rename = "Volatility")]
    pub volatility: Option<f64>,
    #[serde(rename = "Sharpe Ratio")]
    pub sharpe_ratio: Option<f64>,
    #[serde(rename = "Sortino Ratio")]
    pub sortino_ratio: Option<f64>,
    #[serde(rename = "Alpha")]
    pub alpha: Option<f64>,
    #[serde(rename = "Avg Churn/Rebalance")]
    pub avg_churn: f64,
    #[serde(rename = "Avg Holding Period")]
    pub avg_holding_period: f64,
}

impl fmt::Display for PortfolioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("CAGR", fmt_metric(self.cagr)),
            ("Absolute Return", fmt_metric(self.absolute_return)),
            ("Max Drawdown", fmt_metric(Some(self.max_drawdown))),
            ("Volatility", fmt_metric(self.volatility)),
            ("Sharpe Ratio", fmt_metric(self.sharpe_ratio)),
            ("Sortino Ratio", fmt_metric(self.sortino_ratio)),
            ("Alpha", fmt_metric(self.alpha)),
            ("Avg Churn/Rebalance", format!("{:.2}", self.avg_churn)),
            ("Avg Holding Period", format!("{:.2}", self.avg_holding_period)),
        ];
        for (name, value) in rows {
            writeln!(f, "{name:<22}{value:>16}")?;
        }
        Ok(())
    }
}

/// Single-row report of the passive benchmark.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    #[serde(rename = "CAGR")]
    pub cagr: Option<f64>,
    #[serde(rename = "Absolute Return")]
    pub absolute_return: String,
    #[serde(rename = "Max Drawdown")]
    pub max_drawdown: f64,
    #[serde(rename = "Volatility")]
    pub volatility: Option<f64>,
}

impl fmt::Display for BenchmarkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("CAGR", fmt_metric(self.cagr)),
            ("Absolute Return", self.absolute_return.clone()),
            ("Max Drawdown", fmt_metric(Some(self.max_drawdown))),
            ("Volatility", fmt_metric(self.volatility)),
        ];
        for (name, value) in rows {
            writeln!(f, "{name:<22}{value:>16}")?;
        }
        Ok(())
    }
}
