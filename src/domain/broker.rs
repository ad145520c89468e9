//! Simulated broker: cash, holdings and the transaction log.
//!
//! Orders execute as market orders at the caller-supplied price. Every order
//! either applies all of its mutations or none of them; rejected orders
//! leave cash, holdings and the log untouched.

use chrono::NaiveDate;
use std::fmt;
use tracing::{info, warn};

use super::holding::Holding;
use super::price::PriceBook;
use super::transaction::{Action, Transaction};

/// 0.1190% of traded value, charged on both sides.
pub const DEFAULT_COST_RATE: f64 = 0.001190;

/// Identifier handed back for a filled order.
///
/// Derived from symbol, date and side only; two fills of the same symbol and
/// side on the same date share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
    fn new(symbol: &str, date: NaiveDate, action: Action) -> Self {
        OrderId(format!(
            "MOCK_ORDER_{}_{}_{}",
            symbol,
            date.format("%Y%m%d"),
            action
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why an order was not executed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderRejection {
    #[error("invalid quantity {quantity} for {symbol}")]
    InvalidQuantity { symbol: String, quantity: i64 },

    #[error("invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("insufficient funds for {symbol}: need {required:.2}, have {available:.2}")]
    InsufficientFunds {
        symbol: String,
        required: f64,
        available: f64,
    },

    #[error("insufficient shares to sell {symbol}: need {requested}, have {held}")]
    InsufficientShares {
        symbol: String,
        requested: u64,
        held: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedBroker {
    initial_capital: f64,
    cost_rate: f64,
    cash: f64,
    holdings: Vec<Holding>,
    transactions: Vec<Transaction>,
}

impl SimulatedBroker {
    pub fn new(initial_capital: f64) -> Self {
        Self::with_cost_rate(initial_capital, DEFAULT_COST_RATE)
    }

    pub fn with_cost_rate(initial_capital: f64, cost_rate: f64) -> Self {
        SimulatedBroker {
            initial_capital,
            cost_rate,
            cash: initial_capital,
            holdings: Vec::new(),
            transactions: Vec::new(),
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cost_rate(&self) -> f64 {
        self.cost_rate
    }

    pub fn cash_balance(&self) -> f64 {
        self.cash
    }

    /// Open holdings in the order they were first bought.
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn current_positions(&self) -> &[Holding] {
        self.holdings()
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Cash plus holdings marked at the close on `date`.
    ///
    /// A holding with no bar on `date` is valued at its average buy price.
    pub fn portfolio_value(&self, prices: &PriceBook, date: NaiveDate) -> f64 {
        let holdings_value: f64 = self
            .holdings
            .iter()
            .map(|h| {
                let price = prices.close_on(&h.symbol, date).unwrap_or(h.buy_price);
                h.market_value(price)
            })
            .sum();
        self.cash + holdings_value
    }

    pub fn place_market_order(
        &mut self,
        symbol: &str,
        quantity: i64,
        action: Action,
        price: f64,
        date: NaiveDate,
    ) -> Result<OrderId, OrderRejection> {
        if quantity <= 0 {
            let rejection = OrderRejection::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity,
            };
            warn!("{rejection}");
            return Err(rejection);
        }
        if !price.is_finite() || price <= 0.0 {
            let rejection = OrderRejection::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            };
            warn!("{rejection}");
            return Err(rejection);
        }
        let quantity = quantity as u64;

        let transaction_value = quantity as f64 * price;
        let transaction_cost = transaction_value * self.cost_rate;

        let result = match action {
            Action::Buy => {
                self.execute_buy(symbol, quantity, price, transaction_value, transaction_cost)
            }
            Action::Sell => {
                self.execute_sell(symbol, quantity, transaction_value, transaction_cost)
            }
        };
        if let Err(rejection) = result {
            warn!("{rejection}");
            return Err(rejection);
        }

        self.transactions.push(Transaction {
            date,
            symbol: symbol.to_string(),
            action,
            quantity,
            price,
            transaction_cost,
            cash_after: self.cash,
        });

        Ok(OrderId::new(symbol, date, action))
    }

    fn execute_buy(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: f64,
        transaction_value: f64,
        transaction_cost: f64,
    ) -> Result<(), OrderRejection> {
        let total_cost = transaction_value + transaction_cost;
        if total_cost > self.cash {
            return Err(OrderRejection::InsufficientFunds {
                symbol: symbol.to_string(),
                required: total_cost,
                available: self.cash,
            });
        }

        self.cash -= total_cost;
        match self.holdings.iter_mut().find(|h| h.symbol == symbol) {
            Some(holding) => holding.add_lot(quantity, price),
            None => self.holdings.push(Holding::new(symbol, quantity, price)),
        }
        Ok(())
    }

    fn execute_sell(
        &mut self,
        symbol: &str,
        quantity: u64,
        transaction_value: f64,
        transaction_cost: f64,
    ) -> Result<(), OrderRejection> {
        let idx = self.holdings.iter().position(|h| h.symbol == symbol);
        let held = idx.map(|i| self.holdings[i].quantity).unwrap_or(0);
        let idx = match idx {
            Some(i) if held >= quantity => i,
            _ => {
                return Err(OrderRejection::InsufficientShares {
                    symbol: symbol.to_string(),
                    requested: quantity,
                    held,
                });
            }
        };

        self.holdings[idx].quantity -= quantity;
        if self.holdings[idx].quantity == 0 {
            self.holdings.remove(idx);
        }
        self.cash += transaction_value - transaction_cost;
        Ok(())
    }

    /// Restore the starting state, optionally with a new starting capital.
    pub fn reset(&mut self, initial_capital: Option<f64>) {
        if let Some(capital) = initial_capital {
            self.initial_capital = capital;
        }
        self.cash = self.initial_capital;
        self.holdings.clear();
        self.transactions.clear();
        info!(
            initial_capital = self.initial_capital,
            "broker reset with {:.2} initial capital", self.initial_capital
        );
    }
}
