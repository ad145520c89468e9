//! Open holdings held by the simulated broker.

use serde::Serialize;

/// A long position in one symbol.
///
/// `buy_price` is the volume-weighted average cost of every lot bought
/// into the holding. A holding never exists with zero quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: u64,
    pub buy_price: f64,
}

impl Holding {
    pub fn new(symbol: &str, quantity: u64, buy_price: f64) -> Self {
        Holding {
            symbol: symbol.to_string(),
            quantity,
            buy_price,
        }
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.buy_price
    }

    /// Fold a new lot into the holding, re-averaging the buy price.
    pub fn add_lot(&mut self, quantity: u64, price: f64) {
        let total_quantity = self.quantity + quantity;
        let total_value = self.cost_basis() + quantity as f64 * price;
        self.buy_price = total_value / total_quantity as f64;
        self.quantity = total_quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_holding() -> Holding {
        Holding::new("RELIANCE", 100, 50.0)
    }

    #[test]
    fn market_value() {
        let h = sample_holding();
        assert!((h.market_value(55.0) - 5500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cost_basis() {
        let h = sample_holding();
        assert!((h.cost_basis() - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn add_lot_averages_price() {
        let mut h = sample_holding();
        h.add_lot(100, 70.0);
        assert_eq!(h.quantity, 200);
        assert!((h.buy_price - 60.0).abs() < 1e-12);
    }

    #[test]
    fn add_lot_preserves_cost_basis() {
        let mut h = Holding::new("TCS", 3, 101.7);
        let before = h.cost_basis();
        h.add_lot(7, 99.3);
        assert!((h.cost_basis() - (before + 7.0 * 99.3)).abs() < 1e-9);
    }
}
