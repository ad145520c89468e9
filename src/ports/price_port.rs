//! Historical price access port.

use crate::domain::error::EquisimError;
use crate::domain::price::PriceSeries;
use std::collections::HashSet;

pub trait PricePort {
    /// Daily bars for `symbol`, or `None` when the source has nothing for it.
    fn fetch_prices(&self, symbol: &str) -> Result<Option<PriceSeries>, EquisimError>;

    /// Symbols previously found to have no data. Sources that do not track
    /// them report none.
    fn invalid_symbols(&self) -> Result<HashSet<String>, EquisimError> {
        Ok(HashSet::new())
    }

    /// Remember that `symbol` has no data. Default implementation: no-op.
    fn record_invalid_symbol(&self, _symbol: &str) -> Result<(), EquisimError> {
        Ok(())
    }
}
