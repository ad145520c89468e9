//! Concrete adapter implementations for ports.

pub mod csv_price_cache;
pub mod csv_report_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http")]
pub mod nse_http_adapter;
pub mod universe_cache_adapter;
