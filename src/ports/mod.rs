//! Port traits at the I/O seams.

pub mod config_port;
pub mod price_port;
pub mod report_port;
pub mod universe_port;
