//! NSE index constituent lists over HTTP.

use crate::domain::error::EquisimError;
use crate::domain::universe::{Universe, parse_symbol_list};
use crate::ports::universe_port::UniversePort;
use std::time::Duration;
use tracing::debug;

pub struct NseHttpAdapter {
    client: reqwest::blocking::Client,
}

impl NseHttpAdapter {
    pub fn new() -> Result<Self, EquisimError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| EquisimError::Fetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl UniversePort for NseHttpAdapter {
    fn symbols(&self, universe: &Universe) -> Result<Vec<String>, EquisimError> {
        let url = universe.index_list_url();
        debug!(%url, "downloading constituent list");
        let fetch_err = |reason: String| EquisimError::Fetch {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let body = response.text().map_err(|e| fetch_err(e.to_string()))?;
        Ok(parse_symbol_list(&body)?)
    }
}
