//! File cache in front of an upstream universe source.

use crate::domain::error::EquisimError;
use crate::domain::universe::{Universe, parse_symbol_list};
use crate::ports::universe_port::UniversePort;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Serves `{cache_dir}/{universe}.csv` when caching is enabled and the file
/// exists; otherwise asks `upstream` and (when caching) saves the result.
pub struct CachedUniverseAdapter<U> {
    cache_dir: PathBuf,
    caching: bool,
    upstream: U,
}

impl<U: UniversePort> CachedUniverseAdapter<U> {
    pub fn new(cache_dir: PathBuf, caching: bool, upstream: U) -> Self {
        Self {
            cache_dir,
            caching,
            upstream,
        }
    }

    fn cache_path(&self, universe: &Universe) -> PathBuf {
        self.cache_dir.join(format!("{}.csv", universe.name))
    }

    fn write_cache(&self, universe: &Universe, symbols: &[String]) -> Result<(), EquisimError> {
        fs::create_dir_all(&self.cache_dir)?;
        let mut wtr = csv::Writer::from_path(self.cache_path(universe))?;
        wtr.write_record(["Symbol"])?;
        for symbol in symbols {
            wtr.write_record([symbol])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl<U: UniversePort> UniversePort for CachedUniverseAdapter<U> {
    fn symbols(&self, universe: &Universe) -> Result<Vec<String>, EquisimError> {
        let path = self.cache_path(universe);
        if self.caching && path.exists() {
            let content = fs::read_to_string(&path)?;
            return Ok(parse_symbol_list(&content)?);
        }

        let symbols = self.upstream.symbols(universe)?;
        info!(universe = %universe.name, count = symbols.len(), "fetched universe");
        if self.caching {
            self.write_cache(universe, &symbols)?;
        }
        Ok(symbols)
    }
}

/// Upstream that never has data; for running from a pre-filled cache.
pub struct OfflineUniverse;

impl UniversePort for OfflineUniverse {
    fn symbols(&self, universe: &Universe) -> Result<Vec<String>, EquisimError> {
        Err(EquisimError::Fetch {
            url: universe.index_list_url(),
            reason: "offline: no cached constituent list".to_string(),
        })
    }
}
