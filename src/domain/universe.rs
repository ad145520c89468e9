//! Index universes ("nifty50", "nifty500", ...) and their constituent lists.

use std::collections::HashSet;

const UNIVERSE_PREFIX: &str = "nifty";
const PLACEHOLDER_PREFIX: &str = "DUMMY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pub name: String,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("universe format should be like 'nifty100', 'nifty500': got '{0}'")]
    InvalidName(String),

    #[error("constituent list has no 'Symbol' column")]
    MissingSymbolColumn,

    #[error("malformed constituent list: {0}")]
    Malformed(String),
}

impl Universe {
    pub fn parse(name: &str) -> Result<Self, UniverseError> {
        let trimmed = name.trim();
        let size = trimmed
            .strip_prefix(UNIVERSE_PREFIX)
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|&size| size > 0)
            .ok_or_else(|| UniverseError::InvalidName(name.to_string()))?;
        Ok(Universe {
            name: trimmed.to_string(),
            size,
        })
    }

    pub fn index_list_url(&self) -> String {
        format!(
            "https://archives.nseindia.com/content/indices/ind_nifty{}list.csv",
            self.size
        )
    }
}

/// Extract symbols from an index constituent CSV.
///
/// Reads the `Symbol` column, skips blanks, keeps the first occurrence of
/// each symbol and drops exchange placeholder rows (`DUMMY...`).
pub fn parse_symbol_list(csv_text: &str) -> Result<Vec<String>, UniverseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| UniverseError::Malformed(e.to_string()))?;
    let column = headers
        .iter()
        .position(|h| h.trim() == "Symbol")
        .ok_or(UniverseError::MissingSymbolColumn)?;

    let mut seen = HashSet::new();
    let mut symbols = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| UniverseError::Malformed(e.to_string()))?;
        let Some(symbol) = record.get(column).map(str::trim) else {
            continue;
        };
        if symbol.is_empty() || symbol.starts_with(PLACEHOLDER_PREFIX) {
            continue;
        }
        if seen.insert(symbol.to_string()) {
            symbols.push(symbol.to_string());
        }
    }
    Ok(symbols)
}
