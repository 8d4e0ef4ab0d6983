use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Listing suffixes for instruments traded on Indian exchanges (NSE, BSE).
const INDIAN_SUFFIXES: [&str; 2] = [".NS", ".BO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    India,
    Us,
}

impl Market {
    /// Value of the provider's `region` query parameter.
    pub fn region(&self) -> &'static str {
        match self {
            Market::India => "IN",
            Market::Us => "US",
        }
    }

    pub fn currency(&self) -> &'static str {
        match self {
            Market::India => "INR",
            Market::Us => "USD",
        }
    }
}

/// Ticker symbol as the provider knows it, e.g. `AAPL` or `RELIANCE.NS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Symbol(symbol.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn market(&self) -> Market {
        let upper = self.0.to_uppercase();
        if INDIAN_SUFFIXES.iter().any(|s| upper.ends_with(s)) {
            Market::India
        } else {
            Market::Us
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Symbol::new(value)
    }
}
