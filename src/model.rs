use std::fmt;

use chrono::NaiveDate;

use crate::error::AppError;

/// Ticker symbol as it appears on the board. Always trimmed, upper-cased and
/// non-empty; blank watchlist cells never become symbols.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single equity quote row returned by the provider's batch endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StockQuote {
    pub symbol: Symbol,
    pub last: f64,
    pub change: f64,
    pub close: f64,
}

/// One strike of an option chain, carrying the contract symbol of the
/// underlying's call leg.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionStrike {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub strike: f64,
    pub bid: f64,
    pub ask: f64,
}

/// Identifies the concurrent unit a fetch outcome originated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchScope {
    QuoteBatch,
    OptionChain(Symbol),
}

impl fmt::Display for FetchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchScope::QuoteBatch => f.write_str("stock-quote batch"),
            FetchScope::OptionChain(symbol) => write!(f, "option chain {}", symbol),
        }
    }
}

/// Completed result of one fetch task, consumed exactly once by the router.
#[derive(Debug)]
pub enum FetchOutcome {
    QuoteBatch(Vec<StockQuote>),
    OptionChain {
        symbol: Symbol,
        strikes: Vec<OptionStrike>,
    },
    Failed {
        scope: FetchScope,
        error: AppError,
    },
}
