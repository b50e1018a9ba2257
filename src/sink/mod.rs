pub mod board;

pub use board::{Board, BoardRow};

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{OptionStrike, StockQuote, Symbol};

/// Which staleness cue a settle call clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Quote,
    Chain,
}

/// Destination for parsed fetch results.
///
/// Implementations are not reentrant and must only be invoked while the
/// router's sink lock is held. No assumption is made about which thread a
/// call arrives on.
pub trait ResultSink: Send {
    /// Resolve a symbol to its row slot; `None` when the symbol has no row.
    fn find_row(&self, symbol: &Symbol) -> Option<usize>;

    fn write_quote(&mut self, row: usize, quote: &StockQuote) -> Result<()>;

    /// Replace the symbol's chain region wholesale with the given strikes.
    fn write_chain(&mut self, symbol: &Symbol, strikes: &[OptionStrike]) -> Result<()>;

    /// Flag both cues of every listed symbol as in progress.
    fn mark_pending(&mut self, symbols: &[Symbol]);

    fn mark_settled(&mut self, symbol: &Symbol, cue: Cue);

    fn stamp_refreshed(&mut self, at: NaiveDate);
}
