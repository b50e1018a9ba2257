use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{AppError, Context, Result};
use crate::model::{OptionStrike, StockQuote, Symbol};
use crate::sink::{Cue, ResultSink};
use crate::watchlist::Watchlist;

/// Instrument kind written to the chain block; the chain fetch requests call
/// legs only.
const CHAIN_INSTRUMENT_KIND: &str = "CALL";

/// One watchlist row on the board.
#[derive(Debug, Clone)]
pub struct BoardRow {
    pub symbol: Symbol,
    pub last: Option<f64>,
    pub change: Option<f64>,
    pub close: Option<f64>,
    pub quote_pending: bool,
    pub chain_pending: bool,
}

impl BoardRow {
    fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            last: None,
            change: None,
            close: None,
            quote_pending: false,
            chain_pending: false,
        }
    }
}

/// In-memory result sink mirroring the original board layout: one quote row
/// per watchlist symbol plus a dedicated chain region per symbol.
pub struct Board {
    rows: Vec<BoardRow>,
    chains: HashMap<Symbol, Vec<OptionStrike>>,
    last_refreshed: Option<NaiveDate>,
}

impl Board {
    pub fn new(watchlist: &Watchlist) -> Self {
        let rows = watchlist
            .symbols()
            .iter()
            .cloned()
            .map(BoardRow::new)
            .collect();
        Self {
            rows,
            chains: HashMap::new(),
            last_refreshed: None,
        }
    }

    pub fn rows(&self) -> &[BoardRow] {
        &self.rows
    }

    pub fn row(&self, symbol: &Symbol) -> Option<&BoardRow> {
        self.rows.iter().find(|row| &row.symbol == symbol)
    }

    pub fn chain(&self, symbol: &Symbol) -> Option<&[OptionStrike]> {
        self.chains.get(symbol).map(Vec::as_slice)
    }

    pub fn last_refreshed(&self) -> Option<NaiveDate> {
        self.last_refreshed
    }

    /// Persist the quote rows so a cycle's output can be inspected later.
    pub fn save_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer =
            csv::Writer::from_path(path.as_ref()).context("Failed to create board CSV writer")?;

        writer.write_record(["symbol", "last", "change", "close", "stale"])?;
        for row in &self.rows {
            writer.write_record(&[
                row.symbol.as_str().to_string(),
                format_cell(row.last),
                format_cell(row.change),
                format_cell(row.close),
                (row.quote_pending || row.chain_pending).to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Persist every chain region as one rectangular block, in row order.
    pub fn save_chains_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer =
            csv::Writer::from_path(path.as_ref()).context("Failed to create chains CSV writer")?;

        writer.write_record(["symbol", "kind", "expiration", "strike", "bid", "ask"])?;
        for row in &self.rows {
            let Some(strikes) = self.chains.get(&row.symbol) else {
                continue;
            };
            for strike in strikes {
                writer.write_record(&[
                    strike.symbol.clone(),
                    CHAIN_INSTRUMENT_KIND.to_string(),
                    strike.expiration.format("%Y-%m-%d").to_string(),
                    strike.strike.to_string(),
                    strike.bid.to_string(),
                    strike.ask.to_string(),
                ])?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

impl ResultSink for Board {
    fn find_row(&self, symbol: &Symbol) -> Option<usize> {
        // Linear scan over the watchlist range, like the original row lookup.
        self.rows.iter().position(|row| &row.symbol == symbol)
    }

    fn write_quote(&mut self, row: usize, quote: &StockQuote) -> Result<()> {
        let slot = self.rows.get_mut(row).ok_or_else(|| {
            AppError::sink_write(format!("row {} is outside the board range", row))
        })?;
        slot.last = Some(quote.last);
        slot.change = Some(quote.change);
        slot.close = Some(quote.close);
        Ok(())
    }

    fn write_chain(&mut self, symbol: &Symbol, strikes: &[OptionStrike]) -> Result<()> {
        if self.find_row(symbol).is_none() {
            return Err(AppError::sink_write(format!(
                "no chain region for symbol {}",
                symbol
            )));
        }
        self.chains.insert(symbol.clone(), strikes.to_vec());
        Ok(())
    }

    fn mark_pending(&mut self, symbols: &[Symbol]) {
        for row in &mut self.rows {
            if symbols.contains(&row.symbol) {
                row.quote_pending = true;
                row.chain_pending = true;
            }
        }
    }

    fn mark_settled(&mut self, symbol: &Symbol, cue: Cue) {
        let Some(index) = self.find_row(symbol) else {
            return;
        };
        match cue {
            Cue::Quote => self.rows[index].quote_pending = false,
            Cue::Chain => self.rows[index].chain_pending = false,
        }
    }

    fn stamp_refreshed(&mut self, at: NaiveDate) {
        self.last_refreshed = Some(at);
    }
}
