use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::config::WatchlistConfig;
use crate::error::{AppError, Context, Result};
use crate::model::Symbol;

/// Ordered set of symbols under observation. Order maps to board row
/// position and is preserved end-to-end; blanks are skipped and duplicates
/// keep their first slot.
#[derive(Debug, Clone)]
pub struct Watchlist {
    symbols: Vec<Symbol>,
}

impl Watchlist {
    pub fn from_symbols<I: IntoIterator<Item = Symbol>>(symbols: I) -> Self {
        let mut seen = HashSet::new();
        let symbols = symbols
            .into_iter()
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect();
        Self { symbols }
    }

    /// Reads the configured range fresh from disk. Workbooks are scanned over
    /// the fixed sheet range; `.csv` and `.txt` files are read as a
    /// single-column list. Anything else is rejected rather than misparsed.
    pub fn load(cfg: &WatchlistConfig) -> Result<Self> {
        let path = Path::new(&cfg.path);
        if !path.exists() {
            return Err(AppError::config(format!(
                "watchlist file {} not found",
                cfg.path
            )));
        }

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");
        let cells = match extension.to_ascii_lowercase().as_str() {
            "xlsx" => read_workbook_cells(cfg)?,
            "csv" | "txt" => read_csv_cells(path)?,
            other => {
                return Err(AppError::config(format!(
                    "unsupported watchlist extension {:?} for {}; expected .xlsx, .csv, or .txt",
                    other, cfg.path
                )))
            }
        };

        Ok(Self {
            symbols: collect_symbols(cells),
        })
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Scan the configured row range of the symbol column, keeping blanks as
/// placeholders so `collect_symbols` can drop them.
fn read_workbook_cells(cfg: &WatchlistConfig) -> Result<Vec<Option<String>>> {
    let mut workbook: Xlsx<_> = open_workbook(&cfg.path)
        .with_context(|| format!("Failed to open watchlist workbook {}", cfg.path))?;
    let range = workbook
        .worksheet_range(&cfg.sheet)
        .with_context(|| format!("Sheet {} not found in watchlist workbook", cfg.sheet))?;

    let column = cfg.symbol_column.saturating_sub(1) as u32;
    let mut cells = Vec::new();
    for row in cfg.first_row..=cfg.last_row {
        let value = range
            .get_value((row.saturating_sub(1) as u32, column))
            .and_then(cell_to_string);
        cells.push(value);
    }
    Ok(cells)
}

fn read_csv_cells(path: &Path) -> Result<Vec<Option<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open watchlist file {}", path.display()))?;

    let mut cells = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read watchlist record")?;
        cells.push(record.get(0).map(|cell| cell.to_string()));
    }
    Ok(cells)
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.trim().to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn collect_symbols<I: IntoIterator<Item = Option<String>>>(cells: I) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();
    for cell in cells {
        let Some(symbol) = cell.as_deref().and_then(Symbol::parse) else {
            continue;
        };
        if seen.insert(symbol.clone()) {
            symbols.push(symbol);
        }
    }
    symbols
}
