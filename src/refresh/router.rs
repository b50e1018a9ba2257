use chrono::Local;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::AppError;
use crate::model::{FetchOutcome, Symbol};
use crate::notify::Notifier;
use crate::sink::{Cue, ResultSink};

/// Applies completed fetch outcomes to the sink under a single
/// mutual-exclusion domain. At most one delivery executes its sink-mutating
/// body at a time; concurrent callers queue on the sink lock.
pub struct ResultRouter<S> {
    sink: Mutex<S>,
    notifier: Notifier,
}

impl<S: ResultSink> ResultRouter<S> {
    pub fn new(sink: S, notifier: Notifier) -> Self {
        Self {
            sink: Mutex::new(sink),
            notifier,
        }
    }

    /// Flag every given symbol as in progress in one critical section.
    pub async fn mark_all_pending(&self, symbols: &[Symbol]) {
        let mut sink = self.sink.lock().await;
        sink.mark_pending(symbols);
    }

    /// Commit one fetch outcome. Sink and lookup failures are reported to the
    /// notification channel and never propagate to the caller; the lock is
    /// released on every exit path.
    pub async fn deliver(&self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Failed { scope, error } => {
                // No sink mutation for a failed fetch; its pending cue stays
                // set to signal staleness.
                self.notifier
                    .error(format!("Fetch failed for {}", scope), &error);
            }
            FetchOutcome::QuoteBatch(quotes) => {
                let mut sink = self.sink.lock().await;
                for quote in &quotes {
                    let Some(row) = sink.find_row(&quote.symbol) else {
                        self.notifier.error(
                            format!("Skipping quote for {}", quote.symbol),
                            &AppError::sink_write(format!(
                                "symbol {} not present on the board",
                                quote.symbol
                            )),
                        );
                        continue;
                    };
                    match sink.write_quote(row, quote) {
                        Ok(()) => sink.mark_settled(&quote.symbol, Cue::Quote),
                        Err(err) => self
                            .notifier
                            .error(format!("Failed to write quote for {}", quote.symbol), &err),
                    }
                }
            }
            FetchOutcome::OptionChain { symbol, strikes } => {
                let mut sink = self.sink.lock().await;
                if strikes.is_empty() {
                    // Guard against a zero-sized block write. An empty chain
                    // is still fresh data, so the cue settles.
                    sink.mark_settled(&symbol, Cue::Chain);
                    return;
                }
                match sink.write_chain(&symbol, &strikes) {
                    Ok(()) => {
                        sink.stamp_refreshed(Local::now().date_naive());
                        sink.mark_settled(&symbol, Cue::Chain);
                    }
                    Err(err) => self.notifier.error(
                        format!("Failed to write option chain for {}", symbol),
                        &err,
                    ),
                }
            }
        }
    }

    /// Read access to the sink. The guard participates in the same lock
    /// domain as `deliver`, so holding it excludes writes.
    pub async fn sink(&self) -> MutexGuard<'_, S> {
        self.sink.lock().await
    }
}
