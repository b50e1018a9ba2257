use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{AppError, Result};
use crate::fetch::MarketDataSource;
use crate::model::{FetchOutcome, FetchScope, Symbol};

/// One concurrent unit of work wrapping exactly one provider call.
pub enum FetchTask<C> {
    /// Batched quote lookup covering the whole watchlist in one round trip.
    QuoteBatch {
        client: Arc<C>,
        symbols: Vec<Symbol>,
    },
    /// Option-chain lookup for a single underlying.
    OptionChain { client: Arc<C>, symbol: Symbol },
}

impl<C: MarketDataSource> FetchTask<C> {
    pub fn quote_batch(client: Arc<C>, symbols: Vec<Symbol>) -> Self {
        FetchTask::QuoteBatch { client, symbols }
    }

    pub fn option_chain(client: Arc<C>, symbol: Symbol) -> Self {
        FetchTask::OptionChain { client, symbol }
    }

    pub fn scope(&self) -> FetchScope {
        match self {
            FetchTask::QuoteBatch { .. } => FetchScope::QuoteBatch,
            FetchTask::OptionChain { symbol, .. } => FetchScope::OptionChain(symbol.clone()),
        }
    }

    /// Runs the wrapped provider call. Errors and elapsed timeouts are folded
    /// into the outcome; nothing escapes the task boundary.
    pub async fn run(self, task_timeout: Duration) -> FetchOutcome {
        let scope = self.scope();
        match timeout(task_timeout, self.call()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => FetchOutcome::Failed { scope, error },
            Err(_) => {
                let error = AppError::provider(
                    &scope,
                    format!("no response within {}s", task_timeout.as_secs()),
                );
                FetchOutcome::Failed { scope, error }
            }
        }
    }

    async fn call(self) -> Result<FetchOutcome> {
        match self {
            FetchTask::QuoteBatch { client, symbols } => {
                let quotes = client.quotes(&symbols).await?;
                Ok(FetchOutcome::QuoteBatch(quotes))
            }
            FetchTask::OptionChain { client, symbol } => {
                let strikes = client.option_chain(&symbol).await?;
                Ok(FetchOutcome::OptionChain { symbol, strikes })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OptionStrike, StockQuote};

    struct SlowClient;

    impl MarketDataSource for SlowClient {
        async fn quotes(&self, _symbols: &[Symbol]) -> Result<Vec<StockQuote>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn option_chain(&self, _symbol: &Symbol) -> Result<Vec<OptionStrike>> {
            Ok(Vec::new())
        }
    }

    struct FailingClient;

    impl MarketDataSource for FailingClient {
        async fn quotes(&self, _symbols: &[Symbol]) -> Result<Vec<StockQuote>> {
            Err(AppError::message("connection reset"))
        }

        async fn option_chain(&self, symbol: &Symbol) -> Result<Vec<OptionStrike>> {
            Err(AppError::provider(symbol, "503 from upstream"))
        }
    }

    #[tokio::test]
    async fn stalled_call_times_out_into_a_failed_outcome() {
        let task = FetchTask::quote_batch(Arc::new(SlowClient), vec![Symbol::parse("SPY").unwrap()]);

        let outcome = task.run(Duration::from_millis(20)).await;

        match outcome {
            FetchOutcome::Failed { scope, error } => {
                assert_eq!(scope, FetchScope::QuoteBatch);
                assert!(error.to_string().contains("no response within"));
            }
            other => panic!("expected Failed outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn client_errors_never_escape_the_task() {
        let symbol = Symbol::parse("MSFT").unwrap();
        let task = FetchTask::option_chain(Arc::new(FailingClient), symbol.clone());

        let outcome = task.run(Duration::from_secs(5)).await;

        match outcome {
            FetchOutcome::Failed { scope, error } => {
                assert_eq!(scope, FetchScope::OptionChain(symbol));
                assert!(error.to_string().contains("503 from upstream"));
            }
            other => panic!("expected Failed outcome, got {:?}", other),
        }
    }
}
