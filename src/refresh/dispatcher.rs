use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::fetch::{FetchTask, MarketDataSource};
use crate::notify::Notifier;
use crate::refresh::ResultRouter;
use crate::sink::ResultSink;
use crate::watchlist::Watchlist;

/// Orchestrates one refresh cycle: a single quote-batch task plus one
/// option-chain task per watchlist symbol, launched fire-and-forget. The
/// dispatcher owns the cycle's task group so shutdown can drain it.
pub struct RefreshDispatcher<C, S> {
    client: Arc<C>,
    router: Arc<ResultRouter<S>>,
    notifier: Notifier,
    shutdown: Arc<AtomicBool>,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    task_timeout: Duration,
}

impl<C, S> RefreshDispatcher<C, S>
where
    C: MarketDataSource,
    S: ResultSink + 'static,
{
    pub fn new(
        client: Arc<C>,
        router: Arc<ResultRouter<S>>,
        notifier: Notifier,
        task_timeout: Duration,
    ) -> Self {
        Self {
            client,
            router,
            notifier,
            shutdown: Arc::new(AtomicBool::new(false)),
            tasks: tokio::sync::Mutex::new(Vec::new()),
            task_timeout,
        }
    }

    pub fn router(&self) -> &ResultRouter<S> {
        &self.router
    }

    /// Launch the cycle's tasks and return without waiting for completions.
    /// Individual task failures surface through the notification channel, not
    /// through this return value.
    pub async fn refresh(&self, watchlist: &Watchlist) -> Result<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(AppError::Cancelled);
        }
        if watchlist.is_empty() {
            self.notifier.info("Watchlist is empty; nothing to refresh");
            return Ok(());
        }

        self.notifier
            .info(format!("Refreshing {} symbols", watchlist.len()));

        // One critical section for the whole pending sweep, before any task
        // can complete.
        self.router.mark_all_pending(watchlist.symbols()).await;

        let mut tasks = self.tasks.lock().await;
        // Reap handles from earlier cycles; without this the group grows by
        // 1+N completed handles every watch tick until shutdown.
        tasks.retain(|handle| !handle.is_finished());
        tasks.push(self.spawn(FetchTask::quote_batch(
            Arc::clone(&self.client),
            watchlist.symbols().to_vec(),
        )));
        for symbol in watchlist.symbols() {
            tasks.push(self.spawn(FetchTask::option_chain(
                Arc::clone(&self.client),
                symbol.clone(),
            )));
        }

        Ok(())
    }

    fn spawn(&self, task: FetchTask<C>) -> JoinHandle<()> {
        let router = Arc::clone(&self.router);
        let shutdown = Arc::clone(&self.shutdown);
        let task_timeout = self.task_timeout;

        tokio::spawn(async move {
            // Shutdown is checked before the provider call, never mid-flight.
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            let outcome = task.run(task_timeout).await;
            // A result that completes after shutdown is dropped so no sink
            // write is issued once in-flight deliveries have drained.
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            router.deliver(outcome).await;
        })
    }

    /// Wait for every task launched so far to finish routing its result.
    pub async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain(..).collect()
        };
        for result in join_all(handles).await {
            if let Err(err) = result {
                self.notifier
                    .error("Fetch task aborted before completion", &AppError::from(err));
            }
        }
    }

    /// Stop new tasks from launching and drain in-flight deliveries.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.drain().await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::model::{OptionStrike, StockQuote, Symbol};
    use crate::sink::{Board, ResultSink};
    use chrono::NaiveDate;

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).unwrap()
    }

    fn watchlist(symbols: &[&str]) -> Watchlist {
        Watchlist::from_symbols(symbols.iter().map(|raw| symbol(raw)))
    }

    fn strike(contract: &str, price: f64) -> OptionStrike {
        OptionStrike {
            symbol: contract.to_string(),
            expiration: NaiveDate::from_ymd_opt(2027, 1, 15).unwrap(),
            strike: price,
            bid: 3.1,
            ask: 3.4,
        }
    }

    /// Scripted provider: fixed quotes, per-symbol chains, optional outages.
    struct StubClient {
        quotes: Vec<StockQuote>,
        chains: HashMap<String, Vec<OptionStrike>>,
        fail_chains: HashSet<String>,
        quote_calls: AtomicUsize,
        chain_calls: AtomicUsize,
    }

    impl StubClient {
        fn new(quotes: Vec<StockQuote>, chains: HashMap<String, Vec<OptionStrike>>) -> Self {
            Self {
                quotes,
                chains,
                fail_chains: HashSet::new(),
                quote_calls: AtomicUsize::new(0),
                chain_calls: AtomicUsize::new(0),
            }
        }
    }

    impl MarketDataSource for StubClient {
        async fn quotes(&self, _symbols: &[Symbol]) -> crate::error::Result<Vec<StockQuote>> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.quotes.clone())
        }

        async fn option_chain(&self, symbol: &Symbol) -> crate::error::Result<Vec<OptionStrike>> {
            self.chain_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_chains.contains(symbol.as_str()) {
                return Err(AppError::provider(symbol, "simulated provider outage"));
            }
            Ok(self.chains.get(symbol.as_str()).cloned().unwrap_or_default())
        }
    }

    fn dispatcher(
        client: StubClient,
        symbols: &[&str],
        notifier: Notifier,
    ) -> RefreshDispatcher<StubClient, Board> {
        let board = Board::new(&watchlist(symbols));
        let router = Arc::new(ResultRouter::new(board, notifier.clone()));
        RefreshDispatcher::new(Arc::new(client), router, notifier, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn launches_one_batch_task_and_one_chain_task_per_symbol() {
        let symbols = ["AAPL", "MSFT", "GOOG"];
        let client = StubClient::new(Vec::new(), HashMap::new());
        let dispatcher = dispatcher(client, &symbols, Notifier::new());

        dispatcher.refresh(&watchlist(&symbols)).await.unwrap();
        dispatcher.drain().await;

        let client = dispatcher.client.as_ref();
        assert_eq!(client.quote_calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.chain_calls.load(Ordering::SeqCst), symbols.len());
    }

    #[tokio::test]
    async fn one_failed_chain_does_not_disturb_its_siblings() {
        // Watchlist AAPL+MSFT: quotes succeed for both, AAPL's chain has
        // three strikes, MSFT's chain fetch fails.
        let quotes = vec![
            StockQuote {
                symbol: symbol("AAPL"),
                last: 189.5,
                change: 1.1,
                close: 188.4,
            },
            StockQuote {
                symbol: symbol("MSFT"),
                last: 411.2,
                change: -0.9,
                close: 412.1,
            },
        ];
        let chains = HashMap::from([(
            "AAPL".to_string(),
            vec![
                strike("AAPL_C180", 180.0),
                strike("AAPL_C190", 190.0),
                strike("AAPL_C200", 200.0),
            ],
        )]);
        let mut client = StubClient::new(quotes, chains);
        client.fail_chains.insert("MSFT".to_string());

        let notifier = Notifier::new();
        let dispatcher = dispatcher(client, &["AAPL", "MSFT"], notifier.clone());

        dispatcher
            .refresh(&watchlist(&["AAPL", "MSFT"]))
            .await
            .unwrap();
        dispatcher.drain().await;

        let sink = dispatcher.router().sink().await;

        let aapl = sink.row(&symbol("AAPL")).unwrap();
        assert_eq!(sink.chain(&symbol("AAPL")).unwrap().len(), 3);
        assert!(!aapl.quote_pending);
        assert!(!aapl.chain_pending);

        let msft = sink.row(&symbol("MSFT")).unwrap();
        assert_eq!(msft.last, Some(411.2), "quotes succeeded for MSFT");
        assert!(!msft.quote_pending);
        assert!(sink.chain(&symbol("MSFT")).is_none(), "region untouched");
        assert!(msft.chain_pending, "failed chain leaves the cue set");

        let errors: Vec<_> = notifier
            .entries()
            .into_iter()
            .filter(|entry| entry.message.contains("MSFT") && entry.message.contains("failed"))
            .collect();
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn refresh_after_shutdown_is_cancelled() {
        let client = StubClient::new(Vec::new(), HashMap::new());
        let dispatcher = dispatcher(client, &["AAPL"], Notifier::new());

        dispatcher.shutdown().await;
        let err = dispatcher
            .refresh(&watchlist(&["AAPL"]))
            .await
            .expect_err("refresh must refuse after shutdown");

        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(
            dispatcher.client.quote_calls.load(Ordering::SeqCst),
            0,
            "no task may launch after shutdown"
        );
    }

    #[tokio::test]
    async fn empty_watchlist_launches_nothing() {
        let client = StubClient::new(Vec::new(), HashMap::new());
        let dispatcher = dispatcher(client, &[], Notifier::new());

        dispatcher.refresh(&watchlist(&[])).await.unwrap();
        dispatcher.drain().await;

        assert_eq!(dispatcher.client.quote_calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.client.chain_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn completed_cycles_do_not_accumulate_task_handles() {
        // Three back-to-back cycles over one symbol. Each launches two tasks;
        // once a cycle's tasks finish, the next refresh reaps their handles,
        // so the group never holds more than the current cycle.
        let client = StubClient::new(Vec::new(), HashMap::new());
        let dispatcher = dispatcher(client, &["AAPL"], Notifier::new());

        for _ in 0..3 {
            dispatcher.refresh(&watchlist(&["AAPL"])).await.unwrap();
            loop {
                let tasks = dispatcher.tasks.lock().await;
                if tasks.iter().all(JoinHandle::is_finished) {
                    break;
                }
                drop(tasks);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        assert!(
            dispatcher.tasks.lock().await.len() <= 2,
            "finished handles from earlier cycles must be reaped"
        );
        assert_eq!(dispatcher.client.quote_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn refresh_marks_every_symbol_pending_before_tasks_complete() {
        // A client that never responds within the test keeps the cycle
        // in-flight while we inspect the cues.
        struct StalledClient;

        impl MarketDataSource for StalledClient {
            async fn quotes(&self, _symbols: &[Symbol]) -> crate::error::Result<Vec<StockQuote>> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }

            async fn option_chain(
                &self,
                _symbol: &Symbol,
            ) -> crate::error::Result<Vec<OptionStrike>> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
        }

        let board = Board::new(&watchlist(&["AAPL", "MSFT"]));
        let router = Arc::new(ResultRouter::new(board, Notifier::new()));
        let dispatcher = RefreshDispatcher::new(
            Arc::new(StalledClient),
            router,
            Notifier::new(),
            Duration::from_secs(120),
        );

        dispatcher
            .refresh(&watchlist(&["AAPL", "MSFT"]))
            .await
            .unwrap();

        let sink = dispatcher.router().sink().await;
        for raw in ["AAPL", "MSFT"] {
            let row = sink.row(&symbol(raw)).unwrap();
            assert!(row.quote_pending);
            assert!(row.chain_pending);
        }
    }
}
