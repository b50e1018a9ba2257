use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::{AppError, Context, Result};
use crate::model::{OptionStrike, StockQuote, Symbol};

/// Remote quote provider consumed by fetch tasks. One method per round-trip
/// kind: a batched equity-quote lookup and a single-symbol option chain.
pub trait MarketDataSource: Send + Sync + 'static {
    fn quotes(&self, symbols: &[Symbol]) -> impl Future<Output = Result<Vec<StockQuote>>> + Send;

    fn option_chain(
        &self,
        symbol: &Symbol,
    ) -> impl Future<Output = Result<Vec<OptionStrike>>> + Send;
}

/// HTTP client for the quote provider's REST endpoints.
pub struct HttpMarketData {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpMarketData {
    pub fn new(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env).map_err(|_| {
            AppError::config(format!(
                "provider API key not set; export {}",
                cfg.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to construct provider HTTP client")?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::message(format!(
                "Request to {} failed with status {}",
                url,
                response.status()
            )));
        }

        let body = response.text().await?;
        let payload = serde_json::from_str(&body).context("Failed to parse provider response")?;
        Ok(payload)
    }
}

impl MarketDataSource for HttpMarketData {
    async fn quotes(&self, symbols: &[Symbol]) -> Result<Vec<StockQuote>> {
        let url = format!("{}/quotes", self.base_url);
        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let payload = self.get_json(&url, &[("symbol", joined.as_str())]).await?;
        parse_quote_payload(symbols, &payload)
    }

    async fn option_chain(&self, symbol: &Symbol) -> Result<Vec<OptionStrike>> {
        let url = format!("{}/chains", self.base_url);
        let payload = self
            .get_json(&url, &[("symbol", symbol.as_str()), ("contractType", "CALL")])
            .await?;
        parse_chain_payload(symbol, &payload)
    }
}

/// Quotes come back as an object keyed by symbol. Requested symbols missing
/// from the response are skipped; their rows stay pending on the board.
fn parse_quote_payload(requested: &[Symbol], payload: &Value) -> Result<Vec<StockQuote>> {
    let map = payload
        .as_object()
        .context("Quote payload is not a JSON object")?;

    let mut quotes = Vec::with_capacity(requested.len());
    for symbol in requested {
        let Some(entry) = map.get(symbol.as_str()) else {
            continue;
        };

        let field = |key: &str| -> Result<f64> {
            let value = entry
                .get(key)
                .and_then(Value::as_f64)
                .with_context(|| format!("Missing numeric field {} for {}", key, symbol))?;
            Ok(value)
        };

        quotes.push(StockQuote {
            symbol: symbol.clone(),
            last: field("lastPrice")?,
            change: field("netChange")?,
            close: field("closePrice")?,
        });
    }

    Ok(quotes)
}

/// Chains arrive as `callExpDateMap`, keyed by `"YYYY-MM-DD:<dte>"`, then by
/// strike price, each holding the contracts for that leg. The first contract
/// per strike is the call leg we keep.
fn parse_chain_payload(symbol: &Symbol, payload: &Value) -> Result<Vec<OptionStrike>> {
    let expirations = payload
        .get("callExpDateMap")
        .and_then(Value::as_object)
        .with_context(|| format!("Chain payload for {} missing callExpDateMap", symbol))?;

    let mut strikes = Vec::new();
    for (expiration_key, strike_map) in expirations {
        let date_part = expiration_key.split(':').next().unwrap_or(expiration_key);
        let expiration = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .with_context(|| format!("Unrecognized expiration key {} for {}", expiration_key, symbol))?;

        let Some(entries) = strike_map.as_object() else {
            continue;
        };

        for (strike_key, contracts) in entries {
            let Ok(strike) = strike_key.trim().parse::<f64>() else {
                continue;
            };
            let Some(call) = contracts.as_array().and_then(|list| list.first()) else {
                continue;
            };

            let contract_symbol = call
                .get("symbol")
                .and_then(Value::as_str)
                .with_context(|| format!("Missing contract symbol in chain for {}", symbol))?;
            let bid = call
                .get("bid")
                .and_then(Value::as_f64)
                .with_context(|| format!("Missing bid in chain for {}", symbol))?;
            let ask = call
                .get("ask")
                .and_then(Value::as_f64)
                .with_context(|| format!("Missing ask in chain for {}", symbol))?;

            strikes.push(OptionStrike {
                symbol: contract_symbol.to_string(),
                expiration,
                strike,
                bid,
                ask,
            });
        }
    }

    strikes.sort_by(|a, b| {
        a.expiration
            .cmp(&b.expiration)
            .then(a.strike.total_cmp(&b.strike))
    });
    Ok(strikes)
}
