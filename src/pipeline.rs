//! One scrape run: load the previous snapshot, fan out every producer in
//! scope, diff the result against the previous rates and persist.

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::core::cache::Cache;
use crate::core::clock::LocalTime;
use crate::core::config::{AppConfig, CurrencyConfig, Credentials};
use crate::core::currency::CurrencySnapshot;
use crate::core::market::{MarketSeries, SavingsBlock, Weather};
use crate::core::news::NewsBlock;
use crate::core::snapshot::{
    BANK_RELIABILITY, GOLD_BARS, NEWS, SAVINGS, SAVINGS_USD, Snapshot, WEATHER,
};
use crate::news::NewsAggregator;
use crate::notify::{self, Notifier, PushCredentials, RateAlert, WebhookNotifier};
use crate::processor::CurrencyProcessor;
use crate::providers::bank_uz::BankUzProvider;
use crate::providers::cbu::CbuProvider;
use crate::providers::iqair::IqAirProvider;
use crate::providers::polygon::{PolygonProvider, SERIES};
use crate::providers::util::with_deadline;
use crate::providers::worldnews::WorldNewsProvider;
use crate::providers::Fetcher;
use crate::reliability::{ReliabilityBlock, build_reliability};
use crate::store::{SnapshotStore, write_snapshot};

/// Which producers a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Scope {
    /// Currencies, weather, gold bars and metal/crypto series.
    #[default]
    Exchange,
    Savings,
    News,
    Reliability,
    All,
}

impl Scope {
    pub fn includes(self, other: Scope) -> bool {
        self == Scope::All || self == other
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Scope::Exchange => "exchange",
                Scope::Savings => "savings",
                Scope::News => "news",
                Scope::Reliability => "reliability",
                Scope::All => "all",
            }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Ignore every freshness window.
    pub force: bool,
    pub scope: Scope,
    /// Write the produced keys here instead of merging into the store.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub scope: Scope,
    pub currencies: Vec<(String, CurrencySnapshot)>,
    /// Keys written with a value this run.
    pub updated: Vec<String>,
    pub alerts: Vec<RateAlert>,
    pub destination: PathBuf,
}

type Block = (String, Value);

fn block<T: Serialize>(key: &str, value: Option<T>) -> Block {
    let value = match value.map(serde_json::to_value) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            warn!(key, error = %e, "Failed to serialize block, leaving it untouched");
            Value::Null
        }
        None => Value::Null,
    };
    (key.to_string(), value)
}

fn secs(secs: u64) -> Duration {
    Duration::from_secs(secs)
}

/// Producers share the previous snapshot read-only and return their blocks;
/// only the caller assembles the output.
struct Run<'a> {
    config: &'a AppConfig,
    credentials: &'a Credentials,
    prev: &'a Snapshot,
    now: LocalTime,
    force: bool,
    fetcher: Fetcher,
    bank_uz: BankUzProvider,
}

impl Run<'_> {
    fn deadline(&self) -> Duration {
        self.config.fetch.task_deadline()
    }

    #[instrument(name = "Exchange", skip_all)]
    async fn exchange(&self) -> Vec<Block> {
        let cbu = CbuProvider::new(
            &self.config.providers.cbu.base_url,
            self.fetcher.clone(),
            self.config.fetch.history_pacing(),
            Arc::new(Cache::new()),
        );
        let processor = CurrencyProcessor::new(&cbu, &self.bank_uz, &self.config.featured);
        let processor = &processor;
        let deadline = self.deadline();

        let currencies = join_all(self.config.currencies.iter().map(|currency| {
            let key = currency.key();
            let prev = self.prev.currency(&key);
            async move {
                let fresh = with_deadline(
                    &currency.code,
                    deadline,
                    processor.process(currency, prev.as_ref(), &self.now, self.force),
                )
                .await;
                block(&key, fresh.or(prev))
            }
        }));
        let weather = async { block(WEATHER, self.weather().await) };
        let gold_bars = async {
            let bars = with_deadline(GOLD_BARS, deadline, self.bank_uz.gold_bars()).await;
            block(GOLD_BARS, bars.flatten())
        };
        let series = self.series();

        let (mut blocks, weather, gold_bars, series) =
            tokio::join!(currencies, weather, gold_bars, series);
        blocks.push(weather);
        blocks.push(gold_bars);
        blocks.extend(series);
        blocks
    }

    async fn weather(&self) -> Option<Weather> {
        let prev = self.prev.get::<Weather>(WEATHER);
        let Some(api_key) = &self.credentials.iqair_api_key else {
            debug!("No IQAir key, keeping previous weather");
            return prev;
        };
        let provider = IqAirProvider::new(
            &self.config.providers.iqair.base_url,
            self.fetcher.clone(),
            api_key.clone(),
        );
        let window = secs(self.config.windows.weather_secs);
        with_deadline(
            WEATHER,
            self.deadline(),
            provider.weather(prev.clone(), &self.now, window, self.force),
        )
        .await
        .unwrap_or(prev)
    }

    async fn series(&self) -> Vec<Block> {
        let Some(api_key) = &self.credentials.polygon_api_key else {
            debug!("No Polygon key, keeping previous series");
            return Vec::new();
        };
        let provider = PolygonProvider::new(
            &self.config.providers.polygon.base_url,
            self.fetcher.clone(),
            api_key.clone(),
        );
        let provider = &provider;
        let window = secs(self.config.windows.metals_secs);
        join_all(SERIES.iter().map(|&(key, ticker)| async move {
            let prev = self.prev.get::<MarketSeries>(key);
            let series = with_deadline(
                key,
                self.deadline(),
                provider.history(ticker, prev.clone(), &self.now, window, self.force),
            )
            .await
            .unwrap_or(prev);
            block(key, series)
        }))
        .await
    }

    #[instrument(name = "SavingsScope", skip_all)]
    async fn savings(&self) -> Vec<Block> {
        let window = secs(self.config.windows.savings_secs);
        let deadline = self.deadline();
        let prev_uzs = self.prev.get::<SavingsBlock>(SAVINGS);
        let prev_usd = self.prev.get::<SavingsBlock>(SAVINGS_USD);

        let uzs = with_deadline(
            SAVINGS,
            deadline,
            self.bank_uz.savings(prev_uzs.clone(), &self.now, window, self.force),
        );
        let usd = with_deadline(
            SAVINGS_USD,
            deadline,
            self.bank_uz
                .currency_savings(prev_usd.clone(), &self.now, window, self.force),
        );
        let (uzs, usd) = tokio::join!(uzs, usd);
        vec![
            block(SAVINGS, uzs.or(prev_uzs)),
            block(SAVINGS_USD, usd.or(prev_usd)),
        ]
    }

    #[instrument(name = "NewsScope", skip_all)]
    async fn news(&self) -> Vec<Block> {
        let worldnews = self.credentials.worldnews_api_key.as_ref().map(|key| {
            WorldNewsProvider::new(
                &self.config.providers.worldnews.base_url,
                self.fetcher.clone(),
                key.clone(),
            )
        });
        let aggregator = NewsAggregator::new(self.fetcher.clone(), &self.config.news, worldnews);
        let prev = self.prev.get::<NewsBlock>(NEWS);
        let window = secs(self.config.windows.news_secs);
        let news = with_deadline(
            NEWS,
            self.deadline(),
            aggregator.refresh(prev.clone(), &self.now, window, self.force),
        )
        .await
        .unwrap_or(prev);
        vec![block(NEWS, news)]
    }

    fn reliability(&self) -> Vec<Block> {
        let window = secs(self.config.windows.reliability_secs);
        let block_value = match self.prev.get::<ReliabilityBlock>(BANK_RELIABILITY) {
            Some(prev) if !self.force && prev.stamp.is_fresh(&self.now, window) => {
                info!("Bank reliability is fresh, skipping");
                prev
            }
            _ => {
                let built = build_reliability(&self.now, &mut rand::thread_rng());
                info!(banks = built.banks.len(), "Rebuilt bank reliability");
                built
            }
        };
        vec![block(BANK_RELIABILITY, Some(block_value))]
    }
}

/// Runs every producer in `options.scope` and persists the result.
///
/// Producers never fail the run; only reading or writing the store does.
#[instrument(name = "Scrape", skip_all, fields(scope = %options.scope, force = options.force))]
pub async fn run_scrape(
    config: &AppConfig,
    credentials: &Credentials,
    options: &ScrapeOptions,
    now: LocalTime,
) -> Result<RunReport> {
    let store = SnapshotStore::new(&config.store_path);
    let prev = store.load()?;
    let fetcher = Fetcher::new(&config.fetch).context("Failed to build HTTP client")?;
    let bank_uz = BankUzProvider::new(
        fetcher.clone(),
        config.providers.bank_uz.clone(),
        config.featured.clone(),
    );
    let run = Run {
        config,
        credentials,
        prev: &prev,
        now,
        force: options.force,
        fetcher: fetcher.clone(),
        bank_uz,
    };
    let scope = options.scope;

    let (exchange, savings, news, reliability) = tokio::join!(
        async {
            if scope.includes(Scope::Exchange) {
                run.exchange().await
            } else {
                Vec::new()
            }
        },
        async {
            if scope.includes(Scope::Savings) {
                run.savings().await
            } else {
                Vec::new()
            }
        },
        async {
            if scope.includes(Scope::News) {
                run.news().await
            } else {
                Vec::new()
            }
        },
        async {
            if scope.includes(Scope::Reliability) {
                run.reliability()
            } else {
                Vec::new()
            }
        },
    );

    let mut output = Snapshot::new();
    let mut updated = Vec::new();
    for (key, value) in exchange.into_iter().chain(savings).chain(news).chain(reliability) {
        if !value.is_null() {
            updated.push(key.clone());
        }
        output.set_raw(&key, value);
    }
    info!(?updated, "Producers finished");

    let alerts = if scope.includes(Scope::Exchange) && !prev.is_empty() {
        let alerts = notify::diff(&output, &prev, &config.currencies);
        deliver_alerts(&alerts, config, credentials, &fetcher).await;
        alerts
    } else {
        Vec::new()
    };

    let currencies = config
        .currencies
        .iter()
        .filter_map(|c| output.currency(&c.key()).map(|s| (c.code.clone(), s)))
        .collect();

    let destination = match &options.output {
        Some(path) => {
            write_snapshot(path, &output)?;
            info!(path = %path.display(), "Wrote partial output");
            path.clone()
        }
        None => {
            let mut merged = prev;
            merged.overlay(&output);
            merged.ensure_default_keys();
            let keys: Vec<String> = config.currencies.iter().map(CurrencyConfig::key).collect();
            merged.ensure_keys(keys.iter().map(String::as_str));
            merged.stamp(&now);
            store.save(&merged)?;
            store.path().to_path_buf()
        }
    };

    Ok(RunReport {
        scope,
        currencies,
        updated,
        alerts,
        destination,
    })
}

/// Logs the batched alert and pushes it when credentials are configured.
/// Delivery problems are logged and never fail the run.
async fn deliver_alerts(
    alerts: &[RateAlert],
    config: &AppConfig,
    credentials: &Credentials,
    fetcher: &Fetcher,
) {
    let Some(message) = notify::compose(alerts, &config.notify.title) else {
        debug!("No rate changes above threshold");
        return;
    };
    for alert in alerts {
        info!(%alert, "Rate alert");
    }
    let Some(blob) = &credentials.push_credentials else {
        info!("No push credentials, skipping delivery");
        return;
    };
    let push = match PushCredentials::parse(blob) {
        Ok(push) => push,
        Err(e) => {
            warn!(error = %e, "Skipping delivery");
            return;
        }
    };
    let notifier = WebhookNotifier::new(fetcher.client().clone(), push, &config.notify);
    if let Err(e) = notifier.deliver(&message).await {
        warn!(error = %e, "Rate alert not delivered");
    }
}
