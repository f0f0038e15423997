//! bank.uz comparison site: per-bank exchange quotes, deposit offers and
//! gold bar prices.

use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::fetcher::Fetcher;
use crate::core::clock::LocalTime;
use crate::core::config::{BankUzConfig, CurrencyConfig, FeaturedConfig};
use crate::core::currency::{BankQuote, BankQuoteSource};
use crate::core::market::{GoldBar, SavingsBlock, SavingsOffer};
use crate::core::snapshot::Stamp;
use crate::reconcile::reconcile;
use crate::scrape::deposits::{dedupe_offers, parse_offers, sort_by_rate};
use crate::scrape::gold::parse_gold_bars;
use crate::scrape::offload;
use crate::scrape::tables::resolve_bank_tables;

/// Query parameter the currency deposit listing paginates with.
const PAGE_PARAM: &str = "PAGEN_3";

pub struct BankUzProvider {
    fetcher: Fetcher,
    config: BankUzConfig,
    featured: FeaturedConfig,
}

impl BankUzProvider {
    pub fn new(fetcher: Fetcher, config: BankUzConfig, featured: FeaturedConfig) -> Self {
        BankUzProvider {
            fetcher,
            config,
            featured,
        }
    }

    async fn page(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch_text(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!(error = %e, "Page unavailable");
                None
            }
        }
    }

    /// UZS deposit offers, best rate first.
    ///
    /// A fresh `prev` is returned as is. When the page cannot be fetched the
    /// previous block is kept, or an empty block is written if there is none.
    #[instrument(name = "Savings", skip_all, fields(force = force))]
    pub async fn savings(
        &self,
        prev: Option<SavingsBlock>,
        now: &LocalTime,
        window: Duration,
        force: bool,
    ) -> SavingsBlock {
        if let Some(block) = fresh(prev.as_ref(), now, window, force) {
            return block;
        }
        let Some(html) = self.page(&self.config.savings_url).await else {
            return fallback(prev, now);
        };
        let mut offers = offload("savings", move || parse_offers(&html, false))
            .await
            .unwrap_or_default();
        sort_by_rate(&mut offers);
        info!(count = offers.len(), "Collected deposit offers");
        SavingsBlock {
            stamp: Stamp::at(now),
            data: offers,
        }
    }

    /// Foreign-currency deposit offers across every listing page, fetched
    /// concurrently and deduplicated by bank and deposit name.
    #[instrument(name = "CurrencySavings", skip_all, fields(force = force))]
    pub async fn currency_savings(
        &self,
        prev: Option<SavingsBlock>,
        now: &LocalTime,
        window: Duration,
        force: bool,
    ) -> SavingsBlock {
        if let Some(block) = fresh(prev.as_ref(), now, window, force) {
            return block;
        }
        let urls = page_urls(&self.config.currency_savings_url, self.config.currency_savings_pages);
        let pages: Vec<String> = join_all(urls.iter().map(|url| self.page(url)))
            .await
            .into_iter()
            .flatten()
            .collect();
        if pages.is_empty() {
            return fallback(prev, now);
        }

        let mut offers: Vec<SavingsOffer> = Vec::new();
        for html in pages {
            offers.extend(
                offload("currency savings", move || parse_offers(&html, true))
                    .await
                    .unwrap_or_default(),
            );
        }
        let mut offers = dedupe_offers(offers);
        sort_by_rate(&mut offers);
        info!(count = offers.len(), "Collected currency deposit offers");
        SavingsBlock {
            stamp: Stamp::at(now),
            data: offers,
        }
    }

    /// Gold bar prices. `None` on any failure so the caller keeps its value.
    #[instrument(name = "GoldBars", skip(self))]
    pub async fn gold_bars(&self) -> Option<Vec<GoldBar>> {
        let html = self.page(&self.config.gold_bars_url).await?;
        let bars = offload("gold bars", move || parse_gold_bars(&html)).await.flatten();
        match bars {
            Some(bars) if !bars.is_empty() => {
                info!(count = bars.len(), "Collected gold bar prices");
                Some(bars)
            }
            _ => {
                warn!("No gold bar prices on page");
                None
            }
        }
    }
}

#[async_trait]
impl BankQuoteSource for BankUzProvider {
    #[instrument(name = "BankQuotes", skip(self, currency), fields(code = %currency.code))]
    async fn bank_quotes(
        &self,
        currency: &CurrencyConfig,
        reference: f64,
    ) -> Option<Vec<BankQuote>> {
        let html = self.page(&currency.bank_page_url).await?;
        let config = currency.clone();
        let featured = self.featured.clone();
        let resolved = offload("bank tables", move || {
            resolve_bank_tables(&html, &config, reference)
                .map(|(buy, sell)| reconcile(&buy, &sell, reference, &featured))
        })
        .await?;

        match resolved {
            Ok(quotes) => {
                info!(count = quotes.len(), "Reconciled bank quotes");
                Some(quotes)
            }
            Err(e) => {
                warn!(error = %e, "Could not identify the bank tables");
                None
            }
        }
    }
}

fn fresh(
    prev: Option<&SavingsBlock>,
    now: &LocalTime,
    window: Duration,
    force: bool,
) -> Option<SavingsBlock> {
    if force {
        return None;
    }
    let block = prev.filter(|b| b.stamp.is_fresh(now, window))?;
    debug!(last_updated = %block.stamp.last_updated, "Block is fresh, skipping");
    Some(block.clone())
}

fn fallback(prev: Option<SavingsBlock>, now: &LocalTime) -> SavingsBlock {
    prev.unwrap_or_else(|| {
        warn!("Nothing fetched and nothing stored, writing an empty block");
        SavingsBlock {
            stamp: Stamp::at(now),
            data: Vec::new(),
        }
    })
}

fn page_urls(base: &str, pages: u32) -> Vec<String> {
    (1..=pages.max(1))
        .map(|n| {
            if n == 1 {
                base.to_string()
            } else {
                format!("{base}?{PAGE_PARAM}={n}")
            }
        })
        .collect()
}
