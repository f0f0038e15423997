use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{Normalizer, dedupe, rank};
use crate::core::clock::LocalTime;
use crate::core::config::{FeedSource, NewsConfig, PressSource};
use crate::core::news::{NewsBlock, NewsItem};
use crate::core::snapshot::Stamp;
use crate::providers::fetcher::Fetcher;
use crate::providers::worldnews::WorldNewsProvider;
use crate::scrape::feed::parse_feed;
use crate::scrape::offload;
use crate::scrape::press::parse_press_page;

const WORLDNEWS_SOURCE: &str = "WorldNews";

/// Pulls every configured news source concurrently into one ranked list.
pub struct NewsAggregator<'a> {
    fetcher: Fetcher,
    config: &'a NewsConfig,
    worldnews: Option<WorldNewsProvider>,
}

impl<'a> NewsAggregator<'a> {
    pub fn new(
        fetcher: Fetcher,
        config: &'a NewsConfig,
        worldnews: Option<WorldNewsProvider>,
    ) -> Self {
        Self {
            fetcher,
            config,
            worldnews,
        }
    }

    /// The new news block, or `prev` when it is still fresh or when nothing
    /// at all could be fetched.
    #[instrument(name = "News", skip_all, fields(force = force))]
    pub async fn refresh(
        &self,
        prev: Option<NewsBlock>,
        now: &LocalTime,
        window: Duration,
        force: bool,
    ) -> Option<NewsBlock> {
        if !force && prev.as_ref().is_some_and(|b| b.stamp.is_fresh(now, window)) {
            info!("News block is fresh, skipping");
            return prev;
        }

        let items = self.collect(now).await;
        if items.is_empty() {
            warn!("No news items from any source, keeping previous block");
            return prev;
        }
        info!(count = items.len(), "Collected news");
        Some(NewsBlock {
            stamp: Stamp::at(now),
            items,
        })
    }

    /// Feeds, then search results, then press pages, deduplicated and ranked.
    pub async fn collect(&self, now: &LocalTime) -> Vec<NewsItem> {
        let normalizer = Normalizer {
            categories: &self.config.categories,
            reliability: &self.config.reliability,
            now: *now,
        };

        let feeds = join_all(self.config.feeds.iter().map(|s| self.feed_items(s, normalizer)));
        let press = join_all(self.config.press.iter().map(|s| self.press_items(s, normalizer)));
        let articles = async {
            match &self.worldnews {
                Some(provider) => provider
                    .latest()
                    .await
                    .into_iter()
                    .enumerate()
                    .map(|(i, a)| normalizer.from_article(WORLDNEWS_SOURCE, a, i))
                    .collect::<Vec<NewsItem>>(),
                None => Vec::new(),
            }
        };
        let (feeds, press, articles) = tokio::join!(feeds, press, articles);

        let pool: Vec<NewsItem> = feeds
            .into_iter()
            .flatten()
            .chain(articles)
            .chain(press.into_iter().flatten())
            .collect();
        debug!(pooled = pool.len(), "Pooled news items");
        rank(dedupe(pool), self.config.top_n)
    }

    async fn feed_items(&self, source: &FeedSource, normalizer: Normalizer<'_>) -> Vec<NewsItem> {
        let xml = match self.fetcher.fetch_text(&source.url).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(source = %source.name, error = %e, "Feed unavailable");
                return Vec::new();
            }
        };
        let entries = offload("feed", move || parse_feed(&xml)).await.unwrap_or_default();
        entries
            .into_iter()
            .take(self.config.per_feed_limit)
            .enumerate()
            .map(|(i, entry)| normalizer.from_feed(source, entry, i))
            .collect()
    }

    async fn press_items(&self, source: &PressSource, normalizer: Normalizer<'_>) -> Vec<NewsItem> {
        let html = match self.fetcher.fetch_text(&source.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(source = %source.name, error = %e, "Press page unavailable");
                return Vec::new();
            }
        };
        let page_source = source.clone();
        let now = normalizer.now;
        let entries = offload("press", move || parse_press_page(&html, &page_source, &now))
            .await
            .unwrap_or_default();
        entries
            .into_iter()
            .map(|entry| normalizer.from_press(source, entry))
            .collect()
    }
}
