//! Polygon.io daily aggregates for metal and crypto price series.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::fetcher::Fetcher;
use crate::core::clock::LocalTime;
use crate::core::market::{MarketSeries, build_series};
use crate::core::snapshot::{BITCOIN_HISTORY, GOLD_HISTORY, SILVER_HISTORY, Stamp};

/// Snapshot key and ticker of every tracked series.
pub const SERIES: [(&str, &str); 3] = [
    (GOLD_HISTORY, "C:XAUUSD"),
    (SILVER_HISTORY, "C:XAGUSD"),
    (BITCOIN_HISTORY, "X:BTCUSD"),
];

const LOOKBACK_DAYS: i64 = 35;
const SOURCE: &str = "Polygon.io";
const NOTE: &str = "Real market data";

#[derive(Debug, Deserialize)]
struct Bar {
    /// Window start, epoch milliseconds.
    t: Option<i64>,
    c: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    #[serde(default)]
    results: Vec<Bar>,
}

fn bar_points(bars: Vec<Bar>) -> Vec<(NaiveDate, f64)> {
    bars.into_iter()
        .filter_map(|bar| {
            let date = DateTime::from_timestamp_millis(bar.t?)?.date_naive();
            Some((date, bar.c.filter(|c| c.is_finite())?))
        })
        .collect()
}

pub struct PolygonProvider {
    base_url: String,
    fetcher: Fetcher,
    api_key: String,
}

impl PolygonProvider {
    pub fn new(base_url: &str, fetcher: Fetcher, api_key: String) -> Self {
        PolygonProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
            api_key,
        }
    }

    /// Fresh or refetched series for `ticker`; `prev` on any failure.
    #[instrument(name = "Polygon", skip(self, prev, now, window))]
    pub async fn history(
        &self,
        ticker: &str,
        prev: Option<MarketSeries>,
        now: &LocalTime,
        window: Duration,
        force: bool,
    ) -> Option<MarketSeries> {
        if !force && prev.as_ref().is_some_and(|s| s.stamp.is_fresh(now, window)) {
            debug!("Series is fresh, skipping");
            return prev;
        }

        let end = now.today();
        let start = end - ChronoDuration::days(LOOKBACK_DAYS);
        let url = format!(
            "{}/v2/aggs/ticker/{ticker}/range/1/day/{start}/{end}?adjusted=true&sort=asc&limit=50&apiKey={}",
            self.base_url, self.api_key
        );
        let bars = match self.fetcher.fetch_json::<AggregatesResponse>(&url).await {
            Ok(response) => response.results,
            Err(e) => {
                warn!(error = %e, "Aggregates unavailable, keeping previous series");
                return prev;
            }
        };

        let data = build_series(bar_points(bars));
        if data.is_empty() {
            warn!("No aggregates returned, keeping previous series");
            return prev;
        }
        info!(points = data.len(), "Updated series");
        Some(MarketSeries {
            stamp: Stamp::at(now),
            data,
            source: SOURCE.to_string(),
            note: NOTE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FetchConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(&FetchConfig {
            max_retries: 1,
            retry_delay_ms: 0,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    fn now() -> LocalTime {
        LocalTime::at(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(), 12, 0).unwrap()
    }

    const DAY: Duration = Duration::from_secs(86_400);

    #[tokio::test]
    async fn test_history_maps_bars() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/aggs/ticker/C:XAUUSD/range/1/day/2025-02-13/2025-03-20"))
            .and(query_param("apiKey", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ticker": "C:XAUUSD",
                "results": [
                    {"t": 1_742_342_400_000i64, "c": 3030.0},
                    {"t": 1_742_256_000_000i64, "c": 3000.0},
                    {"c": 1.0}
                ]
            })))
            .mount(&server)
            .await;

        let provider = PolygonProvider::new(&server.uri(), fetcher(), "k".to_string());
        let series = provider.history("C:XAUUSD", None, &now(), DAY, false).await.unwrap();

        assert_eq!(series.data.len(), 2);
        assert_eq!(series.data[0].date, NaiveDate::from_ymd_opt(2025, 3, 18).unwrap());
        assert_eq!(series.data[0].change_percent, 0.0);
        assert_eq!(series.data[1].price, 3030.0);
        assert_eq!(series.data[1].change_percent, 1.0);
        assert_eq!(series.source, "Polygon.io");
        assert_eq!(series.stamp, Stamp::at(&now()));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .mount(&server)
            .await;

        let prev = MarketSeries {
            stamp: Stamp {
                last_updated: "2025-03-01 10:00".to_string(),
                last_updated_ts: 1.0,
            },
            data: Vec::new(),
            source: SOURCE.to_string(),
            note: NOTE.to_string(),
        };
        let provider = PolygonProvider::new(&server.uri(), fetcher(), "k".to_string());
        let out = provider
            .history("X:BTCUSD", Some(prev.clone()), &now(), DAY, false)
            .await;
        assert_eq!(out, Some(prev));
    }
}
