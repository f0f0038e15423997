//! Central Bank of Uzbekistan daily rate feed.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::fetcher::Fetcher;
use crate::core::cache::Cache;
use crate::core::currency::{HistoryPoint, OfficialRateProvider};

#[derive(Debug, Clone, Deserialize)]
pub struct CbuRecord {
    #[serde(rename = "Ccy")]
    pub code: String,
    /// Published as a string, occasionally as a number.
    #[serde(rename = "Rate")]
    pub rate: Value,
}

impl CbuRecord {
    fn rate(&self) -> Option<f64> {
        let rate = match &self.rate {
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Number(n) => n.as_f64()?,
            _ => return None,
        };
        (rate.is_finite() && rate > 0.0).then_some(rate)
    }
}

/// Finds `code` in a feed response. Unknown codes and bad rates read as `None`.
pub fn find_rate(records: &[CbuRecord], code: &str) -> Option<f64> {
    records
        .iter()
        .find(|r| r.code.eq_ignore_ascii_case(code))
        .and_then(CbuRecord::rate)
}

pub struct CbuProvider {
    base_url: String,
    fetcher: Fetcher,
    pacing: Duration,
    /// One response covers every currency, so it is fetched once per URL.
    cache: Arc<Cache<String, Arc<Vec<CbuRecord>>>>,
}

impl CbuProvider {
    pub fn new(
        base_url: &str,
        fetcher: Fetcher,
        pacing: Duration,
        cache: Arc<Cache<String, Arc<Vec<CbuRecord>>>>,
    ) -> Self {
        CbuProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
            pacing,
            cache,
        }
    }

    fn url_for(&self, date: Option<NaiveDate>) -> String {
        match date {
            Some(date) => format!(
                "{}/en/arkhiv-kursov-valyut/json/all/{}/",
                self.base_url,
                date.format("%Y-%m-%d")
            ),
            None => format!("{}/common/json/", self.base_url),
        }
    }

    async fn records(&self, url: String) -> Option<Arc<Vec<CbuRecord>>> {
        if let Some(cached) = self.cache.get(&url).await {
            return Some(cached);
        }
        match self.fetcher.fetch_json::<Vec<CbuRecord>>(&url).await {
            Ok(records) => {
                let records = Arc::new(records);
                self.cache.put(url, Arc::clone(&records)).await;
                Some(records)
            }
            Err(e) => {
                warn!(error = %e, "Central bank feed unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl OfficialRateProvider for CbuProvider {
    #[instrument(name = "CbuRate", skip(self), fields(code = %code))]
    async fn official_rate(&self, code: &str, date: Option<NaiveDate>) -> Option<f64> {
        let records = self.records(self.url_for(date)).await?;
        let rate = find_rate(&records, code);
        if rate.is_none() {
            warn!("No usable rate in central bank response");
        }
        rate
    }

    #[instrument(name = "CbuHistory", skip(self), fields(code = %code))]
    async fn official_history(&self, code: &str, until: NaiveDate, days: u32) -> Vec<HistoryPoint> {
        info!(days, "Seeding official rate history");
        let mut history = Vec::with_capacity(days as usize);
        // Sequential and paced: a burst here trips the feed's 403 protection.
        for offset in 0..days {
            let Some(date) = until.checked_sub_days(chrono::Days::new(u64::from(offset))) else {
                break;
            };
            if let Some(rate) = self.official_rate(code, Some(date)).await {
                history.push(HistoryPoint { date, rate });
            } else {
                debug!(%date, "No historical rate");
            }
            tokio::time::sleep(self.pacing).await;
        }
        history.sort_by_key(|p| p.date);
        history
    }
}
