//! Currency domain types and the provider seams the processor talks to.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::config::CurrencyConfig;

pub const HISTORY_CAP: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankQuote {
    pub name: String,
    pub buy: f64,
    pub sell: f64,
    #[serde(rename = "logo", default)]
    pub logo_url: String,
    /// Synthetic quote derived from the official rate, never scraped.
    #[serde(default)]
    pub is_mock: bool,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencySnapshot {
    #[serde(rename = "cbu", default)]
    pub official_rate: Option<f64>,
    #[serde(rename = "cbu_last_updated", default)]
    pub official_rate_date: Option<NaiveDate>,
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
    #[serde(default)]
    pub banks: Vec<BankQuote>,
}

impl CurrencySnapshot {
    pub fn has_live_quotes(&self) -> bool {
        !self.banks.is_empty() && self.banks.iter().all(|b| !b.is_mock)
    }

    pub fn best_buy(&self) -> Option<f64> {
        self.banks.iter().map(|b| b.buy).reduce(f64::max)
    }

    pub fn best_sell(&self) -> Option<f64> {
        self.banks.iter().map(|b| b.sell).reduce(f64::min)
    }
}

/// Inserts or replaces the entry for `point.date` and returns the normalized
/// history. The input is left untouched.
pub fn upsert_history(history: &[HistoryPoint], point: HistoryPoint) -> Vec<HistoryPoint> {
    let mut next: Vec<HistoryPoint> = history
        .iter()
        .filter(|p| p.date != point.date)
        .copied()
        .collect();
    next.push(point);
    normalize_history(next)
}

/// Sorts ascending by date, keeps the last entry seen per date and trims to
/// the newest [`HISTORY_CAP`] entries.
pub fn normalize_history(mut history: Vec<HistoryPoint>) -> Vec<HistoryPoint> {
    // Stable sort keeps insertion order within a date; the later one wins.
    history.sort_by_key(|p| p.date);
    let mut deduped: Vec<HistoryPoint> = Vec::with_capacity(history.len());
    for point in history {
        match deduped.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => deduped.push(point),
        }
    }
    if deduped.len() > HISTORY_CAP {
        deduped.drain(..deduped.len() - HISTORY_CAP);
    }
    deduped
}

/// Daily official exchange rates against UZS.
#[async_trait]
pub trait OfficialRateProvider: Send + Sync {
    /// Rate for `code` on `date`, or the latest published rate when `date`
    /// is `None`. Every failure reads as `None`.
    async fn official_rate(&self, code: &str, date: Option<NaiveDate>) -> Option<f64>;

    /// One rate per day over the `days` days ending at `until`, ascending.
    async fn official_history(&self, code: &str, until: NaiveDate, days: u32)
    -> Vec<HistoryPoint>;
}

/// Per-bank buy/sell quotes for one currency.
#[async_trait]
pub trait BankQuoteSource: Send + Sync {
    /// `reference` is the rate used to recognize the currency's table.
    /// `None` when the page could not be fetched or no table matched.
    async fn bank_quotes(&self, currency: &CurrencyConfig, reference: f64)
    -> Option<Vec<BankQuote>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(u64::from(d))
    }

    fn point(d: u32, rate: f64) -> HistoryPoint {
        HistoryPoint { date: day(d), rate }
    }

    fn assert_well_formed(history: &[HistoryPoint]) {
        assert!(history.len() <= HISTORY_CAP);
        assert!(history.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_upsert_updates_same_date_in_place() {
        let history = vec![point(0, 12700.0), point(1, 12750.0)];
        let updated = upsert_history(&history, point(1, 12790.0));

        assert_eq!(updated, vec![point(0, 12700.0), point(1, 12790.0)]);
        assert_eq!(history[1].rate, 12750.0);
    }

    #[test]
    fn test_upsert_keeps_order_and_cap_over_many_updates() {
        let mut history = Vec::new();
        // Out-of-order days with repeats.
        for i in 0..90u32 {
            let d = (i * 7) % 45;
            history = upsert_history(&history, point(d, 12000.0 + f64::from(i)));
            assert_well_formed(&history);
        }
        assert_eq!(history.len(), HISTORY_CAP);
        assert_eq!(history.last().unwrap().date, day(44));
        assert_eq!(history.first().unwrap().date, day(15));
    }

    #[test]
    fn test_normalize_drops_oldest_first() {
        let history: Vec<HistoryPoint> = (0..35).rev().map(|d| point(d, 1.0)).collect();
        let normalized = normalize_history(history);
        assert_eq!(normalized.len(), HISTORY_CAP);
        assert_eq!(normalized[0].date, day(5));
        assert_well_formed(&normalized);
    }

    #[test]
    fn test_best_buy_and_sell() {
        let quote = |buy, sell| BankQuote {
            name: "Bank".to_string(),
            buy,
            sell,
            logo_url: String::new(),
            is_mock: false,
            featured: false,
        };
        let snapshot = CurrencySnapshot {
            banks: vec![quote(12780.0, 12880.0), quote(12810.0, 12860.0)],
            ..Default::default()
        };
        assert_eq!(snapshot.best_buy(), Some(12810.0));
        assert_eq!(snapshot.best_sell(), Some(12860.0));
        assert!(snapshot.has_live_quotes());
        assert_eq!(CurrencySnapshot::default().best_buy(), None);
    }

    #[test]
    fn test_persisted_field_names() {
        let raw = r#"{
            "cbu": 12850.5,
            "cbu_last_updated": "2025-03-14",
            "history": [{"date": "2025-03-14", "rate": 12850.5}],
            "banks": [{"name": "Hamkorbank", "buy": 12800, "sell": 12900,
                       "logo": "/banks/hamkorbank.png", "is_mock": false, "featured": true}]
        }"#;
        let parsed: CurrencySnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.official_rate, Some(12850.5));
        assert_eq!(parsed.official_rate_date, NaiveDate::from_ymd_opt(2025, 3, 14));
        assert_eq!(parsed.banks[0].logo_url, "/banks/hamkorbank.png");

        let value = serde_json::to_value(&parsed).unwrap();
        assert_eq!(value["cbu_last_updated"], "2025-03-14");
        assert_eq!(value["banks"][0]["logo"], "/banks/hamkorbank.png");
    }
}
