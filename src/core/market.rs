//! Weather, deposit, gold-bar and metal/crypto series blocks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::snapshot::Stamp;

/// Newest points kept in a metal or crypto series.
pub const SERIES_CAP: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub city: String,
    pub aqi: i64,
    pub temp: f64,
    pub humidity: f64,
    pub icon: String,
    #[serde(flatten)]
    pub stamp: Stamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositCurrency {
    #[serde(rename = "UZS")]
    Uzs,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsOffer {
    pub bank_name: String,
    pub deposit_name: String,
    pub rate: f64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub min_amount: String,
    #[serde(default)]
    pub is_online: bool,
    /// Absent on the UZS list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<DepositCurrency>,
    #[serde(default)]
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsBlock {
    #[serde(flatten)]
    pub stamp: Stamp,
    pub data: Vec<SavingsOffer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldBar {
    /// e.g. `5g`
    pub weight: String,
    pub price: u64,
}

impl GoldBar {
    pub fn grams(&self) -> u32 {
        self.weight.trim_end_matches('g').parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    #[serde(alias = "price_usd", alias = "price_usd_per_oz")]
    pub price: f64,
    #[serde(default)]
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSeries {
    #[serde(flatten)]
    pub stamp: Stamp,
    pub data: Vec<SeriesPoint>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub note: String,
}

/// Sorts ascending, keeps the newest [`SERIES_CAP`] points, then derives each
/// change from the preceding point of the trimmed series.
pub fn build_series(mut points: Vec<(NaiveDate, f64)>) -> Vec<SeriesPoint> {
    points.sort_by_key(|(date, _)| *date);
    points.dedup_by_key(|(date, _)| *date);
    if points.len() > SERIES_CAP {
        points.drain(..points.len() - SERIES_CAP);
    }

    let mut series = Vec::with_capacity(points.len());
    let mut prev: Option<f64> = None;
    for (date, price) in points {
        let change_percent = match prev {
            Some(p) if p != 0.0 => round2((price - p) / p * 100.0),
            _ => 0.0,
        };
        series.push(SeriesPoint {
            date,
            price,
            change_percent,
        });
        prev = Some(price);
    }
    series
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap() + chrono::Days::new(d)
    }

    #[test]
    fn test_change_is_computed_on_trimmed_series() {
        let points: Vec<(NaiveDate, f64)> =
            (0..35).rev().map(|d| (day(d), 100.0 + d as f64)).collect();
        let series = build_series(points);

        assert_eq!(series.len(), SERIES_CAP);
        assert_eq!(series[0].date, day(5));
        // First point of the trimmed series has no predecessor.
        assert_eq!(series[0].change_percent, 0.0);
        assert_eq!(series[1].change_percent, round2(1.0 / 105.0 * 100.0));
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_change_rounds_to_two_decimals() {
        let series = build_series(vec![(day(0), 2900.0), (day(1), 2933.37)]);
        assert_eq!(series[1].change_percent, 1.15);
    }

    #[test]
    fn test_series_reads_legacy_price_names() {
        let metal: SeriesPoint =
            serde_json::from_str(r#"{"date":"2025-02-01","price_usd_per_oz":2900.5,"change_percent":0.0}"#)
                .unwrap();
        let crypto: SeriesPoint =
            serde_json::from_str(r#"{"date":"2025-02-01","price_usd":97000.0}"#).unwrap();
        assert_eq!(metal.price, 2900.5);
        assert_eq!(crypto.price, 97000.0);
        assert_eq!(crypto.change_percent, 0.0);
    }

    #[test]
    fn test_gold_bar_grams() {
        let bar = GoldBar {
            weight: "10g".to_string(),
            price: 12_000_000,
        };
        assert_eq!(bar.grams(), 10);
    }
}
