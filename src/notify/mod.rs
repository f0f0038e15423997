//! Rate-change alerts between two snapshots.

pub mod push;

use serde::Serialize;
use std::fmt::Display;

use crate::core::config::CurrencyConfig;
use crate::core::snapshot::Snapshot;

pub use push::{Notifier, PushCredentials, WebhookNotifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    BuyRateUp,
    SellRateDown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateAlert {
    pub currency: String,
    pub kind: AlertKind,
    pub old: f64,
    pub new: f64,
}

impl Display for RateAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match self.kind {
            AlertKind::BuyRateUp => "Buy Rate UP",
            AlertKind::SellRateDown => "Sell Rate DOWN",
        };
        write!(
            f,
            "{} {}: {} -> {} UZS",
            self.currency.to_uppercase(),
            what,
            self.old,
            self.new
        )
    }
}

/// One outbound push per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Threshold crossings of the best buy and best sell per currency.
///
/// A currency is compared only when both snapshots hold live bank quotes
/// with positive best prices.
pub fn diff(new: &Snapshot, old: &Snapshot, currencies: &[CurrencyConfig]) -> Vec<RateAlert> {
    let mut alerts = Vec::new();
    for currency in currencies {
        let key = currency.key();
        let (Some(fresh), Some(prev)) = (new.currency(&key), old.currency(&key)) else {
            continue;
        };
        // Synthesized quotes move randomly.
        if !fresh.has_live_quotes() || !prev.has_live_quotes() {
            continue;
        }
        let threshold = currency.alert_threshold;

        let buys = (usable(prev.best_buy()), usable(fresh.best_buy()));
        if let (Some(old_buy), Some(new_buy)) = buys {
            if new_buy > old_buy + threshold {
                alerts.push(RateAlert {
                    currency: key.clone(),
                    kind: AlertKind::BuyRateUp,
                    old: old_buy,
                    new: new_buy,
                });
            }
        }
        let sells = (usable(prev.best_sell()), usable(fresh.best_sell()));
        if let (Some(old_sell), Some(new_sell)) = sells {
            if new_sell < old_sell - threshold {
                alerts.push(RateAlert {
                    currency: key,
                    kind: AlertKind::SellRateDown,
                    old: old_sell,
                    new: new_sell,
                });
            }
        }
    }
    alerts
}

/// Batches every alert into a single message, one line each.
pub fn compose(alerts: &[RateAlert], title: &str) -> Option<AlertMessage> {
    if alerts.is_empty() {
        return None;
    }
    let body = alerts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    Some(AlertMessage {
        title: title.to_string(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::default_currencies;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> Snapshot {
        Snapshot::from_value(value).unwrap()
    }

    fn quotes(quotes: &[(f64, f64)], is_mock: bool) -> serde_json::Value {
        let banks: Vec<_> = quotes
            .iter()
            .map(|(buy, sell)| {
                json!({
                    "name": "Bank", "buy": buy, "sell": sell, "logo": "",
                    "is_mock": is_mock, "featured": false
                })
            })
            .collect();
        json!({"cbu": 12850.0, "history": [], "banks": banks})
    }

    fn banks(list: &[(f64, f64)]) -> serde_json::Value {
        quotes(list, false)
    }

    #[test]
    fn test_buy_up_without_sell_alert() {
        let old = snapshot(json!({"usd": banks(&[(12800.0, 12850.0)])}));
        let new = snapshot(json!({"usd": banks(&[(12860.0, 12840.0)])}));

        let alerts = diff(&new, &old, &default_currencies());

        assert_eq!(
            alerts,
            vec![RateAlert {
                currency: "usd".to_string(),
                kind: AlertKind::BuyRateUp,
                old: 12800.0,
                new: 12860.0,
            }]
        );
        assert_eq!(alerts[0].to_string(), "USD Buy Rate UP: 12800 -> 12860 UZS");
    }

    #[test]
    fn test_best_prices_and_per_currency_thresholds() {
        let old = snapshot(json!({
            "usd": banks(&[(12700.0, 12900.0), (12750.0, 12950.0)]),
            "rub": banks(&[(140.0, 160.0)]),
        }));
        let new = snapshot(json!({
            "usd": banks(&[(12790.0, 12880.0), (12700.0, 12840.0)]),
            "rub": banks(&[(146.0, 154.0)]),
        }));

        let alerts = diff(&new, &old, &default_currencies());
        let lines: Vec<String> = alerts.iter().map(ToString::to_string).collect();

        // USD: best buy 12750 -> 12790 stays inside 50; best sell 12900 -> 12840 crosses.
        assert_eq!(
            lines,
            vec![
                "USD Sell Rate DOWN: 12900 -> 12840 UZS",
                "RUB Buy Rate UP: 140 -> 146 UZS",
                "RUB Sell Rate DOWN: 160 -> 154 UZS",
            ]
        );
    }

    #[test]
    fn test_missing_or_empty_blocks_are_skipped() {
        let old = snapshot(json!({"usd": {"cbu": 1.0, "history": [], "banks": []}, "eur": null}));
        let new = snapshot(json!({
            "usd": banks(&[(99999.0, 1.0)]),
            "eur": banks(&[(99999.0, 1.0)]),
        }));
        assert!(diff(&new, &old, &default_currencies()).is_empty());
    }

    #[test]
    fn test_mock_quotes_never_alert() {
        let live = snapshot(json!({"usd": banks(&[(12800.0, 12900.0)])}));
        let mock = snapshot(json!({"usd": quotes(&[(12950.0, 12700.0)], true)}));

        assert!(diff(&mock, &live, &default_currencies()).is_empty());
        assert!(diff(&live, &mock, &default_currencies()).is_empty());
    }

    #[test]
    fn test_compose_batches_alerts() {
        assert_eq!(compose(&[], "Title"), None);
        let alerts = vec![
            RateAlert {
                currency: "usd".to_string(),
                kind: AlertKind::BuyRateUp,
                old: 12800.0,
                new: 12860.0,
            },
            RateAlert {
                currency: "eur".to_string(),
                kind: AlertKind::SellRateDown,
                old: 14000.5,
                new: 13900.0,
            },
        ];
        let message = compose(&alerts, "NeoUZS Rate Alert").unwrap();
        assert_eq!(message.title, "NeoUZS Rate Alert");
        assert_eq!(
            message.body,
            "USD Buy Rate UP: 12800 -> 12860 UZS\nEUR Sell Rate DOWN: 14000.5 -> 13900 UZS"
        );
    }
}
