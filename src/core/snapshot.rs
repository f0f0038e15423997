//! The persisted root snapshot.
//!
//! Kept as a JSON object rather than a fully typed struct so that keys this
//! binary does not know about survive a read/overlay/write cycle untouched.
//! Typed access goes through [`Snapshot::get`] and [`Snapshot::set`].

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::warn;

use super::clock::LocalTime;
use super::currency::CurrencySnapshot;

pub const WEATHER: &str = "weather";
pub const SAVINGS: &str = "savings";
pub const SAVINGS_USD: &str = "savings_usd";
pub const NEWS: &str = "news";
pub const GOLD_BARS: &str = "gold_bars";
pub const GOLD_HISTORY: &str = "gold_history";
pub const SILVER_HISTORY: &str = "silver_history";
pub const BITCOIN_HISTORY: &str = "bitcoin_history";
pub const BANK_RELIABILITY: &str = "bank_reliability";
pub const LAST_UPDATED: &str = "last_updated";

/// Keys every written snapshot carries, `null` until first produced.
pub const DEFAULT_KEYS: [&str; 9] = [
    WEATHER,
    SAVINGS,
    SAVINGS_USD,
    NEWS,
    GOLD_BARS,
    GOLD_HISTORY,
    SILVER_HISTORY,
    BITCOIN_HISTORY,
    BANK_RELIABILITY,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    pub last_updated: String,
    #[serde(default)]
    pub last_updated_ts: f64,
}

impl Stamp {
    pub fn at(now: &LocalTime) -> Self {
        Self {
            last_updated: now.stamp(),
            last_updated_ts: now.epoch_secs(),
        }
    }

    /// A stamp without an epoch (older files) is never fresh.
    pub fn is_fresh(&self, now: &LocalTime, window: Duration) -> bool {
        if self.last_updated_ts <= 0.0 {
            return false;
        }
        let age = now.epoch_secs() - self.last_updated_ts;
        age >= 0.0 && age < window.as_secs_f64()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    fields: Map<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => anyhow::bail!(
                "Snapshot root must be a JSON object, found {}",
                kind_of(&other)
            ),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Typed read. Absent, `null` and malformed values all read as `None`;
    /// malformed ones are logged, since consumers must handle absence anyway.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.fields.get(key)?;
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(key, error = %e, "Ignoring malformed snapshot block");
                None
            }
        }
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to serialize snapshot block '{key}'"))?;
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    pub fn set_raw(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Copies every non-null top-level key of `other` over `self`.
    /// Returns the keys that were replaced.
    pub fn overlay(&mut self, other: &Snapshot) -> Vec<String> {
        let mut replaced = Vec::new();
        for (key, value) in &other.fields {
            if value.is_null() {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
            replaced.push(key.clone());
        }
        replaced
    }

    pub fn stamp(&mut self, now: &LocalTime) {
        self.fields
            .insert(LAST_UPDATED.to_string(), Value::String(now.stamp()));
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.fields.get(LAST_UPDATED).and_then(Value::as_str)
    }

    pub fn ensure_default_keys(&mut self) {
        self.ensure_keys(DEFAULT_KEYS);
    }

    pub fn ensure_keys<'k>(&mut self, keys: impl IntoIterator<Item = &'k str>) {
        for key in keys {
            self.fields.entry(key.to_string()).or_insert(Value::Null);
        }
    }

    pub fn currency(&self, key: &str) -> Option<CurrencySnapshot> {
        self.get(key)
    }

    pub fn block_stamp(&self, key: &str) -> Option<Stamp> {
        self.get(key)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn noon() -> LocalTime {
        LocalTime::at(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(), 12, 0).unwrap()
    }

    #[test]
    fn test_overlay_skips_null_and_replaces_present() {
        let mut base = Snapshot::from_value(json!({
            "news": {"last_updated": "x", "items": []},
            "usd": {"cbu": 12700.0}
        }))
        .unwrap();
        let partial = Snapshot::from_value(json!({
            "news": null,
            "usd": {"cbu": 12850.0}
        }))
        .unwrap();

        let replaced = base.overlay(&partial);

        assert_eq!(replaced, vec!["usd".to_string()]);
        assert_eq!(base.raw("news").unwrap()["last_updated"], "x");
        assert_eq!(base.raw("usd").unwrap()["cbu"], 12850.0);
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(Snapshot::from_value(json!([1, 2])).is_err());
        assert!(Snapshot::from_value(json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_get_treats_null_and_malformed_as_absent() {
        let snapshot = Snapshot::from_value(json!({
            "usd": null,
            "eur": "not a block",
            "gbp": {"cbu": 16400.0, "history": [], "banks": []}
        }))
        .unwrap();

        assert!(snapshot.currency("usd").is_none());
        assert!(snapshot.currency("eur").is_none());
        assert!(snapshot.currency("rub").is_none());
        assert_eq!(snapshot.currency("gbp").unwrap().official_rate, Some(16400.0));
    }

    #[test]
    fn test_default_keys_and_stamp() {
        let mut snapshot = Snapshot::from_value(json!({"news": {"items": []}})).unwrap();
        snapshot.ensure_default_keys();
        snapshot.stamp(&noon());

        assert!(snapshot.raw("news").unwrap().is_object());
        assert!(snapshot.raw(WEATHER).unwrap().is_null());
        assert!(snapshot.raw(BANK_RELIABILITY).unwrap().is_null());
        assert_eq!(snapshot.last_updated(), Some("2025-03-14 12:00"));
    }

    #[test]
    fn test_unknown_keys_survive() {
        let mut snapshot = Snapshot::from_value(json!({"legacy_field": [1, 2, 3]})).unwrap();
        snapshot.ensure_default_keys();
        assert_eq!(snapshot.into_value()["legacy_field"], json!([1, 2, 3]));
    }

    #[test]
    fn test_stamp_freshness() {
        let now = noon();
        let stamp = Stamp {
            last_updated: "2025-03-14 11:40".to_string(),
            last_updated_ts: now.epoch_secs() - 1200.0,
        };
        assert!(stamp.is_fresh(&now, Duration::from_secs(1800)));
        assert!(!stamp.is_fresh(&now, Duration::from_secs(600)));

        let legacy = Stamp {
            last_updated: "2025-03-14 11:59".to_string(),
            last_updated_ts: 0.0,
        };
        assert!(!legacy.is_fresh(&now, Duration::from_secs(3600)));
    }
}
