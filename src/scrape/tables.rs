//! Buy/sell table recognition on the bank comparison page.
//!
//! The page renders one buy/sell table pair per currency with no label
//! saying which currency a pair belongs to. A pair is recognized by the mean
//! of its first few buy rates landing near a trusted reference rate.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use super::html::{Document, Element};
use crate::core::config::CurrencyConfig;

const BUY_CONTAINER: &str = "bc-inner-block-left";
const SELL_CONTAINER: &str = "bc-inner-blocks-right";
const ROW: &str = "bc-inner-block-left-texts";
const RATE: &str = "green-date";

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no table pair on the page matches {code} around {reference}")]
    NotFound { code: String, reference: String },
}

/// Bank name to rate, in page order. A repeated name updates in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    entries: Vec<(String, f64)>,
}

impl RateTable {
    pub fn insert(&mut self, name: String, rate: f64) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = rate,
            None => self.entries.push((name, rate)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rate)| *rate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn leading_mean(&self, n: usize) -> Option<f64> {
        let sample: Vec<f64> = self.entries.iter().take(n).map(|(_, r)| *r).collect();
        if sample.is_empty() {
            return None;
        }
        Some(sample.iter().sum::<f64>() / sample.len() as f64)
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut table = RateTable::default();
        for (name, rate) in iter {
            table.insert(name, rate);
        }
        table
    }
}

/// Parses a rate cell such as `12 850 so'm`, `12,5 %` or `19-21 %`.
/// Ranges yield their upper bound. Only positive finite values are accepted.
pub fn parse_rate(raw: &str) -> Option<f64> {
    let lowered = raw.to_lowercase();
    let rate = if lowered.contains('-') {
        let normalized = lowered.replace(',', ".");
        NUMBER_RE
            .find_iter(&normalized)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .reduce(f64::max)?
    } else {
        let clean: String = lowered
            .replace("so'm", "")
            .replace("so‘m", "")
            .replace("сўм", "")
            .replace("сум", "")
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '%')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        clean.parse::<f64>().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Reads one side of a pair. Rows without a bank link or a usable rate are
/// skipped rather than failing the table.
pub fn parse_bank_list(container: &Element<'_>) -> RateTable {
    container
        .find_all_class(ROW)
        .into_iter()
        .filter_map(|row| {
            let name = row.find_tag("a")?.text();
            if name.is_empty() {
                return None;
            }
            let rate = parse_rate(&row.find_class(RATE)?.text())?;
            Some((name, rate))
        })
        .collect()
}

/// Whether `mean` sits inside `reference × (1 ± tolerance)`.
pub fn within_band(mean: f64, reference: f64, tolerance: f64) -> bool {
    (1.0 - tolerance) * reference <= mean && mean <= (1.0 + tolerance) * reference
}

/// Finds the buy/sell pair for `currency` in document order and returns the
/// first one whose leading buy rates fit the tolerance band.
pub fn resolve_bank_tables(
    html: &str,
    currency: &CurrencyConfig,
    reference: f64,
) -> Result<(RateTable, RateTable), ResolveError> {
    let doc = Document::parse(html);
    let buys = doc.find_all_class(BUY_CONTAINER);
    let sells = doc.find_all_class(SELL_CONTAINER);

    for (i, (buy_container, sell_container)) in buys.iter().zip(sells.iter()).enumerate() {
        let buy = parse_bank_list(buy_container);
        let Some(mean) = buy.leading_mean(currency.sample_size.max(1)) else {
            continue;
        };
        if within_band(mean, reference, currency.tolerance) {
            debug!(code = %currency.code, pair = i, mean, "Matched table pair");
            return Ok((buy, parse_bank_list(sell_container)));
        }
        debug!(code = %currency.code, pair = i, mean, "Rejected table pair");
    }

    Err(ResolveError::NotFound {
        code: currency.code.clone(),
        reference: format!("{reference:.2}"),
    })
}
