//! Per-bank quote assembly and featured-bank selection.

use rand::Rng;

use crate::core::config::{CurrencyConfig, FeaturedConfig};
use crate::core::currency::BankQuote;
use crate::lookup::bank_logo;
use crate::scrape::tables::RateTable;

const MOCK_FEATURED: usize = 5;

/// Joins buy and sell tables into quotes, in buy-table order. Banks missing
/// either side are dropped. Featured flags are then set per [`select_featured`].
pub fn reconcile(
    buy: &RateTable,
    sell: &RateTable,
    reference: f64,
    featured: &FeaturedConfig,
) -> Vec<BankQuote> {
    let mut quotes: Vec<BankQuote> = buy
        .iter()
        .filter_map(|(name, buy_rate)| {
            let sell_rate = sell.get(name)?;
            Some(BankQuote {
                name: name.to_string(),
                buy: buy_rate,
                sell: sell_rate,
                logo_url: bank_logo(name),
                is_mock: false,
                featured: false,
            })
        })
        .collect();

    for idx in select_featured(&quotes, reference, featured) {
        quotes[idx].featured = true;
    }
    quotes
}

fn deviation(quote: &BankQuote, reference: f64) -> f64 {
    (quote.buy - reference)
        .abs()
        .max((quote.sell - reference).abs())
}

/// Indices of the featured quotes, popular banks first.
///
/// Stage one walks the popular-name fragments in order and takes the first
/// not-yet-selected bank containing each one (case-insensitive), up to
/// `popular_count`. Stage two adds the banks furthest from `reference`,
/// skipping ones already chosen, up to `deviant_count`. Selection is by
/// position, so two banks with identical fields are still distinct.
pub fn select_featured(
    quotes: &[BankQuote],
    reference: f64,
    config: &FeaturedConfig,
) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::new();
    let lowered: Vec<String> = quotes.iter().map(|q| q.name.to_lowercase()).collect();

    for fragment in &config.popular_fragments {
        if selected.len() >= config.popular_count {
            break;
        }
        let fragment = fragment.to_lowercase();
        let hit = (0..quotes.len())
            .find(|i| !selected.contains(i) && lowered[*i].contains(&fragment));
        if let Some(idx) = hit {
            selected.push(idx);
        }
    }

    let mut by_deviation: Vec<usize> = (0..quotes.len()).collect();
    // Stable: ties keep list order.
    by_deviation.sort_by(|a, b| {
        deviation(&quotes[*b], reference).total_cmp(&deviation(&quotes[*a], reference))
    });
    let deviants: Vec<usize> = by_deviation
        .into_iter()
        .filter(|i| !selected.contains(i))
        .take(config.deviant_count)
        .collect();

    selected.extend(deviants);
    selected
}

/// Synthetic quotes around `official`: every buy is below and every sell
/// above it by a whole-number spread drawn from the currency's variance.
pub fn mock_quotes<R: Rng>(
    currency: &CurrencyConfig,
    official: f64,
    names: &[String],
    rng: &mut R,
) -> Vec<BankQuote> {
    let (lo, hi) = currency.mock_variance;
    let lo = lo.max(1);
    let hi = hi.max(lo);

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let buy_spread = f64::from(rng.gen_range(lo..=hi));
            let sell_spread = f64::from(rng.gen_range(lo..=hi));
            BankQuote {
                name: name.clone(),
                buy: (official - buy_spread).floor(),
                sell: (official + sell_spread).ceil(),
                logo_url: bank_logo(name),
                is_mock: true,
                featured: i < MOCK_FEATURED,
            }
        })
        .collect()
}
