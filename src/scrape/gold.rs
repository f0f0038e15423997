//! Gold bar price table.

use once_cell::sync::Lazy;
use regex::Regex;

use super::html::Document;
use crate::core::market::GoldBar;

static WEIGHT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*грамм").unwrap());

fn parse_price(cell: &str) -> Option<u64> {
    let digits: String = cell
        .replace("сўм", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    digits.parse::<u64>().ok().filter(|p| *p > 0)
}

/// Bars sorted by weight, then price. `None` when the table is missing.
pub fn parse_gold_bars(html: &str) -> Option<Vec<GoldBar>> {
    let doc = Document::parse(html);
    let table = doc
        .find_all_class("table-table-bordered")
        .into_iter()
        .find(|e| e.name() == "table")?;

    let mut bars: Vec<GoldBar> = table
        .find_all_tag("tr")
        .iter()
        .skip(1)
        .filter_map(|row| {
            let cells = row.find_all_tag("td");
            let (weight, price) = (cells.first()?, cells.get(1)?);
            let grams = WEIGHT_RE.captures(&weight.text())?.get(1)?.as_str().to_string();
            Some(GoldBar {
                weight: format!("{grams}g"),
                price: parse_price(&price.text())?,
            })
        })
        .collect();

    bars.sort_by_key(|b| (b.grams(), b.price));
    Some(bars)
}
