//! Deposit offer cards on the comparison site's savings listings.

use super::html::{Document, Element};
use super::tables::parse_rate;
use crate::core::market::{DepositCurrency, SavingsOffer};
use crate::lookup::{bank_logo, short_name};

const CARD: &str = "table-card-offers-bottom";
const BLOCK_BANK: &str = "table-card-offers-block1";
const BLOCK_BANK_TEXT: &str = "table-card-offers-block1-text";
const BLOCKS_ALL: &str = "table-card-offers-blocks-all";
const BLOCK_RATE: &str = "table-card-offers-block2";
const BLOCK_DURATION: &str = "table-card-offers-block3";
const BLOCK_MIN_AMOUNT: &str = "table-card-offers-block4";
const BLOCK_ONLINE: &str = "table-card-offers-block5";
const MEDIUM_TEXT: &str = "medium-text";

fn medium_text(card: &Element<'_>, block: &str) -> Option<String> {
    Some(card.find_class(block)?.find_class(MEDIUM_TEXT)?.text())
}

fn parse_card(card: &Element<'_>, foreign: bool) -> Option<SavingsOffer> {
    let bank = card.find_class(BLOCK_BANK)?;
    let bank_raw = bank
        .find_class(MEDIUM_TEXT)
        .map(|e| e.text())
        .unwrap_or_else(|| "Unknown Bank".to_string());
    let bank_name = short_name(&bank_raw);
    let deposit_name = bank
        .find_class(BLOCK_BANK_TEXT)
        .and_then(|e| e.find_tag("a"))
        .map(|a| a.text())
        .unwrap_or_else(|| "Unknown Deposit".to_string());

    let blocks = card.find_class(BLOCKS_ALL);
    let rate = blocks
        .as_ref()
        .and_then(|b| medium_text(b, BLOCK_RATE))
        .and_then(|t| parse_rate(&t))?;
    let duration = blocks
        .as_ref()
        .and_then(|b| medium_text(b, BLOCK_DURATION))
        .unwrap_or_default();
    let min_amount = blocks
        .as_ref()
        .and_then(|b| medium_text(b, BLOCK_MIN_AMOUNT))
        .unwrap_or_default();
    let is_online = blocks
        .as_ref()
        .and_then(|b| b.find_class(BLOCK_ONLINE))
        .is_some_and(|b| b.text().contains("Onlayn") || b.find_class("online_btn").is_some());

    let currency = foreign.then(|| classify_currency(&deposit_name, &min_amount));

    Some(SavingsOffer {
        logo: bank_logo(&bank_name),
        bank_name,
        deposit_name,
        rate,
        duration,
        min_amount,
        is_online,
        currency,
    })
}

/// The deposit name wins over the minimum-amount text; USD by default.
pub fn classify_currency(deposit_name: &str, min_amount: &str) -> DepositCurrency {
    let name = deposit_name.to_lowercase();
    if name.contains("evro") || name.contains("eur") {
        return DepositCurrency::Eur;
    }
    if name.contains("usd") || name.contains("dollar") {
        return DepositCurrency::Usd;
    }
    let amount = min_amount.to_lowercase();
    if min_amount.contains('€') || amount.contains("eur") || amount.contains("evro") {
        DepositCurrency::Eur
    } else {
        DepositCurrency::Usd
    }
}

/// Offers with a positive rate, in page order. `foreign` tags each offer
/// with its deposit currency.
pub fn parse_offers(html: &str, foreign: bool) -> Vec<SavingsOffer> {
    let doc = Document::parse(html);
    doc.find_all_class(CARD)
        .iter()
        .filter_map(|card| parse_card(card, foreign))
        .collect()
}

/// Keeps the first offer per bank and deposit name.
pub fn dedupe_offers(offers: Vec<SavingsOffer>) -> Vec<SavingsOffer> {
    let mut seen = std::collections::HashSet::new();
    offers
        .into_iter()
        .filter(|o| seen.insert(format!("{}-{}", o.bank_name, o.deposit_name)))
        .collect()
}

pub fn sort_by_rate(offers: &mut [SavingsOffer]) {
    offers.sort_by(|a, b| b.rate.total_cmp(&a.rate));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn card(
        bank: &str,
        deposit: &str,
        rate: &str,
        min_amount: &str,
        online: bool,
    ) -> String {
        let online = if online {
            r#"<span class="online_btn">Onlayn</span>"#
        } else {
            ""
        };
        format!(
            r#"<div class="table-card-offers-bottom">
  <div class="table-card-offers-block1"><img src="/logo.png"><span class="medium-text">{bank}</span>
    <div class="table-card-offers-block1-text"><a href="/deposit">{deposit}</a></div></div>
  <div class="table-card-offers-blocks-all">
    <div class="table-card-offers-block2"><span class="medium-text">{rate}</span></div>
    <div class="table-card-offers-block3"><span class="medium-text">13 oy</span></div>
    <div class="table-card-offers-block4"><span class="medium-text">{min_amount}</span></div>
    <div class="table-card-offers-block5">{online}</div>
  </div>
</div>"#
        )
    }

    #[test]
    fn test_parse_uzs_offers() {
        let html = format!(
            "<html>{}{}{}</html>",
            card("Xalq Banki", "Yillik", "24 %", "1 000 000 so'm", true),
            card("Hamkorbank", "Zero rate", "0 %", "-", false),
            card("Kapitalbank", "Kapital Plus", "19-22,5 %", "500 000 so'm", false),
        );
        let offers = parse_offers(&html, false);

        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].bank_name, "Xalq Bank");
        assert_eq!(offers[0].deposit_name, "Yillik");
        assert_eq!(offers[0].rate, 24.0);
        assert_eq!(offers[0].duration, "13 oy");
        assert!(offers[0].is_online);
        assert_eq!(offers[0].currency, None);
        assert_eq!(offers[1].rate, 22.5);
        assert!(!offers[1].is_online);
        assert_eq!(offers[1].logo, "https://logo.clearbit.com/kapitalbank.uz");
    }

    #[test]
    fn test_currency_classification() {
        assert_eq!(classify_currency("Evro Plus", "100 $"), DepositCurrency::Eur);
        assert_eq!(classify_currency("Dollar Max", "100 €"), DepositCurrency::Usd);
        assert_eq!(classify_currency("Omonat", "1000 €"), DepositCurrency::Eur);
        assert_eq!(classify_currency("Omonat", "100 $"), DepositCurrency::Usd);
    }

    #[test]
    fn test_dedupe_and_sort() {
        let html = format!(
            "{}{}{}",
            card("Hamkorbank", "Valyuta", "5 %", "100 $", false),
            card("Hamkorbank", "Valyuta", "6 %", "100 $", false),
            card("Kapitalbank", "Evro", "7 %", "100 €", false),
        );
        let mut offers = dedupe_offers(parse_offers(&html, true));
        sort_by_rate(&mut offers);

        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].deposit_name, "Evro");
        assert_eq!(offers[0].currency, Some(DepositCurrency::Eur));
        assert_eq!(offers[1].rate, 5.0);
    }
}
