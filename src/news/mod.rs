//! Normalization, categorization and deduplication of news items.
//!
//! Every source is turned into [`NewsItem`]s here; fetching lives in
//! [`aggregator`].

pub mod aggregator;

use chrono::{DateTime, FixedOffset};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::core::clock::{LocalTime, parse_timestamp};
use crate::core::config::{CategoryKeywords, FeedSource, PressSource, SourceReliability};
use crate::core::news::{NewsCategory, NewsItem, Reliability};
use crate::providers::worldnews::Article;
use crate::scrape::feed::FeedEntry;
use crate::scrape::html::{first_img_src, inner_text};
use crate::scrape::press::PressEntry;

pub use aggregator::NewsAggregator;

pub const SUMMARY_CHARS: usize = 200;
pub const CONTENT_CHARS: usize = 2000;
pub const TITLE_PREFIX_CHARS: usize = 50;

const ELLIPSIS: &str = "...";

const OFFICIAL_TIER: &str = "official";

/// Stable id from the source name and the link without its fragment.
pub fn item_id(source: &str, link: &str) -> String {
    let canonical = link.trim();
    let canonical = canonical.split('#').next().unwrap_or(canonical);
    let digest = Sha256::digest(format!("{source}-{canonical}").as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Cuts `text` to at most `max` characters, the ellipsis included.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

/// First category, in table order, with a keyword in the title or summary.
pub fn categorize(
    title: &str,
    summary: &str,
    default: NewsCategory,
    table: &[CategoryKeywords],
) -> NewsCategory {
    let text = format!("{title} {summary}").to_lowercase();
    table
        .iter()
        .find(|entry| entry.keywords.iter().any(|k| text.contains(&k.to_lowercase())))
        .map_or(default, |entry| entry.category)
}

pub fn reliability_for(source: &str, table: &[SourceReliability]) -> Reliability {
    table
        .iter()
        .find(|r| r.source == source)
        .map(|r| Reliability {
            tier: r.tier.clone(),
            score: r.score,
            label: r.label.clone(),
        })
        .unwrap_or_default()
}

fn title_key(title: &str) -> String {
    title.to_lowercase().chars().take(TITLE_PREFIX_CHARS).collect()
}

/// Drops repeated ids, then repeated title prefixes. The first seen wins.
pub fn dedupe(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut ids = HashSet::new();
    let mut titles = HashSet::new();
    items
        .into_iter()
        .filter(|item| ids.insert(item.id.clone()))
        .filter(|item| titles.insert(title_key(&item.title)))
        .collect()
}

/// Newest first, at most `top_n`. Equal timestamps keep pool order.
pub fn rank(mut items: Vec<NewsItem>, top_n: usize) -> Vec<NewsItem> {
    items.sort_by(|a, b| b.published_ts.total_cmp(&a.published_ts));
    items.truncate(top_n);
    items
}

/// Builds items for one run, sharing the category and reputation tables.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    pub categories: &'a [CategoryKeywords],
    pub reliability: &'a [SourceReliability],
    pub now: LocalTime,
}

impl Normalizer<'_> {
    /// Undated items are placed `position` days before now so feed order
    /// survives ranking.
    fn published(&self, raw: Option<&str>, position: usize) -> DateTime<FixedOffset> {
        raw.and_then(parse_timestamp).unwrap_or_else(|| {
            self.now.datetime() - chrono::Duration::days(position as i64)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn item(
        &self,
        source: &str,
        link: String,
        title: String,
        full_content: String,
        summary: String,
        default_category: NewsCategory,
        language: &str,
        published: DateTime<FixedOffset>,
        image_url: Option<String>,
    ) -> NewsItem {
        let reliability = reliability_for(source, self.reliability);
        NewsItem {
            id: item_id(source, &link),
            category: categorize(&title, &summary, default_category, self.categories),
            title,
            summary,
            full_content,
            source: source.to_string(),
            source_url: link,
            language: language.to_string(),
            published_at: published.to_rfc3339(),
            published_ts: published.timestamp() as f64,
            image_url,
            is_official: reliability.tier == OFFICIAL_TIER,
            reliability_tier: reliability.tier,
            reliability_score: reliability.score,
            reliability_label: reliability.label,
        }
    }

    pub fn from_feed(&self, source: &FeedSource, entry: FeedEntry, position: usize) -> NewsItem {
        let body = if entry.content_html.trim().is_empty() {
            &entry.summary_html
        } else {
            &entry.content_html
        };
        let full_content = truncate_chars(&inner_text(body), CONTENT_CHARS);
        let summary = truncate_chars(&full_content, SUMMARY_CHARS);
        let image_url = entry
            .media_url
            .clone()
            .or_else(|| first_img_src(&entry.summary_html))
            .or_else(|| first_img_src(&entry.content_html));
        let published = self.published(entry.published.as_deref(), position);

        self.item(
            &source.name,
            entry.link,
            inner_text(&entry.title),
            full_content,
            summary,
            source.default_category,
            &source.language,
            published,
            image_url,
        )
    }

    pub fn from_press(&self, source: &PressSource, entry: PressEntry) -> NewsItem {
        let summary = match &source.summary_prefix {
            Some(prefix) => format!("{prefix}{}", entry.title),
            None => entry.title.clone(),
        };
        self.item(
            &source.name,
            entry.url,
            entry.title,
            String::new(),
            truncate_chars(&summary, SUMMARY_CHARS),
            source.category,
            "EN",
            entry.published,
            None,
        )
    }

    /// Items from the news search API, already plain text.
    pub fn from_article(&self, source: &str, article: Article, position: usize) -> NewsItem {
        let full_content = truncate_chars(article.text.trim(), CONTENT_CHARS);
        let summary = truncate_chars(&full_content, SUMMARY_CHARS);
        let published = self.published(article.publish_date.as_deref(), position);
        let link = if article.url.is_empty() {
            article.id.map(|id| id.to_string()).unwrap_or_default()
        } else {
            article.url
        };
        self.item(
            source,
            link,
            article.title,
            full_content,
            summary,
            NewsCategory::General,
            "EN",
            published,
            article.image.filter(|i| !i.is_empty()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::NewsConfig;
    use chrono::NaiveDate;

    fn now() -> LocalTime {
        LocalTime::at(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(), 12, 0).unwrap()
    }

    fn item(id: &str, title: &str, ts: f64) -> NewsItem {
        NewsItem {
            id: id.to_string(),
            title: title.to_string(),
            summary: String::new(),
            full_content: String::new(),
            source: "Test".to_string(),
            source_url: String::new(),
            category: NewsCategory::General,
            language: "EN".to_string(),
            published_at: String::new(),
            published_ts: ts,
            image_url: None,
            is_official: false,
            reliability_tier: "standard".to_string(),
            reliability_score: 0.5,
            reliability_label: None,
        }
    }

    #[test]
    fn test_item_id_is_stable_and_source_scoped() {
        let a = item_id("Gazeta.uz", "https://gazeta.uz/a");
        assert_eq!(a, item_id("Gazeta.uz", " https://gazeta.uz/a#comments"));
        assert_ne!(a, item_id("Spot.uz", "https://gazeta.uz/a"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("short", 10), "short");
        let cyrillic = "б".repeat(250);
        let cut = truncate_chars(&cyrillic, SUMMARY_CHARS);
        assert_eq!(cut.chars().count(), SUMMARY_CHARS);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_categorize_uses_table_order() {
        let table = NewsConfig::default().categories;
        // "inflation" (Economy) outranks "bank" (Banking).
        assert_eq!(
            categorize("Central bank on inflation", "", NewsCategory::General, &table),
            NewsCategory::Economy
        );
        assert_eq!(
            categorize("Новый вклад", "", NewsCategory::General, &table),
            NewsCategory::Banking
        );
        assert_eq!(
            categorize("Weather today", "sunny", NewsCategory::Business, &table),
            NewsCategory::Business
        );
    }

    #[test]
    fn test_unknown_source_gets_standard_tier() {
        let table = NewsConfig::default().reliability;
        assert_eq!(reliability_for("CBU", &table).tier, "official");
        assert_eq!(reliability_for("Somewhere", &table), Reliability::default());
    }

    #[test]
    fn test_dedupe_by_id_then_title_prefix() {
        let shared = "Uzbekistan central bank keeps the policy rate unchanged at 14 percent";
        let items = vec![
            item("a", shared, 3.0),
            item("a", "Completely different title", 4.0),
            item("b", &shared.to_uppercase(), 5.0),
            item("c", "Uzbekistan central bank keeps the policy rate... other ending", 6.0),
            item("d", "Gold prices rise", 1.0),
        ];
        let kept: Vec<String> = dedupe(items).into_iter().map(|i| i.id).collect();
        assert_eq!(kept, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_rank_newest_first_and_truncates() {
        let items = (0..5).map(|i| item(&i.to_string(), &format!("t{i}"), f64::from(i))).collect();
        let ranked = rank(items, 3);
        let ids: Vec<&str> = ranked.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_feed_entry_normalization() {
        let config = NewsConfig::default();
        let normalizer = Normalizer {
            categories: &config.categories,
            reliability: &config.reliability,
            now: now(),
        };
        let entry = FeedEntry {
            title: "Exports grow".to_string(),
            link: "https://uzdaily.uz/en/post/1".to_string(),
            summary_html: format!("<p><img src=\"/i.jpg\">{}</p>", "x".repeat(300)),
            content_html: String::new(),
            published: None,
            media_url: None,
        };
        let out = normalizer.from_feed(&config.feeds[2], entry, 2);

        assert_eq!(out.source, "UzDaily");
        assert_eq!(out.category, NewsCategory::Business);
        assert_eq!(out.image_url.as_deref(), Some("/i.jpg"));
        assert_eq!(out.full_content.chars().count(), 300);
        assert_eq!(out.summary.chars().count(), SUMMARY_CHARS);
        assert_eq!(out.published_ts, (now().datetime() - chrono::Duration::days(2)).timestamp() as f64);
        assert_eq!(out.reliability_label.as_deref(), Some("VERIFIED"));
        assert!(!out.is_official);
    }

    #[test]
    fn test_press_entry_is_official() {
        let config = NewsConfig::default();
        let normalizer = Normalizer {
            categories: &config.categories,
            reliability: &config.reliability,
            now: now(),
        };
        let imf = config.press.iter().find(|p| p.name == "IMF").unwrap();
        let entry = PressEntry {
            title: "Staff concludes visit".to_string(),
            url: "https://www.imf.org/en/News/Articles/2025/02/27/pr".to_string(),
            published: now().datetime(),
            dated: true,
        };
        let out = normalizer.from_press(imf, entry);
        assert!(out.is_official);
        assert_eq!(out.summary, "IMF report on Uzbekistan: Staff concludes visit");
        assert_eq!(out.category, NewsCategory::Economy);
        assert!(out.full_content.is_empty());
    }
}
