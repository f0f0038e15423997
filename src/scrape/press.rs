//! Link harvesting from institutional press pages.
//!
//! These pages have no feed. Article links are recognized by URL shape and
//! dated either from text near the link or from a `/YYYY/MM/DD/` path.

use chrono::{DateTime, FixedOffset, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::html::{Document, inner_text};
use crate::core::clock::LocalTime;
use crate::core::config::{DateStyle, PressSource};

static DAY_MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+(\d{4})")
        .unwrap()
});

static TRAILING_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\d{1,2}\s+(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+\d{4}\s*$")
        .unwrap()
});

static URL_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4})/(\d{2})/(\d{2})/").unwrap());

/// Bytes after a link searched for its date, standing in for the card text.
const DATE_WINDOW: usize = 400;

const MAX_TITLE_CHARS: usize = 200;

const NAV_TEXT: [&str; 2] = ["read more", "view all"];

#[derive(Debug, Clone, PartialEq)]
pub struct PressEntry {
    pub title: String,
    pub url: String,
    pub published: DateTime<FixedOffset>,
    /// False when `published` was synthesized.
    pub dated: bool,
}

fn month_number(abbrev: &str) -> Option<u32> {
    let months = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    months
        .iter()
        .position(|m| *m == abbrev)
        .and_then(|i| u32::try_from(i + 1).ok())
}

pub fn date_from_text(text: &str) -> Option<NaiveDate> {
    let caps = DAY_MONTH_YEAR_RE.captures(text)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = month_number(caps.get(2)?.as_str())?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn date_from_url(url: &str) -> Option<NaiveDate> {
    let caps = URL_DATE_RE.captures(url)?;
    NaiveDate::from_ymd_opt(
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
        caps.get(3)?.as_str().parse().ok()?,
    )
}

fn is_article_link(href: &str, source: &PressSource) -> bool {
    let lower = href.to_lowercase();
    let matches = source
        .href_patterns
        .iter()
        .any(|p| lower.contains(&p.to_lowercase()));
    let excluded = source.exclude_patterns.iter().any(|p| href.contains(p.as_str()));
    let is_listing = source.href_patterns.iter().any(|p| href == p) || href == source.url;
    matches && !excluded && !is_listing && href.matches('/').count() >= source.min_depth
}

fn absolute(href: &str, origin: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{href}", origin.trim_end_matches('/'))
    } else {
        format!("{}/{href}", origin.trim_end_matches('/'))
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Article links on a press page: deduplicated by URL, newest first, at most
/// `source.limit`. Undated links get `now - position` days so page order is
/// preserved.
pub fn parse_press_page(html: &str, source: &PressSource, now: &LocalTime) -> Vec<PressEntry> {
    let doc = Document::parse(html);
    let mut entries: Vec<PressEntry> = Vec::new();

    for link in doc.find_all_tag("a") {
        let Some(href) = link.attr("href") else {
            continue;
        };
        if !is_article_link(&href, source) {
            continue;
        }
        let text = link.text();
        if text.chars().count() < source.min_title_len
            || NAV_TEXT.contains(&text.to_lowercase().as_str())
        {
            continue;
        }

        let date = match source.date_style {
            DateStyle::DayMonthYear => date_from_text(&text).or_else(|| {
                let (_, end) = link.span();
                let stop = floor_char_boundary(html, end + DATE_WINDOW);
                date_from_text(&inner_text(&html[end..stop]))
            }),
            DateStyle::UrlPath => date_from_url(&href),
        };

        let title = TRAILING_DATE_RE.replace(&text, "").trim().to_string();
        let title: String = title.chars().take(MAX_TITLE_CHARS).collect();
        let (published, dated) = match date.and_then(|d| LocalTime::at(d, 0, 0)) {
            Some(t) => (t.datetime(), true),
            None => {
                let offset = chrono::Duration::days(entries.len() as i64);
                (now.datetime() - offset, false)
            }
        };

        entries.push(PressEntry {
            title,
            url: absolute(&href, &source.origin),
            published,
            dated,
        });
    }

    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.url.clone()));
    entries.sort_by(|a, b| b.published.cmp(&a.published));
    entries.truncate(source.limit);
    entries
}
