//! News domain types

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::snapshot::Stamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NewsCategory {
    #[serde(alias = "economy")]
    Economy,
    #[serde(alias = "banking")]
    Banking,
    #[serde(alias = "markets")]
    Markets,
    #[serde(alias = "business")]
    Business,
    #[serde(alias = "regulation")]
    Regulation,
    #[serde(alias = "general")]
    General,
}

impl Display for NewsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NewsCategory::Economy => "Economy",
                NewsCategory::Banking => "Banking",
                NewsCategory::Markets => "Markets",
                NewsCategory::Business => "Business",
                NewsCategory::Regulation => "Regulation",
                NewsCategory::General => "General",
            }
        )
    }
}

impl FromStr for NewsCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "economy" => Ok(NewsCategory::Economy),
            "banking" => Ok(NewsCategory::Banking),
            "markets" => Ok(NewsCategory::Markets),
            "business" => Ok(NewsCategory::Business),
            "regulation" => Ok(NewsCategory::Regulation),
            "general" => Ok(NewsCategory::General),
            _ => Err(anyhow::anyhow!("Invalid news category: {}", s)),
        }
    }
}

/// Reputation attached to every item from the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reliability {
    pub tier: String,
    pub score: f64,
    pub label: Option<String>,
}

impl Default for Reliability {
    fn default() -> Self {
        Self {
            tier: "standard".to_string(),
            score: 0.5,
            label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub full_content: String,
    pub source: String,
    pub source_url: String,
    pub category: NewsCategory,
    pub language: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub published_ts: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_official: bool,
    pub reliability_tier: String,
    pub reliability_score: f64,
    #[serde(default)]
    pub reliability_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsBlock {
    #[serde(flatten)]
    pub stamp: Stamp,
    pub items: Vec<NewsItem>,
}
