//! World News API search client.

use serde::Deserialize;
use tracing::{instrument, warn};

use super::fetcher::Fetcher;

/// One search result. Every field is optional in practice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub publish_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<Article>,
}

pub struct WorldNewsProvider {
    base_url: String,
    fetcher: Fetcher,
    api_key: String,
}

impl WorldNewsProvider {
    const RESULTS: u32 = 15;

    pub fn new(base_url: &str, fetcher: Fetcher, api_key: String) -> Self {
        WorldNewsProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            fetcher,
            api_key,
        }
    }

    /// Latest English articles from Uzbek sources. Failures read as empty.
    #[instrument(name = "WorldNews", skip(self))]
    pub async fn latest(&self) -> Vec<Article> {
        let url = format!(
            "{}/search-news?api-key={}&source-country=uz&language=en&number={}&sort=publish-time&sort-direction=DESC",
            self.base_url,
            self.api_key,
            Self::RESULTS
        );
        match self.fetcher.fetch_json::<SearchResponse>(&url).await {
            Ok(response) => response
                .news
                .into_iter()
                .filter(|a| !a.title.trim().is_empty())
                .collect(),
            Err(e) => {
                warn!(error = %e, "News search failed");
                Vec::new()
            }
        }
    }
}
