use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use super::news::NewsCategory;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub referer: String,
    pub accept_language: String,
    /// Pause between the per-day requests used to seed official history.
    pub history_pacing_ms: u64,
    /// Upper bound for any single producer before it falls back to cache.
    pub task_deadline_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://www.google.com/".to_string(),
            accept_language: "en-US,en;q=0.9,uz;q=0.8,ru;q=0.7".to_string(),
            history_pacing_ms: 100,
            task_deadline_secs: 120,
        }
    }
}

impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn history_pacing(&self) -> Duration {
        Duration::from_millis(self.history_pacing_ms)
    }

    pub fn task_deadline(&self) -> Duration {
        Duration::from_secs(self.task_deadline_secs)
    }
}

/// Per-currency knobs. The tolerance band and sample size are empirically
/// tuned against the comparison site's markup.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CurrencyConfig {
    pub code: String,
    pub bank_page_url: String,
    pub fallback_rate: f64,
    /// Inclusive `[min, max]` spread, in UZS, used for mock quotes.
    pub mock_variance: (u32, u32),
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    pub alert_threshold: f64,
}

fn default_tolerance() -> f64 {
    0.1
}

fn default_sample_size() -> usize {
    3
}

impl CurrencyConfig {
    fn new(
        code: &str,
        slug: &str,
        fallback_rate: f64,
        variance: (u32, u32),
        threshold: f64,
    ) -> Self {
        Self {
            code: code.to_string(),
            bank_page_url: format!("https://bank.uz/uz/currency/{slug}"),
            fallback_rate,
            mock_variance: variance,
            tolerance: default_tolerance(),
            sample_size: default_sample_size(),
            alert_threshold: threshold,
        }
    }

    fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn key(&self) -> String {
        self.code.to_lowercase()
    }
}

pub fn default_currencies() -> Vec<CurrencyConfig> {
    vec![
        CurrencyConfig::new("USD", "dollar-ssha", 12800.0, (20, 80), 50.0),
        CurrencyConfig::new("RUB", "rossiyskiy-rubl", 150.0, (2, 10), 5.0),
        CurrencyConfig::new("EUR", "evro", 13800.0, (20, 80), 50.0),
        // Small absolute rates, proportionally wider spread between banks.
        CurrencyConfig::new("KZT", "kzt", 23.0, (1, 3), 2.0).with_tolerance(0.3),
        CurrencyConfig::new("GBP", "funt-sterlingov", 16500.0, (50, 200), 60.0),
    ]
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FeaturedConfig {
    pub popular_fragments: Vec<String>,
    pub popular_count: usize,
    pub deviant_count: usize,
    pub mock_bank_names: Vec<String>,
}

impl Default for FeaturedConfig {
    fn default() -> Self {
        Self {
            popular_fragments: strings(&[
                "Kapitalbank",
                "Hamkorbank",
                "Ipak Yuli",
                "Milliy bank",
                "Sanoatqurilishbank",
            ]),
            popular_count: 3,
            deviant_count: 3,
            mock_bank_names: strings(&[
                "Kapitalbank",
                "Hamkorbank",
                "Ipak Yuli Bank",
                "OFB",
                "SQB",
                "Asaka Bank",
            ]),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
}

impl EndpointConfig {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BankUzConfig {
    pub savings_url: String,
    pub currency_savings_url: String,
    pub currency_savings_pages: u32,
    pub gold_bars_url: String,
}

impl Default for BankUzConfig {
    fn default() -> Self {
        Self {
            savings_url: "https://bank.uz/uz/deposits/sumovye-vklady".to_string(),
            currency_savings_url: "https://bank.uz/uz/deposits/valyutnye-vklady".to_string(),
            currency_savings_pages: 5,
            gold_bars_url: "https://bank.uz/uz/gold-bars".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub cbu: EndpointConfig,
    pub bank_uz: BankUzConfig,
    pub polygon: EndpointConfig,
    pub iqair: EndpointConfig,
    pub worldnews: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            cbu: EndpointConfig::new("https://cbu.uz"),
            bank_uz: BankUzConfig::default(),
            polygon: EndpointConfig::new("https://api.polygon.io"),
            iqair: EndpointConfig::new("https://api.airvisual.com"),
            worldnews: EndpointConfig::new("https://api.worldnewsapi.com"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    pub default_category: NewsCategory,
    pub language: String,
}

/// Where a press page hides the publication date of a link.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateStyle {
    /// `14 Mar 2025` in or right after the link text.
    DayMonthYear,
    /// `/2025/03/14/` in the link itself.
    UrlPath,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PressSource {
    pub name: String,
    pub url: String,
    /// Prefix for relative links, e.g. `https://cbu.uz`.
    pub origin: String,
    pub href_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// Minimum number of `/` in the href, to skip listing pages.
    #[serde(default)]
    pub min_depth: usize,
    #[serde(default = "default_min_title_len")]
    pub min_title_len: usize,
    pub category: NewsCategory,
    pub summary_prefix: Option<String>,
    pub date_style: DateStyle,
    pub limit: usize,
}

fn default_min_title_len() -> usize {
    15
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CategoryKeywords {
    pub category: NewsCategory,
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceReliability {
    pub source: String,
    pub tier: String,
    pub score: f64,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NewsConfig {
    pub feeds: Vec<FeedSource>,
    pub press: Vec<PressSource>,
    pub per_feed_limit: usize,
    pub top_n: usize,
    /// Scanned in order; the first category with a keyword hit wins.
    pub categories: Vec<CategoryKeywords>,
    pub reliability: Vec<SourceReliability>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feeds: vec![
                feed("Gazeta.uz", "https://www.gazeta.uz/en/rss/", NewsCategory::General, "EN"),
                feed("Kapital.uz", "https://kapital.uz/feed/", NewsCategory::Business, "RU"),
                feed("UzDaily", "https://uzdaily.uz/en/rss", NewsCategory::Business, "EN"),
                feed("Spot.uz", "https://www.spot.uz/rss", NewsCategory::Business, "RU"),
                feed("Spot.uz", "https://www.spot.uz/oz/rss/", NewsCategory::Business, "UZ"),
            ],
            press: vec![
                PressSource {
                    name: "CBU".to_string(),
                    url: "https://cbu.uz/en/press_center/news/".to_string(),
                    origin: "https://cbu.uz".to_string(),
                    href_patterns: strings(&["/en/press_center/news/"]),
                    exclude_patterns: strings(&["?PAGEN"]),
                    min_depth: 5,
                    min_title_len: 10,
                    category: NewsCategory::Banking,
                    summary_prefix: None,
                    date_style: DateStyle::DayMonthYear,
                    limit: 10,
                },
                PressSource {
                    name: "IMF".to_string(),
                    url: "https://www.imf.org/en/Countries/UZB".to_string(),
                    origin: "https://www.imf.org".to_string(),
                    href_patterns: strings(&["/news/", "/publications/"]),
                    exclude_patterns: strings(&["Countries/UZB"]),
                    min_depth: 0,
                    min_title_len: default_min_title_len(),
                    category: NewsCategory::Economy,
                    summary_prefix: Some("IMF report on Uzbekistan: ".to_string()),
                    date_style: DateStyle::UrlPath,
                    limit: 5,
                },
                PressSource {
                    name: "World Bank".to_string(),
                    url: "https://www.worldbank.org/en/country/uzbekistan".to_string(),
                    origin: "https://www.worldbank.org".to_string(),
                    href_patterns: strings(&["/news/", "/feature/", "/story/"]),
                    exclude_patterns: Vec::new(),
                    min_depth: 0,
                    min_title_len: default_min_title_len(),
                    category: NewsCategory::Economy,
                    summary_prefix: Some("World Bank report on Uzbekistan: ".to_string()),
                    date_style: DateStyle::UrlPath,
                    limit: 5,
                },
            ],
            per_feed_limit: 10,
            top_n: 60,
            categories: default_categories(),
            reliability: vec![
                reliability("CBU", "official", 1.0, Some("OFFICIAL")),
                reliability("IMF", "official", 1.0, Some("OFFICIAL")),
                reliability("World Bank", "official", 1.0, Some("OFFICIAL")),
                reliability("Gazeta.uz", "verified", 0.8, Some("VERIFIED")),
                reliability("Kapital.uz", "verified", 0.8, Some("VERIFIED")),
                reliability("UzDaily", "verified", 0.8, Some("VERIFIED")),
                reliability("Spot.uz", "verified", 0.8, Some("VERIFIED")),
                reliability("WorldNews", "aggregator", 0.3, Some("AGGREGATOR")),
            ],
        }
    }
}

fn feed(name: &str, url: &str, default_category: NewsCategory, language: &str) -> FeedSource {
    FeedSource {
        name: name.to_string(),
        url: url.to_string(),
        default_category,
        language: language.to_string(),
    }
}

fn reliability(source: &str, tier: &str, score: f64, label: Option<&str>) -> SourceReliability {
    SourceReliability {
        source: source.to_string(),
        tier: tier.to_string(),
        score,
        label: label.map(str::to_string),
    }
}

fn default_categories() -> Vec<CategoryKeywords> {
    let table: [(NewsCategory, &[&str]); 5] = [
        (
            NewsCategory::Economy,
            &[
                "gdp", "inflation", "cpi", "fiscal", "budget", "imf", "world bank", "adb",
                "growth", "tax", "reform", "debt", "ввп", "инфляция", "бюджет", "мвф",
                "всемирный банк", "рост", "налог", "реформа", "долг", "экономика",
            ],
        ),
        (
            NewsCategory::Banking,
            &[
                "cbu", "central bank", "deposit", "loan", "interest rate", "mortgage", "atm",
                "visa", "mastercard", "fintech", "цб", "центробанк", "банк", "вклад", "кредит",
                "ставка", "ипотека", "банкомат", "финтех",
            ],
        ),
        (
            NewsCategory::Markets,
            &[
                "stock", "exchange", "uzse", "ipo", "dividend", "commodity", "gold", "silver",
                "oil", "gas", "bitcoin", "crypto", "биржа", "акции", "рфб", "дивиденд", "сырье",
                "золото", "серебро", "нефть", "газ", "биткоин", "крипто", "рынок",
            ],
        ),
        (
            NewsCategory::Business,
            &[
                "startup", "investment", "profit", "revenue", "merger", "acquisition", "export",
                "import", "trade", "company", "стартап", "инвестиции", "прибыль", "выручка",
                "слияние", "поглощение", "экспорт", "импорт", "торговля", "компания", "бизнес",
            ],
        ),
        (
            NewsCategory::Regulation,
            &[
                "law", "decree", "president", "parliament", "cabinet", "policy", "rule",
                "license", "ban", "permit", "закон", "указ", "президент", "парламент", "кабмин",
                "политика", "правило", "лицензия", "запрет", "разрешение",
            ],
        ),
    ];
    table
        .into_iter()
        .map(|(category, keywords)| CategoryKeywords {
            category,
            keywords: strings(keywords),
        })
        .collect()
}

/// Freshness windows, in seconds, per cached category.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WindowsConfig {
    pub weather_secs: u64,
    pub savings_secs: u64,
    pub metals_secs: u64,
    pub reliability_secs: u64,
    pub news_secs: u64,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            weather_secs: 3600,
            savings_secs: 86_400,
            metals_secs: 86_400,
            reliability_secs: 86_400,
            news_secs: 1800,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotifyConfig {
    pub title: String,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            title: "NeoUZS Rate Alert".to_string(),
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub fetch: FetchConfig,
    pub currencies: Vec<CurrencyConfig>,
    pub featured: FeaturedConfig,
    pub providers: ProvidersConfig,
    pub news: NewsConfig,
    pub windows: WindowsConfig,
    pub notify: NotifyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("public/rates.json"),
            fetch: FetchConfig::default(),
            currencies: default_currencies(),
            featured: FeaturedConfig::default(),
            providers: ProvidersConfig::default(),
            news: NewsConfig::default(),
            windows: WindowsConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Explicit path, else the platform config file if present, else defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_path(path);
        }
        match Self::default_config_path() {
            Ok(path) if path.exists() => Self::load_from_path(&path),
            _ => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("uz", "neouzs", "neouzs")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn currency(&self, code: &str) -> Option<&CurrencyConfig> {
        self.currencies
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }
}

/// API keys and push credentials. Each is optional; a missing key makes the
/// matching producer keep its cached value.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub iqair_api_key: Option<String>,
    pub polygon_api_key: Option<String>,
    pub worldnews_api_key: Option<String>,
    pub push_credentials: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            iqair_api_key: env_var("IQAIR_API_KEY"),
            polygon_api_key: env_var("POLYGON_API_KEY"),
            worldnews_api_key: env_var("WORLDNEWS_API_KEY"),
            push_credentials: env_var("PUSH_CREDENTIALS"),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
