use chrono::NaiveDate;
use neouzs::core::LocalTime;
use neouzs::core::config::{AppConfig, Credentials};
use neouzs::core::snapshot::{DEFAULT_KEYS, Snapshot};
use neouzs::notify::AlertKind;
use neouzs::pipeline::run_scrape;
use neouzs::store::SnapshotStore;
use neouzs::{AppCommand, Scope, ScrapeOptions};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const CBU: &str = r#"[
        {"id": 69, "Code": "840", "Ccy": "USD", "Rate": "12850.55", "Date": "20.03.2025"},
        {"id": 21, "Code": "978", "Ccy": "EUR", "Rate": "13990.10", "Date": "20.03.2025"}
    ]"#;

    pub const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Gazeta.uz</title>
  <item>
    <title>Central bank keeps policy rate at 13.5%</title>
    <link>https://www.gazeta.uz/en/2025/03/19/rate/</link>
    <pubDate>Wed, 19 Mar 2025 10:00:00 +0500</pubDate>
    <description>The CBU left the key rate unchanged.</description>
  </item>
  <item>
    <title>New export deals signed in Tashkent</title>
    <link>https://www.gazeta.uz/en/2025/03/18/export/</link>
    <pubDate>Tue, 18 Mar 2025 09:00:00 +0500</pubDate>
    <description>Trade agreements worth $2bn.</description>
  </item>
</channel></rss>"#;

    fn bank_row(name: &str, rate: &str) -> String {
        format!(
            r#"<div class="bc-inner-block-left-texts"><img src="/logo.png"><a href="/bank">{name}</a><span class="green-date">{rate}</span></div>"#
        )
    }

    /// A comparison page with one table pair, banks listed best first.
    pub fn bank_page(rows: &[(&str, &str, &str)]) -> String {
        let buy: String = rows.iter().map(|(n, b, _)| bank_row(n, b)).collect();
        let sell: String = rows.iter().map(|(n, _, s)| bank_row(n, s)).collect();
        format!(
            r#"<html><body><div class="bc-inner-block"><div class="bc-inner-block-left">{buy}</div><div class="bc-inner-blocks-right">{sell}</div></div></body></html>"#
        )
    }

    pub async fn create_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/common/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CBU))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/en/arkhiv-kursov-valyut/json/all/\d{4}-\d{2}-\d{2}/$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CBU))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/currency/usd"))
            .respond_with(ResponseTemplate::new(200).set_body_string(bank_page(&[
                ("Kapitalbank", "12 800 so'm", "12 900 so'm"),
                ("Hamkorbank", "12 790 so'm", "12 880 so'm"),
                ("Aloqabank", "12 780 so'm", "12 850 so'm"),
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Every provider points at `uri`; unmounted routes answer 404.
    pub fn config_yaml(uri: &str, store: &std::path::Path) -> String {
        format!(
            r#"
store_path: "{store}"
fetch:
  max_retries: 1
  retry_delay_ms: 0
  history_pacing_ms: 0
  task_deadline_secs: 30
currencies:
  - code: "USD"
    bank_page_url: "{uri}/currency/usd"
    fallback_rate: 12800.0
    mock_variance: [20, 80]
    alert_threshold: 50.0
providers:
  cbu:
    base_url: "{uri}"
  bank_uz:
    savings_url: "{uri}/deposits/uzs"
    currency_savings_url: "{uri}/deposits/fx"
    currency_savings_pages: 2
    gold_bars_url: "{uri}/gold-bars"
  polygon:
    base_url: "{uri}"
  iqair:
    base_url: "{uri}"
  worldnews:
    base_url: "{uri}"
news:
  feeds:
    - name: "Gazeta.uz"
      url: "{uri}/rss"
      default_category: general
      language: "EN"
  press: []
"#,
            store = store.display()
        )
    }
}

fn write_config(dir: &TempDir, uri: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let store = dir.path().join("public").join("rates.json");
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, test_utils::config_yaml(uri, &store))
        .expect("Failed to write config file");
    (config_path, store)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("Failed to read snapshot"))
        .expect("Snapshot is not JSON")
}

fn now() -> LocalTime {
    LocalTime::at(NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(), 10, 0).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_full_scrape_flow_with_mock() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = TempDir::new().unwrap();
    let (config_path, store) = write_config(&dir, &mock_server.uri());

    let result = neouzs::run_command(
        AppCommand::Scrape(ScrapeOptions::default()),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Scrape failed with: {:?}", result.err());

    let snapshot = read_json(&store);
    info!(usd = %snapshot["usd"], "Stored currency block");

    let usd = &snapshot["usd"];
    assert_eq!(usd["cbu"], json!(12850.55));
    assert!(usd["cbu_last_updated"].is_string());
    let history = usd["history"].as_array().unwrap();
    assert_eq!(history.len(), 30);
    assert!(history.iter().all(|p| p["rate"] == json!(12850.55)));

    let banks = usd["banks"].as_array().unwrap();
    assert_eq!(banks.len(), 3);
    assert!(banks.iter().all(|b| b["is_mock"] == json!(false)));
    assert!(banks.iter().any(|b| b["featured"] == json!(true)));

    for key in DEFAULT_KEYS {
        assert!(snapshot.get(key).is_some(), "missing key {key}");
    }
    assert!(snapshot["last_updated"].is_string());
}

#[test_log::test(tokio::test)]
async fn test_news_scope_writes_partial_output() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = TempDir::new().unwrap();
    let (config_path, store) = write_config(&dir, &mock_server.uri());
    let partial = dir.path().join("news.json");

    let result = neouzs::run_command(
        AppCommand::Scrape(ScrapeOptions {
            scope: Scope::News,
            output: Some(partial.clone()),
            ..ScrapeOptions::default()
        }),
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Scrape failed with: {:?}", result.err());

    assert!(!store.exists());
    let written = read_json(&partial);
    let items = written["news"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["title"], json!("Central bank keeps policy rate at 13.5%"));
    assert_eq!(items[0]["category"], json!("Banking"));
    assert_eq!(items[1]["category"], json!("Business"));
    assert_eq!(items[0]["reliability_tier"], json!("verified"));
    assert!(written.get("usd").is_none());

    // The partial is later folded into the main store.
    let result = neouzs::run_command(
        AppCommand::Merge {
            base: None,
            inputs: vec![partial, dir.path().join("missing.json")],
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Merge failed with: {:?}", result.err());
    let merged = read_json(&store);
    assert_eq!(merged["news"]["items"].as_array().unwrap().len(), 2);
    assert!(merged["last_updated"].is_string());
}

#[test_log::test(tokio::test)]
async fn test_rate_moves_trigger_one_push() {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    let mock_server = test_utils::create_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/push"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (config_path, store) = write_config(&dir, &mock_server.uri());
    let config = AppConfig::load_from_path(&config_path).unwrap();

    // Today's official rate is already stored, so only bank quotes refresh.
    let prev = Snapshot::from_value(json!({
        "usd": {
            "cbu": 12850.55,
            "cbu_last_updated": "2025-03-20",
            "history": [{"date": "2025-03-20", "rate": 12850.55}],
            "banks": [{"name": "Kapitalbank", "buy": 12700.0, "sell": 12950.0}]
        }
    }))
    .unwrap();
    SnapshotStore::new(&store).save(&prev).unwrap();

    let credentials = Credentials {
        push_credentials: Some(
            json!({"endpoint": format!("{}/push", mock_server.uri()), "token": "secret"}).to_string(),
        ),
        ..Credentials::default()
    };
    let report = run_scrape(&config, &credentials, &ScrapeOptions::default(), now())
        .await
        .unwrap();

    let kinds: Vec<AlertKind> = report.alerts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AlertKind::BuyRateUp, AlertKind::SellRateDown]);
    assert_eq!(report.alerts[0].new, 12800.0);
    assert_eq!(report.alerts[1].new, 12850.0);

    let saved = read_json(&store);
    assert_eq!(saved["usd"]["history"].as_array().unwrap().len(), 1);
    assert_eq!(saved["usd"]["banks"].as_array().unwrap().len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_corrupt_store_fails_the_run() {
    let mock_server = test_utils::create_mock_server().await;
    let dir = TempDir::new().unwrap();
    let (config_path, store) = write_config(&dir, &mock_server.uri());
    fs::create_dir_all(store.parent().unwrap()).unwrap();
    fs::write(&store, "{ not json").unwrap();

    let result = neouzs::run_command(
        AppCommand::Scrape(ScrapeOptions::default()),
        Some(config_path.to_str().unwrap()),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(&store).unwrap(), "{ not json");
}
