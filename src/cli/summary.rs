use super::ui;
use crate::core::currency::CurrencySnapshot;
use crate::notify::{AlertKind, RateAlert};
use crate::pipeline::RunReport;
use comfy_table::Cell;

fn currency_row(code: &str, snapshot: &CurrencySnapshot) -> Vec<Cell> {
    let is_mock = snapshot.banks.iter().any(|b| b.is_mock);
    vec![
        Cell::new(code),
        ui::format_optional_cell(snapshot.official_rate, |r| format!("{r:.2}")),
        ui::format_optional_cell(snapshot.official_rate_date, |d| d.to_string()),
        Cell::new(snapshot.banks.len()),
        ui::format_optional_cell(snapshot.best_buy(), |r| format!("{r:.2}")),
        ui::format_optional_cell(snapshot.best_sell(), |r| format!("{r:.2}")),
        if snapshot.banks.is_empty() {
            ui::na_cell()
        } else {
            ui::source_cell(is_mock)
        },
    ]
}

pub fn currencies_table(currencies: &[(String, CurrencySnapshot)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("CBU"),
        ui::header_cell("Date"),
        ui::header_cell("Banks"),
        ui::header_cell("Best buy"),
        ui::header_cell("Best sell"),
        ui::header_cell("Quotes"),
    ]);
    for (code, snapshot) in currencies {
        table.add_row(currency_row(code, snapshot));
    }
    table.to_string()
}

pub fn alerts_table(alerts: &[RateAlert]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Alert"),
        ui::header_cell("Old"),
        ui::header_cell("New"),
        ui::header_cell("Change"),
    ]);
    for alert in alerts {
        let kind = match alert.kind {
            AlertKind::BuyRateUp => "Buy up",
            AlertKind::SellRateDown => "Sell down",
        };
        table.add_row(vec![
            Cell::new(alert.currency.to_uppercase()),
            Cell::new(kind),
            Cell::new(format!("{:.2}", alert.old)),
            Cell::new(format!("{:.2}", alert.new)),
            ui::change_cell(alert.new - alert.old),
        ]);
    }
    table.to_string()
}

/// Text printed after a scrape run.
pub fn render(report: &RunReport) -> String {
    let mut output = format!(
        "Scrape ({})\n",
        ui::style_text(&report.scope.to_string(), ui::StyleType::Title)
    );

    if !report.currencies.is_empty() {
        output.push('\n');
        output.push_str(&currencies_table(&report.currencies));
        output.push('\n');
    }

    if !report.alerts.is_empty() {
        output.push_str(&format!(
            "\n{}\n",
            ui::style_text("Rate alerts", ui::StyleType::Warning)
        ));
        output.push_str(&alerts_table(&report.alerts));
        output.push('\n');
    }

    let updated = if report.updated.is_empty() {
        ui::style_text("nothing", ui::StyleType::Subtle)
    } else {
        report.updated.join(", ")
    };
    output.push_str(&format!(
        "\n{} {}\n{} {}",
        ui::style_text("Updated:", ui::StyleType::Label),
        updated,
        ui::style_text("Written to:", ui::StyleType::Label),
        ui::style_text(&report.destination.display().to_string(), ui::StyleType::Good),
    ));
    output
}

pub fn display(report: &RunReport) {
    println!("{}", render(report));
    ui::print_separator();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::BankQuote;
    use crate::pipeline::Scope;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn quote(name: &str, buy: f64, sell: f64, is_mock: bool) -> BankQuote {
        BankQuote {
            name: name.to_string(),
            buy,
            sell,
            logo_url: String::new(),
            is_mock,
            featured: false,
        }
    }

    fn report() -> RunReport {
        RunReport {
            scope: Scope::Exchange,
            currencies: vec![
                (
                    "USD".to_string(),
                    CurrencySnapshot {
                        official_rate: Some(12850.55),
                        official_rate_date: NaiveDate::from_ymd_opt(2025, 3, 20),
                        history: Vec::new(),
                        banks: vec![
                            quote("Kapitalbank", 12800.0, 12900.0, false),
                            quote("Hamkorbank", 12820.0, 12880.0, false),
                        ],
                    },
                ),
                (
                    "KZT".to_string(),
                    CurrencySnapshot {
                        official_rate: None,
                        official_rate_date: None,
                        history: Vec::new(),
                        banks: vec![quote("Mock Bank", 22.0, 25.0, true)],
                    },
                ),
            ],
            updated: vec!["usd".to_string(), "kzt".to_string()],
            alerts: vec![RateAlert {
                currency: "usd".to_string(),
                kind: AlertKind::BuyRateUp,
                old: 12760.0,
                new: 12820.0,
            }],
            destination: PathBuf::from("public/rates.json"),
        }
    }

    #[test]
    fn test_currency_table_contents() {
        let table = currencies_table(&report().currencies);
        assert!(table.contains("12850.55"));
        assert!(table.contains("2025-03-20"));
        assert!(table.contains("12820.00"));
        assert!(table.contains("12880.00"));
        assert!(table.contains("live"));
        assert!(table.contains("mock"));
        assert!(table.contains("N/A"));
    }

    #[test]
    fn test_render_includes_alerts_and_destination() {
        let text = render(&report());
        assert!(text.contains("exchange"));
        assert!(text.contains("Buy up"));
        assert!(text.contains("+60.00"));
        assert!(text.contains("usd, kzt"));
        assert!(text.contains("public/rates.json"));
    }

    #[test]
    fn test_render_without_output() {
        let text = render(&RunReport {
            scope: Scope::News,
            currencies: Vec::new(),
            updated: Vec::new(),
            alerts: Vec::new(),
            destination: PathBuf::from("out.json"),
        });
        assert!(!text.contains("Currency"));
        assert!(text.contains("nothing"));
    }
}
