//! Per-currency refresh policy: reuse, refetch or fall back.

use chrono::NaiveDate;
use std::fmt::Display;
use tracing::{info, instrument, warn};

use crate::core::clock::LocalTime;
use crate::core::config::{CurrencyConfig, FeaturedConfig};
use crate::core::currency::{
    BankQuoteSource, CurrencySnapshot, HISTORY_CAP, HistoryPoint, OfficialRateProvider,
    upsert_history,
};
use crate::reconcile::mock_quotes;

/// Local hour from which today's official rate is expected to be published.
pub const PUBLICATION_HOUR: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// The stored rate is already today's.
    CachedToday,
    /// Too early for today's rate; keep yesterday's.
    PreOpenWindow,
    RefreshNeeded,
}

impl Display for RefreshDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RefreshDecision::CachedToday => "cached-today",
                RefreshDecision::PreOpenWindow => "pre-open",
                RefreshDecision::RefreshNeeded => "refresh",
            }
        )
    }
}

/// Reuse requires a stored rate. A stored date ahead of today (clock skew)
/// counts as today so the date never moves backwards.
pub fn decide(prev: Option<&CurrencySnapshot>, now: &LocalTime, force: bool) -> RefreshDecision {
    if force {
        return RefreshDecision::RefreshNeeded;
    }
    let Some(prev) = prev.filter(|p| p.official_rate.is_some()) else {
        return RefreshDecision::RefreshNeeded;
    };
    match prev.official_rate_date {
        Some(date) if date >= now.today() => RefreshDecision::CachedToday,
        _ if now.hour() < PUBLICATION_HOUR => RefreshDecision::PreOpenWindow,
        _ => RefreshDecision::RefreshNeeded,
    }
}

struct Official {
    rate: Option<f64>,
    date: Option<NaiveDate>,
    history: Vec<HistoryPoint>,
}

impl Official {
    fn from_snapshot(prev: &CurrencySnapshot) -> Self {
        Official {
            rate: prev.official_rate,
            date: prev.official_rate_date,
            history: prev.history.clone(),
        }
    }
}

pub struct CurrencyProcessor<'a> {
    rates: &'a dyn OfficialRateProvider,
    banks: &'a dyn BankQuoteSource,
    featured: &'a FeaturedConfig,
}

impl<'a> CurrencyProcessor<'a> {
    pub fn new(
        rates: &'a dyn OfficialRateProvider,
        banks: &'a dyn BankQuoteSource,
        featured: &'a FeaturedConfig,
    ) -> Self {
        Self {
            rates,
            banks,
            featured,
        }
    }

    /// Never fails: every missing piece degrades to the stored value, the
    /// configured fallback rate or mock quotes, flagged as such.
    #[instrument(name = "Currency", skip_all, fields(code = %currency.code))]
    pub async fn process(
        &self,
        currency: &CurrencyConfig,
        prev: Option<&CurrencySnapshot>,
        now: &LocalTime,
        force: bool,
    ) -> CurrencySnapshot {
        let decision = decide(prev, now, force);
        info!(%decision, "Official rate decision");

        let official = match (decision, prev) {
            (RefreshDecision::CachedToday | RefreshDecision::PreOpenWindow, Some(prev)) => {
                Official::from_snapshot(prev)
            }
            _ => self.refresh(currency, prev, now).await,
        };

        let reference = official.rate.unwrap_or(currency.fallback_rate);
        let banks = match self.banks.bank_quotes(currency, reference).await {
            Some(quotes) if !quotes.is_empty() => quotes,
            _ => {
                warn!(reference, "No live bank quotes, using mock quotes");
                mock_quotes(
                    currency,
                    reference,
                    &self.featured.mock_bank_names,
                    &mut rand::thread_rng(),
                )
            }
        };

        CurrencySnapshot {
            official_rate: official.rate,
            official_rate_date: official.date,
            history: official.history,
            banks,
        }
    }

    async fn refresh(
        &self,
        currency: &CurrencyConfig,
        prev: Option<&CurrencySnapshot>,
        now: &LocalTime,
    ) -> Official {
        let today = now.today();
        match self.rates.official_rate(&currency.code, None).await {
            Some(rate) => {
                let mut history = prev.map(|p| p.history.clone()).unwrap_or_default();
                if history.is_empty() {
                    history = self
                        .rates
                        .official_history(&currency.code, today, HISTORY_CAP as u32)
                        .await;
                }
                // A stored date ahead of the clock is kept; the date never moves back.
                let date = prev
                    .and_then(|p| p.official_rate_date)
                    .filter(|d| *d > today)
                    .unwrap_or(today);
                info!(rate, %date, "Accepted official rate");
                Official {
                    rate: Some(rate),
                    date: Some(date),
                    history: upsert_history(&history, HistoryPoint { date, rate }),
                }
            }
            None => match prev.filter(|p| p.official_rate.is_some()) {
                Some(prev) => {
                    warn!("Official rate unavailable, keeping stored rate");
                    Official::from_snapshot(prev)
                }
                None => {
                    warn!(
                        fallback = currency.fallback_rate,
                        "Official rate unavailable and nothing stored, using fallback rate"
                    );
                    Official {
                        rate: Some(currency.fallback_rate),
                        date: Some(today),
                        history: Vec::new(),
                    }
                }
            },
        }
    }
}
