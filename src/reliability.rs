//! Composite bank reliability scores from a static quarterly ranking.

use chrono::Datelike;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::clock::LocalTime;
use crate::core::snapshot::Stamp;
use crate::lookup::bank_logo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankCategory {
    Large,
    Small,
}

impl RankCategory {
    fn size(self) -> i32 {
        match self {
            RankCategory::Large => 14,
            RankCategory::Small => 15,
        }
    }

    fn top_score(self) -> f64 {
        match self {
            RankCategory::Large => 100.0,
            RankCategory::Small => 95.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BankType {
    StateOwned,
    Private,
    Foreign,
}

struct Ranked {
    name: &'static str,
    rank: i32,
    change: i32,
    category: RankCategory,
    bank_type: BankType,
    license_year: i32,
}

const fn ranked(
    name: &'static str,
    rank: i32,
    change: i32,
    category: RankCategory,
    bank_type: BankType,
    license_year: i32,
) -> Ranked {
    Ranked {
        name,
        rank,
        change,
        category,
        bank_type,
        license_year,
    }
}

use BankType::{Foreign, Private, StateOwned};
use RankCategory::{Large, Small};

/// CERR Q3 2025 rankings with type and licence year per bank.
const RANKING: &[Ranked] = &[
    ranked("Kapitalbank", 1, 0, Large, Private, 2001),
    ranked("Trust Bank", 2, 0, Large, Private, 1994),
    ranked("Hamkorbank", 3, 0, Large, Private, 1991),
    ranked("Asia Alliance Bank", 4, 0, Large, Private, 2009),
    ranked("Ipak Yuli Bank", 5, 2, Large, Private, 1990),
    ranked("Infinbank", 6, 1, Large, Private, 2007),
    ranked("Davr Bank", 7, 1, Large, Private, 2001),
    ranked("Orient Finance Bank", 8, 1, Large, Private, 2010),
    ranked("Ipoteka Bank", 9, 1, Large, Foreign, 2005),
    ranked("Asaka Bank", 10, 1, Large, StateOwned, 1995),
    ranked("National Bank of Uzbekistan", 11, 2, Large, StateOwned, 1991),
    ranked("Xalq Bank", 12, -3, Large, StateOwned, 1995),
    ranked("Tenge Bank", 13, -2, Large, Foreign, 2019),
    ranked("BRB Bank", 14, 0, Large, Private, 2008),
    ranked("Universal Bank", 1, 0, Small, Private, 2010),
    ranked("TBC Bank", 2, 1, Small, Foreign, 2020),
    ranked("Ziraat Bank", 3, 0, Small, Foreign, 1993),
    ranked("KDB Bank", 4, 0, Small, Foreign, 1997),
    ranked("Ravnaq Bank", 5, 0, Small, Private, 2010),
    ranked("Iran Saderat Bank", 6, 2, Small, Foreign, 2009),
    ranked("AVO Bank", 7, 2, Small, Foreign, 2020),
    ranked("Turkiston Bank", 8, 0, Small, Foreign, 2009),
    ranked("Agrobank", 9, 0, Small, StateOwned, 2009),
    ranked("Microcreditbank", 10, 0, Small, StateOwned, 2006),
    ranked("Uzpromstroybank", 11, 0, Small, StateOwned, 1922),
    ranked("Aloqa Bank", 12, -1, Small, StateOwned, 1994),
    ranked("Turon Bank", 13, -1, Small, StateOwned, 1990),
    ranked("Madat Invest Bank", 14, -2, Small, Private, 2019),
    ranked("Invest Finance Bank", 15, -1, Small, Private, 2011),
];

pub const INDICATORS: [(&str, &str); 6] = [
    ("financial_intermediation", "Financial Intermediation"),
    ("financial_accessibility", "Financial Accessibility"),
    ("asset_quality", "Asset Quality"),
    ("profitability", "Profitability"),
    ("management_efficiency", "Management Efficiency"),
    ("liquidity", "Liquidity"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub cerr_ranking: f64,
    pub bank_age: f64,
    pub indicators: f64,
    pub bank_type: f64,
    pub trend: f64,
}

pub const WEIGHTS: ScoringWeights = ScoringWeights {
    cerr_ranking: 0.35,
    bank_age: 0.20,
    indicators: 0.20,
    bank_type: 0.15,
    trend: 0.10,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankReliability {
    pub name: String,
    pub score: u32,
    pub tier: String,
    pub tier_label: String,
    pub tier_color: String,
    pub bank_type: BankType,
    pub license_year: i32,
    pub cerr_rank: i32,
    pub cerr_category: RankCategory,
    pub rank_change: i32,
    pub indicators: BTreeMap<String, u32>,
    pub logo: String,
    pub overall_rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityBlock {
    #[serde(flatten)]
    pub stamp: Stamp,
    pub data_sources: BTreeMap<String, String>,
    pub scoring_weights: ScoringWeights,
    pub indicators_list: Vec<IndicatorInfo>,
    pub banks: Vec<BankReliability>,
}

fn age_score(age: i32) -> f64 {
    match age {
        a if a >= 30 => 100.0,
        a if a >= 20 => 85.0,
        a if a >= 15 => 75.0,
        a if a >= 10 => 65.0,
        a if a >= 5 => 50.0,
        _ => 30.0,
    }
}

fn type_score(bank_type: BankType) -> f64 {
    match bank_type {
        StateOwned => 90.0,
        Foreign => 80.0,
        Private => 70.0,
    }
}

fn ranking_score(bank: &Ranked) -> f64 {
    let top = bank.category.top_score();
    let step = (top - 40.0) / f64::from(bank.category.size() - 1);
    (top - f64::from(bank.rank - 1) * step).round()
}

fn trend_score(change: i32) -> f64 {
    match change {
        c if c >= 2 => 100.0,
        1 => 80.0,
        0 => 65.0,
        -1 => 45.0,
        _ => 25.0,
    }
}

/// Per-indicator scores around a rank-derived base, jittered by ±10 and
/// clamped to 20..=100.
fn indicator_scores<R: Rng>(bank: &Ranked, rng: &mut R) -> BTreeMap<String, u32> {
    let base = match bank.category {
        Large => 100 - bank.rank * 4,
        Small => 95 - bank.rank * 4,
    };
    INDICATORS
        .iter()
        .map(|(id, _)| {
            let score = (base + rng.gen_range(-10..=10)).clamp(20, 100);
            (id.to_string(), score as u32)
        })
        .collect()
}

pub fn tier_for(score: u32) -> (&'static str, &'static str, &'static str) {
    match score {
        90.. => ("A+", "Exceptional", "#10B981"),
        80..=89 => ("A", "Excellent", "#22C55E"),
        70..=79 => ("B+", "Very Good", "#84CC16"),
        60..=69 => ("B", "Good", "#EAB308"),
        _ => ("C", "Fair", "#F97316"),
    }
}

fn score_bank<R: Rng>(bank: &Ranked, year: i32, rng: &mut R) -> BankReliability {
    let indicators = indicator_scores(bank, rng);
    let indicator_avg =
        indicators.values().map(|v| f64::from(*v)).sum::<f64>() / indicators.len() as f64;
    let composite = ranking_score(bank) * WEIGHTS.cerr_ranking
        + age_score(year - bank.license_year) * WEIGHTS.bank_age
        + indicator_avg * WEIGHTS.indicators
        + type_score(bank.bank_type) * WEIGHTS.bank_type
        + trend_score(bank.change) * WEIGHTS.trend;
    let score = composite.round().clamp(0.0, 100.0) as u32;
    let (tier, label, color) = tier_for(score);

    BankReliability {
        name: bank.name.to_string(),
        score,
        tier: tier.to_string(),
        tier_label: label.to_string(),
        tier_color: color.to_string(),
        bank_type: bank.bank_type,
        license_year: bank.license_year,
        cerr_rank: bank.rank,
        cerr_category: bank.category,
        rank_change: bank.change,
        indicators,
        logo: bank_logo(bank.name),
        overall_rank: 0,
    }
}

/// Scores every ranked bank, sorted by score descending with `overall_rank`
/// starting at 1.
pub fn build_reliability<R: Rng>(now: &LocalTime, rng: &mut R) -> ReliabilityBlock {
    let year = now.today().year();
    let mut banks: Vec<BankReliability> =
        RANKING.iter().map(|b| score_bank(b, year, rng)).collect();
    banks.sort_by(|a, b| b.score.cmp(&a.score));
    for (i, bank) in banks.iter_mut().enumerate() {
        bank.overall_rank = i + 1;
    }

    ReliabilityBlock {
        stamp: Stamp::at(now),
        data_sources: BTreeMap::from([
            (
                "cbu".to_string(),
                "https://cbu.uz/en/credit-organizations/banks/head-offices/".to_string(),
            ),
            ("cerr".to_string(), "https://cerr.uz".to_string()),
        ]),
        scoring_weights: WEIGHTS,
        indicators_list: INDICATORS
            .iter()
            .map(|(id, name)| IndicatorInfo {
                id: id.to_string(),
                name: name.to_string(),
            })
            .collect(),
        banks,
    }
}
