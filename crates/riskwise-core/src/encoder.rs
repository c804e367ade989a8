//! Feature encoding
//!
//! Maps raw transaction attributes to the six normalized risk features:
//! - amount: spending as a fraction of the income bracket's monthly ceiling
//! - income: fixed lookup per bracket
//! - time: jittered band per hour of day (seedable)
//! - location: metro vs non-metro
//! - merchant: averaged category weights with combination penalties
//! - payment: fixed lookup per payment mode

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::models::{
    FeatureVector, IncomeLevel, PaymentMode, RawTransactionAttributes, FEATURE_COUNT,
};
use crate::risk::FEATURE_WEIGHTS;

/// Default risk for unknown lookups
pub const UNKNOWN_RISK: f64 = 0.5;

/// Major metropolitan areas (lower location risk)
pub const METRO_CITIES: &[&str] = &[
    "mumbai",
    "delhi",
    "bangalore",
    "hyderabad",
    "chennai",
    "kolkata",
];

/// Per-tag merchant risk weights
const MERCHANT_RISK: &[(&str, f64)] = &[
    // Essential
    ("groceries", 0.2),
    ("utilities", 0.3),
    ("medical", 0.3),
    ("education", 0.3),
    ("rent", 0.3),
    // Shopping
    ("electronics", 0.6),
    ("fashion", 0.5),
    ("furniture", 0.5),
    ("beauty", 0.4),
    ("jewelry", 0.8),
    // Services
    ("travel", 0.6),
    ("entertainment", 0.5),
    ("dining", 0.4),
    ("salon", 0.4),
    ("repair", 0.5),
    // Financial
    ("investment", 0.8),
    ("insurance", 0.6),
    ("transfer", 0.7),
    ("loan", 0.7),
    ("crypto", 0.9),
    // Business
    ("b2b", 0.7),
    ("wholesale", 0.7),
    ("software", 0.6),
    ("consulting", 0.6),
    ("marketing", 0.6),
];

/// Tags that count as financial/high-value for the mixing bonus
const FINANCIAL_TAGS: &[&str] = &["investment", "crypto", "transfer", "loan"];

/// Tags that count as luxury for the mixing bonus
const LUXURY_TAGS: &[&str] = &["jewelry", "electronics"];

const MULTI_CATEGORY_PENALTY: f64 = 0.15;
const FINANCIAL_LUXURY_BONUS: f64 = 0.2;

/// Monthly income ceiling used to express an amount as a spending ratio
pub fn monthly_ceiling(income: IncomeLevel) -> f64 {
    match income {
        IncomeLevel::Low => 25_000.0,
        IncomeLevel::Middle => 50_000.0,
        IncomeLevel::Upper => 100_000.0,
    }
}

/// Piecewise-linear risk for a spending ratio.
///
/// 0-20% of income maps to 0.0-0.3, 20-40% to 0.3-0.7, and anything above
/// 40% climbs from 0.7 towards 1.0 (reached at 100%).
pub fn amount_risk_for_ratio(ratio: f64) -> f64 {
    let ratio = ratio.max(0.0);
    if ratio <= 0.2 {
        (ratio / 0.2) * 0.3
    } else if ratio <= 0.4 {
        0.3 + ((ratio - 0.2) / 0.2) * 0.4
    } else {
        (0.7 + ((ratio - 0.4) / 0.6) * 0.3).min(1.0)
    }
}

pub fn amount_risk(amount: f64, income: IncomeLevel) -> f64 {
    amount_risk_for_ratio(amount / monthly_ceiling(income))
}

pub fn income_risk(income: IncomeLevel) -> f64 {
    match income {
        IncomeLevel::Low => 0.8,
        IncomeLevel::Middle => 0.4,
        IncomeLevel::Upper => 0.2,
    }
}

/// Income risk for a free-form label; unknown labels get [`UNKNOWN_RISK`]
pub fn income_risk_for_label(label: &str) -> f64 {
    label
        .parse::<IncomeLevel>()
        .map(income_risk)
        .unwrap_or(UNKNOWN_RISK)
}

/// Hour-of-day risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBand {
    /// 22:00-05:59
    LateNight,
    /// 20:00-21:59
    Evening,
    /// 09:00-18:59
    BusinessHours,
    /// Everything else (early morning, early evening)
    OffPeak,
}

impl TimeBand {
    pub fn for_hour(hour: u8) -> Self {
        match hour {
            h if h >= 22 || h <= 5 => Self::LateNight,
            20 | 21 => Self::Evening,
            9..=18 => Self::BusinessHours,
            _ => Self::OffPeak,
        }
    }

    /// Half-open range the jittered risk is drawn from
    pub fn range(&self) -> std::ops::Range<f64> {
        match self {
            Self::LateNight => 0.7..0.9,
            Self::Evening => 0.4..0.7,
            Self::BusinessHours => 0.1..0.3,
            Self::OffPeak => 0.3..0.5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LateNight => "High risk hours (late night)",
            Self::Evening => "Medium risk hours (evening)",
            Self::BusinessHours => "Low risk hours (business hours)",
            Self::OffPeak => "Medium risk hours",
        }
    }
}

/// Time-of-day risk, jittered uniformly within the hour's band
pub fn time_risk<R: Rng + ?Sized>(hour: u8, rng: &mut R) -> f64 {
    rng.gen_range(TimeBand::for_hour(hour).range())
}

pub fn location_risk(location: &str) -> f64 {
    let location = location.trim().to_lowercase();
    if METRO_CITIES.contains(&location.as_str()) {
        0.3
    } else {
        0.7
    }
}

/// Risk weight for a single merchant tag
pub fn merchant_tag_risk(tag: &str) -> f64 {
    let tag = tag.trim().to_lowercase();
    MERCHANT_RISK
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, risk)| *risk)
        .unwrap_or(UNKNOWN_RISK)
}

/// Combined merchant risk for a tag set.
///
/// Tags are compared trimmed and lowercased, so repeats count once. Averages
/// the per-tag weights, scales by 15% per extra tag, and adds a flat bonus
/// when financial and luxury tags appear together.
pub fn merchant_risk<S: AsRef<str>>(tags: &[S]) -> f64 {
    let mut tags: Vec<String> = tags
        .iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .collect();
    tags.sort();
    tags.dedup();

    if tags.is_empty() {
        return UNKNOWN_RISK;
    }

    let count = tags.len() as f64;
    let average = tags.iter().map(|t| merchant_tag_risk(t)).sum::<f64>() / count;
    let multiplier = 1.0 + MULTI_CATEGORY_PENALTY * (count - 1.0);

    let has_tag_in = |set: &[&str]| tags.iter().any(|t| set.contains(&t.as_str()));
    let bonus = if has_tag_in(FINANCIAL_TAGS) && has_tag_in(LUXURY_TAGS) {
        FINANCIAL_LUXURY_BONUS
    } else {
        0.0
    };

    (average * multiplier + bonus).min(1.0)
}

pub fn payment_risk(mode: PaymentMode) -> f64 {
    match mode {
        PaymentMode::Upi => 0.3,
        PaymentMode::Debit => 0.4,
        PaymentMode::Credit => 0.6,
        PaymentMode::NetBanking => 0.5,
        PaymentMode::Wallet => 0.4,
    }
}

/// Payment risk for a free-form label; unknown labels get [`UNKNOWN_RISK`]
pub fn payment_risk_for_label(label: &str) -> f64 {
    label
        .parse::<PaymentMode>()
        .map(payment_risk)
        .unwrap_or(UNKNOWN_RISK)
}

/// Encode attributes into a feature vector, drawing time jitter from `rng`
pub fn encode<R: Rng + ?Sized>(
    attrs: &RawTransactionAttributes,
    rng: &mut R,
) -> Result<FeatureVector> {
    attrs.validate()?;

    let vector = FeatureVector::from_values([
        amount_risk(attrs.amount, attrs.income_level),
        income_risk(attrs.income_level),
        time_risk(attrs.hour, rng),
        location_risk(&attrs.location),
        merchant_risk(&attrs.merchant_types),
        payment_risk(attrs.payment_mode),
    ])?;

    trace!(features = %vector.to_log_entry(), "Encoded transaction");
    Ok(vector)
}

/// One feature's value and its share of the weighted base risk
#[derive(Debug, Clone, Serialize)]
pub struct FeatureContribution {
    pub name: &'static str,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// Per-feature explanation of an encoded vector
#[derive(Debug, Clone, Serialize)]
pub struct FeatureBreakdown {
    pub time_band: TimeBand,
    pub spending_ratio: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl FeatureBreakdown {
    pub fn new(attrs: &RawTransactionAttributes, features: &FeatureVector) -> Self {
        let contributions = features
            .named_values()
            .zip(FEATURE_WEIGHTS.iter())
            .map(|((name, value), weight)| FeatureContribution {
                name,
                value,
                weight: *weight,
                contribution: value * weight,
            })
            .collect::<Vec<_>>();
        debug_assert_eq!(contributions.len(), FEATURE_COUNT);

        Self {
            time_band: TimeBand::for_hour(attrs.hour),
            spending_ratio: attrs.amount / monthly_ceiling(attrs.income_level),
            contributions,
        }
    }

    /// The feature contributing most to the base risk
    pub fn dominant(&self) -> Option<&FeatureContribution> {
        self.contributions
            .iter()
            .max_by(|a, b| a.contribution.total_cmp(&b.contribution))
    }
}

/// Encoder that owns its jitter source
pub struct FeatureEncoder {
    rng: StdRng,
}

impl FeatureEncoder {
    /// Deterministic encoder for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn encode(&mut self, attrs: &RawTransactionAttributes) -> Result<FeatureVector> {
        encode(attrs, &mut self.rng)
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::from_entropy()
    }
}
