//! Rule-based risk composition
//!
//! Produces the ground-truth risk used to label synthetic training samples.
//! A weighted sum of the six features is scaled by a multiplier that grows
//! when correlated risk factors show up together. Inference never calls
//! into this module; the trained classifier approximates it.

use serde::Serialize;

use crate::models::{FeatureVector, FEATURE_COUNT};

/// Weights in feature order (amount, income, time, location, merchant, payment)
pub const FEATURE_WEIGHTS: [f64; FEATURE_COUNT] = [0.35, 0.25, 0.15, 0.10, 0.10, 0.05];

/// Composed risk above this is labeled risky
pub const LABEL_THRESHOLD: f64 = 0.7;

/// A feature above this counts towards the high-risk factor bonus
const HIGH_FACTOR_LEVEL: f64 = 0.5;
const HIGH_FACTOR_BONUS: f64 = 0.2;

/// A multiplier bonus applied when two features are jointly elevated
struct ComboRule {
    name: &'static str,
    bonus: f64,
    applies: fn(&FeatureVector) -> bool,
}

const COMBO_RULES: &[ComboRule] = &[
    ComboRule {
        name: "high_amount_for_income",
        bonus: 0.3,
        applies: |f| f.amount_risk() > 0.4 && f.income_risk() > 0.5,
    },
    ComboRule {
        name: "late_night_amount",
        bonus: 0.25,
        applies: |f| f.time_risk() > 0.6 && f.amount_risk() > 0.3,
    },
    ComboRule {
        name: "remote_location_amount",
        bonus: 0.2,
        applies: |f| f.location_risk() > 0.6 && f.amount_risk() > 0.4,
    },
    ComboRule {
        name: "unusual_payment_for_amount",
        bonus: 0.15,
        applies: |f| f.payment_risk() > 0.6 && f.amount_risk() > 0.5,
    },
];

/// Intermediate values of a risk composition
#[derive(Debug, Clone, Serialize)]
pub struct RiskComposition {
    /// Weighted sum of the features
    pub base: f64,
    /// Combination multiplier (>= 1.0)
    pub multiplier: f64,
    /// Names of the combination rules that fired
    pub triggered: Vec<&'static str>,
    /// Number of features above 0.5
    pub high_factors: usize,
    /// Final clamped risk
    pub risk: f64,
}

/// Compose a risk value with all intermediate terms
pub fn compose(features: &FeatureVector) -> RiskComposition {
    let base = features
        .as_array()
        .iter()
        .zip(FEATURE_WEIGHTS.iter())
        .map(|(value, weight)| value * weight)
        .sum::<f64>();

    let mut multiplier = 1.0;
    let mut triggered = Vec::new();
    for rule in COMBO_RULES {
        if (rule.applies)(features) {
            multiplier += rule.bonus;
            triggered.push(rule.name);
        }
    }

    let high_factors = features
        .as_array()
        .iter()
        .filter(|v| **v > HIGH_FACTOR_LEVEL)
        .count();
    if high_factors >= 2 {
        multiplier += HIGH_FACTOR_BONUS * (high_factors - 1) as f64;
    }

    RiskComposition {
        base,
        multiplier,
        triggered,
        high_factors,
        risk: (base * multiplier).clamp(0.0, 1.0),
    }
}

/// Ground-truth risk in [0, 1]
pub fn compose_risk(features: &FeatureVector) -> f64 {
    compose(features).risk
}

/// Binary label for a composed risk plus labeling noise
pub fn label_for(risk: f64, noise: f64) -> u8 {
    u8::from(risk + noise > LABEL_THRESHOLD)
}
