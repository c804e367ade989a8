//! Domain models for Riskwise

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Income bracket of the account holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeLevel {
    /// Up to 25k monthly
    Low,
    /// 25k-50k monthly
    Middle,
    /// Above 50k monthly
    Upper,
}

impl IncomeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Middle => "middle",
            Self::Upper => "upper",
        }
    }

    pub fn all() -> &'static [IncomeLevel] {
        &[Self::Low, Self::Middle, Self::Upper]
    }
}

impl std::str::FromStr for IncomeLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "middle" | "mid" => Ok(Self::Middle),
            "upper" | "high" => Ok(Self::Upper),
            _ => Err(format!("Unknown income level: {}", s)),
        }
    }
}

impl std::fmt::Display for IncomeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment channel used for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    Upi,
    Debit,
    Credit,
    #[serde(rename = "netbanking")]
    NetBanking,
    Wallet,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upi => "upi",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::NetBanking => "netbanking",
            Self::Wallet => "wallet",
        }
    }

    pub fn all() -> &'static [PaymentMode] {
        &[
            Self::Upi,
            Self::Debit,
            Self::Credit,
            Self::NetBanking,
            Self::Wallet,
        ]
    }
}

impl std::str::FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upi" => Ok(Self::Upi),
            "debit" | "debit_card" => Ok(Self::Debit),
            "credit" | "credit_card" => Ok(Self::Credit),
            "netbanking" | "net_banking" => Ok(Self::NetBanking),
            "wallet" => Ok(Self::Wallet),
            _ => Err(format!("Unknown payment mode: {}", s)),
        }
    }
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw attributes of a single transaction, as collected from the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransactionAttributes {
    /// Transaction amount in currency units (must be positive)
    pub amount: f64,
    pub income_level: IncomeLevel,
    /// Hour of day, 0-23
    pub hour: u8,
    /// City name, or "other"
    pub location: String,
    /// Merchant category tags (e.g. "groceries", "crypto"); never empty
    pub merchant_types: Vec<String>,
    pub payment_mode: PaymentMode,
}

impl RawTransactionAttributes {
    pub fn new(
        amount: f64,
        income_level: IncomeLevel,
        hour: u8,
        location: impl Into<String>,
        merchant_types: Vec<String>,
        payment_mode: PaymentMode,
    ) -> Self {
        Self {
            amount,
            income_level,
            hour,
            location: location.into(),
            merchant_types,
            payment_mode,
        }
    }

    /// Check the attribute invariants
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAttributes(format!(
                "amount must be a positive number, got {}",
                self.amount
            )));
        }
        if self.hour > 23 {
            return Err(Error::InvalidAttributes(format!(
                "hour must be between 0 and 23, got {}",
                self.hour
            )));
        }
        if self.merchant_types.is_empty() {
            return Err(Error::InvalidAttributes(
                "at least one merchant type is required".to_string(),
            ));
        }
        if self.merchant_types.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::InvalidAttributes(
                "merchant types must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Number of features in a [`FeatureVector`]
pub const FEATURE_COUNT: usize = 6;

/// Feature names in vector order. Labeling and inference both rely on this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "amount_risk",
    "income_risk",
    "time_risk",
    "location_risk",
    "merchant_risk",
    "payment_risk",
];

/// Encoded risk features, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build a vector from raw values, rejecting anything outside [0, 1]
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        for (name, value) in FEATURE_NAMES.iter().zip(values.iter()) {
            if !value.is_finite() || !(0.0..=1.0).contains(value) {
                return Err(Error::InvalidAttributes(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(Self { values })
    }

    pub fn amount_risk(&self) -> f64 {
        self.values[0]
    }

    pub fn income_risk(&self) -> f64 {
        self.values[1]
    }

    pub fn time_risk(&self) -> f64 {
        self.values[2]
    }

    pub fn location_risk(&self) -> f64 {
        self.values[3]
    }

    pub fn merchant_risk(&self) -> f64 {
        self.values[4]
    }

    pub fn payment_risk(&self) -> f64 {
        self.values[5]
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// Feature name/value pairs in vector order
    pub fn named_values(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.named_values()
                .map(|(name, value)| (name.to_string(), serde_json::json!(value)))
                .collect(),
        )
    }
}

impl TryFrom<[f64; FEATURE_COUNT]> for FeatureVector {
    type Error = Error;

    fn try_from(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        Self::from_values(values)
    }
}

/// A feature vector with its generated ground-truth label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub features: FeatureVector,
    /// 1 = risky, 0 = normal
    pub label: u8,
    /// Composed risk before noise was applied
    pub composed_risk: f64,
}

/// Stage of a training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPhase {
    /// Synthesizing labeled samples
    Generating,
    /// Fitting the classifier
    Fitting,
}

impl TrainingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generating => "generating",
            Self::Fitting => "fitting",
        }
    }
}

impl std::fmt::Display for TrainingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress event emitted while training. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub phase: TrainingPhase,
    /// Fraction of the current phase completed (0.0-1.0)
    pub fraction_complete: f64,
    /// Training loss of the last epoch (0.0 while generating)
    pub current_loss: f64,
    /// Epochs finished so far
    pub epoch: usize,
    pub epochs: usize,
    pub validation_loss: Option<f64>,
    pub validation_accuracy: Option<f64>,
}

impl TrainingProgress {
    pub fn percent(&self) -> f64 {
        self.fraction_complete * 100.0
    }
}

/// Observable engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// No run has ever succeeded and none is active
    NeverTrained,
    /// A run is active (a previous model may still be serving)
    Training,
    /// A trained model is available and no run is active
    Trained,
}

impl EngineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeverTrained => "never_trained",
            Self::Training => "training",
            Self::Trained => "trained",
        }
    }
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a successful training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Classifier implementation name
    pub model: String,
    /// Number of generated samples
    pub samples: usize,
    /// Fraction of samples labeled risky
    pub positive_rate: f64,
    pub epochs: usize,
    pub final_loss: f64,
    pub validation_loss: Option<f64>,
    pub validation_accuracy: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Three-tier classification of a risk probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Human-readable assessment for this tier
    pub fn advice(&self) -> &'static str {
        match self {
            Self::High => "This transaction shows significant risk factors.",
            Self::Medium => "Exercise caution with this transaction.",
            Self::Low => "This transaction appears safe.",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scored result for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Model probability that the transaction is risky (0.0-1.0)
    pub probability: f64,
    pub tier: RiskTier,
    /// Whether the transaction should be flagged as suspicious
    pub is_suspicious: bool,
    /// Distance from the 0.5 decision point, scaled to 0.0-1.0
    pub confidence: f64,
}

impl RiskAssessment {
    /// Probability as a percentage (0-100)
    pub fn percent(&self) -> f64 {
        self.probability * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> RawTransactionAttributes {
        RawTransactionAttributes::new(
            1200.0,
            IncomeLevel::Middle,
            14,
            "mumbai",
            vec!["groceries".to_string()],
            PaymentMode::Upi,
        )
    }

    #[test]
    fn test_income_level_parse() {
        assert_eq!("low".parse::<IncomeLevel>().unwrap(), IncomeLevel::Low);
        assert_eq!("MIDDLE".parse::<IncomeLevel>().unwrap(), IncomeLevel::Middle);
        assert_eq!(" upper ".parse::<IncomeLevel>().unwrap(), IncomeLevel::Upper);
        assert!("rich".parse::<IncomeLevel>().is_err());
    }

    #[test]
    fn test_payment_mode_roundtrip_str() {
        for mode in PaymentMode::all() {
            assert_eq!(mode.as_str().parse::<PaymentMode>().unwrap(), *mode);
        }
        assert!("cheque".parse::<PaymentMode>().is_err());
    }

    #[test]
    fn test_payment_mode_serde_spelling() {
        let json = serde_json::to_string(&PaymentMode::NetBanking).unwrap();
        assert_eq!(json, "\"netbanking\"");
    }

    #[test]
    fn test_validate_accepts_valid() {
        assert!(attrs().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_amount() {
        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut a = attrs();
            a.amount = amount;
            assert!(matches!(a.validate(), Err(Error::InvalidAttributes(_))));
        }
    }

    #[test]
    fn test_validate_rejects_bad_hour() {
        let mut a = attrs();
        a.hour = 24;
        assert!(matches!(a.validate(), Err(Error::InvalidAttributes(_))));
    }

    #[test]
    fn test_validate_rejects_empty_merchants() {
        let mut a = attrs();
        a.merchant_types.clear();
        assert!(matches!(a.validate(), Err(Error::InvalidAttributes(_))));

        let mut a = attrs();
        a.merchant_types = vec!["  ".to_string()];
        assert!(matches!(a.validate(), Err(Error::InvalidAttributes(_))));
    }

    #[test]
    fn test_feature_vector_bounds() {
        assert!(FeatureVector::from_values([0.0, 0.5, 1.0, 0.3, 0.2, 0.1]).is_ok());
        assert!(FeatureVector::from_values([1.1, 0.5, 1.0, 0.3, 0.2, 0.1]).is_err());
        assert!(FeatureVector::from_values([0.1, -0.1, 1.0, 0.3, 0.2, 0.1]).is_err());
        assert!(FeatureVector::from_values([0.1, f64::NAN, 1.0, 0.3, 0.2, 0.1]).is_err());
    }

    #[test]
    fn test_feature_vector_order() {
        let v = FeatureVector::from_values([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        assert_eq!(v.amount_risk(), 0.1);
        assert_eq!(v.income_risk(), 0.2);
        assert_eq!(v.time_risk(), 0.3);
        assert_eq!(v.location_risk(), 0.4);
        assert_eq!(v.merchant_risk(), 0.5);
        assert_eq!(v.payment_risk(), 0.6);
        assert_eq!(v.get_by_name("merchant_risk"), Some(0.5));
        assert_eq!(v.get_by_name("unknown"), None);

        let entry = v.to_log_entry();
        assert_eq!(entry["payment_risk"], serde_json::json!(0.6));
    }

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::High > RiskTier::Medium);
        assert!(RiskTier::Medium > RiskTier::Low);
    }
}
