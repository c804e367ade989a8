//! Risk scoring against a trained classifier

use crate::classifier::ClassifierModel;
use crate::config::ScoringConfig;
use crate::error::{Error, Result};
use crate::models::{FeatureVector, RiskAssessment, RiskTier};

/// Map a probability to its tier
pub fn tier_for(probability: f64, config: &ScoringConfig) -> RiskTier {
    if probability >= config.high_threshold {
        RiskTier::High
    } else if probability >= config.medium_threshold {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Build an assessment from a raw model probability
pub fn assessment_for(probability: f64, config: &ScoringConfig) -> RiskAssessment {
    // Guard against out-of-range output from third-party models
    let probability = if probability.is_nan() {
        0.5
    } else {
        probability.clamp(0.0, 1.0)
    };

    RiskAssessment {
        probability,
        tier: tier_for(probability, config),
        is_suspicious: probability > config.suspicious_threshold,
        confidence: (probability - 0.5).abs() * 2.0,
    }
}

/// Score a feature vector with the given model
///
/// Returns `ModelNotTrained` when no model is available.
pub fn score(
    model: Option<&dyn ClassifierModel>,
    features: &FeatureVector,
    config: &ScoringConfig,
) -> Result<RiskAssessment> {
    let model = model.ok_or(Error::ModelNotTrained)?;
    Ok(assessment_for(model.predict(features), config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FEATURE_COUNT;
    use crate::test_utils::FixedClassifier;

    fn features() -> FeatureVector {
        FeatureVector::from_values([0.5; FEATURE_COUNT]).unwrap()
    }

    #[test]
    fn test_tier_boundaries() {
        let config = ScoringConfig::default();
        assert_eq!(tier_for(0.0, &config), RiskTier::Low);
        assert_eq!(tier_for(0.2999, &config), RiskTier::Low);
        assert_eq!(tier_for(0.3, &config), RiskTier::Medium);
        assert_eq!(tier_for(0.6999, &config), RiskTier::Medium);
        assert_eq!(tier_for(0.7, &config), RiskTier::High);
        assert_eq!(tier_for(1.0, &config), RiskTier::High);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ScoringConfig {
            high_threshold: 0.9,
            medium_threshold: 0.5,
            suspicious_threshold: 0.8,
        };
        assert_eq!(tier_for(0.85, &config), RiskTier::Medium);
        assert!(!assessment_for(0.75, &config).is_suspicious);
    }

    #[test]
    fn test_score_without_model() {
        let result = score(None, &features(), &ScoringConfig::default());
        assert!(matches!(result, Err(Error::ModelNotTrained)));
    }

    #[test]
    fn test_score_with_model() {
        let model = FixedClassifier(0.82);
        let model: &dyn ClassifierModel = &model;
        let a = score(Some(model), &features(), &ScoringConfig::default()).unwrap();
        assert_eq!(a.tier, RiskTier::High);
        assert!(a.is_suspicious);
        assert!((a.percent() - 82.0).abs() < 1e-9);
        assert!((a.confidence - 0.64).abs() < 1e-9);
    }

    #[test]
    fn test_suspicious_strictly_above_threshold() {
        let config = ScoringConfig::default();
        assert!(!assessment_for(0.5, &config).is_suspicious);
        assert!(assessment_for(0.5001, &config).is_suspicious);
        assert!(!assessment_for(0.4999, &config).is_suspicious);
        assert_eq!(assessment_for(0.5, &config).confidence, 0.0);
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let config = ScoringConfig::default();
        assert_eq!(assessment_for(1.3, &config).probability, 1.0);
        assert_eq!(assessment_for(-0.2, &config).probability, 0.0);
        assert_eq!(assessment_for(f64::NAN, &config).probability, 0.5);
    }
}
