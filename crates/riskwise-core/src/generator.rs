//! Synthetic training data generation
//!
//! Draws raw transaction attributes from weighted population distributions,
//! encodes them, and labels each sample with the rule-based composed risk
//! plus a little noise. Samples can be produced in bounded chunks so callers
//! can report progress and stop early between chunks.

use std::io::Write;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::config::{GeneratorConfig, IncomePrior};
use crate::encoder;
use crate::error::{Error, Result};
use crate::models::{
    IncomeLevel, LabeledSample, PaymentMode, RawTransactionAttributes, FEATURE_NAMES,
};
use crate::risk;

/// Half-width of the uniform noise added before thresholding labels
pub const LABEL_NOISE: f64 = 0.05;

/// Typical spending range for an income bracket
#[derive(Debug, Clone, Copy)]
struct SpendingRange {
    min: f64,
    usual: f64,
    max: f64,
}

fn spending_range(income: IncomeLevel) -> SpendingRange {
    match income {
        IncomeLevel::Low => SpendingRange {
            min: 1_000.0,
            usual: 15_000.0,
            max: 25_000.0,
        },
        IncomeLevel::Middle => SpendingRange {
            min: 5_000.0,
            usual: 30_000.0,
            max: 50_000.0,
        },
        IncomeLevel::Upper => SpendingRange {
            min: 10_000.0,
            usual: 75_000.0,
            max: 200_000.0,
        },
    }
}

/// City weights, roughly by population
const LOCATIONS: &[(&str, f64)] = &[
    ("mumbai", 0.25),
    ("delhi", 0.2),
    ("bangalore", 0.15),
    ("hyderabad", 0.1),
    ("chennai", 0.1),
    ("kolkata", 0.1),
    ("pune", 0.05),
    ("other", 0.05),
];

/// Merchant category groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerchantCategory {
    Essential,
    Shopping,
    Services,
    Financial,
    Business,
}

impl MerchantCategory {
    pub fn all() -> &'static [MerchantCategory] {
        &[
            Self::Essential,
            Self::Shopping,
            Self::Services,
            Self::Financial,
            Self::Business,
        ]
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Self::Essential => &["groceries", "utilities", "medical", "education", "rent"],
            Self::Shopping => &["electronics", "fashion", "jewelry", "furniture", "beauty"],
            Self::Services => &["travel", "entertainment", "dining", "salon", "repair"],
            Self::Financial => &["investment", "insurance", "transfer", "loan", "crypto"],
            Self::Business => &["b2b", "wholesale", "software", "consulting", "marketing"],
        }
    }

    /// Probability of being the primary category of a transaction
    fn weight(&self) -> f64 {
        match self {
            Self::Essential => 0.4,
            Self::Shopping => 0.25,
            Self::Services => 0.2,
            Self::Financial => 0.1,
            Self::Business => 0.05,
        }
    }
}

/// Maximum amount and usage probability per payment mode
fn payment_limits(mode: PaymentMode) -> (f64, f64) {
    match mode {
        PaymentMode::Upi => (100_000.0, 0.4),
        PaymentMode::Debit => (200_000.0, 0.3),
        PaymentMode::Credit => (500_000.0, 0.15),
        PaymentMode::NetBanking => (1_000_000.0, 0.1),
        PaymentMode::Wallet => (50_000.0, 0.05),
    }
}

/// Labeled sample generator with its own seedable RNG
pub struct SampleGenerator {
    rng: StdRng,
    prior: IncomePrior,
}

impl SampleGenerator {
    pub fn new(config: &GeneratorConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            prior: config.income_prior.clone(),
        }
    }

    pub fn from_entropy(config: &GeneratorConfig) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            prior: config.income_prior.clone(),
        }
    }

    /// Draw one set of raw attributes from the population model
    pub fn draw_attributes(&mut self) -> Result<RawTransactionAttributes> {
        let income_level = self.draw_income()?;
        let amount = self.draw_amount(income_level);
        let hour = self.draw_hour();
        let location = self.draw_location();
        let merchant_types = self.draw_merchant_types();
        let payment_mode = self.draw_payment_mode(amount);

        Ok(RawTransactionAttributes {
            amount,
            income_level,
            hour,
            location: location.to_string(),
            merchant_types,
            payment_mode,
        })
    }

    /// Draw, encode and label a single sample
    pub fn sample(&mut self) -> Result<LabeledSample> {
        let attrs = self.draw_attributes()?;
        let features = encoder::encode(&attrs, &mut self.rng)?;
        let composed_risk = risk::compose_risk(&features);
        let noise = self.rng.gen_range(-LABEL_NOISE..LABEL_NOISE);

        Ok(LabeledSample {
            features,
            label: risk::label_for(composed_risk, noise),
            composed_risk,
        })
    }

    pub fn generate(&mut self, count: usize) -> Result<Vec<LabeledSample>> {
        (0..count).map(|_| self.sample()).collect()
    }

    /// Iterate over `count` samples in chunks of at most `chunk_size`
    pub fn chunks(&mut self, count: usize, chunk_size: usize) -> SampleChunks<'_> {
        SampleChunks {
            generator: self,
            remaining: count,
            chunk_size: chunk_size.max(1),
        }
    }

    fn draw_income(&mut self) -> Result<IncomeLevel> {
        let prior = &self.prior;
        IncomeLevel::all()
            .choose_weighted(&mut self.rng, |level| prior.weight(*level))
            .copied()
            .map_err(|e| Error::Config(format!("Invalid income prior: {}", e)))
    }

    /// Mixture around the bracket's usual spend: 70% near usual (±50%),
    /// 20% below usual, 10% above usual up to the bracket max
    fn draw_amount(&mut self, income: IncomeLevel) -> f64 {
        let range = spending_range(income);
        let branch: f64 = self.rng.gen();
        let u: f64 = self.rng.gen();

        if branch < 0.7 {
            range.usual + (u - 0.5) * range.usual
        } else if branch < 0.9 {
            range.min + u * (range.usual - range.min)
        } else {
            range.usual + u * (range.max - range.usual)
        }
    }

    /// 60% business hours, 30% evening, 10% any hour
    fn draw_hour(&mut self) -> u8 {
        let roll: f64 = self.rng.gen();
        if roll < 0.6 {
            self.rng.gen_range(9..=17)
        } else if roll < 0.9 {
            self.rng.gen_range(18..=21)
        } else {
            self.rng.gen_range(0..=23)
        }
    }

    fn draw_location(&mut self) -> &'static str {
        LOCATIONS
            .choose_weighted(&mut self.rng, |(_, weight)| *weight)
            .map(|(city, _)| *city)
            .unwrap_or("other")
    }

    /// One tag from a weighted primary category, sometimes plus distinct extras
    fn draw_merchant_types(&mut self) -> Vec<String> {
        let count = if self.rng.gen::<f64>() < 0.8 {
            1
        } else {
            self.rng.gen_range(1..=3)
        };

        let primary = MerchantCategory::all()
            .choose_weighted(&mut self.rng, |c| c.weight())
            .copied()
            .unwrap_or(MerchantCategory::Essential);
        let mut tags: Vec<&'static str> = primary
            .tags()
            .choose(&mut self.rng)
            .copied()
            .into_iter()
            .collect();

        let all_tags: Vec<&'static str> = MerchantCategory::all()
            .iter()
            .flat_map(|c| c.tags().iter().copied())
            .collect();
        while tags.len() < count {
            if let Some(tag) = all_tags.choose(&mut self.rng) {
                if !tags.contains(tag) {
                    tags.push(*tag);
                }
            }
        }

        tags.into_iter().map(str::to_string).collect()
    }

    /// Weighted choice among modes whose limit covers the amount
    fn draw_payment_mode(&mut self, amount: f64) -> PaymentMode {
        let eligible: Vec<(PaymentMode, f64)> = PaymentMode::all()
            .iter()
            .map(|mode| (*mode, payment_limits(*mode)))
            .filter(|(_, (max, _))| amount <= *max)
            .map(|(mode, (_, prob))| (mode, prob))
            .collect();

        eligible
            .choose_weighted(&mut self.rng, |(_, prob)| *prob)
            .map(|(mode, _)| *mode)
            .unwrap_or(PaymentMode::NetBanking)
    }
}

/// Chunked sample iterator returned by [`SampleGenerator::chunks`]
pub struct SampleChunks<'a> {
    generator: &'a mut SampleGenerator,
    remaining: usize,
    chunk_size: usize,
}

impl Iterator for SampleChunks<'_> {
    type Item = Result<Vec<LabeledSample>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let size = self.remaining.min(self.chunk_size);
        self.remaining -= size;
        debug!("Generating chunk of {} samples ({} left)", size, self.remaining);
        Some(self.generator.generate(size))
    }
}

/// Summary statistics of a generated sample set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationStats {
    pub count: usize,
    pub positives: usize,
    pub positive_rate: f64,
    pub mean_composed_risk: f64,
}

impl GenerationStats {
    pub fn from_samples(samples: &[LabeledSample]) -> Self {
        let mut stats = Self::default();
        stats.record(samples);
        stats
    }

    /// Fold another chunk into the running totals
    pub fn record(&mut self, samples: &[LabeledSample]) {
        if samples.is_empty() {
            return;
        }
        let risk_total = self.mean_composed_risk * self.count as f64
            + samples.iter().map(|s| s.composed_risk).sum::<f64>();

        self.count += samples.len();
        self.positives += samples.iter().filter(|s| s.label == 1).count();
        self.positive_rate = self.positives as f64 / self.count as f64;
        self.mean_composed_risk = risk_total / self.count as f64;
    }
}

/// Write samples as CSV: feature columns, then composed risk and label
pub fn write_csv<W: Write>(samples: &[LabeledSample], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
    header.extend(["composed_risk", "label"]);
    csv_writer.write_record(&header)?;

    for sample in samples {
        let mut record: Vec<String> = sample
            .features
            .as_array()
            .iter()
            .map(|v| format!("{:.6}", v))
            .collect();
        record.push(format!("{:.6}", sample.composed_risk));
        record.push(sample.label.to_string());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::METRO_CITIES;

    fn generator(seed: u64) -> SampleGenerator {
        SampleGenerator::new(&GeneratorConfig::default(), seed)
    }

    #[test]
    fn test_drawn_attributes_are_valid() {
        let mut gen = generator(11);
        for _ in 0..2_000 {
            let attrs = gen.draw_attributes().unwrap();
            attrs.validate().unwrap();
            assert!((1..=3).contains(&attrs.merchant_types.len()));

            let mut unique = attrs.merchant_types.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), attrs.merchant_types.len(), "duplicate tags");
        }
    }

    #[test]
    fn test_amounts_stay_within_bracket() {
        let mut gen = generator(12);
        for _ in 0..2_000 {
            let attrs = gen.draw_attributes().unwrap();
            let range = spending_range(attrs.income_level);
            assert!(attrs.amount >= range.min.min(range.usual * 0.5));
            assert!(attrs.amount <= range.max.max(range.usual * 1.5));
        }
    }

    #[test]
    fn test_payment_mode_respects_limits() {
        let mut gen = generator(13);
        for amount in [10.0, 60_000.0, 150_000.0, 400_000.0, 900_000.0] {
            for _ in 0..200 {
                let mode = gen.draw_payment_mode(amount);
                let (max, _) = payment_limits(mode);
                assert!(amount <= max, "{} not allowed for {}", mode, amount);
            }
        }
        assert_eq!(gen.draw_payment_mode(5_000_000.0), PaymentMode::NetBanking);
    }

    #[test]
    fn test_hour_distribution_favors_business_hours() {
        let mut gen = generator(14);
        let n = 5_000;
        let business = (0..n)
            .filter(|_| (9..=17).contains(&gen.draw_hour()))
            .count();
        let rate = business as f64 / n as f64;
        // 60% direct plus a share of the uniform tier
        assert!(rate > 0.55 && rate < 0.72, "business rate {}", rate);
    }

    #[test]
    fn test_income_prior_is_respected() {
        let config = GeneratorConfig {
            income_prior: IncomePrior {
                low: 0.0,
                middle: 0.0,
                upper: 1.0,
            },
        };
        let mut gen = SampleGenerator::new(&config, 15);
        for _ in 0..200 {
            assert_eq!(gen.draw_attributes().unwrap().income_level, IncomeLevel::Upper);
        }
    }

    #[test]
    fn test_locations_are_known() {
        let mut gen = generator(16);
        for _ in 0..500 {
            let location = gen.draw_location();
            assert!(METRO_CITIES.contains(&location) || location == "pune" || location == "other");
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generator(42).generate(200).unwrap();
        let b = generator(42).generate(200).unwrap();
        assert_eq!(a, b);

        let c = generator(43).generate(200).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_labels_consistent_with_threshold() {
        let samples = generator(1_000).generate(1_000).unwrap();
        let stats = GenerationStats::from_samples(&samples);
        assert_eq!(stats.count, 1_000);

        for s in &samples {
            for (_, value) in s.features.named_values() {
                assert!((0.0..=1.0).contains(&value));
            }
            if s.composed_risk > risk::LABEL_THRESHOLD + LABEL_NOISE {
                assert_eq!(s.label, 1);
            }
            if s.composed_risk <= risk::LABEL_THRESHOLD - LABEL_NOISE {
                assert_eq!(s.label, 0);
            }
        }

        let above = |t: f64| samples.iter().filter(|s| s.composed_risk > t).count() as f64 / 1_000.0;
        let upper_bound = above(risk::LABEL_THRESHOLD - LABEL_NOISE);
        let lower_bound = above(risk::LABEL_THRESHOLD + LABEL_NOISE);
        assert!(stats.positive_rate >= lower_bound && stats.positive_rate <= upper_bound);
        assert!(
            stats.positive_rate > 0.05 && stats.positive_rate < 0.95,
            "positive rate {}",
            stats.positive_rate
        );
    }

    #[test]
    fn test_chunks_cover_requested_count() {
        let mut gen = generator(17);
        let sizes: Vec<usize> = gen
            .chunks(250, 100)
            .map(|chunk| chunk.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        assert_eq!(gen.chunks(0, 100).count(), 0);
    }

    #[test]
    fn test_stats_record_matches_from_samples() {
        let samples = generator(18).generate(300).unwrap();
        let mut running = GenerationStats::default();
        for chunk in samples.chunks(70) {
            running.record(chunk);
        }
        let whole = GenerationStats::from_samples(&samples);
        assert_eq!(running.count, whole.count);
        assert_eq!(running.positives, whole.positives);
        assert!((running.mean_composed_risk - whole.mean_composed_risk).abs() < 1e-9);
    }

    #[test]
    fn test_write_csv() {
        let samples = generator(19).generate(3).unwrap();
        let mut buffer = Vec::new();
        write_csv(&samples, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "amount_risk,income_risk,time_risk,location_risk,merchant_risk,payment_risk,composed_risk,label"
        );
        assert!(lines[1].ends_with(",0") || lines[1].ends_with(",1"));
    }
}
