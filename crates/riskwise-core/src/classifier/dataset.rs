//! Dense training matrices

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{LabeledSample, FEATURE_COUNT};

/// Feature rows with one 0/1 label per row
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Array1<f64>,
}

impl Dataset {
    pub fn from_samples(samples: &[LabeledSample]) -> Self {
        let features = Array2::from_shape_fn((samples.len(), FEATURE_COUNT), |(row, col)| {
            samples[row].features.as_array()[col]
        });
        let labels = samples.iter().map(|s| f64::from(s.label)).collect();
        Self { features, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, f64> {
        self.labels.view()
    }

    /// Fraction of rows labeled 1
    pub fn positive_rate(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.labels.sum() / self.len() as f64
        }
    }

    /// Permute rows in place
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.features = self.features.select(Axis(0), &order);
        self.labels = self.labels.select(Axis(0), &order);
    }

    /// Split off the trailing `fraction` of rows as a validation set.
    ///
    /// Returns `None` for validation when the fraction rounds to zero rows.
    /// At least one training row is always kept.
    pub fn split(self, fraction: f64) -> (Dataset, Option<Dataset>) {
        let len = self.len();
        let held_out = ((len as f64) * fraction.clamp(0.0, 1.0)).round() as usize;
        let held_out = held_out.min(len.saturating_sub(1));
        if held_out == 0 {
            return (self, None);
        }

        let cut = len - held_out;
        let train = Dataset {
            features: self.features.slice_axis(Axis(0), (..cut).into()).to_owned(),
            labels: self.labels.slice_axis(Axis(0), (..cut).into()).to_owned(),
        };
        let validation = Dataset {
            features: self.features.slice_axis(Axis(0), (cut..).into()).to_owned(),
            labels: self.labels.slice_axis(Axis(0), (cut..).into()).to_owned(),
        };
        (train, Some(validation))
    }

    /// Consecutive mini-batches of at most `size` rows
    pub fn batches(
        &self,
        size: usize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f64>, ArrayView1<'_, f64>)> {
        let size = size.max(1);
        self.features
            .axis_chunks_iter(Axis(0), size)
            .zip(self.labels.axis_chunks_iter(Axis(0), size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn samples(n: usize) -> Vec<LabeledSample> {
        (0..n)
            .map(|i| {
                let v = i as f64 / n as f64;
                LabeledSample {
                    features: FeatureVector::from_values([v; FEATURE_COUNT]).unwrap(),
                    label: u8::from(i % 2 == 0),
                    composed_risk: v,
                }
            })
            .collect()
    }

    #[test]
    fn test_from_samples_shape() {
        let data = Dataset::from_samples(&samples(10));
        assert_eq!(data.len(), 10);
        assert_eq!(data.features().dim(), (10, FEATURE_COUNT));
        assert_eq!(data.labels()[0], 1.0);
        assert_eq!(data.labels()[1], 0.0);
        assert!((data.positive_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_shuffle_keeps_rows_paired() {
        let mut data = Dataset::from_samples(&samples(50));
        let mut rng = StdRng::seed_from_u64(3);
        data.shuffle(&mut rng);

        // Row value i/50 has label 1 iff i is even
        for (row, label) in data.features().outer_iter().zip(data.labels().iter()) {
            let i = (row[0] * 50.0).round() as usize;
            assert_eq!(*label, f64::from(u8::from(i % 2 == 0)));
        }
    }

    #[test]
    fn test_split_fraction() {
        let (train, validation) = Dataset::from_samples(&samples(100)).split(0.2);
        assert_eq!(train.len(), 80);
        assert_eq!(validation.unwrap().len(), 20);

        let (train, validation) = Dataset::from_samples(&samples(100)).split(0.0);
        assert_eq!(train.len(), 100);
        assert!(validation.is_none());

        let (train, validation) = Dataset::from_samples(&samples(1)).split(0.5);
        assert_eq!(train.len(), 1);
        assert!(validation.is_none());
    }

    #[test]
    fn test_batches() {
        let data = Dataset::from_samples(&samples(10));
        let sizes: Vec<usize> = data
            .batches(4)
            .map(|(x, y)| {
                assert_eq!(x.nrows(), y.len());
                y.len()
            })
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }
}
