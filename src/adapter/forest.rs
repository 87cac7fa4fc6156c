//! Seeded one-dimensional isolation forest.
//!
//! Anomalous prices sit in sparse regions of the sample and get isolated
//! by fewer random splits, giving them shorter average path lengths. Raw
//! scores follow the standard 2^(-E[h]/c(n)) form; the contamination rate
//! fixes a score offset over the training sample so that normalized output
//! crosses 0.5 exactly for the assumed outlier fraction. The RNG seed is
//! fixed, so fitting the same sample twice yields identical scores.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PriceAnomalyConfig;
use crate::port::{AnomalyModel, FittedModel};

const EULER_MASCHERONI: f64 = 0.577_215_664_901_532_9;

pub struct IsolationForest {
    trees: usize,
    subsample: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForest {
    #[must_use]
    pub fn new(trees: usize, subsample: usize, contamination: f64, seed: u64) -> Self {
        Self {
            trees,
            subsample,
            contamination,
            seed,
        }
    }

    /// Forest with the configured contamination rate and the default shape.
    #[must_use]
    pub fn from_config(config: &PriceAnomalyConfig) -> Self {
        Self {
            contamination: config.contamination,
            ..Self::default()
        }
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(100, 64, 0.1, 42)
    }
}

impl AnomalyModel for IsolationForest {
    fn fit(&self, samples: &[f64]) -> Box<dyn FittedModel> {
        if samples.len() < 2 {
            return Box::new(Degenerate);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let subsample = self.subsample.min(samples.len());
        let max_depth = (subsample as f64).log2().ceil() as usize;

        let trees: Vec<Node> = (0..self.trees)
            .map(|_| {
                let mut draw: Vec<f64> = (0..subsample)
                    .map(|_| samples[rng.gen_range(0..samples.len())])
                    .collect();
                Node::build(&mut draw, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Forest {
            trees,
            expected_path: c_factor(subsample),
            offset: 0.0,
        };

        // Offset at the (1 - contamination) quantile of training scores:
        // the assumed outlier share of the sample normalizes above 0.5.
        let mut training: Vec<f64> = samples.iter().map(|&v| forest.raw_score(v)).collect();
        training.sort_by(|a, b| a.total_cmp(b));
        let rank = ((1.0 - self.contamination) * (training.len() - 1) as f64).round() as usize;
        forest.offset = training[rank.min(training.len() - 1)];

        Box::new(forest)
    }
}

enum Node {
    Internal {
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl Node {
    fn build(values: &mut [f64], depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
        let (min, max) = bounds(values);
        if values.len() <= 1 || depth >= max_depth || min == max {
            return Node::Leaf { size: values.len() };
        }

        let split = rng.gen_range(min..max);
        let pivot = partition(values, split);
        let (lower, upper) = values.split_at_mut(pivot);
        Node::Internal {
            split,
            left: Box::new(Node::build(lower, depth + 1, max_depth, rng)),
            right: Box::new(Node::build(upper, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, value: f64, depth: f64) -> f64 {
        match self {
            Node::Leaf { size } => depth + c_factor(*size),
            Node::Internal { split, left, right } => {
                if value <= *split {
                    left.path_length(value, depth + 1.0)
                } else {
                    right.path_length(value, depth + 1.0)
                }
            }
        }
    }
}

struct Forest {
    trees: Vec<Node>,
    expected_path: f64,
    offset: f64,
}

impl Forest {
    fn raw_score(&self, value: f64) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|t| t.path_length(value, 0.0))
            .sum();
        let mean_path = total / self.trees.len() as f64;
        2.0_f64.powf(-mean_path / self.expected_path)
    }
}

impl FittedModel for Forest {
    fn score(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .map(|&v| (self.raw_score(v) - self.offset + 0.5).clamp(0.0, 1.0))
            .collect()
    }
}

/// Fallback for samples too small to fit: everything is unremarkable.
struct Degenerate;

impl FittedModel for Degenerate {
    fn score(&self, values: &[f64]) -> Vec<f64> {
        vec![0.0; values.len()]
    }
}

/// Average unsuccessful-search path length in a BST of `n` nodes.
fn c_factor(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}

/// In-place partition around `split`; returns the index of the first value
/// greater than the split.
fn partition(values: &mut [f64], split: f64) -> usize {
    let mut pivot = 0;
    for i in 0..values.len() {
        if values[i] <= split {
            values.swap(i, pivot);
            pivot += 1;
        }
    }
    pivot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_sample() -> Vec<f64> {
        // Tight cluster around 100k with one far outlier.
        let mut sample: Vec<f64> = (0..30).map(|i| 100_000.0 + f64::from(i) * 500.0).collect();
        sample.push(900_000.0);
        sample
    }

    #[test]
    fn scoring_is_deterministic() {
        let sample = clustered_sample();
        let a = IsolationForest::default().fit(&sample).score(&sample);
        let b = IsolationForest::default().fit(&sample).score(&sample);
        assert_eq!(a, b);
    }

    #[test]
    fn outlier_scores_above_decision_boundary() {
        let sample = clustered_sample();
        let model = IsolationForest::default().fit(&sample);
        let scores = model.score(&[105_000.0, 900_000.0]);
        assert!(scores[1] > 0.5, "outlier scored {}", scores[1]);
        assert!(scores[0] < scores[1]);
    }

    #[test]
    fn contamination_moves_the_decision_offset() {
        let sample = clustered_sample();
        let strict = IsolationForest::new(100, 64, 0.0, 42).fit(&sample);
        let loose = IsolationForest::new(100, 64, 0.5, 42).fit(&sample);

        let outlier = 900_000.0;
        // Zero contamination anchors the offset at the worst training score,
        // so nothing seen during fitting crosses the boundary.
        assert!(strict.score(&[outlier])[0] <= 0.5);
        assert!(loose.score(&[outlier])[0] > 0.5);
        assert!(loose.score(&[outlier])[0] > strict.score(&[outlier])[0]);
    }

    #[test]
    fn from_config_uses_the_configured_contamination() {
        let config = PriceAnomalyConfig {
            contamination: 0.5,
            ..PriceAnomalyConfig::default()
        };
        let sample = clustered_sample();
        let configured = IsolationForest::from_config(&config).fit(&sample);
        let default = IsolationForest::default().fit(&sample);
        assert_ne!(configured.score(&[105_000.0]), default.score(&[105_000.0]));
    }

    #[test]
    fn degenerate_sample_scores_zero() {
        let model = IsolationForest::default().fit(&[42.0]);
        assert_eq!(model.score(&[42.0, 1_000_000.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn identical_values_are_unremarkable() {
        let sample = vec![250_000.0; 40];
        let model = IsolationForest::default().fit(&sample);
        let scores = model.score(&[250_000.0]);
        assert!(scores[0] <= 0.5 + 1e-9, "got {}", scores[0]);
    }
}
