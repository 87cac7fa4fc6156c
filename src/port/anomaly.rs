//! Pluggable unsupervised outlier-scoring strategy.
//!
//! The price-anomaly detector only depends on this narrow seam, so the
//! concrete statistical technique can be swapped without touching detector
//! logic. The default adapter is a seeded isolation forest.

/// A model fitted over a training sample.
pub trait FittedModel: Send + Sync {
    /// Anomaly score per value, normalized to [0,1]; higher means more
    /// anomalous, with 0.5 as the decision boundary.
    fn score(&self, values: &[f64]) -> Vec<f64>;
}

/// Factory for fitted models.
pub trait AnomalyModel: Send + Sync {
    /// Fit over the training sample. Degenerate samples (fewer than two
    /// points) yield a model that scores everything as unremarkable.
    fn fit(&self, samples: &[f64]) -> Box<dyn FittedModel>;
}
