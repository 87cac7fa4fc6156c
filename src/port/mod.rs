//! Trait definitions at the seams of the engine.
//!
//! Ports are the extension points toward external collaborators: the
//! persistent store (read-only history), the memoization cache, the
//! notification pipeline and the pluggable unsupervised anomaly model.
//! Adapters in [`crate::adapter`] provide in-process implementations; the
//! production deployment substitutes its own.

mod anomaly;
mod cache;
mod history;
mod sink;

pub use anomaly::{AnomalyModel, FittedModel};
pub use cache::{CacheKey, Cached, EntityKind, ResultCache};
pub use history::{
    AwardSummary, ClusterPerformance, HistoryReader, Participation, ParticipationScope,
};
pub use sink::AlertSink;
