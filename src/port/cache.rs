//! Result memoization port.
//!
//! The cache is the only shared mutable resource in the engine. Reads and
//! writes are atomic per key; there are no cross-key transactions. A cache
//! failure must never fail an assessment: `get` misses fall through to live
//! computation and `put` is fire-and-forget.

use serde::{Deserialize, Serialize};

use crate::domain::DataVersion;

/// Class of cached entity, selecting the TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Composite tender score. Short-lived.
    CompositeScore,
    /// Per-detector sub-result.
    DetectorResult,
    /// Slow-moving historical aggregate.
    HistoricalAggregate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub entity_id: String,
    pub algorithm_version: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(kind: EntityKind, entity_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            algorithm_version: version.into(),
        }
    }
}

/// A cached value with the data version it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached {
    pub value: serde_json::Value,
    pub data_version: DataVersion,
}

/// Memoization collaborator.
///
/// Writes are last-writer-wins by *data version*, not completion time: a
/// stale in-flight assessment finishing after a fresher one must not clobber
/// the fresher entry.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Cached>;

    fn put(&self, key: CacheKey, entry: Cached);
}
