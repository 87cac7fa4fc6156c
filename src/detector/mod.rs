//! The four risk detectors behind a uniform interface.
//!
//! Each detector independently reads history through [`HistoryReader`],
//! scores one aspect of a tender and returns a [`Detection`]: a clamped
//! sub-score, risk-factor tags and a structured detail record. The set is
//! closed by design; the aggregator dispatches to the four concrete
//! detectors explicitly rather than through an open registry.
//!
//! Missing or undersized historical samples are handled inside each
//! detector by skipping the affected sub-check. Only genuine faults
//! (timeouts, computation errors) surface as [`DetectorError`] and are
//! isolated by the aggregator.

mod frequent_winner;
mod geo_cluster;
mod price_anomaly;
mod single_bidder;

pub use frequent_winner::FrequentWinnerDetector;
pub use geo_cluster::GeoClusterDetector;
pub use price_anomaly::PriceAnomalyDetector;
pub use single_bidder::SingleBidderDetector;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{winning_bid, Bid, Detection, Tender};
use crate::error::DetectorError;
use crate::port::HistoryReader;

/// Everything a detector needs about the tender under assessment.
///
/// `now` is fixed once per assessment so all trailing windows share the same
/// reference instant.
#[derive(Debug, Clone)]
pub struct DetectionContext {
    pub tender: Tender,
    pub bids: Vec<Bid>,
    pub now: DateTime<Utc>,
}

impl DetectionContext {
    #[must_use]
    pub fn new(tender: Tender, bids: Vec<Bid>, now: DateTime<Utc>) -> Self {
        Self { tender, bids, now }
    }

    /// Start of a trailing window of `days` days.
    #[must_use]
    pub fn since(&self, days: i64) -> DateTime<Utc> {
        self.now - Duration::days(days)
    }

    #[must_use]
    pub fn winning_bid(&self) -> Option<&Bid> {
        winning_bid(&self.bids)
    }
}

/// One risk detection algorithm.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Stable identifier used in logs, cache keys and alert types.
    fn name(&self) -> &'static str;

    /// Score the tender. An unassessable tender (no bids yet, missing
    /// coordinates) yields `Detection::empty()`, not an error.
    async fn detect(&self, ctx: &DetectionContext) -> Result<Detection, DetectorError>;
}

/// Read a value through the history port, degrading to a fallback when the
/// sample is unavailable. Unavailable history is a local condition, not a
/// detector failure.
pub(crate) async fn read_or<T, F>(label: &str, fut: F, fallback: T) -> T
where
    F: std::future::Future<Output = crate::error::Result<T>>,
{
    match fut.await {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(query = label, error = %err, "history unavailable, skipping sub-check");
            fallback
        }
    }
}

// Re-exported so detectors can name the reader uniformly in constructors.
pub(crate) type Reader = std::sync::Arc<dyn HistoryReader>;
