//! Tenderlens - Corruption risk detection and scoring for public procurement.
//!
//! This crate scores individual tenders for corruption risk using pluggable
//! detection algorithms and composes the sub-scores into a single assessment.
//!
//! # Architecture
//!
//! The engine is hexagonal: detectors and the aggregator depend only on
//! ports, and adapters supply in-process defaults.
//!
//! - **`detector`** - The four risk detectors behind the `Detector` trait
//!   - `SingleBidderDetector` - awards with exactly one bidder
//!   - `PriceAnomalyDetector` - statistical and model-based price outliers
//!   - `FrequentWinnerDetector` - dominant trailing win rates
//!   - `GeoClusterDetector` - geographically clustered wins
//!
//! - **`engine`** - orchestration: the aggregator with failure isolation,
//!   the batch pattern miner and the alert generator
//! - **`port`** - trait seams toward storage, cache, notifications and the
//!   anomaly model
//! - **`adapter`** - in-process defaults: memoization cache, seeded
//!   isolation forest, alert sinks
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files with validation
//! - [`domain`] - Tenders, bids, scores, patterns, alerts, statistics
//! - [`error`] - Error types for the crate
//! - [`detector`] - Detection algorithms
//! - [`engine`] - Assessment orchestration
//! - [`port`] - Trait definitions for external collaborators
//! - [`adapter`] - In-process implementations of the ports
//!
//! # Features
//!
//! - `testkit` - Expose the in-memory history reader and fixture helpers to
//!   downstream tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tenderlens::adapter::{CachedHistory, IsolationForest, LogAlertSink, MemoryCache};
//! use tenderlens::config::Config;
//! use tenderlens::engine::{PatternStore, RiskEngine};
//! # fn reader() -> Arc<dyn tenderlens::port::HistoryReader> { unimplemented!() }
//!
//! let config = Arc::new(Config::default());
//! let cache = Arc::new(MemoryCache::new(config.cache.clone()));
//! let engine = RiskEngine::new(
//!     config.clone(),
//!     Arc::new(CachedHistory::new(reader(), cache.clone())),
//!     cache,
//!     Arc::new(PatternStore::new()),
//!     Arc::new(LogAlertSink),
//!     Arc::new(IsolationForest::from_config(&config.price_anomaly)),
//! );
//! ```

pub mod adapter;
pub mod config;
pub mod detector;
pub mod domain;
pub mod engine;
pub mod error;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use error::{Error, Result};
