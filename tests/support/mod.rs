//! Shared harness for end-to-end assessment tests.
#![allow(dead_code)]

use std::sync::Arc;

use tenderlens::adapter::{CachedHistory, IsolationForest, MemoryCache, VecAlertSink};
use tenderlens::config::Config;
use tenderlens::engine::{PatternStore, RiskEngine};
use tenderlens::port::HistoryReader;

/// Route engine logs through the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub engine: RiskEngine,
    pub sink: Arc<VecAlertSink>,
    pub patterns: Arc<PatternStore>,
    pub cache: Arc<MemoryCache>,
    pub config: Arc<Config>,
}

pub fn harness(reader: Arc<dyn HistoryReader>) -> Harness {
    harness_with(reader, Config::default())
}

pub fn harness_with(reader: Arc<dyn HistoryReader>, config: Config) -> Harness {
    let config = Arc::new(config);
    let sink = Arc::new(VecAlertSink::new());
    let patterns = Arc::new(PatternStore::new());
    let cache = Arc::new(MemoryCache::new(config.cache.clone()));
    let reader = Arc::new(CachedHistory::new(reader, cache.clone()));
    let engine = RiskEngine::new(
        config.clone(),
        reader,
        cache.clone(),
        patterns.clone(),
        sink.clone(),
        Arc::new(IsolationForest::from_config(&config.price_anomaly)),
    );
    Harness {
        engine,
        sink,
        patterns,
        cache,
        config,
    }
}
