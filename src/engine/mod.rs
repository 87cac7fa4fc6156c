//! Assessment orchestration: the aggregator, the batch pattern miner and
//! the alert generator.

mod aggregator;
mod alerts;
mod pattern;

pub use aggregator::{RiskEngine, ALGORITHM_VERSION};
pub use alerts::AlertGenerator;
pub use pattern::{PatternMiner, PatternStore};
