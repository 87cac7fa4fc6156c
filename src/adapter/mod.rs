//! Default adapters behind the engine's ports.

mod cached_history;
mod forest;
mod memory_cache;
mod sink;

pub use cached_history::CachedHistory;
pub use forest::IsolationForest;
pub use memory_cache::MemoryCache;
pub use sink::{LogAlertSink, VecAlertSink};
