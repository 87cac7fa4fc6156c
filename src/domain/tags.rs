//! Risk-factor tags emitted by the detectors and the aggregator.
//!
//! Tags are stable identifiers: they appear in stored results, drive the
//! recommended-action mapping and are asserted on by downstream consumers.

pub const SINGLE_BIDDER: &str = "single_bidder";
pub const HIGH_VALUE_SINGLE_BIDDER: &str = "high_value_single_bidder";
pub const CRITICAL_SECTOR_SINGLE_BIDDER: &str = "critical_sector_single_bidder";
pub const REPEAT_SINGLE_BIDDER_AUTHORITY: &str = "repeat_single_bidder_authority";

pub const ABNORMALLY_LOW_BID: &str = "abnormally_low_bid";
pub const INFLATED_BID_PRICE: &str = "inflated_bid_price";
pub const ANOMALOUS_PRICE_PATTERN: &str = "anomalous_price_pattern";
pub const SUSPICIOUSLY_SIMILAR_BIDS: &str = "suspiciously_similar_bids";
pub const UNUSUAL_BID_SPREAD: &str = "unusual_bid_spread";

pub const HIGH_AUTHORITY_WIN_RATE: &str = "high_authority_win_rate";
pub const EXTREMELY_HIGH_AUTHORITY_WIN_RATE: &str = "extremely_high_authority_win_rate";
pub const HIGH_SECTOR_WIN_RATE: &str = "high_sector_win_rate";
pub const CONSISTENT_MONTHLY_WINS: &str = "consistent_monthly_wins";
pub const WIN_CONCENTRATION_SPIKE: &str = "win_concentration_spike";

pub const HIGH_GEOGRAPHIC_CLUSTER_WIN_RATE: &str = "high_geographic_cluster_win_rate";
pub const GEOGRAPHIC_MONOPOLY_PATTERN: &str = "geographic_monopoly_pattern";
pub const CLOSE_PROXIMITY_WINNER: &str = "close_proximity_winner";

pub const PARTIAL_ANALYSIS: &str = "partial_analysis";
pub const NO_DATA: &str = "no_data";

/// Prefix for tags derived from systemic patterns, e.g.
/// `systemic_company_monopoly`.
pub const SYSTEMIC_PREFIX: &str = "systemic_";
