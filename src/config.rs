//! Engine configuration loaded from TOML.
//!
//! Every threshold and weight used by the detectors and the aggregator lives
//! here so operators can tune the engine without a code change. Validation
//! happens at load time; in particular a weight set that could push the
//! composite score outside [0,100] is rejected before the engine ever runs.

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default)]
    pub levels: LevelThresholds,
    #[serde(default)]
    pub single_bidder: SingleBidderConfig,
    #[serde(default)]
    pub price_anomaly: PriceAnomalyConfig,
    #[serde(default)]
    pub frequent_winner: FrequentWinnerConfig,
    #[serde(default)]
    pub geographic: GeoClusterConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Scheduling knobs for the assessment path.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Independent timeout applied to each detector call, in milliseconds.
    #[serde(default = "default_detector_timeout_ms")]
    pub detector_timeout_ms: u64,
}

fn default_detector_timeout_ms() -> u64 {
    5_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detector_timeout_ms: default_detector_timeout_ms(),
        }
    }
}

/// Per-detector weights for the composite score.
///
/// The composite stays in [0,100] by construction when the weights sum to at
/// most 1; `validate` enforces that, and the aggregator clamps regardless.
#[derive(Debug, Clone, Deserialize)]
pub struct Weights {
    #[serde(default = "default_w_single_bidder")]
    pub single_bidder: f64,
    #[serde(default = "default_w_price_anomaly")]
    pub price_anomaly: f64,
    #[serde(default = "default_w_frequent_winner")]
    pub frequent_winner: f64,
    #[serde(default = "default_w_geographic")]
    pub geographic: f64,
}

fn default_w_single_bidder() -> f64 {
    0.30
}

fn default_w_price_anomaly() -> f64 {
    0.25
}

fn default_w_frequent_winner() -> f64 {
    0.25
}

fn default_w_geographic() -> f64 {
    0.20
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            single_bidder: default_w_single_bidder(),
            price_anomaly: default_w_price_anomaly(),
            frequent_winner: default_w_frequent_winner(),
            geographic: default_w_geographic(),
        }
    }
}

/// Composite-score thresholds for the coarse risk levels.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelThresholds {
    #[serde(default = "default_level_critical")]
    pub critical: f64,
    #[serde(default = "default_level_high")]
    pub high: f64,
    #[serde(default = "default_level_medium")]
    pub medium: f64,
}

fn default_level_critical() -> f64 {
    80.0
}

fn default_level_high() -> f64 {
    60.0
}

fn default_level_medium() -> f64 {
    30.0
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            critical: default_level_critical(),
            high: default_level_high(),
            medium: default_level_medium(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleBidderConfig {
    /// Estimated value above which a single-bidder award earns the
    /// high-value bonus.
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: Decimal,

    /// CPV prefixes treated as critical sectors (construction, medical,
    /// fuel by default).
    #[serde(default = "default_critical_cpv_prefixes")]
    pub critical_cpv_prefixes: Vec<String>,

    /// Trailing single-bidder awards by the same authority at or above which
    /// the repeat-authority bonus applies.
    #[serde(default = "default_repeat_authority_threshold")]
    pub repeat_authority_threshold: u32,

    #[serde(default = "default_window_days_365")]
    pub window_days: i64,
}

fn default_high_value_threshold() -> Decimal {
    dec!(1_000_000)
}

fn default_critical_cpv_prefixes() -> Vec<String> {
    vec!["45".into(), "33".into(), "09".into()]
}

fn default_repeat_authority_threshold() -> u32 {
    3
}

fn default_window_days_365() -> i64 {
    365
}

impl Default for SingleBidderConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: default_high_value_threshold(),
            critical_cpv_prefixes: default_critical_cpv_prefixes(),
            repeat_authority_threshold: default_repeat_authority_threshold(),
            window_days: default_window_days_365(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceAnomalyConfig {
    /// Standardized deviation beyond which a bid counts as an outlier.
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,

    /// Minimum comparable-price sample size for the outlier check.
    #[serde(default = "default_min_sample")]
    pub min_sample: usize,

    /// Minimum sample size before the unsupervised model is fitted.
    #[serde(default = "default_model_min_sample")]
    pub model_min_sample: usize,

    /// Expected share of anomalies in the training sample.
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Coefficient of variation below which 3+ bids look coordinated.
    #[serde(default = "default_similar_cv")]
    pub similar_cv: f64,

    /// Coefficient of variation above which the spread is flagged.
    #[serde(default = "default_spread_cv")]
    pub spread_cv: f64,

    #[serde(default = "default_window_days_730")]
    pub window_days: i64,
}

fn default_z_threshold() -> f64 {
    2.5
}

fn default_min_sample() -> usize {
    10
}

fn default_model_min_sample() -> usize {
    20
}

fn default_contamination() -> f64 {
    0.1
}

fn default_similar_cv() -> f64 {
    0.05
}

fn default_spread_cv() -> f64 {
    0.5
}

fn default_window_days_730() -> i64 {
    730
}

impl Default for PriceAnomalyConfig {
    fn default() -> Self {
        Self {
            z_threshold: default_z_threshold(),
            min_sample: default_min_sample(),
            model_min_sample: default_model_min_sample(),
            contamination: default_contamination(),
            similar_cv: default_similar_cv(),
            spread_cv: default_spread_cv(),
            window_days: default_window_days_730(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrequentWinnerConfig {
    /// Minimum participations in a scope before win rates are scored.
    #[serde(default = "default_min_participations")]
    pub min_participations: u32,

    #[serde(default = "default_authority_win_rate")]
    pub authority_win_rate: f64,

    #[serde(default = "default_extreme_authority_win_rate")]
    pub extreme_authority_win_rate: f64,

    #[serde(default = "default_sector_win_rate")]
    pub sector_win_rate: f64,

    /// Monthly win-count CV below which wins look suspiciously steady.
    #[serde(default = "default_monthly_cv")]
    pub monthly_cv: f64,

    #[serde(default = "default_window_days_365")]
    pub window_days: i64,
}

fn default_min_participations() -> u32 {
    5
}

fn default_authority_win_rate() -> f64 {
    0.6
}

fn default_extreme_authority_win_rate() -> f64 {
    0.8
}

fn default_sector_win_rate() -> f64 {
    0.4
}

fn default_monthly_cv() -> f64 {
    0.3
}

impl Default for FrequentWinnerConfig {
    fn default() -> Self {
        Self {
            min_participations: default_min_participations(),
            authority_win_rate: default_authority_win_rate(),
            extreme_authority_win_rate: default_extreme_authority_win_rate(),
            sector_win_rate: default_sector_win_rate(),
            monthly_cv: default_monthly_cv(),
            window_days: default_window_days_365(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoClusterConfig {
    /// Great-circle radius defining an authority's geographic cluster.
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,

    /// Minimum tenders the company must have inside the cluster.
    #[serde(default = "default_min_cluster_tenders")]
    pub min_cluster_tenders: u32,

    #[serde(default = "default_cluster_win_rate")]
    pub cluster_win_rate: f64,

    #[serde(default = "default_monopoly_win_rate")]
    pub monopoly_win_rate: f64,

    /// Company-to-authority distance below which the proximity bonus
    /// applies (when the cluster win rate is already elevated).
    #[serde(default = "default_proximity_km")]
    pub proximity_km: f64,

    #[serde(default = "default_window_days_365")]
    pub window_days: i64,
}

fn default_radius_km() -> f64 {
    50.0
}

fn default_min_cluster_tenders() -> u32 {
    3
}

fn default_cluster_win_rate() -> f64 {
    0.7
}

fn default_monopoly_win_rate() -> f64 {
    0.9
}

fn default_proximity_km() -> f64 {
    10.0
}

impl Default for GeoClusterConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
            min_cluster_tenders: default_min_cluster_tenders(),
            cluster_win_rate: default_cluster_win_rate(),
            monopoly_win_rate: default_monopoly_win_rate(),
            proximity_km: default_proximity_km(),
            window_days: default_window_days_365(),
        }
    }
}

/// Thresholds for the batch pattern miner.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    #[serde(default = "default_window_days_365")]
    pub window_days: i64,

    #[serde(default = "default_monopoly_min_wins")]
    pub monopoly_min_wins: u32,

    #[serde(default = "default_monopoly_share")]
    pub monopoly_share: f64,

    #[serde(default = "default_favoritism_min_awards")]
    pub favoritism_min_awards: u32,

    #[serde(default = "default_monopoly_min_wins")]
    pub sector_min_wins: u32,

    #[serde(default = "default_monopoly_share")]
    pub sector_share: f64,

    #[serde(default = "default_monopoly_min_wins")]
    pub temporal_min_wins: u32,

    #[serde(default = "default_temporal_month_share")]
    pub temporal_month_share: f64,
}

fn default_monopoly_min_wins() -> u32 {
    5
}

fn default_monopoly_share() -> f64 {
    0.6
}

fn default_favoritism_min_awards() -> u32 {
    8
}

fn default_temporal_month_share() -> f64 {
    0.4
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days_365(),
            monopoly_min_wins: default_monopoly_min_wins(),
            monopoly_share: default_monopoly_share(),
            favoritism_min_awards: default_favoritism_min_awards(),
            sector_min_wins: default_monopoly_min_wins(),
            sector_share: default_monopoly_share(),
            temporal_min_wins: default_monopoly_min_wins(),
            temporal_month_share: default_temporal_month_share(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Composite score at or above which a `high_risk_tender` alert is
    /// emitted.
    #[serde(default = "default_level_high")]
    pub high_risk_threshold: f64,

    /// Composite or sub-score at or above which alert severity escalates
    /// from medium to high.
    #[serde(default = "default_level_critical")]
    pub severe_threshold: f64,

    #[serde(default = "default_single_bidder_alert")]
    pub single_bidder_alert: f64,

    #[serde(default = "default_level_high")]
    pub price_anomaly_alert: f64,

    #[serde(default = "default_level_high")]
    pub frequent_winner_alert: f64,

    #[serde(default = "default_level_high")]
    pub geographic_alert: f64,
}

fn default_single_bidder_alert() -> f64 {
    75.0
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: default_level_high(),
            severe_threshold: default_level_critical(),
            single_bidder_alert: default_single_bidder_alert(),
            price_anomaly_alert: default_level_high(),
            frequent_winner_alert: default_level_high(),
            geographic_alert: default_level_high(),
        }
    }
}

/// TTLs per cached entity class. Composite scores go stale quickly;
/// historical aggregates move slowly.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_composite_ttl_secs")]
    pub composite_ttl_secs: u64,

    #[serde(default = "default_detector_ttl_secs")]
    pub detector_ttl_secs: u64,

    #[serde(default = "default_aggregate_ttl_secs")]
    pub aggregate_ttl_secs: u64,
}

fn default_composite_ttl_secs() -> u64 {
    300
}

fn default_detector_ttl_secs() -> u64 {
    900
}

fn default_aggregate_ttl_secs() -> u64 {
    3_600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            composite_ttl_secs: default_composite_ttl_secs(),
            detector_ttl_secs: default_detector_ttl_secs(),
            aggregate_ttl_secs: default_aggregate_ttl_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants.
    ///
    /// A bad weight set would surface as a composite score outside [0,100]
    /// at assessment time; rejecting it here keeps that failure mode out of
    /// the hot path entirely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("weights.single_bidder", self.weights.single_bidder),
            ("weights.price_anomaly", self.weights.price_anomaly),
            ("weights.frequent_winner", self.weights.frequent_winner),
            ("weights.geographic", self.weights.geographic),
        ];
        for (field, w) in weights {
            if !(0.0..=1.0).contains(&w) || !w.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be in [0,1], got {w}"),
                });
            }
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if sum <= 0.0 || sum > 1.0 + 1e-9 {
            return Err(ConfigError::InvalidValue {
                field: "weights",
                reason: format!("weights must sum to (0,1], got {sum}"),
            });
        }

        if self.levels.critical < self.levels.high || self.levels.high < self.levels.medium {
            return Err(ConfigError::InvalidValue {
                field: "levels",
                reason: format!(
                    "thresholds must be ordered critical >= high >= medium, got {} / {} / {}",
                    self.levels.critical, self.levels.high, self.levels.medium
                ),
            });
        }
        if self.levels.medium < 0.0 || self.levels.critical > 100.0 {
            return Err(ConfigError::InvalidValue {
                field: "levels",
                reason: "thresholds must lie in [0,100]".into(),
            });
        }

        if self.price_anomaly.z_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "price_anomaly.z_threshold",
                reason: "must be positive".into(),
            });
        }
        if !(0.0..=0.5).contains(&self.price_anomaly.contamination) {
            return Err(ConfigError::InvalidValue {
                field: "price_anomaly.contamination",
                reason: "must be in [0, 0.5]".into(),
            });
        }
        if self.geographic.radius_km <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "geographic.radius_km",
                reason: "must be positive".into(),
            });
        }
        if self.engine.detector_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.detector_timeout_ms",
                reason: "must be positive".into(),
            });
        }

        Ok(())
    }
}
