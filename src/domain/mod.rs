//! Storage-agnostic domain types and statistics.

mod alert;
mod ids;
mod pattern;
mod score;
mod tender;

pub mod stats;
pub mod tags;

pub use alert::{recommended_actions, Alert, DeliveryStatus, Severity};
pub use ids::{AuthorityId, CompanyId, TenderId};
pub use pattern::{Pattern, PatternKind};
pub use score::{merge_tags, Detection, RiskLevel, RiskScoreResult, Score};
pub use tender::{
    winning_bid, AuthorityCategory, Bid, Company, CompanySize, ContractingAuthority, DataVersion,
    GeoPoint, Tender, TenderStatus,
};
