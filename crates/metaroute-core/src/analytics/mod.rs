//! Routing analytics
//!
//! Best-effort, self-pruning log of routing decisions and unmatched requests,
//! snapshotted to a JSON file. Failures here never affect routing.

mod store;
mod types;

pub use store::{AnalyticsConfig, AnalyticsStore};
pub use types::{
    AnalyticsEvent, AnalyticsSnapshot, AnalyticsSummary, SNAPSHOT_VERSION, context_fingerprint,
};
