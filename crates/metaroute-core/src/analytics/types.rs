//! Analytics event and snapshot types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::routing::{ConfigOverrides, RoutingContext};

/// Format version written into every snapshot
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// A routing or usage event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// A request resolved to a delegate
    RoutingDecision {
        agent: String,
        matcher_type: String,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config_overrides: Option<ConfigOverrides>,
    },
    /// No rule matched a request
    UnmatchedRequest {
        timestamp: DateTime<Utc>,
        context_hash: String,
    },
}

impl AnalyticsEvent {
    /// Routing decision stamped with the current time
    pub fn routing_decision(
        agent: impl Into<String>,
        matcher_type: impl Into<String>,
        config_overrides: Option<ConfigOverrides>,
    ) -> Self {
        Self::RoutingDecision {
            agent: agent.into(),
            matcher_type: matcher_type.into(),
            timestamp: Utc::now(),
            config_overrides,
        }
    }

    /// Unmatched request stamped with the current time
    pub fn unmatched(context: &RoutingContext) -> Self {
        Self::UnmatchedRequest {
            timestamp: Utc::now(),
            context_hash: context_fingerprint(context),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RoutingDecision { timestamp, .. } | Self::UnmatchedRequest { timestamp, .. } => {
                *timestamp
            }
        }
    }

    /// Same event with a different timestamp
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        match &mut self {
            Self::RoutingDecision { timestamp, .. } | Self::UnmatchedRequest { timestamp, .. } => {
                *timestamp = at
            }
        }
        self
    }

    pub fn agent(&self) -> Option<&str> {
        match self {
            Self::RoutingDecision { agent, .. } => Some(agent.as_str()),
            Self::UnmatchedRequest { .. } => None,
        }
    }

    pub fn matcher_type(&self) -> Option<&str> {
        match self {
            Self::RoutingDecision { matcher_type, .. } => Some(matcher_type.as_str()),
            Self::UnmatchedRequest { .. } => None,
        }
    }

    pub fn is_unmatched(&self) -> bool {
        matches!(self, Self::UnmatchedRequest { .. })
    }
}

/// Short, stable fingerprint of a request, so raw input is never persisted
pub fn context_fingerprint(context: &RoutingContext) -> String {
    let mut hasher = Sha256::new();
    hasher.update(context.input.as_bytes());
    if let Some(project) = &context.project {
        for file in &project.files {
            hasher.update(b"\0f:");
            hasher.update(file.as_bytes());
        }
        for dep in &project.dependencies {
            hasher.update(b"\0d:");
            hasher.update(dep.as_bytes());
        }
    }
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

/// On-disk snapshot, also returned by `export_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub events: Vec<AnalyticsEvent>,
    #[serde(default)]
    pub agent_metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub matcher_metrics: BTreeMap<String, Value>,
    pub total_events: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_event_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_timestamp: Option<DateTime<Utc>>,
    pub version: String,
}

impl AnalyticsSnapshot {
    /// Build a snapshot from events, sorting them by timestamp
    pub fn from_events(mut events: Vec<AnalyticsEvent>) -> Self {
        events.sort_by_key(AnalyticsEvent::timestamp);
        Self {
            first_event_timestamp: events.first().map(AnalyticsEvent::timestamp),
            last_event_timestamp: events.last().map(AnalyticsEvent::timestamp),
            total_events: events.len(),
            events,
            agent_metrics: BTreeMap::new(),
            matcher_metrics: BTreeMap::new(),
            version: SNAPSHOT_VERSION.to_string(),
        }
    }
}

/// Counts computed over the in-memory log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_events: usize,
    pub routing_decisions: usize,
    pub unmatched_requests: usize,
    pub by_agent: BTreeMap<String, u64>,
    pub by_matcher: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_event_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_timestamp: Option<DateTime<Utc>>,
}
