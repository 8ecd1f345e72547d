//! Best-effort analytics event store
//!
//! Events live in an in-memory, arrival-ordered log that is pruned by age and
//! count and snapshotted to a JSON file after every write. All persistence
//! failures are reported through `tracing` and swallowed; reads never touch
//! the disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::types::{AnalyticsEvent, AnalyticsSnapshot, AnalyticsSummary};
use crate::error::{Error, Result};

/// Analytics store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub storage_file: PathBuf,
    pub max_events: usize,
    pub retention_days: u32,
    pub auto_prune: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_file: PathBuf::from("analytics.json"),
            max_events: 10_000,
            retention_days: 90,
            auto_prune: true,
        }
    }
}

/// Only the part of a snapshot needed to restore state
#[derive(Deserialize)]
struct StoredEvents {
    events: Vec<AnalyticsEvent>,
}

/// Append-only, self-pruning event log with a JSON snapshot on disk
#[derive(Debug, Clone)]
pub struct AnalyticsStore {
    config: AnalyticsConfig,
    events: Vec<AnalyticsEvent>,
}

impl AnalyticsStore {
    /// Open the store, loading any existing snapshot
    ///
    /// A missing or unreadable snapshot starts an empty log.
    pub fn open(config: AnalyticsConfig) -> Self {
        let mut store = Self {
            config,
            events: Vec::new(),
        };
        if !store.config.enabled {
            return store;
        }

        match load_events(&store.config.storage_file) {
            Ok(Some(events)) => {
                info!(
                    count = events.len(),
                    path = %store.config.storage_file.display(),
                    "Loaded analytics events"
                );
                store.events = events;
                if store.config.auto_prune {
                    store.prune();
                }
            }
            Ok(None) => {
                debug!(
                    path = %store.config.storage_file.display(),
                    "No analytics snapshot found, starting empty"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    code = e.code(),
                    path = %store.config.storage_file.display(),
                    "Ignoring unreadable analytics snapshot"
                );
            }
        }
        store
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Append an event, prune if configured, then persist
    pub fn record_event(&mut self, event: AnalyticsEvent) {
        if !self.config.enabled {
            return;
        }
        self.events.push(event);
        if self.config.auto_prune {
            self.prune();
        }
        self.save();
    }

    /// Prune relative to the current time, returning how many events were dropped
    pub fn prune(&mut self) -> usize {
        self.prune_at(Utc::now())
    }

    /// Prune relative to `now`
    ///
    /// Drops events older than the retention window, then the oldest excess
    /// beyond `max_events` from the front of the log.
    pub fn prune_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.events.len();
        // A window reaching past the representable range keeps everything.
        let cutoff = Duration::try_days(i64::from(self.config.retention_days))
            .and_then(|window| now.checked_sub_signed(window));
        if let Some(cutoff) = cutoff {
            self.events.retain(|e| e.timestamp() >= cutoff);
        }

        if self.events.len() > self.config.max_events {
            let excess = self.events.len() - self.config.max_events;
            self.events.drain(..excess);
        }

        let removed = before - self.events.len();
        if removed > 0 {
            debug!(removed, remaining = self.events.len(), "Pruned analytics events");
        }
        removed
    }

    /// All events in arrival order
    pub fn get_all_events(&self) -> Vec<AnalyticsEvent> {
        if !self.config.enabled {
            return Vec::new();
        }
        self.events.clone()
    }

    /// Events with `start <= timestamp <= end`
    pub fn get_events_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<AnalyticsEvent> {
        self.filtered(|e| {
            let ts = e.timestamp();
            ts >= start && ts <= end
        })
    }

    /// Routing decisions that targeted `agent`
    pub fn get_events_by_agent(&self, agent: &str) -> Vec<AnalyticsEvent> {
        self.filtered(|e| e.agent() == Some(agent))
    }

    /// Routing decisions made by a matcher of `matcher_type`
    pub fn get_events_by_matcher_type(&self, matcher_type: &str) -> Vec<AnalyticsEvent> {
        self.filtered(|e| e.matcher_type() == Some(matcher_type))
    }

    pub fn get_unmatched_requests(&self) -> Vec<AnalyticsEvent> {
        self.filtered(AnalyticsEvent::is_unmatched)
    }

    pub fn get_event_count(&self) -> usize {
        if !self.config.enabled {
            return 0;
        }
        self.events.len()
    }

    fn filtered(&self, predicate: impl Fn(&AnalyticsEvent) -> bool) -> Vec<AnalyticsEvent> {
        if !self.config.enabled {
            return Vec::new();
        }
        self.events.iter().filter(|e| predicate(e)).cloned().collect()
    }

    /// Timestamp-sorted snapshot of the log, exactly as persisted
    pub fn export_data(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot::from_events(self.get_all_events())
    }

    /// Per-agent and per-matcher counts
    pub fn summary(&self) -> AnalyticsSummary {
        let events = self.get_all_events();
        let mut by_agent: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_matcher: BTreeMap<String, u64> = BTreeMap::new();
        let mut unmatched_requests = 0;

        for event in &events {
            match event {
                AnalyticsEvent::RoutingDecision {
                    agent,
                    matcher_type,
                    ..
                } => {
                    *by_agent.entry(agent.clone()).or_default() += 1;
                    *by_matcher.entry(matcher_type.clone()).or_default() += 1;
                }
                AnalyticsEvent::UnmatchedRequest { .. } => unmatched_requests += 1,
            }
        }

        AnalyticsSummary {
            total_events: events.len(),
            routing_decisions: events.len() - unmatched_requests,
            unmatched_requests,
            by_agent,
            by_matcher,
            first_event_timestamp: events.iter().map(AnalyticsEvent::timestamp).min(),
            last_event_timestamp: events.iter().map(AnalyticsEvent::timestamp).max(),
        }
    }

    /// Empty the log and persist the empty snapshot
    pub fn clear(&mut self) {
        if !self.config.enabled {
            return;
        }
        self.events.clear();
        info!("Cleared analytics events");
        self.save();
    }

    /// Persist the current snapshot, swallowing failures
    pub fn save(&self) {
        if !self.config.enabled {
            return;
        }
        if let Err(e) = self.try_save() {
            warn!(
                error = %e,
                path = %self.config.storage_file.display(),
                "Failed to persist analytics snapshot"
            );
        }
    }

    /// Persist the current snapshot, reporting failures
    ///
    /// Writes to a sibling temp file and renames it over the target so a crash
    /// never leaves a truncated snapshot behind.
    pub fn try_save(&self) -> Result<()> {
        let path = &self.config.storage_file;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.export_data())?;
        let tmp = temp_path(path);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "analytics.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn load_events(path: &Path) -> Result<Option<Vec<AnalyticsEvent>>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let stored: StoredEvents =
        serde_json::from_str(&contents).map_err(|e| Error::SchemaInvalid(e.to_string()))?;
    Ok(Some(stored.events))
}
