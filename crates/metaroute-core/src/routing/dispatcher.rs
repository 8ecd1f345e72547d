//! Request dispatch through chains of meta-agents
//!
//! Drives one request from its entry meta-agent to a terminal decision:
//! resolve, log, record analytics, and, when the chosen target is itself a
//! meta-agent, prove the hop cycle-free before tracking it and resolving again.
//! A hop that fails the cycle check aborts the whole chain.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::logger::RoutingLogger;
use super::registry::DelegationRegistry;
use super::types::{ResolvedConfig, RoutingContext};
use crate::analytics::{AnalyticsEvent, AnalyticsStore};
use crate::error::{Error, Result};

/// Terminal state of one dispatched request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Agents visited in order, ending with the final target when one matched
    pub path: Vec<String>,
    /// One decision per resolved hop
    pub decisions: Vec<ResolvedConfig>,
    /// The final decision, `None` when the last meta-agent matched nothing
    pub resolved: Option<ResolvedConfig>,
    /// Number of meta-agent to meta-agent delegations taken
    pub hops: usize,
}

impl DispatchOutcome {
    pub fn is_matched(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Registry plus its observability collaborators
pub struct Dispatcher {
    registry: DelegationRegistry,
    logger: RoutingLogger,
    analytics: Option<AnalyticsStore>,
}

impl Dispatcher {
    /// Create a dispatcher; the registry records full traces when the logger is in debug mode
    pub fn new(registry: DelegationRegistry, logger: RoutingLogger) -> Self {
        let registry = registry.with_trace(logger.debug_mode());
        Self {
            registry,
            logger,
            analytics: None,
        }
    }

    /// Record every decision in an analytics store
    pub fn with_analytics(mut self, analytics: AnalyticsStore) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn registry(&self) -> &DelegationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DelegationRegistry {
        &mut self.registry
    }

    pub fn analytics(&self) -> Option<&AnalyticsStore> {
        self.analytics.as_ref()
    }

    pub fn analytics_mut(&mut self) -> Option<&mut AnalyticsStore> {
        self.analytics.as_mut()
    }

    /// Route a request starting at `agent`
    pub fn dispatch(&mut self, agent: &str, context: &RoutingContext) -> Result<DispatchOutcome> {
        let max_depth = self.registry.max_depth();
        let mut current = agent.to_string();
        let mut path = vec![current.clone()];
        let mut decisions: Vec<ResolvedConfig> = Vec::new();

        loop {
            let resolution = self.registry.resolve_traced(&current, context)?;

            let Some(resolved) = resolution.resolved else {
                info!(agent = %current, "Request matched no routing rule");
                self.record(AnalyticsEvent::unmatched(context));
                return Ok(DispatchOutcome {
                    hops: path.len() - 1,
                    path,
                    decisions,
                    resolved: None,
                });
            };

            let trace = self
                .logger
                .debug_mode()
                .then_some(resolution.evaluations.as_slice());
            self.logger.log_routing_decision(
                &resolved.agent,
                &resolved.matcher_type,
                &resolved.reason,
                resolved.overrides.as_ref(),
                trace,
            );
            self.record(AnalyticsEvent::routing_decision(
                &resolved.agent,
                &resolved.matcher_type,
                resolved.overrides.clone(),
            ));

            let target = resolved.agent.clone();
            decisions.push(resolved.clone());

            if !self.registry.is_meta_agent(&target) {
                let hops = path.len() - 1;
                path.push(target);
                return Ok(DispatchOutcome {
                    path,
                    decisions,
                    resolved: Some(resolved),
                    hops,
                });
            }

            let hops_taken = path.len() - 1;
            let hop = if hops_taken >= max_depth {
                Err(Error::CircularDelegation {
                    from: current.clone(),
                    to: target.clone(),
                    max_depth,
                })
            } else {
                self.registry.delegate(&current, &target, Some(max_depth))
            };
            if let Err(e) = hop {
                warn!(
                    from = %current,
                    to = %target,
                    hops_taken,
                    max_depth,
                    "Rejected delegation"
                );
                return Err(e);
            }

            path.push(target.clone());
            current = target;
        }
    }

    fn record(&mut self, event: AnalyticsEvent) {
        if let Some(analytics) = self.analytics.as_mut() {
            analytics.record_event(event);
        }
    }
}
