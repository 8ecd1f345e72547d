//! Delegation registry
//!
//! Owns the meta-agent definitions, the declared worker base configurations,
//! and the delegation graph. Registration is single-writer; nothing here is
//! internally synchronized.

use std::collections::HashMap;

use tracing::{debug, info};

use super::graph::{DEFAULT_MAX_DEPTH, DelegationGraph};
use super::resolver::{Resolution, RoutingResolver};
use super::types::{AgentConfig, MetaAgentDefinition, ResolvedConfig, RoutingContext};
use crate::error::{Error, Result};

/// Registry of meta-agents plus the delegation graph between them
#[derive(Debug, Clone, Default)]
pub struct DelegationRegistry {
    definitions: HashMap<String, MetaAgentDefinition>,
    workers: HashMap<String, AgentConfig>,
    graph: DelegationGraph,
    resolver: RoutingResolver,
    max_depth: Option<usize>,
}

impl DelegationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a resolver that records the full evaluation trace
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.resolver = self.resolver.with_trace(trace);
        self
    }

    /// Override the registry-wide cycle detection depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Registry-wide default hop budget for [`Self::check_circular`]
    pub fn max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Store or wholesale-replace a definition
    pub fn register(&mut self, name: impl Into<String>, definition: MetaAgentDefinition) {
        let name = name.into();
        let replaced = self.definitions.insert(name.clone(), definition).is_some();
        info!(agent = %name, replaced, "Registered meta-agent");
    }

    /// Declare the base configuration of a delegate
    pub fn register_worker(&mut self, name: impl Into<String>, config: AgentConfig) {
        let name = name.into();
        debug!(worker = %name, "Registered worker config");
        self.workers.insert(name, config);
    }

    /// Look up a definition
    pub fn get(&self, name: &str) -> Option<&MetaAgentDefinition> {
        self.definitions.get(name)
    }

    /// Whether `name` is a registered meta-agent
    pub fn is_meta_agent(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Declared base configuration of a worker
    pub fn worker(&self, name: &str) -> Option<&AgentConfig> {
        self.workers.get(name)
    }

    /// Registered meta-agent names, sorted
    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Declared worker names, sorted
    pub fn worker_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolve a request against a registered meta-agent
    ///
    /// Returns `Ok(None)` when no rule matched; the fallback is the caller's call.
    pub fn resolve(&self, name: &str, context: &RoutingContext) -> Result<Option<ResolvedConfig>> {
        Ok(self.resolve_traced(name, context)?.resolved)
    }

    /// Resolve and keep the evaluation trace
    pub fn resolve_traced(&self, name: &str, context: &RoutingContext) -> Result<Resolution> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| Error::AgentNotFound(name.to_string()))?;
        Ok(self
            .resolver
            .resolve_traced(definition, &self.workers, context))
    }

    /// Record a delegation hop
    ///
    /// `to` need not be registered: chains may end at a plain worker.
    pub fn track_delegation(&mut self, from: &str, to: &str) {
        self.graph.track(from, to);
        debug!(
            from,
            to,
            count = self.graph.edge_count(from, to),
            "Tracked delegation"
        );
    }

    /// Whether the hop `from -> to` would loop back within `max_depth` hops
    ///
    /// `None` uses the registry-wide default.
    pub fn check_circular(&self, from: &str, to: &str, max_depth: Option<usize>) -> bool {
        let depth = max_depth.unwrap_or_else(|| self.max_depth());
        let circular = self.graph.would_cycle(from, to, depth);
        if circular {
            debug!(from, to, depth, "Circular delegation detected");
        }
        circular
    }

    /// Check then track a hop, failing instead of tracking when it would cycle
    pub fn delegate(&mut self, from: &str, to: &str, max_depth: Option<usize>) -> Result<()> {
        let depth = max_depth.unwrap_or_else(|| self.max_depth());
        if self.check_circular(from, to, Some(depth)) {
            return Err(Error::CircularDelegation {
                from: from.to_string(),
                to: to.to_string(),
                max_depth: depth,
            });
        }
        self.track_delegation(from, to);
        Ok(())
    }

    /// The delegation graph
    pub fn graph(&self) -> &DelegationGraph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::types::{Matcher, RoutingRule};

    fn coordinator() -> MetaAgentDefinition {
        MetaAgentDefinition::new("coordinator", "base")
            .with_rule(RoutingRule::new(Matcher::keywords_any(["test"]), "tester"))
            .with_rule(RoutingRule::new(Matcher::Always, "generalist"))
    }

    #[test]
    fn test_resolve_unregistered_is_not_found() {
        let registry = DelegationRegistry::new();
        let err = registry
            .resolve("ghost", &RoutingContext::new("hi"))
            .unwrap_err();
        assert!(matches!(err, Error::AgentNotFound(ref name) if name == "ghost"));
    }

    #[test]
    fn test_resolve_delegates_to_resolver() {
        let mut registry = DelegationRegistry::new();
        registry.register("coordinator", coordinator());

        let resolved = registry
            .resolve("coordinator", &RoutingContext::new("run the unit tests now"))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.agent, "tester");
    }

    #[test]
    fn test_resolve_passes_through_no_match() {
        let mut registry = DelegationRegistry::new();
        registry.register(
            "narrow",
            MetaAgentDefinition::new("narrow", "m")
                .with_rule(RoutingRule::new(Matcher::keywords_any(["deploy"]), "ops")),
        );
        assert!(
            registry
                .resolve("narrow", &RoutingContext::new("hi"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_register_replaces_wholesale() {
        let mut registry = DelegationRegistry::new();
        registry.register("coordinator", coordinator());
        registry.register(
            "coordinator",
            MetaAgentDefinition::new("coordinator", "other")
                .with_rule(RoutingRule::new(Matcher::Always, "solo")),
        );

        assert_eq!(registry.len(), 1);
        let def = registry.get("coordinator").unwrap();
        assert_eq!(def.model, "other");
        assert_eq!(def.routing_rules.len(), 1);
    }

    #[test]
    fn test_track_then_check_circular() {
        let mut registry = DelegationRegistry::new();
        registry.track_delegation("a", "b");
        registry.track_delegation("b", "a");

        assert!(registry.check_circular("a", "b", Some(2)));
        assert!(!registry.check_circular("a", "b", Some(0)));
        assert!(registry.check_circular("a", "a", None));
    }

    #[test]
    fn test_track_does_not_require_registration() {
        let mut registry = DelegationRegistry::new();
        registry.track_delegation("coordinator", "plain-worker");
        assert_eq!(registry.graph().edge_count("coordinator", "plain-worker"), 1);
        assert!(!registry.is_meta_agent("plain-worker"));
    }

    #[test]
    fn test_delegate_rejects_cycle_without_tracking() {
        let mut registry = DelegationRegistry::new().with_max_depth(4);
        registry.delegate("a", "b", None).unwrap();
        registry.delegate("b", "c", None).unwrap();

        let err = registry.delegate("c", "a", None).unwrap_err();
        assert!(matches!(
            err,
            Error::CircularDelegation { ref from, ref to, max_depth: 4 } if from == "c" && to == "a"
        ));
        assert_eq!(registry.graph().edge_count("c", "a"), 0);
    }

    #[test]
    fn test_default_max_depth() {
        assert_eq!(DelegationRegistry::new().max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(DelegationRegistry::new().with_max_depth(7).max_depth(), 7);
    }

    #[test]
    fn test_agent_names_sorted() {
        let mut registry = DelegationRegistry::new();
        registry.register("zeta", coordinator());
        registry.register("alpha", coordinator());
        assert_eq!(registry.agent_names(), vec!["alpha", "zeta"]);
    }
}
