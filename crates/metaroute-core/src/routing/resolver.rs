//! First-match-wins rule resolution
//!
//! The resolver walks a definition's rules in declared order and stops at the
//! first matching rule. In trace mode the remaining rules are still evaluated,
//! but only to fill the diagnostic trace; the decision never changes.

use std::collections::HashMap;

use tracing::debug;

use super::matcher::evaluate;
use super::types::{AgentConfig, MetaAgentDefinition, ResolvedConfig, RoutingContext, RuleEvaluation};

/// Outcome of resolving one definition, with the evaluation trace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// The chosen configuration, `None` when no rule matched
    pub resolved: Option<ResolvedConfig>,
    /// Evaluations in rule order (every rule in trace mode, up to the winner otherwise)
    pub evaluations: Vec<RuleEvaluation>,
}

/// Stateless first-match-wins resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingResolver {
    trace: bool,
}

impl RoutingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate every rule for the diagnostic trace
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace
    }

    /// Resolve a definition against a context
    ///
    /// `workers` supplies declared base configurations by target name.
    pub fn resolve(
        &self,
        definition: &MetaAgentDefinition,
        workers: &HashMap<String, AgentConfig>,
        context: &RoutingContext,
    ) -> Option<ResolvedConfig> {
        self.resolve_traced(definition, workers, context).resolved
    }

    /// Resolve and keep the evaluation trace
    pub fn resolve_traced(
        &self,
        definition: &MetaAgentDefinition,
        workers: &HashMap<String, AgentConfig>,
        context: &RoutingContext,
    ) -> Resolution {
        let mut evaluations = Vec::new();
        let mut winner: Option<usize> = None;

        for (index, rule) in definition.routing_rules.iter().enumerate() {
            if winner.is_some() && !self.trace {
                break;
            }

            let outcome = evaluate(&rule.matcher, context);
            evaluations.push(RuleEvaluation {
                rule_index: index,
                matcher_type: rule.matcher.matcher_type().to_string(),
                target_agent: rule.target_agent.clone(),
                matched: outcome.matched,
                reason: outcome.reason,
            });

            if outcome.matched && winner.is_none() {
                winner = Some(index);
            }
        }

        let Some(index) = winner else {
            debug!(
                agent = %definition.name,
                rules = evaluations.len(),
                "No routing rule matched"
            );
            return Resolution {
                resolved: None,
                evaluations,
            };
        };

        let rule = &definition.routing_rules[index];
        let base = base_config(definition, workers, &rule.target_agent);
        let config = match &rule.config_overrides {
            Some(overrides) => base.merged(overrides),
            None => base,
        };

        let resolved = ResolvedConfig {
            agent: rule.target_agent.clone(),
            matcher_type: rule.matcher.matcher_type().to_string(),
            reason: evaluations[index].reason.clone(),
            rule_index: index,
            config,
            overrides: rule.config_overrides.clone(),
            evaluations: if self.trace {
                evaluations.clone()
            } else {
                Vec::new()
            },
            rules_evaluated: evaluations.len(),
        };

        debug!(
            agent = %definition.name,
            target = %resolved.agent,
            rule_index = index,
            matcher = %resolved.matcher_type,
            "Routing rule matched"
        );

        Resolution {
            resolved: Some(resolved),
            evaluations,
        }
    }
}

/// Base configuration for a target before overrides
///
/// A declared worker config wins; missing model and prompt fall back to the
/// meta-agent's base model and prompt template.
pub fn base_config(
    definition: &MetaAgentDefinition,
    workers: &HashMap<String, AgentConfig>,
    target: &str,
) -> AgentConfig {
    let mut base = workers.get(target).cloned().unwrap_or_default();
    if base.model.is_none() {
        base.model = Some(definition.model.clone());
    }
    if base.prompt.is_none() {
        base.prompt = definition.prompt_template.clone();
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::types::{ConfigOverrides, Matcher, RoutingRule};

    fn definition() -> MetaAgentDefinition {
        MetaAgentDefinition::new("coordinator", "base-model")
            .with_rule(
                RoutingRule::new(Matcher::keywords_any(["test"]), "tester")
                    .with_overrides(ConfigOverrides::new().with_temperature(0.1)),
            )
            .with_rule(RoutingRule::new(
                Matcher::keywords_any(["crash", "stack trace"]),
                "debugger",
            ))
            .with_rule(RoutingRule::new(Matcher::Always, "generalist"))
    }

    fn no_workers() -> HashMap<String, AgentConfig> {
        HashMap::new()
    }

    #[test]
    fn test_first_match_wins() {
        let resolver = RoutingResolver::new();
        let def = definition();

        let resolved = resolver
            .resolve(&def, &no_workers(), &RoutingContext::new("a test that crashed"))
            .unwrap();
        assert_eq!(resolved.agent, "tester");
        assert_eq!(resolved.rule_index, 0);
        assert_eq!(resolved.rules_evaluated, 1);
        assert!(resolved.evaluations.is_empty());
    }

    #[test]
    fn test_falls_through_to_always() {
        let resolver = RoutingResolver::new();
        let resolved = resolver
            .resolve(&definition(), &no_workers(), &RoutingContext::new("hello there"))
            .unwrap();
        assert_eq!(resolved.agent, "generalist");
        assert_eq!(resolved.matcher_type, "always");
        assert_eq!(resolved.rules_evaluated, 3);
    }

    #[test]
    fn test_no_match_returns_none() {
        let def = MetaAgentDefinition::new("narrow", "m")
            .with_rule(RoutingRule::new(Matcher::keywords_any(["deploy"]), "ops"));
        let resolution =
            RoutingResolver::new().resolve_traced(&def, &no_workers(), &RoutingContext::new("hi"));
        assert!(resolution.resolved.is_none());
        assert_eq!(resolution.evaluations.len(), 1);
        assert!(!resolution.evaluations[0].matched);
    }

    #[test]
    fn test_trace_evaluates_all_rules_without_changing_decision() {
        let def = definition();
        let context = RoutingContext::new("run the unit tests now");

        let plain = RoutingResolver::new()
            .resolve(&def, &no_workers(), &context)
            .unwrap();
        let traced = RoutingResolver::new()
            .with_trace(true)
            .resolve(&def, &no_workers(), &context)
            .unwrap();

        assert_eq!(plain.agent, traced.agent);
        assert_eq!(plain.config, traced.config);
        assert_eq!(traced.rules_evaluated, 3);
        assert_eq!(traced.evaluations.len(), 3);
        assert!(traced.evaluations[0].matched);
        assert!(!traced.evaluations[1].matched);
        assert!(traced.evaluations[2].matched);
    }

    #[test]
    fn test_overrides_merge_onto_worker_base() {
        let def = definition();
        let mut workers = HashMap::new();
        workers.insert(
            "tester".to_string(),
            AgentConfig {
                model: Some("tester-model".into()),
                temperature: Some(0.5),
                prompt: Some("You write tests.".into()),
                ..Default::default()
            },
        );

        let resolved = RoutingResolver::new()
            .resolve(&def, &workers, &RoutingContext::new("write a test"))
            .unwrap();

        assert_eq!(resolved.config.model.as_deref(), Some("tester-model"));
        assert_eq!(resolved.config.temperature, Some(0.1));
        assert_eq!(resolved.config.prompt.as_deref(), Some("You write tests."));
        // stored worker config is not mutated
        assert_eq!(workers["tester"].temperature, Some(0.5));
    }

    #[test]
    fn test_base_falls_back_to_definition_model_and_template() {
        let def = definition().with_prompt_template("Route carefully.");
        let base = base_config(&def, &no_workers(), "generalist");
        assert_eq!(base.model.as_deref(), Some("base-model"));
        assert_eq!(base.prompt.as_deref(), Some("Route carefully."));
    }

    #[test]
    fn test_reordering_non_matching_rules_keeps_outcome() {
        let a = RoutingRule::new(Matcher::keywords_any(["deploy"]), "ops");
        let b = RoutingRule::new(Matcher::regex("^SELECT"), "sql");
        let fallback = RoutingRule::new(Matcher::Always, "generalist");

        let first = MetaAgentDefinition::new("x", "m")
            .with_rule(a.clone())
            .with_rule(b.clone())
            .with_rule(fallback.clone());
        let second = MetaAgentDefinition::new("x", "m")
            .with_rule(b)
            .with_rule(a)
            .with_rule(fallback);

        let context = RoutingContext::new("summarize this");
        let resolver = RoutingResolver::new();
        assert_eq!(
            resolver.resolve(&first, &no_workers(), &context).unwrap().agent,
            resolver.resolve(&second, &no_workers(), &context).unwrap().agent
        );
    }
}
