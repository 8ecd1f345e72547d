//! Declarative meta-agent routing
//!
//! A meta-agent is a named routing profile: an ordered list of rules, each a
//! matcher plus a target delegate. The key components are:
//!
//! - **Matcher evaluation**: pure predicates over the request text and an
//!   optional project snapshot (keyword, complexity, regex, project context,
//!   always).
//!
//! - **Resolver**: first-match-wins over the rule list, merging the winning
//!   rule's config overrides onto the target's base configuration.
//!
//! - **Delegation registry**: owns the definitions and the delegation graph,
//!   and proves each meta-agent to meta-agent hop cycle-free before it is
//!   tracked.
//!
//! - **Routing logger**: records each decision to the console or a file.
//!
//! ## Example
//!
//! ```rust,ignore
//! use metaroute_core::routing::{
//!     DelegationRegistry, Dispatcher, Matcher, MetaAgentDefinition, RoutingContext,
//!     RoutingLogger, RoutingRule,
//! };
//!
//! let mut registry = DelegationRegistry::new();
//! registry.register(
//!     "coordinator",
//!     MetaAgentDefinition::new("coordinator", "anthropic/claude-sonnet-4")
//!         .with_rule(RoutingRule::new(Matcher::keywords_any(["test"]), "tester"))
//!         .with_rule(RoutingRule::new(Matcher::Always, "generalist")),
//! );
//!
//! let mut dispatcher = Dispatcher::new(registry, RoutingLogger::default());
//! let outcome = dispatcher.dispatch("coordinator", &RoutingContext::new("run the tests"))?;
//! assert_eq!(outcome.resolved.unwrap().agent, "tester");
//! ```

mod dispatcher;
mod graph;
mod logger;
mod matcher;
mod registry;
mod resolver;
mod types;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use graph::{DEFAULT_MAX_DEPTH, DelegationEdge, DelegationGraph};
pub use logger::{DebugInfo, EvaluationSummary, LogOutput, LoggerConfig, RoutingLogEntry, RoutingLogger};
pub use matcher::{
    LOW_COMPLEXITY_MAX_CHARS, MEDIUM_COMPLEXITY_MAX_CHARS, compile_regex, evaluate,
    observed_complexity,
};
pub use registry::DelegationRegistry;
pub use resolver::{Resolution, RoutingResolver, base_config};
pub use types::{
    AgentConfig, ComplexityLevel, ConfigOverrides, KeywordMode, MatchOutcome, Matcher,
    MetaAgentDefinition, ProjectSnapshot, ResolvedConfig, RoutingContext, RoutingRule,
    RuleEvaluation,
};
