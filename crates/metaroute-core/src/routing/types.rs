//! Types for declarative meta-agent routing
//!
//! This module defines the data model the resolver works over: meta-agent
//! definitions, their ordered routing rules, the closed set of matcher shapes,
//! and the per-request context a matcher is evaluated against.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A named routing profile that maps requests to delegate configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAgentDefinition {
    /// Agent name (filled from the catalog key when omitted)
    #[serde(default)]
    pub name: String,
    /// Base model identifier used when a delegate declares no model of its own
    pub model: String,
    /// Ordered routing rules; the first matching rule wins
    #[serde(default, rename = "rules")]
    pub routing_rules: Vec<RoutingRule>,
    /// Delegate names this meta-agent may target
    #[serde(default)]
    pub delegates: Vec<String>,
    /// Optional fixed prompt template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl MetaAgentDefinition {
    /// Create a new definition with no rules
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            routing_rules: Vec::new(),
            delegates: Vec::new(),
            prompt_template: None,
        }
    }

    /// Append a routing rule (and record its target as a delegate)
    pub fn with_rule(mut self, rule: RoutingRule) -> Self {
        if !self.delegates.contains(&rule.target_agent) {
            self.delegates.push(rule.target_agent.clone());
        }
        self.routing_rules.push(rule);
        self
    }

    /// Set the fixed prompt template
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }
}

/// One matcher-to-target rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub matcher: Matcher,
    #[serde(alias = "target")]
    pub target_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_overrides: Option<ConfigOverrides>,
}

impl RoutingRule {
    /// Create a rule without overrides
    pub fn new(matcher: Matcher, target_agent: impl Into<String>) -> Self {
        Self {
            matcher,
            target_agent: target_agent.into(),
            config_overrides: None,
        }
    }

    /// Attach config overrides applied when this rule wins
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.config_overrides = Some(overrides);
        self
    }
}

/// Predicate deciding whether a rule applies to a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Matcher {
    /// Case-insensitive keyword search
    Keyword {
        keywords: Vec<String>,
        #[serde(default)]
        mode: KeywordMode,
    },
    /// Observed input complexity at or above a threshold
    Complexity { threshold: ComplexityLevel },
    /// Regular expression against the raw input
    Regex {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
    },
    /// Required files and dependencies in the project snapshot
    ProjectContext {
        #[serde(default)]
        has_files: Vec<String>,
        #[serde(default)]
        has_deps: Vec<String>,
    },
    /// Unconditional
    Always,
}

impl Matcher {
    /// Convenience constructor for an `any` keyword matcher
    pub fn keywords_any<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keyword {
            keywords: keywords.into_iter().map(Into::into).collect(),
            mode: KeywordMode::Any,
        }
    }

    /// Convenience constructor for an `all` keyword matcher
    pub fn keywords_all<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keyword {
            keywords: keywords.into_iter().map(Into::into).collect(),
            mode: KeywordMode::All,
        }
    }

    /// Convenience constructor for a regex matcher without flags
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            flags: None,
        }
    }

    /// Stable type tag, as written to logs and analytics
    pub fn matcher_type(&self) -> &'static str {
        match self {
            Self::Keyword { .. } => "keyword",
            Self::Complexity { .. } => "complexity",
            Self::Regex { .. } => "regex",
            Self::ProjectContext { .. } => "project_context",
            Self::Always => "always",
        }
    }
}

/// How a keyword matcher combines its keywords
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMode {
    #[default]
    Any,
    All,
}

/// Complexity tiers, ordered low < medium < high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for ComplexityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown complexity level: {}", s)),
        }
    }
}

/// Per-rule configuration overrides
///
/// Named fields cover the common knobs; anything else goes in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.prompt.is_none()
            && self.variant.is_none()
            && self.model.is_none()
            && self.temperature.is_none()
            && self.extra.is_empty()
    }
}

/// Concrete configuration of a delegate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AgentConfig {
    /// Produce a new config with `overrides` applied key-by-key
    pub fn merged(&self, overrides: &ConfigOverrides) -> AgentConfig {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }

        AgentConfig {
            model: overrides.model.clone().or_else(|| self.model.clone()),
            temperature: overrides.temperature.or(self.temperature),
            prompt: overrides.prompt.clone().or_else(|| self.prompt.clone()),
            variant: overrides.variant.clone().or_else(|| self.variant.clone()),
            extra,
        }
    }
}

/// Project files and dependencies supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ProjectSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn has_file(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }

    pub fn has_dependency(&self, dep: &str) -> bool {
        self.dependencies.iter().any(|d| d == dep)
    }
}

/// Immutable snapshot of one incoming request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingContext {
    /// Raw request text
    pub input: String,
    /// Project snapshot, when the caller has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSnapshot>,
}

impl RoutingContext {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            project: None,
        }
    }

    pub fn with_project(mut self, project: ProjectSnapshot) -> Self {
        self.project = Some(project);
        self
    }
}

/// Result of evaluating one matcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matched: bool,
    pub reason: String,
}

impl MatchOutcome {
    pub fn matched(reason: impl Into<String>) -> Self {
        Self {
            matched: true,
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            reason: reason.into(),
        }
    }
}

/// Trace entry for one evaluated rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    pub rule_index: usize,
    pub matcher_type: String,
    pub target_agent: String,
    pub matched: bool,
    pub reason: String,
}

/// The delegate configuration a request resolved to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Target agent name
    pub agent: String,
    /// Type of the matcher that won
    pub matcher_type: String,
    /// Evaluator reason for the winning match
    pub reason: String,
    /// Index of the winning rule
    pub rule_index: usize,
    /// Base configuration with overrides applied
    pub config: AgentConfig,
    /// Overrides of the winning rule, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
    /// Full trace, only populated in trace mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evaluations: Vec<RuleEvaluation>,
    /// Number of rules evaluated to produce this decision
    pub rules_evaluated: usize,
}
