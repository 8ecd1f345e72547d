//! Agent catalog loading
//!
//! A catalog is plain data (TOML or JSON) naming meta-agents and the base
//! configurations of the workers they delegate to:
//!
//! ```toml
//! [agents.coordinator]
//! model = "anthropic/claude-sonnet-4"
//!
//! [[agents.coordinator.rules]]
//! matcher = { type = "keyword", keywords = ["test", "spec"] }
//! target_agent = "tester"
//! config_overrides = { temperature = 0.2 }
//!
//! [[agents.coordinator.rules]]
//! matcher = { type = "always" }
//! target_agent = "generalist"
//!
//! [workers.tester]
//! model = "anthropic/claude-haiku-4"
//! prompt = "You write focused unit tests."
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::routing::{AgentConfig, DelegationRegistry, Matcher, MetaAgentDefinition, compile_regex};

/// Meta-agent definitions and worker base configs keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentCatalog {
    #[serde(default)]
    pub agents: BTreeMap<String, MetaAgentDefinition>,
    #[serde(default)]
    pub workers: BTreeMap<String, AgentConfig>,
}

impl AgentCatalog {
    /// Parse a TOML catalog
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let catalog: AgentCatalog =
            toml::from_str(contents).context("Failed to parse TOML agent catalog")?;
        catalog.normalized()
    }

    /// Parse a JSON catalog
    pub fn from_json_str(contents: &str) -> anyhow::Result<Self> {
        let catalog: AgentCatalog =
            serde_json::from_str(contents).context("Failed to parse JSON agent catalog")?;
        catalog.normalized()
    }

    /// Load a catalog file, choosing the format by extension
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent catalog: {}", path.display()))?;

        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("toml") | None => Self::from_toml_str(&contents),
            Some(other) => Err(anyhow!("Unsupported catalog format: .{}", other)),
        }
        .with_context(|| format!("Invalid agent catalog: {}", path.display()))?;

        info!(
            agents = catalog.agents.len(),
            workers = catalog.workers.len(),
            path = %path.display(),
            "Loaded agent catalog"
        );
        Ok(catalog)
    }

    /// Fill names from keys, derive delegate lists, and check rule targets
    fn normalized(mut self) -> anyhow::Result<Self> {
        for (key, definition) in self.agents.iter_mut() {
            if definition.name.is_empty() {
                definition.name = key.clone();
            } else if definition.name != *key {
                return Err(anyhow!(
                    "Agent '{}' declares a different name '{}'",
                    key,
                    definition.name
                ));
            }

            if definition.delegates.is_empty() {
                for rule in &definition.routing_rules {
                    if !definition.delegates.contains(&rule.target_agent) {
                        definition.delegates.push(rule.target_agent.clone());
                    }
                }
            }

            for (index, rule) in definition.routing_rules.iter().enumerate() {
                if !definition.delegates.contains(&rule.target_agent) {
                    return Err(anyhow!(
                        "Agent '{}' rule {} targets '{}', which is not in its delegates",
                        key,
                        index,
                        rule.target_agent
                    ));
                }
                // Broken patterns stay loadable; they simply never match.
                if let Matcher::Regex { pattern, flags } = &rule.matcher
                    && let Err(e) = compile_regex(pattern, flags.as_deref())
                {
                    warn!(agent = %key, rule = index, error = %e, "Rule will never match");
                }
            }
        }
        Ok(self)
    }

    /// Register every agent and worker into a new registry
    pub fn into_registry(self) -> DelegationRegistry {
        let mut registry = DelegationRegistry::new();
        self.register_into(&mut registry);
        registry
    }

    /// Register every agent and worker into an existing registry
    pub fn register_into(self, registry: &mut DelegationRegistry) {
        for (name, config) in self.workers {
            registry.register_worker(name, config);
        }
        for (name, definition) in self.agents {
            registry.register(name, definition);
        }
    }
}
