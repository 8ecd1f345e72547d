//! Metaroute Core Library
//!
//! This crate decides which delegate a request should go to and records that
//! decision. It provides:
//! - Matcher evaluation and first-match-wins rule resolution
//! - A delegation registry with depth-bounded cycle detection
//! - Routing decision logging (console, file, or disabled)
//! - A retention-pruned analytics event store
//! - Configuration and agent catalog loading
//!
//! It never executes requests or talks to a model.

pub mod analytics;
pub mod config;
pub mod error;
pub mod routing;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{AgentCatalog, Config};
    pub use crate::error::{Error, Result};
    pub use crate::routing::{
        DelegationRegistry, Dispatcher, Matcher, MetaAgentDefinition, RoutingContext, RoutingRule,
    };
}
