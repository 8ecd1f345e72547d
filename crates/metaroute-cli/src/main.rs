//! Metaroute CLI - resolve requests against meta-agent profiles

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use metaroute_core::analytics::{AnalyticsConfig, AnalyticsStore};
use metaroute_core::config::{AgentCatalog, Config};
use metaroute_core::routing::{
    DelegationRegistry, DispatchOutcome, Dispatcher, LoggerConfig, ProjectSnapshot,
    RoutingContext, RoutingLogger,
};
use tracing::debug;

#[derive(Parser)]
#[command(name = "metaroute")]
#[command(author, version, about = "Declarative meta-agent routing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Agent catalog file (overrides routing.catalog_file)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a request against a meta-agent
    Resolve {
        /// Entry meta-agent name
        agent: String,
        /// Raw request text
        input: String,
        /// Files present in the project (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
        /// Declared project dependencies (repeatable)
        #[arg(long = "dep")]
        deps: Vec<String>,
        /// Evaluate every rule and log the full trace
        #[arg(long)]
        trace: bool,
    },

    /// Inspect the agent catalog
    Agents {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Inspect or maintain routing analytics
    Analytics {
        #[command(subcommand)]
        action: AnalyticsAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// List registered meta-agents
    List,
    /// Show one meta-agent definition
    Show { name: String },
}

#[derive(Subcommand)]
enum AnalyticsAction {
    /// Per-agent and per-matcher counts
    Summary,
    /// Print the full snapshot as JSON
    Export,
    /// Apply retention and count limits now
    Prune,
    /// Delete all recorded events
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Print the config file path
    Path,
}

fn init_tracing() -> anyhow::Result<()> {
    // stdout is reserved for command output and console routing logs
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("metaroute=warn".parse()?),
        )
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match init_tracing().and_then(|()| run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Resolve {
            agent,
            input,
            files,
            deps,
            trace,
        } => cmd_resolve(
            cli.catalog.as_ref(),
            &agent,
            input,
            files,
            deps,
            trace,
            cli.format,
            cli.quiet,
        ),
        Commands::Agents { action } => cmd_agents(cli.catalog.as_ref(), action, cli.format),
        Commands::Analytics { action } => cmd_analytics(action, cli.format, cli.quiet),
        Commands::Config { action } => cmd_config(action, cli.quiet),
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<metaroute_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(hint) = core.suggestion() {
                eprintln!("  hint: {}", hint);
            }
        }
        None => eprintln!("Error: {:#}", err),
    }
}

// ============================================================================
// Wiring
// ============================================================================

fn load_registry(config: &Config, catalog: Option<&PathBuf>) -> anyhow::Result<DelegationRegistry> {
    let path = match catalog {
        Some(path) => path.clone(),
        None => config.resolve_path(&config.routing.catalog_file)?,
    };
    debug!(path = %path.display(), "Loading agent catalog");
    Ok(AgentCatalog::load(&path)?
        .into_registry()
        .with_max_depth(config.routing.max_delegation_depth))
}

fn logger_config(config: &Config) -> anyhow::Result<LoggerConfig> {
    let mut logging = config.logging.clone();
    logging.log_file = config.resolve_path(&logging.log_file)?;
    Ok(logging)
}

fn analytics_config(config: &Config) -> anyhow::Result<AnalyticsConfig> {
    let mut analytics = config.analytics.clone();
    analytics.storage_file = config.resolve_path(&analytics.storage_file)?;
    Ok(analytics)
}

// ============================================================================
// Command Implementations
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_resolve(
    catalog: Option<&PathBuf>,
    agent: &str,
    input: String,
    files: Vec<String>,
    deps: Vec<String>,
    trace: bool,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let registry = load_registry(&config, catalog)?;

    let mut logging = logger_config(&config)?;
    logging.debug_mode |= trace;
    let analytics = AnalyticsStore::open(analytics_config(&config)?);

    let mut context = RoutingContext::new(input);
    if !files.is_empty() || !deps.is_empty() {
        context = context.with_project(
            ProjectSnapshot::new()
                .with_files(files)
                .with_dependencies(deps),
        );
    }

    // json and quiet output own stdout, so console routing lines move to stderr
    let logger = RoutingLogger::new(logging)
        .with_console_on_stderr(quiet || format == OutputFormat::Json);
    let mut dispatcher = Dispatcher::new(registry, logger).with_analytics(analytics);
    let outcome = dispatcher.dispatch(agent, &context)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_outcome(&outcome, quiet),
    }
    Ok(())
}

fn print_outcome(outcome: &DispatchOutcome, quiet: bool) {
    let Some(resolved) = &outcome.resolved else {
        println!("No routing rule matched ({})", outcome.path.join(" -> "));
        return;
    };

    if quiet {
        println!("{}", resolved.agent);
        return;
    }

    println!("Route: {}", outcome.path.join(" -> "));
    println!(
        "Matched rule {} ({}): {}",
        resolved.rule_index, resolved.matcher_type, resolved.reason
    );
    if let Some(model) = &resolved.config.model {
        println!("  model: {}", model);
    }
    if let Some(temperature) = resolved.config.temperature {
        println!("  temperature: {}", temperature);
    }
    if let Some(variant) = &resolved.config.variant {
        println!("  variant: {}", variant);
    }
    for (key, value) in &resolved.config.extra {
        println!("  {}: {}", key, value);
    }
}

fn cmd_agents(
    catalog: Option<&PathBuf>,
    action: AgentAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let registry = load_registry(&config, catalog)?;

    match action {
        AgentAction::List => {
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&registry.agent_names())?);
                return Ok(());
            }
            if registry.is_empty() {
                println!("No meta-agents registered.");
            }
            for name in registry.agent_names() {
                if let Some(def) = registry.get(name) {
                    println!(
                        "{}  ({} rules, delegates: {})",
                        name,
                        def.routing_rules.len(),
                        def.delegates.join(", ")
                    );
                }
            }
        }
        AgentAction::Show { name } => {
            let def = registry
                .get(&name)
                .ok_or_else(|| metaroute_core::Error::AgentNotFound(name.clone()))?;
            println!("{}", serde_json::to_string_pretty(def)?);
        }
    }
    Ok(())
}

fn cmd_analytics(action: AnalyticsAction, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut store = AnalyticsStore::open(analytics_config(&config)?);

    match action {
        AnalyticsAction::Summary => {
            let summary = store.summary();
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!("Total events: {}", summary.total_events);
            println!("  routing decisions: {}", summary.routing_decisions);
            println!("  unmatched requests: {}", summary.unmatched_requests);
            for (agent, count) in &summary.by_agent {
                println!("  agent {}: {}", agent, count);
            }
            for (matcher, count) in &summary.by_matcher {
                println!("  matcher {}: {}", matcher, count);
            }
        }
        AnalyticsAction::Export => {
            println!("{}", serde_json::to_string_pretty(&store.export_data())?);
        }
        AnalyticsAction::Prune => {
            let removed = store.prune();
            store.try_save()?;
            if !quiet {
                println!("Pruned {} events ({} remaining).", removed, store.get_event_count());
            }
        }
        AnalyticsAction::Clear => {
            store.clear();
            if !quiet {
                println!("Analytics cleared.");
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
