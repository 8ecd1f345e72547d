//! Routing decision log
//!
//! Writes one entry per routing decision to the console or to an append-only
//! newline-delimited JSON file. Logging is strictly synchronous and every I/O
//! failure is swallowed (reported through `tracing`), so it cannot change a
//! routing outcome.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::{ConfigOverrides, RuleEvaluation};

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Where routing decisions are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Disabled,
}

impl std::fmt::Display for LogOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Console => write!(f, "console"),
            Self::File => write!(f, "file"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl std::str::FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "file" => Ok(Self::File),
            "disabled" => Ok(Self::Disabled),
            _ => Err(format!(
                "Unknown log output: {}. Valid options: console, file, disabled",
                s
            )),
        }
    }
}

/// Routing logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub enabled: bool,
    pub output: LogOutput,
    pub log_file: PathBuf,
    pub debug_mode: bool,
    pub colored: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output: LogOutput::Console,
            log_file: PathBuf::from("routing.log"),
            debug_mode: false,
            colored: false,
        }
    }
}

/// One `{matcher type, matched}` pair of the debug trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub matcher_type: String,
    pub matched: bool,
}

/// Extra detail attached in debug mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub evaluations: Vec<EvaluationSummary>,
    pub rules_evaluated: usize,
}

/// A single log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingLogEntry {
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub target_agent: String,
    pub matcher_type: String,
    pub matched_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_overrides: Option<ConfigOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

impl RoutingLogEntry {
    /// Human-readable colorized rendering
    pub fn to_colored_line(&self) -> String {
        let mut line = format!(
            "{DIM}[routing] {}{RESET} -> {GREEN}{}{RESET} via {CYAN}{}{RESET} (\"{}\")",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.target_agent,
            self.matcher_type,
            self.matched_content,
        );
        if let Some(overrides) = &self.config_overrides
            && let Ok(json) = serde_json::to_string(overrides)
        {
            line.push_str(&format!(" {YELLOW}overrides={}{RESET}", json));
        }
        if let Some(debug) = &self.debug_info {
            let trace: Vec<String> = debug
                .evaluations
                .iter()
                .map(|e| format!("{}={}", e.matcher_type, if e.matched { "y" } else { "n" }))
                .collect();
            line.push_str(&format!(
                " {DIM}[{} rules: {}]{RESET}",
                debug.rules_evaluated,
                trace.join(" ")
            ));
        }
        line
    }
}

/// Logger for routing decisions
#[derive(Debug, Clone, Default)]
pub struct RoutingLogger {
    config: LoggerConfig,
    console_stderr: bool,
}

impl RoutingLogger {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            console_stderr: false,
        }
    }

    /// Send console-mode lines to stderr, leaving stdout to the caller
    pub fn with_console_on_stderr(mut self, on_stderr: bool) -> Self {
        self.console_stderr = on_stderr;
        self
    }

    pub fn console_on_stderr(&self) -> bool {
        self.console_stderr
    }

    /// Logger that never writes anything
    pub fn disabled() -> Self {
        Self::new(LoggerConfig {
            output: LogOutput::Disabled,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn debug_mode(&self) -> bool {
        self.config.debug_mode
    }

    /// Whether calls will produce output at all
    pub fn is_active(&self) -> bool {
        self.config.enabled && self.config.output != LogOutput::Disabled
    }

    /// Build the entry that would be logged for a decision
    pub fn build_entry(
        &self,
        target: &str,
        matcher_type: &str,
        matched_content: &str,
        overrides: Option<&ConfigOverrides>,
        all_evaluations: Option<&[RuleEvaluation]>,
    ) -> RoutingLogEntry {
        let debug_info = match all_evaluations {
            Some(evaluations) if self.config.debug_mode => Some(DebugInfo {
                evaluations: evaluations
                    .iter()
                    .map(|e| EvaluationSummary {
                        matcher_type: e.matcher_type.clone(),
                        matched: e.matched,
                    })
                    .collect(),
                rules_evaluated: evaluations.len(),
            }),
            _ => None,
        };

        RoutingLogEntry {
            timestamp: Utc::now(),
            target_agent: target.to_string(),
            matcher_type: matcher_type.to_string(),
            matched_content: matched_content.to_string(),
            config_overrides: overrides.cloned(),
            debug_info,
        }
    }

    /// Record a routing decision
    pub fn log_routing_decision(
        &self,
        target: &str,
        matcher_type: &str,
        matched_content: &str,
        overrides: Option<&ConfigOverrides>,
        all_evaluations: Option<&[RuleEvaluation]>,
    ) {
        if !self.is_active() {
            return;
        }

        let entry = self.build_entry(
            target,
            matcher_type,
            matched_content,
            overrides,
            all_evaluations,
        );

        match self.config.output {
            LogOutput::Console => self.write_console(&entry),
            LogOutput::File => self.write_file(&entry),
            LogOutput::Disabled => {}
        }
    }

    fn write_console(&self, entry: &RoutingLogEntry) {
        let line = if self.config.colored {
            entry.to_colored_line()
        } else {
            match serde_json::to_string(entry) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize routing log entry");
                    return;
                }
            }
        };

        let written = if self.console_stderr {
            writeln!(std::io::stderr().lock(), "{}", line)
        } else {
            writeln!(std::io::stdout().lock(), "{}", line)
        };
        if let Err(e) = written {
            warn!(error = %e, "Failed to write routing log entry to console");
        }
    }

    fn write_file(&self, entry: &RoutingLogEntry) {
        if let Err(e) = self.append_to_file(entry) {
            warn!(
                error = %e,
                path = %self.config.log_file.display(),
                "Failed to append routing log entry"
            );
        }
    }

    fn append_to_file(&self, entry: &RoutingLogEntry) -> std::io::Result<()> {
        let path = &self.config.log_file;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", json)?;
        file.flush()
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix
pub(crate) mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
