//! Matcher evaluation
//!
//! Pure predicate evaluation of one [`Matcher`] against one [`RoutingContext`].
//! Evaluation never fails: an invalid regex is reported as a non-match with an
//! explicit reason so a broken rule cannot abort resolution.

use regex::RegexBuilder;

use super::types::{ComplexityLevel, KeywordMode, MatchOutcome, Matcher, RoutingContext};
use crate::error::Error;

/// Inputs up to this many characters are observed as low complexity
pub const LOW_COMPLEXITY_MAX_CHARS: usize = 280;

/// Inputs up to this many characters are observed as medium complexity
pub const MEDIUM_COMPLEXITY_MAX_CHARS: usize = 1200;

/// Evaluate a matcher against a request context
pub fn evaluate(matcher: &Matcher, context: &RoutingContext) -> MatchOutcome {
    match matcher {
        Matcher::Keyword { keywords, mode } => evaluate_keywords(keywords, *mode, &context.input),
        Matcher::Complexity { threshold } => evaluate_complexity(*threshold, &context.input),
        Matcher::Regex { pattern, flags } => {
            evaluate_regex(pattern, flags.as_deref(), &context.input)
        }
        Matcher::ProjectContext {
            has_files,
            has_deps,
        } => evaluate_project_context(has_files, has_deps, context),
        Matcher::Always => MatchOutcome::matched("always"),
    }
}

/// Observed complexity tier of an input, monotonic in its length
pub fn observed_complexity(input: &str) -> ComplexityLevel {
    let len = input.chars().count();
    if len <= LOW_COMPLEXITY_MAX_CHARS {
        ComplexityLevel::Low
    } else if len <= MEDIUM_COMPLEXITY_MAX_CHARS {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::High
    }
}

fn evaluate_keywords(keywords: &[String], mode: KeywordMode, input: &str) -> MatchOutcome {
    let haystack = input.to_lowercase();
    let (found, missing): (Vec<&String>, Vec<&String>) = keywords
        .iter()
        .partition(|k| haystack.contains(&k.to_lowercase()));

    let matched = match mode {
        KeywordMode::Any => !found.is_empty(),
        // an empty keyword list never matches, even in `all` mode
        KeywordMode::All => !keywords.is_empty() && missing.is_empty(),
    };

    if matched {
        MatchOutcome::matched(format!("matched keywords: {}", join(&found)))
    } else if keywords.is_empty() {
        MatchOutcome::rejected("no keywords configured")
    } else {
        MatchOutcome::rejected(format!("missing keywords: {}", join(&missing)))
    }
}

fn evaluate_complexity(threshold: ComplexityLevel, input: &str) -> MatchOutcome {
    let observed = observed_complexity(input);
    let reason = format!("observed complexity {} (threshold {})", observed, threshold);
    if observed >= threshold {
        MatchOutcome::matched(reason)
    } else {
        MatchOutcome::rejected(reason)
    }
}

fn evaluate_regex(pattern: &str, flags: Option<&str>, input: &str) -> MatchOutcome {
    let regex = match compile_regex(pattern, flags) {
        Ok(regex) => regex,
        Err(err) => return MatchOutcome::rejected(format!("invalid pattern: {}", err)),
    };

    match regex.find(input) {
        Some(m) => MatchOutcome::matched(format!("pattern matched '{}'", m.as_str())),
        None => MatchOutcome::rejected(format!("pattern /{}/ did not match", pattern)),
    }
}

/// Compile a pattern with JavaScript-style flags (`i`, `m`, `s`, `x`; `g`/`u` are accepted and ignored)
pub fn compile_regex(pattern: &str, flags: Option<&str>) -> Result<regex::Regex, Error> {
    let invalid = |reason: String| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'g' | 'u' => {}
            other => return Err(invalid(format!("unsupported flag '{}'", other))),
        }
    }

    builder.build().map_err(|e| invalid(e.to_string()))
}

fn evaluate_project_context(
    has_files: &[String],
    has_deps: &[String],
    context: &RoutingContext,
) -> MatchOutcome {
    let Some(project) = &context.project else {
        return MatchOutcome::rejected("context unavailable");
    };

    let missing_files: Vec<&String> = has_files.iter().filter(|f| !project.has_file(f)).collect();
    let missing_deps: Vec<&String> = has_deps
        .iter()
        .filter(|d| !project.has_dependency(d))
        .collect();

    if missing_files.is_empty() && missing_deps.is_empty() {
        return MatchOutcome::matched(format!(
            "project has files [{}] and deps [{}]",
            join(&has_files.iter().collect::<Vec<_>>()),
            join(&has_deps.iter().collect::<Vec<_>>())
        ));
    }

    let mut parts = Vec::new();
    if !missing_files.is_empty() {
        parts.push(format!("missing files: {}", join(&missing_files)));
    }
    if !missing_deps.is_empty() {
        parts.push(format!("missing deps: {}", join(&missing_deps)));
    }
    MatchOutcome::rejected(parts.join("; "))
}

fn join(items: &[&String]) -> String {
    items
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::types::ProjectSnapshot;

    fn ctx(input: &str) -> RoutingContext {
        RoutingContext::new(input)
    }

    #[test]
    fn test_keyword_any_is_case_insensitive() {
        let matcher = Matcher::keywords_any(["Test", "spec"]);
        let outcome = evaluate(&matcher, &ctx("run the unit TESTS now"));
        assert!(outcome.matched);
        assert!(outcome.reason.contains("Test"));

        let outcome = evaluate(&matcher, &ctx("hello there"));
        assert!(!outcome.matched);
        assert!(outcome.reason.contains("missing keywords"));
    }

    #[test]
    fn test_keyword_all_requires_every_keyword() {
        let matcher = Matcher::keywords_all(["stack", "trace"]);
        assert!(evaluate(&matcher, &ctx("it crashed with a stack trace")).matched);

        let outcome = evaluate(&matcher, &ctx("the stack is full"));
        assert!(!outcome.matched);
        assert_eq!(outcome.reason, "missing keywords: trace");
    }

    #[test]
    fn test_keyword_empty_list_never_matches() {
        assert!(!evaluate(&Matcher::keywords_any(Vec::<String>::new()), &ctx("x")).matched);
        assert!(!evaluate(&Matcher::keywords_all(Vec::<String>::new()), &ctx("x")).matched);
    }

    #[test]
    fn test_keyword_matches_substrings() {
        // "test" is found inside "testing"
        assert!(evaluate(&Matcher::keywords_any(["test"]), &ctx("Testing things")).matched);
    }

    #[test]
    fn test_complexity_tiers() {
        let short = "fix typo";
        let medium = "a".repeat(LOW_COMPLEXITY_MAX_CHARS + 1);
        let long = "a".repeat(MEDIUM_COMPLEXITY_MAX_CHARS + 1);

        assert_eq!(observed_complexity(short), ComplexityLevel::Low);
        assert_eq!(observed_complexity(&medium), ComplexityLevel::Medium);
        assert_eq!(observed_complexity(&long), ComplexityLevel::High);

        let medium_threshold = Matcher::Complexity {
            threshold: ComplexityLevel::Medium,
        };
        assert!(!evaluate(&medium_threshold, &ctx(short)).matched);
        assert!(evaluate(&medium_threshold, &ctx(&medium)).matched);
        assert!(evaluate(&medium_threshold, &ctx(&long)).matched);

        let low_threshold = Matcher::Complexity {
            threshold: ComplexityLevel::Low,
        };
        assert!(evaluate(&low_threshold, &ctx("")).matched);
    }

    #[test]
    fn test_regex_uses_raw_input() {
        let matcher = Matcher::regex(r"^ERROR\b");
        assert!(evaluate(&matcher, &ctx("ERROR: disk full")).matched);
        assert!(!evaluate(&matcher, &ctx("error: disk full")).matched);

        let insensitive = Matcher::Regex {
            pattern: r"^ERROR\b".into(),
            flags: Some("i".into()),
        };
        assert!(evaluate(&insensitive, &ctx("error: disk full")).matched);
    }

    #[test]
    fn test_invalid_regex_is_a_non_match() {
        let outcome = evaluate(&Matcher::regex("(unclosed"), &ctx("(unclosed"));
        assert!(!outcome.matched);
        assert!(outcome.reason.starts_with("invalid pattern"));

        let bad_flag = Matcher::Regex {
            pattern: "ok".into(),
            flags: Some("q".into()),
        };
        let outcome = evaluate(&bad_flag, &ctx("ok"));
        assert!(!outcome.matched);
        assert!(outcome.reason.contains("unsupported flag"));
    }

    #[test]
    fn test_project_context_requires_snapshot() {
        let matcher = Matcher::ProjectContext {
            has_files: vec!["Cargo.toml".into()],
            has_deps: vec![],
        };
        let outcome = evaluate(&matcher, &ctx("build it"));
        assert!(!outcome.matched);
        assert_eq!(outcome.reason, "context unavailable");
    }

    #[test]
    fn test_project_context_files_and_deps() {
        let matcher = Matcher::ProjectContext {
            has_files: vec!["package.json".into()],
            has_deps: vec!["react".into(), "vite".into()],
        };
        let project = ProjectSnapshot::new()
            .with_files(["package.json", "src/main.tsx"])
            .with_dependencies(["react"]);
        let context = ctx("add a page").with_project(project.clone());

        let outcome = evaluate(&matcher, &context);
        assert!(!outcome.matched);
        assert_eq!(outcome.reason, "missing deps: vite");

        let context = ctx("add a page").with_project(project.with_dependencies(["vite"]));
        assert!(evaluate(&matcher, &context).matched);
    }

    #[test]
    fn test_always_matches_empty_input() {
        assert!(evaluate(&Matcher::Always, &ctx("")).matched);
    }

    #[test]
    fn test_evaluation_does_not_mutate_inputs() {
        let matcher = Matcher::keywords_any(["Deploy"]);
        let context = ctx("Deploy now");
        let (m_before, c_before) = (matcher.clone(), context.clone());
        let _ = evaluate(&matcher, &context);
        assert_eq!(matcher, m_before);
        assert_eq!(context, c_before);
    }
}
