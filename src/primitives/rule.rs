//! Primitive rules: the single tests a rule set is built from.
//!
//! Rules are compiled from their JSON form once per detection pass. Regular
//! expressions are compiled up front; a pattern that fails to compile is kept
//! as a failure so the rule reports "not matched" every time it is evaluated.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::config::{FunctionSpec, RuleSpec};
use crate::error::PluginError;
use crate::model::document::DocumentFacts;
use crate::plugins::{PluginArgs, PluginLoader};

/// Prefix every interpreter rule is appended to.
const SHEBANG_PREFIX: &str = "^#!(?:.+)";

/// Which document fact a regex rule is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    FirstLine,
    FilePath,
    Contents,
}

/// A compiled regular expression rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    subject: Subject,
    source: String,
    compiled: Result<Regex, String>,
}

impl RegexRule {
    /// Compile `pattern` against `subject`.
    ///
    /// Contents rules search anywhere in the text; every other subject only
    /// matches from its start.
    pub fn new(subject: Subject, pattern: &str) -> Self {
        let compiled = if pattern.is_empty() {
            Err("empty pattern".to_string())
        } else {
            let full = match subject {
                Subject::Contents => pattern.to_string(),
                _ => format!(r"\A(?:{})", pattern),
            };
            Regex::new(&full).map_err(|e| e.to_string())
        };
        Self {
            subject,
            source: pattern.to_string(),
            compiled,
        }
    }

    /// Interpreter rule: `pattern` must follow a shebang on the first line.
    ///
    /// An empty `pattern` matches any shebang line.
    pub fn interpreter(pattern: &str) -> Self {
        Self::new(Subject::FirstLine, &format!("{}{}", SHEBANG_PREFIX, pattern))
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    fn evaluate(&self, facts: &DocumentFacts<'_>) -> RuleOutcome {
        let regex = match &self.compiled {
            Ok(regex) => regex,
            Err(reason) => {
                return RuleOutcome::Failed(RuleFailure::InvalidPattern {
                    pattern: self.source.clone(),
                    reason: reason.clone(),
                })
            }
        };
        let subject = match self.subject {
            Subject::FirstLine => facts.first_line(),
            Subject::FilePath => facts.file_name(),
            Subject::Contents => facts.contents(),
        };
        if subject.is_empty() {
            return RuleOutcome::NotMatched;
        }
        RuleOutcome::from_bool(regex.is_match(subject))
    }
}

/// A rule calling an external predicate.
#[derive(Debug, Clone, Default)]
pub struct FunctionRule {
    pub source: String,
    pub entry_point: Option<String>,
    pub args: PluginArgs,
}

impl FunctionRule {
    fn from_spec(spec: &FunctionSpec) -> Self {
        Self {
            source: spec.source.clone().unwrap_or_default(),
            entry_point: spec.name.clone(),
            args: spec.args.clone().unwrap_or_default(),
        }
    }

    fn evaluate(&self, facts: &DocumentFacts<'_>, plugins: &mut PluginLoader) -> RuleOutcome {
        let predicate = match plugins.resolve(&self.source, self.entry_point.as_deref()) {
            Ok(predicate) => predicate,
            Err(e) => return RuleOutcome::Failed(RuleFailure::Plugin(e)),
        };
        match predicate(facts.file_name(), &self.args) {
            Ok(matched) => RuleOutcome::from_bool(matched),
            Err(e) => RuleOutcome::Failed(RuleFailure::Plugin(e)),
        }
    }
}

/// A single compiled rule.
#[derive(Debug, Clone)]
pub enum Rule {
    Extensions(Vec<String>),
    Regex(RegexRule),
    Function(FunctionRule),
    /// A rule with no recognized key; never matches.
    Unrecognized(String),
}

/// Why a rule could not be evaluated.
#[derive(Debug)]
pub enum RuleFailure {
    InvalidPattern { pattern: String, reason: String },
    Malformed(String),
    Plugin(PluginError),
}

/// Result of evaluating one rule.
#[derive(Debug)]
pub enum RuleOutcome {
    Matched,
    NotMatched,
    Failed(RuleFailure),
}

impl RuleOutcome {
    pub fn from_bool(matched: bool) -> Self {
        if matched {
            RuleOutcome::Matched
        } else {
            RuleOutcome::NotMatched
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, RuleOutcome::Matched)
    }
}

/// Remembers which deprecation warnings were already emitted.
#[derive(Debug, Default)]
pub struct DeprecationLog {
    seen: HashSet<(String, Option<String>)>,
}

impl DeprecationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn about `keyword` (optionally inside a `rule` kind) once per process.
    pub fn warn(&mut self, keyword: &str, rule: Option<&str>) {
        let key = (keyword.to_string(), rule.map(str::to_string));
        if !self.seen.insert(key) {
            return;
        }
        match rule {
            Some(rule) => tracing::warn!(
                "'{}' keyword in '{}' rule is deprecated and will be removed in the future",
                keyword,
                rule
            ),
            None => tracing::warn!(
                "'{}' keyword is deprecated and will be removed in the future",
                keyword
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Rule {
    /// An extension rule; candidates are compared case-insensitively.
    pub fn extensions<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Rule::Extensions(
            candidates
                .into_iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
        )
    }

    /// Compile a rule from its JSON form.
    pub fn compile(value: &Value, deprecations: &mut DeprecationLog) -> Self {
        let spec: RuleSpec = match serde_json::from_value(value.clone()) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!("Malformed rule {}: {}", value, e);
                return Rule::Unrecognized(value.to_string());
            }
        };
        Self::from_spec(&spec, value, deprecations)
    }

    fn from_spec(spec: &RuleSpec, raw: &Value, deprecations: &mut DeprecationLog) -> Self {
        if let Some(candidates) = &spec.extensions {
            return Rule::extensions(candidates);
        }
        if let Some(function) = &spec.function {
            return Rule::Function(FunctionRule::from_spec(function));
        }
        if let Some(pattern) = &spec.first_line {
            return Rule::Regex(RegexRule::new(Subject::FirstLine, pattern));
        }
        if let Some(pattern) = &spec.interpreter {
            return Rule::Regex(RegexRule::interpreter(pattern));
        }
        if let Some(pattern) = &spec.binary {
            deprecations.warn("binary", None);
            return Rule::Regex(RegexRule::interpreter(pattern));
        }
        if let Some(pattern) = &spec.file_path {
            return Rule::Regex(RegexRule::new(Subject::FilePath, pattern));
        }
        if let Some(pattern) = &spec.file_name {
            deprecations.warn("file_name", None);
            return Rule::Regex(RegexRule::new(Subject::FilePath, pattern));
        }
        if let Some(pattern) = &spec.contains {
            return Rule::Regex(RegexRule::new(Subject::Contents, pattern));
        }
        Rule::Unrecognized(raw.to_string())
    }

    /// Evaluate this rule against one document.
    pub fn evaluate(&self, facts: &DocumentFacts<'_>, plugins: &mut PluginLoader) -> RuleOutcome {
        match self {
            Rule::Extensions(candidates) => {
                RuleOutcome::from_bool(extension_matches(candidates, &facts.base_name_lower()))
            }
            Rule::Regex(rule) => rule.evaluate(facts),
            Rule::Function(rule) => rule.evaluate(facts, plugins),
            Rule::Unrecognized(raw) => RuleOutcome::Failed(RuleFailure::Malformed(raw.clone())),
        }
    }
}

/// Whether `base_name` (already lowercased) carries one of `candidates`.
///
/// A candidate starting with `.` names a whole file (`.bashrc`); anything
/// else is a suffix after a dot.
pub fn extension_matches(candidates: &[String], base_name: &str) -> bool {
    candidates.iter().any(|candidate| {
        let candidate = candidate.to_lowercase();
        if candidate.is_empty() {
            false
        } else if candidate.starts_with('.') {
            base_name == candidate
        } else {
            base_name.ends_with(&format!(".{}", candidate))
        }
    })
}
