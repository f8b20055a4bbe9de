//! Rule sets: the rules deciding whether one grammar applies.

use crate::config::{RuleSetSpec, SyntaxName};
use crate::error::PluginError;
use crate::model::document::DocumentFacts;
use crate::plugins::PluginLoader;
use crate::primitives::rule::{DeprecationLog, Rule, RuleFailure, RuleOutcome};

/// How the non-extension rules of a set are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Any,
    All,
}

impl MatchMode {
    fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some("all") => MatchMode::All,
            _ => MatchMode::Any,
        }
    }
}

/// A compiled rule set targeting one grammar.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub syntax: SyntaxName,
    pub mode: MatchMode,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(syntax: SyntaxName, mode: MatchMode, rules: Vec<Rule>) -> Self {
        Self {
            syntax,
            mode,
            rules,
        }
    }

    /// Compile a rule set from settings.
    ///
    /// Declared `extensions` become a leading extension rule. Returns `None`
    /// when the set names no grammar.
    pub fn compile(spec: &RuleSetSpec, deprecations: &mut DeprecationLog) -> Option<Self> {
        let syntax = match (&spec.syntax, &spec.name) {
            (Some(syntax), _) => syntax.clone(),
            (None, Some(name)) => {
                deprecations.warn("name", None);
                name.clone()
            }
            (None, None) => {
                tracing::warn!("Skipping rule set without a syntax: {:?}", spec);
                return None;
            }
        };

        let mut rules = Vec::with_capacity(spec.rules.len() + 1);
        if let Some(extensions) = &spec.extensions {
            rules.push(Rule::extensions(extensions));
        }
        rules.extend(
            spec.rules
                .iter()
                .map(|value| Rule::compile(value, deprecations)),
        );

        Some(Self::new(
            syntax,
            MatchMode::from_setting(spec.match_mode.as_deref()),
            rules,
        ))
    }

    /// Evaluate the set against one document.
    ///
    /// A matching extension rule decides the set on its own; a non-matching
    /// one is ignored. Failed rules count as not matched, except plugin
    /// failures when `reraise` is set, which are returned.
    pub fn matches(
        &self,
        facts: &DocumentFacts<'_>,
        plugins: &mut PluginLoader,
        reraise: bool,
    ) -> Result<bool, PluginError> {
        for rule in &self.rules {
            let outcome = rule.evaluate(facts, plugins);

            if let Rule::Extensions(_) = rule {
                if outcome.is_match() {
                    return Ok(true);
                }
                continue;
            }

            let matched = match outcome {
                RuleOutcome::Matched => true,
                RuleOutcome::NotMatched => false,
                RuleOutcome::Failed(failure) => {
                    report_failure(failure, &self.syntax, reraise)?;
                    false
                }
            };

            match self.mode {
                MatchMode::All if !matched => return Ok(false),
                MatchMode::Any if matched => return Ok(true),
                _ => {}
            }
        }
        Ok(self.mode == MatchMode::All)
    }
}

fn report_failure(
    failure: RuleFailure,
    syntax: &SyntaxName,
    reraise: bool,
) -> Result<(), PluginError> {
    match failure {
        RuleFailure::Plugin(e) if reraise && e.is_reraisable() => Err(e),
        RuleFailure::Plugin(e) => {
            tracing::debug!("Plugin rule for {} failed: {}", syntax.display(), e);
            Ok(())
        }
        RuleFailure::InvalidPattern { pattern, reason } => {
            tracing::warn!(
                "Invalid pattern '{}' in rules for {}: {}",
                pattern,
                syntax.display(),
                reason
            );
            Ok(())
        }
        RuleFailure::Malformed(raw) => {
            tracing::debug!("Ignoring unrecognized rule {} for {}", raw, syntax.display());
            Ok(())
        }
    }
}
