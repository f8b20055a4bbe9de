//! The merged, ordered list of rule sets a document is checked against.

use std::fmt;

use crate::config::{RuleSetSpec, Settings};
use crate::error::PluginError;
use crate::model::document::DocumentFacts;
use crate::plugins::PluginLoader;
use crate::primitives::rule::DeprecationLog;
use crate::primitives::rule_set::RuleSet;

/// Where a rule set was declared. Earlier tiers take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Project,
    User,
    Default,
}

impl Tier {
    /// Settings key holding this tier's rule sets.
    pub fn settings_key(self) -> &'static str {
        match self {
            Tier::Project => "project_syntaxes",
            Tier::User => "syntaxes",
            Tier::Default => "default_syntaxes",
        }
    }

    pub fn specs(self, settings: &Settings) -> &[RuleSetSpec] {
        match self {
            Tier::Project => &settings.project_syntaxes,
            Tier::User => &settings.syntaxes,
            Tier::Default => &settings.default_syntaxes,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.settings_key())
    }
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub tier: Tier,
    pub rule_set: RuleSet,
}

/// Rule sets in evaluation order: project, then user, then default.
#[derive(Debug, Clone, Default)]
pub struct SyntaxCatalog {
    entries: Vec<CatalogEntry>,
}

impl SyntaxCatalog {
    /// Compile every tier of `settings`, keeping declaration order within a tier.
    pub fn from_settings(settings: &Settings, deprecations: &mut DeprecationLog) -> Self {
        let entries = [Tier::Project, Tier::User, Tier::Default]
            .into_iter()
            .flat_map(|tier| {
                tier.specs(settings)
                    .iter()
                    .map(move |spec| (tier, spec))
            })
            .filter_map(|(tier, spec)| {
                RuleSet::compile(spec, deprecations).map(|rule_set| CatalogEntry { tier, rule_set })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first entry whose rule set matches the document.
    pub fn find_match(
        &self,
        facts: &DocumentFacts<'_>,
        plugins: &mut PluginLoader,
        reraise: bool,
    ) -> Result<Option<&CatalogEntry>, PluginError> {
        for entry in &self.entries {
            if entry.rule_set.matches(facts, plugins, reraise)? {
                tracing::trace!(
                    "{} matched {} rule set for {}",
                    facts.file_name(),
                    entry.tier,
                    entry.rule_set.syntax.display()
                );
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}
