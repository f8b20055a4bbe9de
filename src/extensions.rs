//! Keeping the editor's per-language `extensions` lists in step with the
//! extensions declared by rule sets.
//!
//! Every extension this crate adds to `<Language>.sublime-settings` is also
//! recorded under the language's key in `ApplySyntax.ext-list`. Only recorded
//! extensions are ever removed again, so entries users add by hand survive
//! every reconciliation.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Tier;
use crate::config::{Settings, EXT_SETTINGS};
use crate::error::SettingsError;
use crate::grammar::LanguageInventory;
use crate::model::settings::SettingsStore;
use crate::primitives::path::{base_name, dir_name, format_resource_path, split_extension, Platform};

/// Key holding a language's extension list in its settings document.
const EXTENSIONS_KEY: &str = "extensions";

/// Declared extensions per language name.
pub type ExtensionMap = BTreeMap<String, BTreeSet<String>>;

/// Settings document holding the editor's settings for `language`.
pub fn language_settings_name(language: &str) -> String {
    format!("{}.sublime-settings", language)
}

/// Compute which language owns each declared extension.
///
/// Default rule sets are walked before user rule sets; project rule sets
/// never declare extensions. Only installed grammars are considered, and
/// when two languages declare the same extension the later one owns it.
pub fn declared_extensions(
    settings: &Settings,
    inventory: &LanguageInventory,
    platform: Platform,
) -> ExtensionMap {
    let mut owner: BTreeMap<String, String> = BTreeMap::new();

    for tier in [Tier::Default, Tier::User] {
        for spec in tier.specs(settings) {
            let extensions = spec.declared_extensions();
            if extensions.is_empty() {
                continue;
            }
            let Some(target) = spec.target() else {
                continue;
            };
            for name in target.candidates() {
                let stem = split_extension(name).0;
                let language = base_name(stem);
                let grammar = format_resource_path(
                    &format!("Packages/{}/{}", dir_name(stem), language),
                    platform,
                );
                if !inventory.contains(&grammar) {
                    tracing::trace!("Skipping extensions for {}: not installed", name);
                    continue;
                }
                tracing::trace!("Found extensions for {}: {:?}", language, extensions);
                for ext in extensions {
                    owner.insert(ext.clone(), language.to_string());
                }
            }
        }
    }

    let mut by_language = ExtensionMap::new();
    for (ext, language) in owner {
        by_language.entry(language).or_default().insert(ext);
    }
    by_language
}

/// What a reconciliation pass changed, per language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: BTreeMap<String, Vec<String>>,
    pub pruned: BTreeMap<String, Vec<String>>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.pruned.is_empty()
    }
}

/// Add newly declared extensions and prune stale ones this crate added earlier.
pub fn reconcile(
    declared: &ExtensionMap,
    store: &mut dyn SettingsStore,
) -> Result<ReconcileReport, SettingsError> {
    tracing::trace!("Updating extensions");
    let mut report = ReconcileReport::default();
    add_declared(declared, store, &mut report)?;
    prune_stale(declared, store, &mut report)?;
    log_report(&report);
    Ok(report)
}

/// Remove every extension this crate ever added.
pub fn rollback(store: &mut dyn SettingsStore) -> Result<ReconcileReport, SettingsError> {
    tracing::trace!("Rolling back added extensions");
    let mut report = ReconcileReport::default();
    prune_stale(&ExtensionMap::new(), store, &mut report)?;
    log_report(&report);
    Ok(report)
}

fn string_list(
    store: &mut dyn SettingsStore,
    doc: &str,
    key: &str,
) -> Result<Vec<String>, SettingsError> {
    Ok(store
        .load_settings(doc)?
        .get_as::<Vec<String>>(key)
        .unwrap_or_default())
}

fn add_declared(
    declared: &ExtensionMap,
    store: &mut dyn SettingsStore,
    report: &mut ReconcileReport,
) -> Result<(), SettingsError> {
    for (language, extensions) in declared {
        let settings_name = language_settings_name(language);
        let mut live = string_list(store, &settings_name, EXTENSIONS_KEY)?;
        let missing: Vec<String> = extensions
            .iter()
            .filter(|ext| !live.contains(ext))
            .cloned()
            .collect();
        if missing.is_empty() {
            continue;
        }

        live.extend(missing.iter().cloned());
        store.load_settings(&settings_name)?.set(EXTENSIONS_KEY, live);

        let mut recorded: BTreeSet<String> = string_list(store, EXT_SETTINGS, language)?
            .into_iter()
            .collect();
        recorded.extend(missing.iter().cloned());
        store
            .load_settings(EXT_SETTINGS)?
            .set(language, recorded.into_iter().collect::<Vec<_>>());

        tracing::trace!("{}: added extensions {:?}", settings_name, missing);
        store.save_settings(&settings_name)?;
        store.save_settings(EXT_SETTINGS)?;
        report.added.insert(language.clone(), missing);
    }
    Ok(())
}

fn prune_stale(
    declared: &ExtensionMap,
    store: &mut dyn SettingsStore,
    report: &mut ReconcileReport,
) -> Result<(), SettingsError> {
    let languages: Vec<String> = store
        .load_settings(EXT_SETTINGS)?
        .keys()
        .map(str::to_string)
        .collect();
    let empty = BTreeSet::new();

    for language in languages {
        let recorded = string_list(store, EXT_SETTINGS, &language)?;
        let still_declared = declared.get(&language).unwrap_or(&empty);
        let (kept, stale): (Vec<String>, Vec<String>) = recorded
            .into_iter()
            .partition(|ext| still_declared.contains(ext));
        if stale.is_empty() {
            continue;
        }

        let settings_name = language_settings_name(&language);
        let live = string_list(store, &settings_name, EXTENSIONS_KEY)?;
        let pruned_live: Vec<String> = live
            .iter()
            .filter(|ext| !stale.contains(ext))
            .cloned()
            .collect();
        if pruned_live.len() != live.len() {
            store
                .load_settings(&settings_name)?
                .set(EXTENSIONS_KEY, pruned_live);
            store.save_settings(&settings_name)?;
        }

        let bookkeeping = store.load_settings(EXT_SETTINGS)?;
        if kept.is_empty() {
            bookkeeping.erase(&language);
        } else {
            bookkeeping.set(&language, kept);
        }
        store.save_settings(EXT_SETTINGS)?;

        tracing::trace!("{}: pruned extensions {:?}", settings_name, stale);
        report.pruned.insert(language, stale);
    }
    Ok(())
}

fn log_report(report: &ReconcileReport) {
    for (language, extensions) in &report.added {
        tracing::info!("Added extensions to {}: {}", language, extensions.join(", "));
    }
    for (language, extensions) in &report.pruned {
        tracing::info!("Pruned extensions from {}: {}", language, extensions.join(", "));
    }
}
