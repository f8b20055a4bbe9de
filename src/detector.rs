//! The detector: reacts to editor events by picking and applying a grammar.
//!
//! Every event handler follows the same sequence: mark the document as
//! touched, reconcile language extensions if the installed grammars changed,
//! then walk the syntax catalog and apply the first grammar whose rules
//! match. Settings are re-read on every pass, so edits take effect without a
//! restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::SyntaxCatalog;
use crate::config::{Settings, DEFAULT_USER_SETTINGS, PLUGIN_SETTINGS, TOUCHED_KEY};
use crate::error::{DetectError, SettingsError};
use crate::extensions::{declared_extensions, reconcile, rollback, ReconcileReport};
use crate::grammar::{apply_syntax, LanguageInventory, ResourceLoader, SyntaxChange};
use crate::model::document::{Document, DocumentFacts};
use crate::model::settings::{SettingsDocument, SettingsStore};
use crate::plugins::PluginLoader;
use crate::primitives::rule::DeprecationLog;

/// Listener tag registered on the global settings document.
const RELOAD_TAG: &str = "reload";

/// Host services a detection pass needs.
pub struct Environment<'a> {
    pub resources: &'a dyn ResourceLoader,
    pub settings: &'a mut dyn SettingsStore,
}

impl<'a> Environment<'a> {
    pub fn new(resources: &'a dyn ResourceLoader, settings: &'a mut dyn SettingsStore) -> Self {
        Self {
            resources,
            settings,
        }
    }

    /// Global settings, without document overrides.
    pub fn global_settings(&mut self) -> Result<Settings, SettingsError> {
        Ok(Settings::from_document(
            self.settings.load_settings(PLUGIN_SETTINGS)?,
        ))
    }

    /// Settings for `document`: document-local values win key by key.
    pub fn document_settings(
        &mut self,
        document: &dyn Document,
    ) -> Result<Settings, SettingsError> {
        let global = self.settings.load_settings(PLUGIN_SETTINGS)?;
        let mut values = Map::new();
        for key in Settings::KEYS {
            let value = document.setting(key).or_else(|| global.get(key).cloned());
            if let Some(value) = value {
                values.insert(key.to_string(), value);
            }
        }
        let mut layered = SettingsDocument::new(PLUGIN_SETTINGS);
        layered.replace_values(values);
        Ok(Settings::from_document(&layered))
    }
}

/// Process-wide detection state.
pub struct Detector {
    plugins: PluginLoader,
    lang_hash: Option<String>,
    deprecations: DeprecationLog,
    settings_changed: Arc<AtomicBool>,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(PluginLoader::default())
    }
}

impl Detector {
    pub fn new(plugins: PluginLoader) -> Self {
        Self {
            plugins,
            lang_hash: None,
            deprecations: DeprecationLog::new(),
            settings_changed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fingerprint of the grammar inventory seen by the last reconciliation.
    pub fn lang_hash(&self) -> Option<&str> {
        self.lang_hash.as_deref()
    }

    pub fn plugins(&self) -> &PluginLoader {
        &self.plugins
    }

    pub fn deprecations(&self) -> &DeprecationLog {
        &self.deprecations
    }

    /// Startup: seed user settings, reconcile extensions, then sweep open documents.
    ///
    /// Returns how many documents were swept.
    pub fn plugin_loaded(
        &mut self,
        documents: &mut [&mut dyn Document],
        env: &mut Environment<'_>,
    ) -> Result<usize, DetectError> {
        env.settings
            .create_if_missing(PLUGIN_SETTINGS, DEFAULT_USER_SETTINGS)?;

        let flag = Arc::clone(&self.settings_changed);
        let global = env.settings.load_settings(PLUGIN_SETTINGS)?;
        global.clear_on_change(RELOAD_TAG);
        global.add_on_change(
            RELOAD_TAG,
            Box::new(move |_key: &str| flag.store(true, Ordering::SeqCst)),
        );
        self.settings_changed.store(false, Ordering::SeqCst);

        self.on_settings_changed(env)?;
        self.touch_untouched(documents, env)
    }

    /// Global settings changed: roll back or reconcile extensions.
    ///
    /// With extension sync disabled every extension this crate added is
    /// removed. Otherwise the inventory is fingerprinted and reconciled
    /// regardless of whether it changed.
    pub fn on_settings_changed(
        &mut self,
        env: &mut Environment<'_>,
    ) -> Result<ReconcileReport, DetectError> {
        let settings = env.global_settings()?;
        if !settings.add_exts_to_lang_settings {
            tracing::debug!("Extension sync disabled, rolling back added extensions");
            return Ok(rollback(env.settings)?);
        }

        let inventory = LanguageInventory::scan(env.resources);
        self.lang_hash = Some(inventory.fingerprint().to_string());
        let declared = declared_extensions(&settings, &inventory, env.resources.platform());
        Ok(reconcile(&declared, env.settings)?)
    }

    /// Reconcile extensions if enabled and the grammar inventory changed since last time.
    pub fn update_extensions(
        &mut self,
        env: &mut Environment<'_>,
    ) -> Result<Option<ReconcileReport>, DetectError> {
        let settings = env.global_settings()?;
        if !settings.add_exts_to_lang_settings {
            tracing::trace!("Skipping extension update");
            return Ok(None);
        }

        let inventory = LanguageInventory::scan(env.resources);
        if self.lang_hash.as_deref() == Some(inventory.fingerprint()) {
            return Ok(None);
        }
        tracing::debug!(
            "Grammar inventory changed: {} languages installed",
            inventory.languages().len()
        );
        self.lang_hash = Some(inventory.fingerprint().to_string());
        let declared = declared_extensions(&settings, &inventory, env.resources.platform());
        Ok(Some(reconcile(&declared, env.settings)?))
    }

    /// A brand new buffer: apply `new_file_syntax` if one is configured.
    pub fn on_new(
        &mut self,
        document: &mut dyn Document,
        env: &mut Environment<'_>,
    ) -> Result<Option<SyntaxChange>, DetectError> {
        self.begin_event(document, env)?;
        let settings = env.document_settings(document)?;
        Ok(settings
            .new_file_syntax
            .0
            .map(|syntax| apply_syntax(document, &syntax, env.resources)))
    }

    /// A document was opened.
    pub fn on_load(
        &mut self,
        document: &mut dyn Document,
        env: &mut Environment<'_>,
    ) -> Result<Option<SyntaxChange>, DetectError> {
        self.begin_event(document, env)?;
        self.detect_syntax(document, env)
    }

    /// A document was saved, possibly under a new name.
    pub fn on_post_save(
        &mut self,
        document: &mut dyn Document,
        env: &mut Environment<'_>,
    ) -> Result<Option<SyntaxChange>, DetectError> {
        self.begin_event(document, env)?;
        self.detect_syntax(document, env)
    }

    /// A document found by the untouched sweep.
    pub fn on_touched(
        &mut self,
        document: &mut dyn Document,
        env: &mut Environment<'_>,
    ) -> Result<Option<SyntaxChange>, DetectError> {
        self.begin_event(document, env)?;
        self.detect_syntax(document, env)
    }

    /// Run `on_touched` for every document not processed yet.
    pub fn touch_untouched(
        &mut self,
        documents: &mut [&mut dyn Document],
        env: &mut Environment<'_>,
    ) -> Result<usize, DetectError> {
        let mut swept = 0;
        for document in documents.iter_mut() {
            if is_touched(&**document) {
                continue;
            }
            self.on_touched(&mut **document, env)?;
            swept += 1;
        }
        Ok(swept)
    }

    /// Walk the catalog and apply the first matching grammar.
    ///
    /// Unsaved and scratch documents are left alone.
    pub fn detect_syntax(
        &mut self,
        document: &mut dyn Document,
        env: &mut Environment<'_>,
    ) -> Result<Option<SyntaxChange>, DetectError> {
        self.plugins.clear();
        if document.is_scratch() {
            return Ok(None);
        }

        let settings = env.document_settings(document)?;
        let catalog = SyntaxCatalog::from_settings(&settings, &mut self.deprecations);
        if catalog.is_empty() {
            return Ok(None);
        }

        let winner = {
            let Some(facts) = DocumentFacts::new(document) else {
                return Ok(None);
            };
            let found = catalog.find_match(&facts, &mut self.plugins, settings.reraise_exceptions);
            self.plugins.clear();
            found?.map(|entry| entry.rule_set.syntax.clone())
        };

        Ok(winner.map(|syntax| apply_syntax(document, &syntax, env.resources)))
    }

    /// Handle a pending settings reload, then touch and reconcile.
    fn begin_event(
        &mut self,
        document: &mut dyn Document,
        env: &mut Environment<'_>,
    ) -> Result<(), DetectError> {
        if self.settings_changed.swap(false, Ordering::SeqCst) {
            self.on_settings_changed(env)?;
        }
        touch(document);
        self.update_extensions(env)?;
        Ok(())
    }
}

/// Mark `document` as processed.
pub fn touch(document: &mut dyn Document) {
    document.set_setting(TOUCHED_KEY, Value::Bool(true));
}

pub fn is_touched(document: &dyn Document) -> bool {
    document.setting(TOUCHED_KEY) == Some(Value::Bool(true))
}
