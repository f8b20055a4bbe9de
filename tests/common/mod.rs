//! Shared test doubles for the integration tests.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::io;

use apply_syntax::config::{PACKAGE_DEFAULTS, PLUGIN_SETTINGS};
use apply_syntax::grammar::ResourceLoader;
use apply_syntax::model::document::Document;
use apply_syntax::model::settings::{parse_settings_object, MemorySettingsStore, SettingsDocument};
use apply_syntax::primitives::glob_match::resource_glob_matches;
use apply_syntax::primitives::path::{base_name, Platform};
use serde_json::Value;

/// In-memory grammar inventory.
pub struct MockResources {
    resources: BTreeSet<String>,
    pub platform: Platform,
    pub sublime_syntax: bool,
}

impl MockResources {
    pub fn new(resources: &[&str]) -> Self {
        Self {
            resources: resources.iter().map(|r| r.to_string()).collect(),
            platform: Platform::Unix,
            sublime_syntax: true,
        }
    }

    pub fn install(&mut self, resource: &str) {
        self.resources.insert(resource.to_string());
    }

    pub fn uninstall(&mut self, resource: &str) {
        self.resources.remove(resource);
    }
}

impl ResourceLoader for MockResources {
    fn find_resources(&self, pattern: &str) -> Vec<String> {
        self.resources
            .iter()
            .filter(|r| resource_glob_matches(pattern, base_name(r)))
            .cloned()
            .collect()
    }

    fn load_resource(&self, path: &str) -> io::Result<String> {
        if self.resources.contains(path) {
            Ok(String::new())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn supports_sublime_syntax(&self) -> bool {
        self.sublime_syntax
    }
}

/// An editor view over in-memory text that counts what it is asked for.
#[derive(Default)]
pub struct MockDocument {
    pub file_name: Option<String>,
    pub text: String,
    pub scratch: bool,
    pub settings: HashMap<String, Value>,
    pub switches: Vec<String>,
    pub contents_reads: Cell<usize>,
}

impl MockDocument {
    pub fn new(file_name: &str, text: &str) -> Self {
        Self {
            file_name: Some(file_name.to_string()),
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn unsaved() -> Self {
        Self::default()
    }
}

impl Document for MockDocument {
    fn file_name(&self) -> Option<String> {
        self.file_name.clone()
    }

    fn is_scratch(&self) -> bool {
        self.scratch
    }

    fn first_line(&self) -> String {
        self.text.lines().next().unwrap_or_default().to_string()
    }

    fn contents(&self) -> String {
        self.contents_reads.set(self.contents_reads.get() + 1);
        self.text.clone()
    }

    fn setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key).cloned()
    }

    fn set_setting(&mut self, key: &str, value: Value) {
        self.settings.insert(key.to_string(), value);
    }

    fn set_syntax_file(&mut self, resource_path: &str) {
        self.switches.push(resource_path.to_string());
        self.set_setting("syntax", Value::String(resource_path.to_string()));
    }
}

/// A settings store whose global document has the package defaults layered
/// underneath `user` settings.
pub fn store_with_defaults(user: Value) -> MemorySettingsStore {
    let defaults = parse_settings_object(PLUGIN_SETTINGS, PACKAGE_DEFAULTS).unwrap();
    store_with(user, defaults)
}

/// A settings store whose global document holds exactly `user`.
pub fn store_with_user(user: Value) -> MemorySettingsStore {
    store_with(user, Default::default())
}

fn store_with(user: Value, defaults: serde_json::Map<String, Value>) -> MemorySettingsStore {
    let mut doc = SettingsDocument::new(PLUGIN_SETTINGS).with_defaults(defaults);
    if let Value::Object(values) = user {
        doc.replace_values(values);
    }
    let mut store = MemorySettingsStore::new();
    store.insert(doc);
    store
}
