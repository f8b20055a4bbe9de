//! Settings documents.
//!
//! A settings document is a named JSON object (`ApplySyntax.sublime-settings`,
//! `Python.sublime-settings`, `ApplySyntax.ext-list`, ...). Documents may be
//! layered over package defaults: reads fall through to the defaults, writes
//! only ever touch the user layer.
//!
//! `SettingsStore` abstracts where documents live so the engine can run
//! against an editor's own settings, the filesystem, or memory in tests.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::SettingsError;

/// Callback invoked with the changed key whenever a document is modified.
pub type ChangeListener = Box<dyn FnMut(&str) + Send>;

/// A named key/value settings document.
pub struct SettingsDocument {
    name: String,
    values: Map<String, Value>,
    defaults: Map<String, Value>,
    listeners: Vec<(String, ChangeListener)>,
}

impl SettingsDocument {
    /// Create an empty document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Map::new(),
            defaults: Map::new(),
            listeners: Vec::new(),
        }
    }

    /// Create a document from Sublime-style JSON (comments and trailing commas allowed).
    pub fn from_json_str(name: impl Into<String>, text: &str) -> Result<Self, SettingsError> {
        let name = name.into();
        let values = parse_settings_object(&name, text)?;
        Ok(Self {
            values,
            ..Self::new(name)
        })
    }

    /// Layer package defaults underneath this document.
    pub fn with_defaults(mut self, defaults: Map<String, Value>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw value for `key`, falling back to the package defaults.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).or_else(|| self.defaults.get(key))
    }

    /// Typed value for `key`.
    ///
    /// A value of the wrong shape is logged and reported as absent so one bad
    /// key never takes the rest of the document down with it.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring invalid '{}' in {}: {}", key, self.name, e);
                None
            }
        }
    }

    /// Typed value for `key`, or `default` when absent or invalid.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }

    /// Keys set in the user layer, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.values.get(key) == Some(&value) {
            return;
        }
        self.values.insert(key.to_string(), value);
        self.notify(key);
    }

    pub fn erase(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.notify(key);
        }
    }

    /// Replace the user layer wholesale (used when the backing file is reloaded).
    pub fn replace_values(&mut self, values: Map<String, Value>) {
        if self.values == values {
            return;
        }
        self.values = values;
        self.notify("");
    }

    /// The user layer as a JSON object, for persisting.
    pub fn user_values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Register a change listener under `tag`, replacing any listener with the same tag.
    pub fn add_on_change(&mut self, tag: &str, listener: ChangeListener) {
        self.clear_on_change(tag);
        self.listeners.push((tag.to_string(), listener));
    }

    pub fn clear_on_change(&mut self, tag: &str) {
        self.listeners.retain(|(t, _)| t != tag);
    }

    fn notify(&mut self, key: &str) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(key);
        }
    }
}

impl fmt::Debug for SettingsDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsDocument")
            .field("name", &self.name)
            .field("values", &self.values)
            .field("defaults", &self.defaults.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Where settings documents are loaded from and saved to.
pub trait SettingsStore {
    /// Load (or create empty) the document called `name`.
    ///
    /// Repeated loads return the same document, so edits made through one
    /// handle are visible through the next.
    fn load_settings(&mut self, name: &str) -> Result<&mut SettingsDocument, SettingsError>;

    /// Persist the document called `name`.
    fn save_settings(&mut self, name: &str) -> Result<(), SettingsError>;

    /// Seed `name` from the JSON `template` unless the user already has settings.
    ///
    /// Returns `true` when the template was applied.
    fn create_if_missing(&mut self, name: &str, template: &str) -> Result<bool, SettingsError> {
        let doc = self.load_settings(name)?;
        if doc.keys().next().is_some() {
            return Ok(false);
        }
        doc.replace_values(parse_settings_object(name, template)?);
        self.save_settings(name)?;
        Ok(true)
    }
}

/// In-memory settings store. Saves are counted, not written anywhere.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    documents: HashMap<String, SettingsDocument>,
    saves: HashMap<String, usize>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a prepared document, replacing one with the same name.
    pub fn insert(&mut self, document: SettingsDocument) {
        self.documents.insert(document.name().to_string(), document);
    }

    /// Read-only access to a document that has been loaded or inserted.
    pub fn document(&self, name: &str) -> Option<&SettingsDocument> {
        self.documents.get(name)
    }

    /// How many times `name` has been saved.
    pub fn save_count(&self, name: &str) -> usize {
        self.saves.get(name).copied().unwrap_or(0)
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_settings(&mut self, name: &str) -> Result<&mut SettingsDocument, SettingsError> {
        Ok(self
            .documents
            .entry(name.to_string())
            .or_insert_with(|| SettingsDocument::new(name)))
    }

    fn save_settings(&mut self, name: &str) -> Result<(), SettingsError> {
        *self.saves.entry(name.to_string()).or_insert(0) += 1;
        Ok(())
    }
}

/// Parse Sublime-style JSON into an object map.
pub fn parse_settings_object(name: &str, text: &str) -> Result<Map<String, Value>, SettingsError> {
    let cleaned = strip_json_comments(text);
    if cleaned.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SettingsError::NotAnObject(name.to_string())),
        Err(source) => Err(SettingsError::Parse {
            name: name.to_string(),
            source,
        }),
    }
}

/// Remove `//` and `/* */` comments and trailing commas from JSON text.
///
/// Newlines inside comments are kept so parse errors still point at the
/// right line.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    strip_trailing_commas(&out)
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }

    out
}
