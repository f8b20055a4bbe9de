//! Filesystem-backed settings store.
//!
//! Each document lives in `<dir>/<name>` as a JSON object. Documents named in
//! `defaults` get the given package defaults layered underneath them.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_USER_SETTINGS, PLUGIN_SETTINGS};
use crate::error::SettingsError;
use crate::model::settings::{parse_settings_object, SettingsDocument, SettingsStore};

pub struct FileSettingsStore {
    dir: PathBuf,
    documents: HashMap<String, SettingsDocument>,
    defaults: HashMap<String, &'static str>,
}

impl FileSettingsStore {
    /// Create a store rooted at `dir`. Nothing is read until a document is loaded.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            documents: HashMap::new(),
            defaults: HashMap::new(),
        }
    }

    /// Layer `json` underneath the document called `name` when it is loaded.
    pub fn with_defaults(mut self, name: &str, json: &'static str) -> Self {
        self.defaults.insert(name.to_string(), json);
        self
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Re-read `name` from disk if it was already loaded.
    ///
    /// Change listeners fire when the contents differ.
    pub fn reload(&mut self, name: &str) -> Result<(), SettingsError> {
        let path = self.path_for(name);
        if let Some(doc) = self.documents.get_mut(name) {
            let values = match std::fs::read_to_string(&path) {
                Ok(text) => parse_settings_object(name, &text)?,
                Err(e) if e.kind() == io::ErrorKind::NotFound => Default::default(),
                Err(source) => return Err(SettingsError::Read { path, source }),
            };
            doc.replace_values(values);
        }
        Ok(())
    }
}

fn read_document(
    dir: &Path,
    name: &str,
    defaults: Option<&str>,
) -> Result<SettingsDocument, SettingsError> {
    let path = dir.join(name);
    let mut doc = match std::fs::read_to_string(&path) {
        Ok(text) => SettingsDocument::from_json_str(name, &text)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => SettingsDocument::new(name),
        Err(source) => return Err(SettingsError::Read { path, source }),
    };
    if let Some(json) = defaults {
        doc = doc.with_defaults(parse_settings_object(name, json)?);
    }
    tracing::trace!("Loaded settings document {} from {:?}", name, path);
    Ok(doc)
}

impl SettingsStore for FileSettingsStore {
    fn load_settings(&mut self, name: &str) -> Result<&mut SettingsDocument, SettingsError> {
        match self.documents.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let doc = read_document(&self.dir, name, self.defaults.get(name).copied())?;
                Ok(entry.insert(doc))
            }
        }
    }

    fn save_settings(&mut self, name: &str) -> Result<(), SettingsError> {
        let Some(doc) = self.documents.get(name) else {
            return Ok(());
        };
        let path = self.path_for(name);
        let text = serde_json::to_string_pretty(doc.user_values()).map_err(|source| {
            SettingsError::Parse {
                name: name.to_string(),
                source,
            }
        })?;
        std::fs::create_dir_all(&self.dir).map_err(|source| SettingsError::Write {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, text + "\n").map_err(|source| SettingsError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::trace!("Saved settings document {} to {:?}", name, path);
        Ok(())
    }

    /// Writes `template` verbatim, comments included, when the file does not exist.
    fn create_if_missing(&mut self, name: &str, template: &str) -> Result<bool, SettingsError> {
        let path = self.path_for(name);
        if path.exists() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.dir).map_err(|source| SettingsError::Write {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(&path, template).map_err(|source| SettingsError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Created default settings file {:?}", path);
        self.reload(name)?;
        Ok(true)
    }
}

/// Create a default user settings file in `dir` if there is none.
///
/// Returns `true` when a file was written.
pub fn ensure_user_settings(dir: &Path) -> Result<bool, SettingsError> {
    FileSettingsStore::new(dir).create_if_missing(PLUGIN_SETTINGS, DEFAULT_USER_SETTINGS)
}
