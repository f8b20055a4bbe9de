//! Documents and the facts rules are evaluated against.
//!
//! `Document` is the host editor's view of an open file. `DocumentFacts`
//! wraps one for the duration of a single detection pass and fetches the
//! first line and the full contents at most once, and only when a rule asks.

use std::collections::HashMap;

use once_cell::unsync::OnceCell;
use serde_json::Value;

use crate::primitives::path::base_name;

/// An open document in the host editor.
pub trait Document {
    /// Backing file path; `None` for buffers that were never saved.
    fn file_name(&self) -> Option<String>;

    /// Scratch buffers (output panels, throwaway views) are never detected.
    fn is_scratch(&self) -> bool {
        false
    }

    /// Text of the first line, without its line ending.
    fn first_line(&self) -> String;

    /// Entire text of the document.
    fn contents(&self) -> String;

    /// Document-local setting.
    fn setting(&self, key: &str) -> Option<Value>;

    fn set_setting(&mut self, key: &str, value: Value);

    /// Resource path of the grammar currently applied.
    fn syntax(&self) -> Option<String> {
        self.setting("syntax")
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Switch the document to the grammar at `resource_path`.
    fn set_syntax_file(&mut self, resource_path: &str);
}

/// Lazily fetched, memoized facts about one document.
pub struct DocumentFacts<'a> {
    document: &'a dyn Document,
    file_name: String,
    first_line: OnceCell<String>,
    contents: OnceCell<String>,
}

impl<'a> DocumentFacts<'a> {
    /// Facts for `document`, or `None` when it has no backing file.
    pub fn new(document: &'a dyn Document) -> Option<Self> {
        let file_name = document.file_name().filter(|name| !name.is_empty())?;
        Some(Self {
            document,
            file_name,
            first_line: OnceCell::new(),
            contents: OnceCell::new(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Lowercased base name of the file, used for extension matching.
    pub fn base_name_lower(&self) -> String {
        base_name(&self.file_name).to_lowercase()
    }

    pub fn first_line(&self) -> &str {
        self.first_line.get_or_init(|| self.document.first_line())
    }

    pub fn contents(&self) -> &str {
        self.contents.get_or_init(|| self.document.contents())
    }

    /// Whether the full contents have been fetched during this pass.
    pub fn contents_loaded(&self) -> bool {
        self.contents.get().is_some()
    }
}

/// A document held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pub file_name: Option<String>,
    pub text: String,
    pub scratch: bool,
    settings: HashMap<String, Value>,
    syntax_switches: Vec<String>,
}

impl MemoryDocument {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            text: text.into(),
            ..Self::default()
        }
    }

    /// An unsaved buffer with no backing file.
    pub fn unsaved(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Every grammar this document was switched to, in order.
    pub fn syntax_switches(&self) -> &[String] {
        &self.syntax_switches
    }
}

impl Document for MemoryDocument {
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
        self.text.clone()
    }

    fn setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key).cloned()
    }

    fn set_setting(&mut self, key: &str, value: Value) {
        self.settings.insert(key.to_string(), value);
    }

    fn set_syntax_file(&mut self, resource_path: &str) {
        self.syntax_switches.push(resource_path.to_string());
        self.set_setting("syntax", Value::String(resource_path.to_string()));
    }
}

/// A document backed by a file on disk, read on demand.
#[cfg(feature = "runtime")]
#[derive(Debug)]
pub struct FileDocument {
    path: std::path::PathBuf,
    settings: HashMap<String, Value>,
}

#[cfg(feature = "runtime")]
impl FileDocument {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: HashMap::new(),
        }
    }

    fn read(&self) -> String {
        match std::fs::read(&self.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!("Failed to read {:?}: {}", self.path, e);
                String::new()
            }
        }
    }
}

#[cfg(feature = "runtime")]
impl Document for FileDocument {
    fn file_name(&self) -> Option<String> {
        Some(self.path.to_string_lossy().into_owned())
    }

    fn first_line(&self) -> String {
        use std::io::BufRead;

        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", self.path, e);
                return String::new();
            }
        };
        let mut line = Vec::new();
        if let Err(e) = std::io::BufReader::new(file).read_until(b'\n', &mut line) {
            tracing::warn!("Failed to read first line of {:?}: {}", self.path, e);
        }
        String::from_utf8_lossy(&line)
            .trim_end_matches(['\n', '\r'])
            .to_string()
    }

    fn contents(&self) -> String {
        self.read()
    }

    fn setting(&self, key: &str) -> Option<Value> {
        self.settings.get(key).cloned()
    }

    fn set_setting(&mut self, key: &str, value: Value) {
        self.settings.insert(key.to_string(), value);
    }

    fn set_syntax_file(&mut self, resource_path: &str) {
        self.set_setting("syntax", Value::String(resource_path.to_string()));
    }
}
