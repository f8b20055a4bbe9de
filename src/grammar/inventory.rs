use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use super::{supported_formats, ResourceLoader};
use crate::primitives::path::{base_name, split_extension};

/// The set of installed grammars, ignoring their file format.
///
/// `Packages/Python/Python.sublime-syntax` and `Packages/Python/Python.tmLanguage`
/// both appear as `Packages/Python/Python`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageInventory {
    grammars: BTreeSet<String>,
    fingerprint: String,
}

impl LanguageInventory {
    /// Enumerate every grammar resource the host can load.
    pub fn scan(loader: &dyn ResourceLoader) -> Self {
        let grammars = supported_formats(loader)
            .into_iter()
            .flat_map(|format| loader.find_resources(&format.glob()))
            .map(|path| split_extension(&path).0.to_string())
            .collect();
        Self::from_grammars(grammars)
    }

    /// Build an inventory from suffix-less resource paths.
    pub fn from_grammars(grammars: BTreeSet<String>) -> Self {
        let mut hasher = Sha256::new();
        for grammar in &grammars {
            hasher.update(grammar.as_bytes());
            hasher.update(b"\n");
        }
        let fingerprint = format!("{:x}", hasher.finalize());
        tracing::trace!(
            "Language inventory: {} grammars, fingerprint {}",
            grammars.len(),
            fingerprint
        );
        Self {
            grammars,
            fingerprint,
        }
    }

    /// Hex digest identifying this exact set of grammars.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Whether the suffix-less resource path `grammar` is installed.
    pub fn contains(&self, grammar: &str) -> bool {
        self.grammars.contains(grammar)
    }

    /// Language names (grammar base names) of every installed grammar.
    pub fn languages(&self) -> BTreeSet<String> {
        self.grammars
            .iter()
            .map(|grammar| base_name(grammar).to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}
