//! Installed grammars: resource access, the inventory fingerprint and
//! switching a document to a named grammar.
//!
//! # Module Structure
//! - `types`: `GrammarFormat` and `SyntaxChange`
//! - `inventory`: `LanguageInventory`, the fingerprinted set of installed grammars
//! - `resolve`: turning a grammar name into a resource path and applying it
//! - `loader`: `FsResources`, a packages directory on disk (runtime only)

mod inventory;
#[cfg(feature = "runtime")]
mod loader;
mod resolve;
mod types;

use std::io;

pub use inventory::LanguageInventory;
#[cfg(feature = "runtime")]
pub use loader::FsResources;
pub use resolve::{apply_syntax, candidate_paths};
pub use types::{GrammarFormat, SyntaxChange};

use crate::primitives::path::Platform;

/// Trait for reading grammar resources from the host.
///
/// Resource paths always start with `Packages/` and use `/` separators.
/// This abstraction allows:
/// - Testing with mock implementations
/// - Running against an editor's own resource API
/// - Running standalone over a packages directory on disk
pub trait ResourceLoader {
    /// Every resource whose file name matches `pattern` (`*` and `?` globs).
    fn find_resources(&self, pattern: &str) -> Vec<String>;

    /// Read a resource as text.
    fn load_resource(&self, path: &str) -> io::Result<String>;

    /// Check if a resource exists.
    fn resource_exists(&self, path: &str) -> bool {
        self.load_resource(path).is_ok()
    }

    /// Platform whose path conventions apply to resource names.
    fn platform(&self) -> Platform {
        Platform::current()
    }

    /// Whether the host understands `.sublime-syntax` grammars.
    fn supports_sublime_syntax(&self) -> bool {
        true
    }
}

/// Grammar formats the host can load, in order of preference.
pub fn supported_formats(loader: &dyn ResourceLoader) -> Vec<GrammarFormat> {
    GrammarFormat::ALL
        .into_iter()
        .filter(|format| {
            *format != GrammarFormat::SublimeSyntax || loader.supports_sublime_syntax()
        })
        .collect()
}
