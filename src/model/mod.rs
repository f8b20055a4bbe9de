//! Host-facing data: open documents and settings documents.

pub mod document;
pub mod settings;
// Filesystem-backed store - runtime only
#[cfg(feature = "runtime")]
pub mod settings_fs;
