//! Rule-based syntax detection for text editors.
//!
//! Given an open document, [`Detector`] walks the configured rule sets
//! (project, then user, then package defaults) and switches the document to
//! the grammar of the first set whose rules match. It also keeps each
//! language's `extensions` list in step with the extensions declared by the
//! rule sets.
//!
//! The host editor is reached through traits: [`model::document::Document`],
//! [`grammar::ResourceLoader`], [`model::settings::SettingsStore`] and
//! [`plugins::ModuleResolver`].

pub mod catalog;
pub mod config;
pub mod detector;
pub mod error;
pub mod extensions;
pub mod grammar;
pub mod model;
pub mod plugins;
pub mod primitives;

pub use detector::{Detector, Environment};
pub use error::{DetectError, PluginError, SettingsError};
