//! External predicate functions for `function` rules.
//!
//! A rule names a module with a dotted reference (`Pkg.sub.module`) and an
//! entry point (`syntax_test` by default). The reference maps to the resource
//! path `Packages/Pkg/sub/module`, which a `ModuleResolver` turns into a
//! loaded module. Each module is resolved independently, so two modules may
//! export entry points with the same name.
//!
//! `PluginLoader` caches resolved entry points for the length of one
//! detection pass; the detector clears it before and after every pass.

mod builtin;
#[cfg(feature = "runtime")]
mod native;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::PluginError;

pub use builtin::BuiltinModules;
#[cfg(feature = "runtime")]
pub use native::NativeModuleResolver;

/// Entry point used when a rule does not name one.
pub const DEFAULT_ENTRY_POINT: &str = "syntax_test";

/// Named arguments declared on a `function` rule.
pub type PluginArgs = Map<String, Value>;

/// A resolved predicate: called with the document's file path and the rule's arguments.
pub type Predicate = Arc<dyn Fn(&str, &PluginArgs) -> Result<bool, PluginError> + Send + Sync>;

/// A loaded module exposing named entry points.
pub trait PluginModule {
    fn entry_point(&self, name: &str) -> Option<Predicate>;
}

/// Turns a module resource path into a loaded module.
pub trait ModuleResolver {
    /// Load the module at `module_path` (e.g. `Packages/ApplySyntax/as_plugins/is_size`).
    ///
    /// Return `PluginError::ModuleNotFound` when this resolver does not know
    /// the module, so a `ChainResolver` can try the next one.
    fn load_module(&self, module_path: &str) -> Result<Arc<dyn PluginModule>, PluginError>;
}

/// Tries several resolvers in order.
pub struct ChainResolver {
    resolvers: Vec<Box<dyn ModuleResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Box<dyn ModuleResolver>>) -> Self {
        Self { resolvers }
    }
}

impl ModuleResolver for ChainResolver {
    fn load_module(&self, module_path: &str) -> Result<Arc<dyn PluginModule>, PluginError> {
        for resolver in &self.resolvers {
            match resolver.load_module(module_path) {
                Err(PluginError::ModuleNotFound(_)) => continue,
                other => return other,
            }
        }
        Err(PluginError::ModuleNotFound(module_path.to_string()))
    }
}

/// Convert a dotted module reference into its resource path.
///
/// References are module names, not file names, so `Pkg.module.py` is rejected.
pub fn module_path(source: &str) -> Result<String, PluginError> {
    if source.to_lowercase().ends_with(".py") {
        return Err(PluginError::BadReference(source.to_string()));
    }
    let segments: Vec<&str> = source.split('.').collect();
    let valid = segments.iter().all(|s| {
        !s.is_empty() && !s.contains(['/', '\\']) && *s != ".."
    });
    if !valid {
        return Err(PluginError::BadReference(source.to_string()));
    }
    Ok(format!("Packages/{}", segments.join("/")))
}

/// Resolves and caches predicates for one detection pass.
pub struct PluginLoader {
    resolver: Box<dyn ModuleResolver>,
    cache: HashMap<(String, String), Predicate>,
}

impl PluginLoader {
    pub fn new(resolver: Box<dyn ModuleResolver>) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    /// Resolve `entry_point` (default `syntax_test`) in the module named by `source`.
    pub fn resolve(
        &mut self,
        source: &str,
        entry_point: Option<&str>,
    ) -> Result<Predicate, PluginError> {
        let entry_point = entry_point.unwrap_or(DEFAULT_ENTRY_POINT);
        let key = (source.to_string(), entry_point.to_string());
        if let Some(predicate) = self.cache.get(&key) {
            return Ok(Arc::clone(predicate));
        }

        let path = module_path(source)?;
        let module = self.resolver.load_module(&path)?;
        let predicate = module
            .entry_point(entry_point)
            .ok_or_else(|| PluginError::MissingEntryPoint {
                module: path.clone(),
                name: entry_point.to_string(),
            })?;
        tracing::trace!("Resolved plugin {}::{}", path, entry_point);

        self.cache.insert(key, Arc::clone(&predicate));
        Ok(predicate)
    }

    /// Forget every resolved predicate.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl Default for PluginLoader {
    /// Only the built-in modules.
    fn default() -> Self {
        Self::new(Box::new(BuiltinModules::new()))
    }
}
