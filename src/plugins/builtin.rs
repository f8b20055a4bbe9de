//! Predicate modules shipped with the crate, under `ApplySyntax.as_plugins`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use super::{ModuleResolver, PluginArgs, PluginModule, Predicate, DEFAULT_ENTRY_POINT};
use crate::error::PluginError;

/// A module made of Rust functions.
struct FnModule {
    entry_points: HashMap<&'static str, Predicate>,
}

impl PluginModule for FnModule {
    fn entry_point(&self, name: &str) -> Option<Predicate> {
        self.entry_points.get(name).cloned()
    }
}

/// Resolver serving the built-in modules.
pub struct BuiltinModules {
    modules: HashMap<&'static str, Arc<dyn PluginModule + Send + Sync>>,
}

impl BuiltinModules {
    pub fn new() -> Self {
        let mut modules: HashMap<&'static str, Arc<dyn PluginModule + Send + Sync>> =
            HashMap::new();
        modules.insert(
            "Packages/ApplySyntax/as_plugins/is_rails_file",
            single_entry(Arc::new(is_rails_file)),
        );
        modules.insert(
            "Packages/ApplySyntax/as_plugins/is_size",
            single_entry(Arc::new(is_size)),
        );
        Self { modules }
    }

    /// Module paths this resolver knows.
    pub fn module_paths(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().copied()
    }
}

impl Default for BuiltinModules {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleResolver for BuiltinModules {
    fn load_module(&self, module_path: &str) -> Result<Arc<dyn PluginModule>, PluginError> {
        match self.modules.get(module_path) {
            Some(module) => Ok(Arc::clone(module) as Arc<dyn PluginModule>),
            None => Err(PluginError::ModuleNotFound(module_path.to_string())),
        }
    }
}

fn single_entry(predicate: Predicate) -> Arc<dyn PluginModule + Send + Sync> {
    let mut entry_points = HashMap::new();
    entry_points.insert(DEFAULT_ENTRY_POINT, predicate);
    Arc::new(FnModule { entry_points })
}

/// A Ruby file inside a Rails application, or a Gemfile.
///
/// A Rails application is recognized by a `config/routes.rb` in any
/// ancestor directory of the file.
fn is_rails_file(file_path: &str, _args: &PluginArgs) -> Result<bool, PluginError> {
    let path = Path::new(file_path);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let (stem, extension) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], &file_name[idx..]),
        _ => (file_name.as_str(), ""),
    };

    if stem == "gemfile" {
        return Ok(true);
    }
    if extension != ".rb" && extension != ".rake" {
        return Ok(false);
    }

    let in_rails_app = path
        .ancestors()
        .skip(1)
        .filter(|dir| !dir.as_os_str().is_empty())
        .any(|dir| dir.join("config").join("routes.rb").exists());
    Ok(in_rails_app)
}

/// Compare the file's size in bytes: `compare` is `<N`, `>N` or `=N`.
///
/// `N` may be negative, so `>-1` holds for every readable file.
fn is_size(file_path: &str, args: &PluginArgs) -> Result<bool, PluginError> {
    let compare = match args.get("compare") {
        Some(Value::String(compare)) => compare,
        _ => {
            return Err(PluginError::BadArgument {
                name: "compare".to_string(),
            })
        }
    };

    let Some((operator, size)) = parse_compare(compare) else {
        return Ok(false);
    };
    let Ok(metadata) = std::fs::metadata(file_path) else {
        return Ok(false);
    };

    let file_size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);
    Ok(match operator {
        '>' => file_size > size,
        '<' => file_size < size,
        _ => file_size == size,
    })
}

fn parse_compare(compare: &str) -> Option<(char, i64)> {
    let mut chars = compare.chars();
    let operator = chars.next().filter(|c| matches!(c, '<' | '>' | '='))?;
    let size = chars.as_str().trim().parse().ok()?;
    Some((operator, size))
}
