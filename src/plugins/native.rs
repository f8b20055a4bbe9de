//! Predicate modules loaded from dynamic libraries.
//!
//! `Packages/Pkg/sub/module` maps to `<packages>/Pkg/sub/libmodule.so`
//! (`module.dll` on Windows, `libmodule.dylib` on macOS). Each exported
//! entry point has the C signature
//!
//! ```c
//! int syntax_test(const char *file_path, const char *args_json);
//! ```
//!
//! returning 1 for matched, 0 for not matched and a negative value on failure.

use std::ffi::{c_char, c_int, CString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

use super::{ModuleResolver, PluginArgs, PluginModule, Predicate};
use crate::error::PluginError;

type EntryPointFn = unsafe extern "C" fn(*const c_char, *const c_char) -> c_int;

/// Resolves modules to dynamic libraries under a packages directory.
pub struct NativeModuleResolver {
    packages_dir: PathBuf,
}

impl NativeModuleResolver {
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
        }
    }

    /// Library file a module path refers to.
    pub fn library_path(&self, module_path: &str) -> Option<PathBuf> {
        let relative = module_path.strip_prefix("Packages/")?;
        let mut segments: Vec<&str> = relative.split('/').collect();
        let module = segments.pop()?;
        if module.is_empty() || segments.iter().any(|s| s.is_empty() || *s == "..") {
            return None;
        }
        let dir = segments
            .iter()
            .fold(self.packages_dir.clone(), |path, segment| path.join(segment));
        Some(dir.join(libloading::library_filename(module)))
    }
}

impl ModuleResolver for NativeModuleResolver {
    fn load_module(&self, module_path: &str) -> Result<Arc<dyn PluginModule>, PluginError> {
        let path = self
            .library_path(module_path)
            .filter(|path| path.is_file())
            .ok_or_else(|| PluginError::ModuleNotFound(module_path.to_string()))?;

        // SAFETY: loading a library runs its initializers; plugin libraries are
        // trusted the same way the user's settings are.
        let library = unsafe { Library::new(&path) }.map_err(|e| PluginError::LoadFailed {
            module: module_path.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!("Loaded native plugin {:?}", path);

        Ok(Arc::new(NativeModule {
            library: Arc::new(library),
            path,
        }))
    }
}

struct NativeModule {
    library: Arc<Library>,
    path: PathBuf,
}

impl PluginModule for NativeModule {
    fn entry_point(&self, name: &str) -> Option<Predicate> {
        let symbol = format!("{}\0", name);
        // SAFETY: the symbol is required to have the `EntryPointFn` signature.
        let function: EntryPointFn = unsafe {
            match self.library.get::<EntryPointFn>(symbol.as_bytes()) {
                Ok(function) => *function,
                Err(e) => {
                    tracing::debug!("No entry point '{}' in {:?}: {}", name, self.path, e);
                    return None;
                }
            }
        };

        let library = Arc::clone(&self.library);
        let path = self.path.clone();
        Some(Arc::new(move |file_path: &str, args: &PluginArgs| {
            call_entry_point(&library, &path, function, file_path, args)
        }))
    }
}

fn call_entry_point(
    _library: &Library,
    module: &Path,
    function: EntryPointFn,
    file_path: &str,
    args: &PluginArgs,
) -> Result<bool, PluginError> {
    let c_path = CString::new(file_path).map_err(|e| PluginError::Predicate(e.to_string()))?;
    let args_json = serde_json::to_string(args).map_err(|e| PluginError::Predicate(e.to_string()))?;
    let c_args = CString::new(args_json).map_err(|e| PluginError::Predicate(e.to_string()))?;

    // SAFETY: both pointers are valid NUL-terminated strings for the duration
    // of the call, and `_library` keeps the code mapped.
    let status = unsafe { function(c_path.as_ptr(), c_args.as_ptr()) };
    match status {
        1 => Ok(true),
        0 => Ok(false),
        code => Err(PluginError::Predicate(format!(
            "{:?} returned status {}",
            module, code
        ))),
    }
}
