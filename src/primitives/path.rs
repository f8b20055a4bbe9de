//! Resource path helpers.
//!
//! Grammar names and resource paths are plain strings using `/` as the
//! separator, regardless of the platform the host runs on. Rules written on
//! Windows may still use `\`, so every helper here accepts both.

/// Host platform convention, used when normalizing resource paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Format a path for the resource API.
///
/// Backslashes become forward slashes. On Windows a leading drive letter
/// (`C:\Users`) is rewritten to `C/Users`.
pub fn format_resource_path(path: &str, platform: Platform) -> String {
    let mut path = path.to_string();
    if platform == Platform::Windows {
        let bytes = path.as_bytes();
        if bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'/' || bytes[2] == b'\\')
        {
            path = format!("{}/{}", &path[..1], &path[3..]);
        }
    }
    path.replace('\\', "/")
}

/// Everything before the last separator, or `""` when there is none.
pub fn dir_name(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Everything after the last separator.
pub fn base_name(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Split a path into `(stem, extension)` where the extension keeps its dot.
///
/// Leading dots of the base name do not start an extension, so `.bashrc`
/// has no extension while `a/b.tmLanguage` has `.tmLanguage`.
pub fn split_extension(path: &str) -> (&str, &str) {
    let base_start = path.len() - base_name(path).len();
    let base = &path[base_start..];
    let leading_dots = base.len() - base.trim_start_matches('.').len();
    match base[leading_dots..].rfind('.') {
        Some(idx) => {
            let split = base_start + leading_dots + idx;
            (&path[..split], &path[split..])
        }
        None => (path, ""),
    }
}
