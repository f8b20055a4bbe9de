use super::{supported_formats, GrammarFormat, ResourceLoader, SyntaxChange};
use crate::config::SyntaxName;
use crate::model::document::Document;
use crate::primitives::path::{base_name, dir_name, format_resource_path, split_extension, Platform};

/// Resource paths a grammar name may refer to, most preferred first.
///
/// Names need a package directory (`Python/Python`); bare names resolve to
/// nothing. A recognized format suffix on the name restricts the result to
/// that format.
pub fn candidate_paths(name: &str, formats: &[GrammarFormat], platform: Platform) -> Vec<String> {
    let dir = dir_name(name);
    if dir.is_empty() {
        return Vec::new();
    }
    let requested = GrammarFormat::from_suffix(split_extension(name).1)
        .filter(|format| formats.contains(format));
    let stem = split_extension(base_name(name)).0;

    formats
        .iter()
        .filter(|format| requested.map_or(true, |requested| requested == **format))
        .map(|format| {
            format_resource_path(
                &format!("Packages/{}/{}{}", dir, stem, format.suffix()),
                platform,
            )
        })
        .collect()
}

/// Switch `document` to the first candidate of `syntax` that exists.
///
/// Candidates are tried in order; the document is left alone when it
/// already uses the candidate reached first.
pub fn apply_syntax(
    document: &mut dyn Document,
    syntax: &SyntaxName,
    loader: &dyn ResourceLoader,
) -> SyntaxChange {
    let formats = supported_formats(loader);
    let current = document.syntax();

    for name in syntax.candidates() {
        for path in candidate_paths(name, &formats, loader.platform()) {
            if current.as_deref() == Some(path.as_str()) {
                tracing::debug!("Syntax already set to {}", path);
                return SyntaxChange::AlreadySet(path);
            }
            if loader.resource_exists(&path) {
                document.set_syntax_file(&path);
                tracing::info!("Syntax set to {} using {}", base_name(name), path);
                return SyntaxChange::Switched(path);
            }
            tracing::debug!("Syntax file for {} does not exist at {}", name, path);
        }
    }
    SyntaxChange::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::MemoryDocument;
    use std::io;

    const BOTH: &[GrammarFormat] = &GrammarFormat::ALL;

    struct Installed(Vec<&'static str>);

    impl ResourceLoader for Installed {
        fn find_resources(&self, _pattern: &str) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }

        fn load_resource(&self, path: &str) -> io::Result<String> {
            if self.0.iter().any(|installed| *installed == path) {
                Ok(String::new())
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, path.to_string()))
            }
        }
    }

    #[test]
    fn test_candidates_prefer_sublime_syntax() {
        assert_eq!(
            candidate_paths("Python/Python", BOTH, Platform::Unix),
            vec![
                "Packages/Python/Python.sublime-syntax".to_string(),
                "Packages/Python/Python.tmLanguage".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidates_need_a_directory() {
        assert!(candidate_paths("Python", BOTH, Platform::Unix).is_empty());
    }

    #[test]
    fn test_suffix_restricts_format() {
        assert_eq!(
            candidate_paths("Python/Python.tmLanguage", BOTH, Platform::Unix),
            vec!["Packages/Python/Python.tmLanguage".to_string()]
        );
        // Unsupported suffix: every supported format is still tried.
        assert_eq!(
            candidate_paths(
                "Python/Python.sublime-syntax",
                &[GrammarFormat::TmLanguage],
                Platform::Unix
            ),
            vec!["Packages/Python/Python.tmLanguage".to_string()]
        );
    }

    #[test]
    fn test_windows_separators() {
        assert_eq!(
            candidate_paths(
                "User\\Syntaxes\\Custom",
                &[GrammarFormat::TmLanguage],
                Platform::Windows,
            ),
            vec!["Packages/User/Syntaxes/Custom.tmLanguage".to_string()]
        );
    }

    #[test]
    fn test_apply_falls_through_to_existing_resource() {
        let loader = Installed(vec!["Packages/Ruby/Ruby.tmLanguage"]);
        let mut doc = MemoryDocument::new("a.rb", "");
        let change = apply_syntax(
            &mut doc,
            &SyntaxName::Many(vec!["Rails/Ruby on Rails".into(), "Ruby/Ruby".into()]),
            &loader,
        );
        assert_eq!(
            change,
            SyntaxChange::Switched("Packages/Ruby/Ruby.tmLanguage".to_string())
        );
        assert_eq!(doc.syntax_switches().len(), 1);
    }

    #[test]
    fn test_apply_twice_switches_once() {
        let loader = Installed(vec!["Packages/Ruby/Ruby.sublime-syntax"]);
        let mut doc = MemoryDocument::new("a.rb", "");
        let syntax = SyntaxName::from("Ruby/Ruby");
        apply_syntax(&mut doc, &syntax, &loader);
        let second = apply_syntax(&mut doc, &syntax, &loader);
        assert!(matches!(second, SyntaxChange::AlreadySet(_)));
        assert_eq!(doc.syntax_switches().len(), 1);
    }

    #[test]
    fn test_apply_not_found_leaves_document_alone() {
        let loader = Installed(vec![]);
        let mut doc = MemoryDocument::new("a.rb", "");
        assert_eq!(
            apply_syntax(&mut doc, &SyntaxName::from("Ruby/Ruby"), &loader),
            SyntaxChange::NotFound
        );
        assert!(doc.syntax().is_none());
    }
}
