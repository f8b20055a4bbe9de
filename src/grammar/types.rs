/// A grammar definition file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarFormat {
    SublimeSyntax,
    TmLanguage,
}

impl GrammarFormat {
    /// Every format, preferred first.
    pub const ALL: [GrammarFormat; 2] = [GrammarFormat::SublimeSyntax, GrammarFormat::TmLanguage];

    /// File suffix, including the dot.
    pub fn suffix(self) -> &'static str {
        match self {
            GrammarFormat::SublimeSyntax => ".sublime-syntax",
            GrammarFormat::TmLanguage => ".tmLanguage",
        }
    }

    /// Glob matching every resource of this format.
    pub fn glob(self) -> String {
        format!("*{}", self.suffix())
    }

    /// Format named by a file suffix such as `.tmLanguage`.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.suffix() == suffix)
    }
}

/// What happened when a grammar name was applied to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxChange {
    /// The document was switched to this resource.
    Switched(String),
    /// The document already used this resource.
    AlreadySet(String),
    /// No candidate resolved to an existing resource.
    NotFound,
}

impl SyntaxChange {
    /// Resource the document now uses because of this change, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            SyntaxChange::Switched(path) | SyntaxChange::AlreadySet(path) => Some(path),
            SyntaxChange::NotFound => None,
        }
    }
}
