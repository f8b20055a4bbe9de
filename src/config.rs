//! Settings schema for the detector.
//!
//! The global settings document is `ApplySyntax.sublime-settings`. Any key can
//! be overridden per document (for example from a project file), which is how
//! `project_syntaxes` reaches the detector.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::settings::SettingsDocument;

/// Global settings document.
pub const PLUGIN_SETTINGS: &str = "ApplySyntax.sublime-settings";
/// Bookkeeping document listing the extensions this crate added per language.
pub const EXT_SETTINGS: &str = "ApplySyntax.ext-list";
/// Document-local flag set once a document has been processed.
pub const TOUCHED_KEY: &str = "apply_syntax_touched";

/// Package defaults, layered underneath the user's settings.
pub const PACKAGE_DEFAULTS: &str = include_str!("../assets/ApplySyntax.sublime-settings");

/// Written to the user's settings directory when no settings file exists yet.
pub const DEFAULT_USER_SETTINGS: &str = r#"
{
    // If you want exceptions reraised so you can see them in the console, change this to true.
    "reraise_exceptions": false,

    // If you want to have a syntax applied when new files are created, set new_file_syntax to the name of the syntax
    // to use.  The format is exactly the same as "syntax" in the rules below. For example, if you want to have a new
    // file use JavaScript syntax, set new_file_syntax to 'JavaScript'.
    "new_file_syntax": false,

    // Auto add extensions to language settings file in User folder.
    // Extensions added this way are tracked in ApplySyntax.ext-list and removed again
    // once no rule declares them.
    "add_exts_to_lang_settings": true,

    // Control level of logging in the console.
    // (true|false|"verbose")
    "debug": true,

    // Put your custom syntax rules here:
    "syntaxes": [
    ]
}
"#;

/// One or more grammar names, tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SyntaxName {
    One(String),
    Many(Vec<String>),
}

impl SyntaxName {
    pub fn candidates(&self) -> &[String] {
        match self {
            SyntaxName::One(name) => std::slice::from_ref(name),
            SyntaxName::Many(names) => names,
        }
    }

    /// Human readable form for logs.
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            SyntaxName::One(name) => Cow::Borrowed(name),
            SyntaxName::Many(names) => Cow::Owned(names.join(" | ")),
        }
    }
}

impl From<&str> for SyntaxName {
    fn from(name: &str) -> Self {
        SyntaxName::One(name.to_string())
    }
}

/// `debug` setting: `false`, `true` or `"verbose"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "DebugSetting", into = "DebugSetting")]
pub enum DebugLevel {
    Off,
    #[default]
    On,
    Verbose,
}

/// Raw JSON shape of the `debug` setting.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DebugSetting {
    Flag(bool),
    Word(String),
}

impl From<DebugSetting> for DebugLevel {
    fn from(raw: DebugSetting) -> Self {
        match raw {
            DebugSetting::Flag(true) => DebugLevel::On,
            DebugSetting::Word(word) if word == "verbose" => DebugLevel::Verbose,
            _ => DebugLevel::Off,
        }
    }
}

impl From<DebugLevel> for DebugSetting {
    fn from(level: DebugLevel) -> Self {
        match level {
            DebugLevel::Off => DebugSetting::Flag(false),
            DebugLevel::On => DebugSetting::Flag(true),
            DebugLevel::Verbose => DebugSetting::Word("verbose".to_string()),
        }
    }
}

impl DebugLevel {
    /// `tracing` filter directive matching this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            DebugLevel::Off => "info",
            DebugLevel::On => "debug",
            DebugLevel::Verbose => "trace",
        }
    }
}

/// `new_file_syntax` setting: `false` or a grammar name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "NewFileSyntaxSetting", into = "NewFileSyntaxSetting")]
pub struct NewFileSyntax(pub Option<SyntaxName>);

/// Raw JSON shape of the `new_file_syntax` setting.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NewFileSyntaxSetting {
    Disabled(bool),
    Syntax(SyntaxName),
}

impl From<NewFileSyntaxSetting> for NewFileSyntax {
    fn from(raw: NewFileSyntaxSetting) -> Self {
        match raw {
            NewFileSyntaxSetting::Disabled(_) => NewFileSyntax(None),
            NewFileSyntaxSetting::Syntax(name) => NewFileSyntax(Some(name)),
        }
    }
}

impl From<NewFileSyntax> for NewFileSyntaxSetting {
    fn from(setting: NewFileSyntax) -> Self {
        match setting.0 {
            Some(name) => NewFileSyntaxSetting::Syntax(name),
            None => NewFileSyntaxSetting::Disabled(false),
        }
    }
}

/// An external predicate reference inside a `function` rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionSpec {
    /// Dotted module reference, e.g. `ApplySyntax.as_plugins.is_rails_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Entry point name; `syntax_test` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Named arguments passed after the file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
}

/// A single primitive rule as written in settings.
///
/// Exactly one field is expected; when several are present the first in
/// declaration order below wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    /// Deprecated alias for `interpreter`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Deprecated alias for `file_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
}

/// A rule set as written in settings: the rules for one candidate grammar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleSetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<SyntaxName>,
    /// Deprecated alias for `syntax`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<SyntaxName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    /// `"all"` requires every rule to match; anything else means any rule.
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_mode: Option<String>,
    /// Kept as raw JSON so a single malformed rule only disables itself.
    #[serde(default)]
    #[schemars(with = "Vec<RuleSpec>")]
    pub rules: Vec<Value>,
}

impl RuleSetSpec {
    /// Target grammar, honouring the deprecated `name` alias.
    pub fn target(&self) -> Option<&SyntaxName> {
        self.syntax.as_ref().or(self.name.as_ref())
    }

    /// Declared extensions, empty when none.
    pub fn declared_extensions(&self) -> &[String] {
        self.extensions.as_deref().unwrap_or_default()
    }

    /// Parse a list of rule sets, skipping (and logging) malformed entries.
    pub fn parse_list(values: &[Value]) -> Vec<RuleSetSpec> {
        values
            .iter()
            .filter_map(|value| match serde_json::from_value::<RuleSetSpec>(value.clone()) {
                Ok(spec) => Some(spec),
                Err(e) => {
                    tracing::warn!("Skipping malformed syntax rule set {}: {}", value, e);
                    None
                }
            })
            .collect()
    }
}

/// Typed view of the global settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    /// Propagate plugin failures instead of treating them as "not matched".
    pub reraise_exceptions: bool,
    /// Grammar applied to brand new (unsaved) documents.
    #[schemars(with = "NewFileSyntaxSetting")]
    pub new_file_syntax: NewFileSyntax,
    /// Keep language settings' `extensions` lists in sync with declared extensions.
    pub add_exts_to_lang_settings: bool,
    /// Logging level: `false`, `true` or `"verbose"`.
    #[schemars(with = "DebugSetting")]
    pub debug: DebugLevel,
    /// Rule sets shipped with the package.
    pub default_syntaxes: Vec<RuleSetSpec>,
    /// User rule sets, evaluated before the defaults.
    pub syntaxes: Vec<RuleSetSpec>,
    /// Project rule sets, evaluated before everything else.
    pub project_syntaxes: Vec<RuleSetSpec>,
}

impl Settings {
    /// Every key a document may override.
    pub const KEYS: [&'static str; 7] = [
        "reraise_exceptions",
        "new_file_syntax",
        "add_exts_to_lang_settings",
        "debug",
        "default_syntaxes",
        "syntaxes",
        "project_syntaxes",
    ];

    /// Read every key from `doc`, tolerating individually invalid values.
    pub fn from_document(doc: &SettingsDocument) -> Self {
        let rule_sets = |key: &str| {
            doc.get_as::<Vec<Value>>(key)
                .map(|values| RuleSetSpec::parse_list(&values))
                .unwrap_or_default()
        };
        Self {
            reraise_exceptions: doc.get_or("reraise_exceptions", false),
            new_file_syntax: doc.get_or("new_file_syntax", NewFileSyntax::default()),
            add_exts_to_lang_settings: doc.get_or("add_exts_to_lang_settings", false),
            debug: doc.get_or("debug", DebugLevel::On),
            default_syntaxes: rule_sets("default_syntaxes"),
            syntaxes: rule_sets("syntaxes"),
            project_syntaxes: rule_sets("project_syntaxes"),
        }
    }

    /// JSON schema for the settings file.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_package_defaults_parse() {
        let doc = SettingsDocument::from_json_str(PLUGIN_SETTINGS, PACKAGE_DEFAULTS).unwrap();
        let settings = Settings::from_document(&doc);
        assert!(settings.add_exts_to_lang_settings);
        assert!(!settings.default_syntaxes.is_empty());
        assert!(settings
            .default_syntaxes
            .iter()
            .all(|spec| spec.target().is_some()));
    }

    #[test]
    fn test_default_user_settings_parse() {
        let doc = SettingsDocument::from_json_str(PLUGIN_SETTINGS, DEFAULT_USER_SETTINGS).unwrap();
        let settings = Settings::from_document(&doc);
        assert_eq!(settings.debug, DebugLevel::On);
        assert_eq!(settings.new_file_syntax, NewFileSyntax(None));
        assert!(settings.syntaxes.is_empty());
    }

    #[test]
    fn test_debug_level_values() {
        let parse = |v: Value| serde_json::from_value::<DebugLevel>(v).unwrap();
        assert_eq!(parse(json!(false)), DebugLevel::Off);
        assert_eq!(parse(json!(true)), DebugLevel::On);
        assert_eq!(parse(json!("verbose")), DebugLevel::Verbose);
        assert_eq!(parse(json!("loud")), DebugLevel::Off);
        assert_eq!(serde_json::to_value(DebugLevel::Verbose).unwrap(), json!("verbose"));
    }

    #[test]
    fn test_new_file_syntax_values() {
        let parse = |v: Value| serde_json::from_value::<NewFileSyntax>(v).unwrap();
        assert_eq!(parse(json!(false)), NewFileSyntax(None));
        assert_eq!(
            parse(json!("JavaScript/JavaScript")),
            NewFileSyntax(Some(SyntaxName::from("JavaScript/JavaScript")))
        );
        assert_eq!(
            parse(json!(["A/A", "B/B"])).0.unwrap().candidates(),
            &["A/A".to_string(), "B/B".to_string()]
        );
    }

    #[test]
    fn test_rule_set_name_alias() {
        let spec: RuleSetSpec = serde_json::from_value(json!({
            "name": "Ruby/Ruby",
            "match": "all",
            "rules": [{"first_line": "^#!"}, {"bogus": 1}]
        }))
        .unwrap();
        assert_eq!(spec.target(), Some(&SyntaxName::from("Ruby/Ruby")));
        assert_eq!(spec.match_mode.as_deref(), Some("all"));
        assert_eq!(spec.rules.len(), 2);
        assert!(spec.declared_extensions().is_empty());
    }

    #[test]
    fn test_malformed_rule_sets_are_skipped() {
        let specs = RuleSetSpec::parse_list(&[
            json!({"syntax": "Ruby/Ruby", "extensions": ["rb"]}),
            json!({"syntax": 42}),
            json!("not an object"),
        ]);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].declared_extensions(), &["rb".to_string()]);
    }

    #[test]
    fn test_invalid_scalar_falls_back_to_default() {
        let mut doc = SettingsDocument::new(PLUGIN_SETTINGS);
        doc.set("reraise_exceptions", "sometimes");
        doc.set("syntaxes", json!([{"syntax": "Python/Python", "rules": []}]));
        let settings = Settings::from_document(&doc);
        assert!(!settings.reraise_exceptions);
        assert_eq!(settings.syntaxes.len(), 1);
    }

    #[test]
    fn test_schema_mentions_rule_keys() {
        let schema = serde_json::to_string(&Settings::json_schema()).unwrap();
        assert!(schema.contains("project_syntaxes"));
        assert!(schema.contains("first_line"));
        assert!(schema.contains("interpreter"));
    }
}
