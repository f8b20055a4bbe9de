//! Syncing language `extensions` lists through the detector's event handlers.

mod common;

use apply_syntax::config::{EXT_SETTINGS, PLUGIN_SETTINGS};
use apply_syntax::extensions::language_settings_name;
use apply_syntax::model::document::Document;
use apply_syntax::model::settings::{MemorySettingsStore, SettingsStore};
use apply_syntax::{Detector, Environment};
use common::{store_with_defaults, store_with_user, MockDocument, MockResources};
use serde_json::{json, Value};

fn live(store: &mut MemorySettingsStore, language: &str) -> Vec<String> {
    store
        .load_settings(&language_settings_name(language))
        .unwrap()
        .get_as("extensions")
        .unwrap_or_default()
}

fn recorded(store: &mut MemorySettingsStore, language: &str) -> Option<Vec<String>> {
    store.load_settings(EXT_SETTINGS).unwrap().get_as(language)
}

fn set_global(store: &mut MemorySettingsStore, key: &str, value: Value) {
    store.load_settings(PLUGIN_SETTINGS).unwrap().set(key, value);
}

#[test]
fn test_added_extension_is_pruned_once_undeclared() {
    let resources = MockResources::new(&["Packages/Ruby/Ruby.sublime-syntax"]);
    let mut store = store_with_user(json!({
        "add_exts_to_lang_settings": true,
        "syntaxes": [{"syntax": "Ruby/Ruby", "extensions": ["rb"]}]
    }));
    store
        .load_settings("Ruby.sublime-settings")
        .unwrap()
        .set("extensions", json!(["ruby_custom"]));
    let mut detector = Detector::default();

    detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert_eq!(live(&mut store, "Ruby"), vec!["ruby_custom", "rb"]);
    assert_eq!(recorded(&mut store, "Ruby"), Some(vec!["rb".to_string()]));

    set_global(
        &mut store,
        "syntaxes",
        json!([{"syntax": "Ruby/Ruby", "extensions": ["rb", "rake"]}]),
    );
    let report = detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert_eq!(report.added["Ruby"], vec!["rake".to_string()]);
    assert_eq!(live(&mut store, "Ruby"), vec!["ruby_custom", "rb", "rake"]);
    assert_eq!(
        recorded(&mut store, "Ruby"),
        Some(vec!["rake".to_string(), "rb".to_string()])
    );

    set_global(
        &mut store,
        "syntaxes",
        json!([{"syntax": "Ruby/Ruby", "extensions": ["rb"]}]),
    );
    let report = detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert!(report.added.is_empty());
    assert_eq!(report.pruned["Ruby"], vec!["rake".to_string()]);
    assert_eq!(live(&mut store, "Ruby"), vec!["ruby_custom", "rb"]);
    assert_eq!(recorded(&mut store, "Ruby"), Some(vec!["rb".to_string()]));
}

#[test]
fn test_extensions_present_before_sync_are_never_removed() {
    let resources = MockResources::new(&["Packages/Ruby/Ruby.sublime-syntax"]);
    let mut store = store_with_user(json!({
        "add_exts_to_lang_settings": true,
        "syntaxes": [{"syntax": "Ruby/Ruby", "extensions": ["rb"]}]
    }));
    store
        .load_settings("Ruby.sublime-settings")
        .unwrap()
        .set("extensions", json!(["rb"]));
    let mut detector = Detector::default();

    let report = detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(recorded(&mut store, "Ruby"), None);

    set_global(&mut store, "syntaxes", json!([]));
    let report = detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert!(report.is_empty());
    assert_eq!(live(&mut store, "Ruby"), vec!["rb"]);
}

#[test]
fn test_last_declaration_owns_shared_extension() {
    let resources = MockResources::new(&[
        "Packages/Python/Python.sublime-syntax",
        "Packages/INI/INI.tmLanguage",
    ]);
    let mut store = store_with_user(json!({
        "add_exts_to_lang_settings": true,
        "default_syntaxes": [{"syntax": "Python/Python", "extensions": ["cfg", "pyw"]}],
        "syntaxes": [{"syntax": "INI/INI", "extensions": ["cfg"]}]
    }));

    Detector::default()
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();

    assert_eq!(live(&mut store, "INI"), vec!["cfg"]);
    assert_eq!(live(&mut store, "Python"), vec!["pyw"]);
    assert_eq!(recorded(&mut store, "Python"), Some(vec!["pyw".to_string()]));
    assert_eq!(recorded(&mut store, "INI"), Some(vec!["cfg".to_string()]));
}

#[test]
fn test_later_declaration_takes_over_recorded_extension() {
    let resources = MockResources::new(&[
        "Packages/Python/Python.sublime-syntax",
        "Packages/INI/INI.tmLanguage",
    ]);
    let mut store = store_with_user(json!({
        "add_exts_to_lang_settings": true,
        "default_syntaxes": [{"syntax": "Python/Python", "extensions": ["cfg"]}]
    }));
    let mut detector = Detector::default();

    detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert_eq!(live(&mut store, "Python"), vec!["cfg"]);
    assert_eq!(recorded(&mut store, "Python"), Some(vec!["cfg".to_string()]));

    set_global(
        &mut store,
        "syntaxes",
        json!([{"syntax": "INI/INI", "extensions": ["cfg"]}]),
    );
    let report = detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert_eq!(report.added["INI"], vec!["cfg".to_string()]);
    assert_eq!(report.pruned["Python"], vec!["cfg".to_string()]);
    assert!(live(&mut store, "Python").is_empty());
    assert_eq!(recorded(&mut store, "Python"), None);
    assert_eq!(live(&mut store, "INI"), vec!["cfg"]);
    assert_eq!(recorded(&mut store, "INI"), Some(vec!["cfg".to_string()]));

    let report = detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert!(report.is_empty());
    assert!(live(&mut store, "Python").is_empty());
    assert_eq!(recorded(&mut store, "Python"), None);
}

#[test]
fn test_uninstalled_languages_get_nothing() {
    let resources = MockResources::new(&["Packages/Ruby/Ruby.sublime-syntax"]);
    let mut store = store_with_defaults(json!({}));

    let report = Detector::default()
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();

    assert_eq!(report.added.keys().collect::<Vec<_>>(), vec!["Ruby"]);
    assert!(live(&mut store, "Shell-Unix-Generic").is_empty());
    assert_eq!(
        live(&mut store, "Ruby"),
        vec!["jbuilder", "podspec", "rabl", "rake", "rb", "simplecov", "thor"]
    );
}

#[test]
fn test_disabling_sync_rolls_back() {
    let resources = MockResources::new(&["Packages/Ruby/Ruby.sublime-syntax"]);
    let mut store = store_with_user(json!({
        "add_exts_to_lang_settings": true,
        "syntaxes": [{"syntax": "Ruby/Ruby", "extensions": ["rb", "rake"]}]
    }));
    store
        .load_settings("Ruby.sublime-settings")
        .unwrap()
        .set("extensions", json!(["gemspec"]));
    let mut detector = Detector::default();

    detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert_eq!(live(&mut store, "Ruby"), vec!["gemspec", "rake", "rb"]);

    set_global(&mut store, "add_exts_to_lang_settings", json!(false));
    let report = detector
        .on_settings_changed(&mut Environment::new(&resources, &mut store))
        .unwrap();

    assert_eq!(
        report.pruned["Ruby"],
        vec!["rake".to_string(), "rb".to_string()]
    );
    assert_eq!(live(&mut store, "Ruby"), vec!["gemspec"]);
    assert_eq!(recorded(&mut store, "Ruby"), None);
    assert_eq!(
        store.load_settings(EXT_SETTINGS).unwrap().keys().count(),
        0
    );
}

#[test]
fn test_inventory_change_triggers_reconciliation() {
    let mut resources = MockResources::new(&["Packages/Ruby/Ruby.sublime-syntax"]);
    let mut store = store_with_user(json!({
        "add_exts_to_lang_settings": true,
        "syntaxes": [
            {"syntax": "Ruby/Ruby", "extensions": ["rb"]},
            {"syntax": "Go/Go", "extensions": ["go"]}
        ]
    }));
    let mut detector = Detector::default();

    let first = detector
        .update_extensions(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert!(first.is_some());
    let fingerprint = detector.lang_hash().map(str::to_string);
    assert!(fingerprint.is_some());

    let unchanged = detector
        .update_extensions(&mut Environment::new(&resources, &mut store))
        .unwrap();
    assert_eq!(unchanged, None);
    assert_eq!(store.save_count("Ruby.sublime-settings"), 1);

    resources.install("Packages/Go/Go.tmLanguage");
    let report = detector
        .update_extensions(&mut Environment::new(&resources, &mut store))
        .unwrap()
        .unwrap();
    assert_eq!(report.added["Go"], vec!["go".to_string()]);
    assert_ne!(detector.lang_hash().map(str::to_string), fingerprint);

    resources.uninstall("Packages/Go/Go.tmLanguage");
    let report = detector
        .update_extensions(&mut Environment::new(&resources, &mut store))
        .unwrap()
        .unwrap();
    assert_eq!(report.pruned["Go"], vec!["go".to_string()]);
    assert!(live(&mut store, "Go").is_empty());
}

#[test]
fn test_plugin_loaded_seeds_settings_and_sweeps_documents() {
    let resources = MockResources::new(&["Packages/Ruby/Ruby.sublime-syntax"]);
    let mut store = MemorySettingsStore::new();
    let mut detector = Detector::default();
    let mut open = MockDocument::new("/src/app.rb", "#!/usr/bin/env ruby\n");
    open.set_setting(
        "syntaxes",
        json!([{"syntax": "Ruby/Ruby", "rules": [{"interpreter": "ruby"}]}]),
    );

    let swept = {
        let mut env = Environment::new(&resources, &mut store);
        let mut documents: Vec<&mut dyn Document> = vec![&mut open];
        detector.plugin_loaded(&mut documents, &mut env).unwrap()
    };

    assert_eq!(swept, 1);
    assert_eq!(open.switches.len(), 1);
    assert_eq!(store.save_count(PLUGIN_SETTINGS), 1);
    let global = store.document(PLUGIN_SETTINGS).unwrap();
    assert_eq!(global.get("add_exts_to_lang_settings"), Some(&json!(true)));
    assert!(detector.lang_hash().is_some());
}

#[test]
fn test_settings_edit_is_picked_up_by_next_event() {
    let resources = MockResources::new(&["Packages/Ruby/Ruby.sublime-syntax"]);
    let mut store = store_with_user(json!({
        "add_exts_to_lang_settings": true,
        "syntaxes": [{"syntax": "Ruby/Ruby", "extensions": ["rb"]}]
    }));
    let mut detector = Detector::default();

    detector
        .plugin_loaded(&mut [], &mut Environment::new(&resources, &mut store))
        .unwrap();
    assert_eq!(live(&mut store, "Ruby"), vec!["rb"]);

    // Rollback only happens through the change listener.
    set_global(&mut store, "add_exts_to_lang_settings", json!(false));
    let mut doc = MockDocument::new("/src/notes.txt", "");
    detector
        .on_load(&mut doc, &mut Environment::new(&resources, &mut store))
        .unwrap();

    assert!(live(&mut store, "Ruby").is_empty());
    assert_eq!(recorded(&mut store, "Ruby"), None);
}
