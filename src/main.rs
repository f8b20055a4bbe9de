use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use apply_syntax::config::{Settings, PACKAGE_DEFAULTS, PLUGIN_SETTINGS};
use apply_syntax::detector::{Detector, Environment};
use apply_syntax::grammar::{FsResources, SyntaxChange};
use apply_syntax::model::document::FileDocument;
use apply_syntax::model::settings::SettingsStore;
use apply_syntax::model::settings_fs::{ensure_user_settings, FileSettingsStore};
use apply_syntax::plugins::{
    BuiltinModules, ChainResolver, ModuleResolver, NativeModuleResolver, PluginLoader,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the settings directory.
const CONFIG_DIR_ENV: &str = "APPLY_SYNTAX_CONFIG_DIR";

/// Pick a syntax for files from their name, path, shebang or contents
#[derive(Parser, Debug)]
#[command(name = "apply-syntax")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding installed packages (grammars and plugin libraries)
    #[arg(long, value_name = "DIR")]
    packages: Option<PathBuf>,

    /// Directory holding the user's settings documents
    #[arg(long, value_name = "DIR")]
    settings_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect and print the grammar for each file
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Reconcile language extension lists with the declared extensions
    Sync,
    /// Print the JSON schema of the settings file
    Schema,
    /// Create the default user settings file
    Init,
}

fn config_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("apply-syntax"))
        .context("could not determine the configuration directory")
}

fn init_tracing(store: &mut FileSettingsStore) {
    let level = store
        .load_settings(PLUGIN_SETTINGS)
        .map(|doc| Settings::from_document(doc).debug)
        .unwrap_or_default();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apply_syntax={}", level.filter_directive())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Open the settings store and start logging at its `debug` level.
fn open_store(settings_dir: &Path) -> FileSettingsStore {
    let mut store =
        FileSettingsStore::new(settings_dir).with_defaults(PLUGIN_SETTINGS, PACKAGE_DEFAULTS);
    init_tracing(&mut store);
    store
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings_dir = || -> Result<PathBuf> {
        match &args.settings_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_root()?.join("User")),
        }
    };
    let packages_dir = || -> Result<PathBuf> {
        match &args.packages {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_root()?.join("Packages")),
        }
    };

    match &args.command {
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&Settings::json_schema())?;
            println!("{}", schema);
        }
        Command::Init => {
            let settings_dir = settings_dir()?;
            open_store(&settings_dir);
            let path = settings_dir.join(PLUGIN_SETTINGS);
            if ensure_user_settings(&settings_dir)? {
                println!("Created {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
        }
        Command::Sync => {
            let mut store = open_store(&settings_dir()?);
            let resources = FsResources::new(packages_dir()?);
            let mut env = Environment::new(&resources, &mut store);
            let report = Detector::default()
                .on_settings_changed(&mut env)
                .context("failed to reconcile language extensions")?;
            for (language, extensions) in &report.added {
                println!("+ {}: {}", language, extensions.join(", "));
            }
            for (language, extensions) in &report.pruned {
                println!("- {}: {}", language, extensions.join(", "));
            }
        }
        Command::Detect { files } => {
            let mut store = open_store(&settings_dir()?);
            let packages_dir = packages_dir()?;
            let resources = FsResources::new(&packages_dir);
            let resolvers: Vec<Box<dyn ModuleResolver>> = vec![
                Box::new(BuiltinModules::new()),
                Box::new(NativeModuleResolver::new(&packages_dir)),
            ];
            let mut detector =
                Detector::new(PluginLoader::new(Box::new(ChainResolver::new(resolvers))));
            let mut env = Environment::new(&resources, &mut store);

            for file in files {
                let mut document = FileDocument::new(file);
                let change = detector
                    .on_load(&mut document, &mut env)
                    .with_context(|| format!("detection failed for {}", file.display()))?;
                let grammar = change
                    .as_ref()
                    .and_then(SyntaxChange::resource)
                    .unwrap_or("-");
                println!("{}\t{}", file.display(), grammar);
            }
        }
    }

    Ok(())
}
