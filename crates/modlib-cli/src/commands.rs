//! Subcommand definitions and handlers.

use clap::Subcommand;

use modlib_core::{EngineSettings, ModuleSpecification, ModuleVersion};
use modlib_resolve::{LoadContext, LocalResolver};
use modlib_runtime::{ImportEngine, ImportOptions, ImportTarget};

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a module reference to a concrete artifact
    Resolve {
        /// Module name or path
        name: String,

        /// Require exactly this version
        #[arg(long = "required-version", conflicts_with_all = ["min_version", "max_version"])]
        required_version: Option<String>,

        /// Lowest acceptable version
        #[arg(long = "min-version")]
        min_version: Option<String>,

        /// Highest acceptable version
        #[arg(long = "max-version")]
        max_version: Option<String>,

        /// Emit the resolved descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import one or more modules and show their exported members
    Import {
        /// Module names or paths
        names: Vec<String>,

        /// Reload even when the module is already loaded
        #[arg(long)]
        force: bool,

        /// Prefix inserted into imported member names
        #[arg(long)]
        prefix: Option<String>,

        /// Skip members whose name already exists instead of overwriting
        #[arg(long = "no-clobber")]
        no_clobber: bool,
    },

    /// List the modules available on the module search path
    List,

    /// Show the effective module search path
    SearchPath,
}

/// Parse an optional version argument, surfacing the engine's own error.
fn parse_version(arg: Option<&str>) -> anyhow::Result<Option<ModuleVersion>> {
    arg.map(str::parse).transpose().map_err(Into::into)
}

/// Handle `modlib resolve`.
pub async fn handle_resolve(
    settings: EngineSettings,
    name: &str,
    required_version: Option<&str>,
    min_version: Option<&str>,
    max_version: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let spec = ModuleSpecification::new(
        name,
        None,
        parse_version(required_version)?,
        parse_version(min_version)?,
        parse_version(max_version)?,
    )?;
    let engine = ImportEngine::new(settings);

    let options = ImportOptions {
        import_members: false,
        ..ImportOptions::default()
    };
    let report = engine
        .import_local(&[ImportTarget::Spec(spec)], &options)
        .await;

    if let Some(failure) = report.failures.first() {
        anyhow::bail!("{}", failure.error);
    }
    let descriptor = report.imported[0].descriptor();
    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
    } else {
        println!("{} [{}]", descriptor.key, descriptor.module_type);
        if let Some(version) = descriptor.version {
            println!("  version: {version}");
        }
        if let Some(guid) = descriptor.guid {
            println!("  guid:    {guid}");
        }
    }
    Ok(())
}

/// Handle `modlib import`.
pub async fn handle_import(
    settings: EngineSettings,
    names: &[String],
    force: bool,
    prefix: Option<String>,
    no_clobber: bool,
) -> anyhow::Result<()> {
    if names.is_empty() {
        anyhow::bail!("no module names given");
    }
    let engine = ImportEngine::new(settings);
    let targets: Vec<ImportTarget> = names
        .iter()
        .map(|name| ImportTarget::Name(name.clone()))
        .collect();
    let options = ImportOptions {
        force,
        prefix,
        no_clobber,
        ..ImportOptions::default()
    };

    let report = engine.import_local(&targets, &options).await;

    for record in &report.imported {
        let version = record
            .version
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        println!("{:<24} {:<10} {}", record.name, version, record.key);
        for (_, member) in record.exports.iter() {
            println!("    {member}");
        }
    }
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    for failure in &report.failures {
        eprintln!("error: {} ({})", failure.error, failure.error.category());
    }
    if report.is_complete_success() {
        Ok(())
    } else {
        anyhow::bail!("{} of {} imports failed", report.failures.len(), names.len())
    }
}

/// Handle `modlib list`: walk the search path and resolve every module
/// directory the way an import would.
pub async fn handle_list(settings: EngineSettings) -> anyhow::Result<()> {
    let resolver = LocalResolver::new(settings.search_path.clone());
    let mut state = modlib_core::EngineState::new();
    let mut seen = std::collections::BTreeSet::new();

    for dir in &settings.search_path {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.filter_map(Result::ok) {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !seen.insert(name.to_ascii_lowercase()) {
                // Shadowed by an earlier search-path entry.
                continue;
            }
            let resolved = resolver.resolve(
                &mut state,
                &name,
                &modlib_core::ANY_VERSION,
                false,
                &LoadContext::local(),
            );
            if let Ok(Some(resolved)) = resolved {
                let record = resolved.record();
                let version = record
                    .version
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                println!("{:<24} {:<10} {}", record.name, version, record.key);
            }
        }
    }
    Ok(())
}

/// Handle `modlib search-path`.
pub fn handle_search_path(settings: &EngineSettings) {
    for dir in &settings.search_path {
        println!("{}", dir.display());
    }
}
