//! CLI entry point - the composition root.
//!
//! Settings come from the environment (plus the global `--module-path`
//! override); command dispatch routes to the handlers in `commands`.

use clap::Parser;

use modlib_cli::{commands, Cli, Commands};
use modlib_core::EngineSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before settings read them.
    dotenvy::dotenv().ok();

    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize logging.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let mut settings = EngineSettings::from_env()?;
    if let Some(raw) = &cli.module_path {
        settings.search_path = std::env::split_paths(raw)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
    }

    let Some(command) = cli.command else {
        // No command provided - show help.
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Resolve {
            name,
            required_version,
            min_version,
            max_version,
            json,
        } => {
            commands::handle_resolve(
                settings,
                &name,
                required_version.as_deref(),
                min_version.as_deref(),
                max_version.as_deref(),
                json,
            )
            .await
        }
        Commands::Import {
            names,
            force,
            prefix,
            no_clobber,
        } => commands::handle_import(settings, &names, force, prefix, no_clobber).await,
        Commands::List => commands::handle_list(settings).await,
        Commands::SearchPath => {
            commands::handle_search_path(&settings);
            Ok(())
        }
    }
}
