//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface definition for the module engine host.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "modlib")]
#[command(about = "Resolve, inspect, and import modules")]
#[command(version)]
pub struct Cli {
    /// Override the module search path for this invocation
    /// (platform path-list syntax)
    #[arg(long = "module-path", global = true)]
    pub module_path: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_args_parse() {
        let cli = Cli::parse_from(["modlib", "--verbose", "--module-path", "/tmp/mods", "list"]);
        assert!(cli.verbose);
        assert_eq!(cli.module_path, Some("/tmp/mods".to_string()));
    }
}
