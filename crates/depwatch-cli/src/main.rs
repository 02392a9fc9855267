#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use commands::deps::DepsFilter;
use depwatch_core::pkg::{pkg_codes, PkgError};
use depwatch_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "depwatch")]
#[command(author, version, about = "Inspect package.json manifests and dependency freshness", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// npm registry URL (defaults to $DEPWATCH_NPM_REGISTRY, then registry.npmjs.org)
    #[arg(long, global = true, value_name = "URL")]
    registry: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Check that a package.json has the npm manifest shape
    Check {
        /// Manifest file or directory containing package.json (default: cwd)
        path: Option<PathBuf>,
    },

    /// List dependencies declared in package.json
    Deps {
        /// Only devDependencies
        #[arg(long, conflicts_with = "prod_only")]
        dev_only: bool,

        /// Only dependencies
        #[arg(long)]
        prod_only: bool,
    },

    /// Compare declared dependencies with the registry
    Outdated {
        /// Include devDependencies
        #[arg(long)]
        dev: bool,
    },

    /// Show the published manifest for name[@range]
    Show {
        /// Package spec, e.g. "lodash", "react@^18" or "@types/node@latest"
        spec: String,
    },

    /// Download a published tarball and verify its integrity and shasum
    Verify {
        /// Package spec, e.g. "lodash@4.17.21"
        spec: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_registry(cli.registry);

    logging::init(config.verbosity, config.json_logs);
    if let Err(e) = config.validate() {
        let err = PkgError::new(pkg_codes::PKG_DIR_UNREADABLE, e.to_string());
        return commands::fail(&err, cli.json);
    }

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Check { path }) => {
            commands::check::run(&config.cwd, path.as_deref(), cli.json)
        }
        Some(Commands::Deps {
            dev_only,
            prod_only,
        }) => {
            let filter = match (dev_only, prod_only) {
                (true, _) => DepsFilter::DevOnly,
                (_, true) => DepsFilter::ProdOnly,
                _ => DepsFilter::All,
            };
            commands::deps::run(&config.cwd, filter, cli.json)
        }
        Some(Commands::Outdated { dev }) => commands::outdated::run(&config, dev, cli.json),
        Some(Commands::Show { spec }) => commands::show::run(&config, &spec, cli.json),
        Some(Commands::Verify { spec }) => commands::verify::run(&config, &spec, cli.json),
    }
}
