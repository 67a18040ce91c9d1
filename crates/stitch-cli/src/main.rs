#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stitch")]
#[command(author, version, about = "A manifest-aware module graph builder", long_about = None)]
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

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Build and print the module graph for an entry specifier
    Graph {
        /// Entry specifier, resolved against the root
        #[arg(default_value = "./")]
        entry: String,

        /// Build root (defaults to the working directory)
        #[arg(long, value_name = "PATH")]
        root: Option<PathBuf>,

        /// Target the host runtime: pass builtins through and skip
        /// manifest override maps
        #[arg(long)]
        node: bool,

        /// Dependency directory name searched at every ancestor
        #[arg(long, default_value = "node_modules", value_name = "NAME")]
        dep_dir: String,

        /// Fallback package location searched last
        #[arg(long, value_name = "PATH")]
        default_path: Option<PathBuf>,

        /// Extensions probed during resolution, comma separated
        #[arg(long, value_delimiter = ',', default_value = ".js", value_name = "EXT")]
        extensions: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json);

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Graph {
            entry,
            root,
            node,
            dep_dir,
            default_path,
            extensions,
        } => {
            commands::graph::run(
                commands::graph::GraphAction {
                    entry,
                    root: root.unwrap_or(cwd),
                    restricted: !node,
                    dep_dir,
                    default_path,
                    extensions,
                },
                cli.json,
            )
            .await
        }
    }
}
