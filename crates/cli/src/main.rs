//! Graphlapse CLI - gl command

use clap::{Parser, Subcommand};
use engine::ChangedFailurePolicy;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cmd;

/// Graphlapse - Incremental semantic graphs for your code
#[derive(Parser)]
#[command(name = "gl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Use this config file instead of the project/user config
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project from scratch and write a new graph
    Build {
        /// Project root
        root: PathBuf,
        /// Graph file to write
        #[arg(short, long, value_name = "GRAPH")]
        output: PathBuf,
        /// Recompute workers (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Bring an existing graph up to date with the project
    Update {
        /// Graph file to update
        graph: PathBuf,
        /// Project root
        root: PathBuf,
        /// Ignore the saved state and recompute every file
        #[arg(long)]
        force_full: bool,
        /// Recompute workers (0 = one per CPU)
        #[arg(long)]
        workers: Option<usize>,
        /// Fate of a changed file's facts when its recompute fails (drop|restore)
        #[arg(long)]
        policy: Option<ChangedFailurePolicy>,
    },
    /// Show what the next update would recompute
    Status {
        /// Graph file
        graph: PathBuf,
        /// Project root
        root: PathBuf,
    },
    /// Show the run history of a graph
    History {
        /// Graph file
        graph: PathBuf,
        /// Number of runs to show (default: 20)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the effective configuration
    Config {
        /// Project root used to find .graphlapse.toml (default: current directory)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Print every setting
        #[arg(long, conflicts_with_all = ["path", "example"])]
        list: bool,
        /// Print the config file location
        #[arg(long, conflicts_with = "example")]
        path: bool,
        /// Print an annotated example config
        #[arg(long)]
        example: bool,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = cli.config.as_deref();
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Build {
            root,
            output,
            workers,
        } => cmd::build::run(&root, &output, workers, config, quiet),
        Commands::Update {
            graph,
            root,
            force_full,
            workers,
            policy,
        } => {
            let overrides = cmd::update::Overrides {
                force_full,
                workers,
                policy,
            };
            cmd::update::run(&graph, &root, overrides, config, quiet)
        }
        Commands::Status { graph, root } => cmd::status::run(&graph, &root, config),
        Commands::History { graph, limit } => cmd::history::run(&graph, limit),
        // --list is the default view
        Commands::Config {
            root,
            list: _,
            path,
            example,
        } => {
            if example {
                cmd::config::run_example()
            } else if path {
                cmd::config::run_path(config, root.as_deref())
            } else {
                cmd::config::run_list(config, root.as_deref())
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
