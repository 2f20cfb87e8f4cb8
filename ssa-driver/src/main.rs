//! ssac - SSA back end driver
//!
//! Builds the sample program, prints and validates it, exports its
//! control-flow and dominator graphs and writes amd64 assembly for it.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use ssa_codegen::Platform;

#[derive(Parser, Debug)]
#[command(name = "ssac")]
#[command(about = "SSA IR back end driver")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the sample program and generate assembly for it
    Demo(DemoArgs),

    /// Validate the sample program and report the result
    Check,
}

#[derive(clap::Args, Debug)]
pub struct DemoArgs {
    /// Print the IR before code generation
    #[arg(long)]
    pub print_ir: bool,

    /// Print every value with its reference count
    #[arg(long)]
    pub print_values: bool,

    /// Write CFG and dominator tree graphs of every function into DIR
    #[arg(long, value_name = "DIR")]
    pub graphs: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
    pub graph_format: GraphFormat,

    /// Code generation options as JSON, e.g. {"platform": "windows"}
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target platform (overrides the config file)
    #[arg(long, value_enum)]
    pub platform: Option<Platform>,

    /// Leave IR lines out of the assembly
    #[arg(long)]
    pub no_comments: bool,

    /// Output assembly file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Dot,
    Json,
}

impl GraphFormat {
    fn extension(self) -> &'static str {
        match self {
            GraphFormat::Dot => "dot",
            GraphFormat::Json => "json",
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Demo(args) => commands::demo(&args),
        Commands::Check => commands::check(),
    };
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
