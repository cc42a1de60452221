//! Xbase CLI - command-line driver for the Xbase++/Clipper front end

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use xbase_core::{analyze, FrontendConfig};

mod check;

#[derive(Parser)]
#[command(name = "xbase")]
#[command(version = xbase_core::VERSION)]
#[command(about = "Tokenize, parse and check Xbase++/Clipper sources", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./xbase.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lex the source as written, without stripping preprocessor directives
    #[arg(long, global = true)]
    no_preprocess: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a source file
    Tokens {
        /// Path to the source file
        file: PathBuf,
    },

    /// Print the syntax tree of a source file
    Parse {
        /// Path to the source file
        file: PathBuf,

        /// Emit the tree and diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report lexical and syntax errors in files and directories
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Tokens { file } => {
            let source = read_source(&file)?;
            let analysis = analyze(&source, &config);
            for token in &analysis.tokens {
                println!("{} {:?} {:?}", token.span, token.kind, token.lexeme);
            }
            check::print_diagnostics(&file, &source, &analysis, &config);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Parse { file, json } => {
            let source = read_source(&file)?;
            let analysis = analyze(&source, &config);
            if json {
                let output = serde_json::to_string_pretty(&analysis.result)
                    .context("Failed to serialize syntax tree")?;
                println!("{output}");
            } else {
                print!("{}", analysis.result.program.dump());
                check::print_diagnostics(&file, &source, &analysis, &config);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Check { paths } => {
            let files = check::collect_sources(&paths, &config)?;
            let summary = check::check_files(&files, &config)?;
            eprintln!(
                "checked {} file(s): {} error(s)",
                summary.files, summary.errors
            );
            if summary.errors > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Resolve the configuration from `--config`, `./xbase.toml` or the
/// defaults, then apply command-line overrides
fn load_config(cli: &Cli) -> Result<FrontendConfig> {
    let mut config = match &cli.config {
        Some(path) => FrontendConfig::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => FrontendConfig::discover(".").context("Failed to load ./xbase.toml")?,
    };
    if cli.no_preprocess {
        config.preprocess.strip_directives = false;
    }
    Ok(config)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}
