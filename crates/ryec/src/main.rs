//! Command-line driver for the Rye compiler.

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use ryec::diagnostics::{self, Severity};
use ryec::{CompileOptions, compile, manifest};

#[derive(Parser)]
#[command(name = "ryec", about = "Rye compiler", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Print verbose progress information
    #[arg(long = "verbose")]
    verbose: bool,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a source file and report diagnostics
    Check {
        /// Source file to analyze
        file: String,
        /// Enable constant folding
        #[arg(long)]
        fold: bool,
    },
    /// Dump the token stream of a source file
    Tokens {
        /// Source file to tokenize
        file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Check { file, fold } => check(&file, fold, cli.verbose),
        Commands::Tokens { file } => tokens(&file),
    }
}

fn check(file: &str, fold: bool, verbose: bool) -> Result<()> {
    // The manifest next to the source supplies defaults; flags win.
    let dir = Path::new(file).parent().unwrap_or_else(|| Path::new("."));
    let manifest = manifest::load(dir)?.unwrap_or_default();
    let fold = fold || manifest.build.constant_folding.unwrap_or(false);

    eprintln!("{} {}", "Checking".green().bold(), file);
    if verbose && fold {
        eprintln!("{} constant folding enabled", "note:".blue());
    }

    let mut options = CompileOptions::new(file);
    options.optimize_constant_folding = fold;
    let output = compile(&options)?;

    diagnostics::emit_all(output.diagnostics());

    let errors = output
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = output
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();

    if errors > 0 {
        eprintln!(
            "{} could not check `{}` ({} error{})",
            "error:".red().bold(),
            file,
            errors,
            if errors == 1 { "" } else { "s" }
        );
        std::process::exit(1);
    }

    if warnings > 0 && verbose {
        eprintln!("{} {} warning(s) emitted", "note:".blue(), warnings);
    }
    eprintln!("{} {}", "Finished".green().bold(), file);
    Ok(())
}

fn tokens(file: &str) -> Result<()> {
    let source = std::fs::read_to_string(file)?;
    for token in rye_parser::tokenizer::tokenize(&source) {
        if token.kind.is_trivia() {
            continue;
        }
        println!("{:>5}..{:<5} {:?}", token.span.start, token.span.end, token.kind);
    }
    Ok(())
}
