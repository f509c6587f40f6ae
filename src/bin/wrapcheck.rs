#![allow(clippy::print_stderr)]

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use wrapcheck::{analyze, load_graph, Severity};

/// Exit status codes.
const EXIT_CLEAN: i32 = 0;
const EXIT_DIAGNOSTICS: i32 = 1;
const EXIT_FATAL: i32 = 2;

/// Analyze a declaration graph and report what a binding generator can wrap.
#[derive(Parser, Debug)]
#[command(name = "wrapcheck", version, about)]
struct CliArgs {
    /// Path to the JSON declaration graph, or `-` for stdin.
    input: PathBuf,

    /// Write the records JSON here instead of stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,

    /// Suppress diagnostic lines on stderr; the exit code still reflects
    /// them.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Exit non-zero on warnings, not just errors.
    #[arg(long = "deny-warnings")]
    deny_warnings: bool,
}

fn main() -> Result<()> {
    wrapcheck::tracing_config::init_tracing();
    let args = CliArgs::parse();

    let json = read_input(&args.input)?;
    let graph = match load_graph(&json) {
        Ok(graph) => graph,
        Err(fatal) => {
            eprintln!("{fatal}");
            std::process::exit(EXIT_FATAL);
        }
    };
    let output = match analyze(&graph) {
        Ok(output) => output,
        Err(fatal) => {
            eprintln!("{fatal}");
            std::process::exit(EXIT_FATAL);
        }
    };
    tracing::debug!(
        records = output.records.len(),
        diagnostics = output.diagnostics.len(),
        "analysis complete"
    );

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("failed to serialize the analysis output")?;
    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{rendered}"),
    }

    let mut worst = EXIT_CLEAN;
    for diagnostic in &output.diagnostics {
        if !args.quiet {
            eprintln!("{diagnostic}");
        }
        let counts = match diagnostic.severity {
            Severity::Error => true,
            Severity::Warning => args.deny_warnings,
            Severity::Note => false,
        };
        if counts {
            worst = EXIT_DIAGNOSTICS;
        }
    }
    std::process::exit(worst);
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}
