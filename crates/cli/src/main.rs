use clap::{Parser as ClapParser, ValueEnum};
use colored::*;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::ExitCode,
};
use thiserror::Error;
use tracing::{debug, info};

extern crate frontend;
extern crate runtime;

use frontend::{FrontEnd, GoliteFrontEnd};
use runtime::{run, EvalConfig, RunReport};

// --------
//   CLI
// --------

#[derive(ClapParser)]
#[command(version)]
#[command(about = "Interpreter for the golite teaching language")]
struct Cli {
    /// Path to the file to run, stdin when absent
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Prints the whole run report as JSON
    #[arg(short, long)]
    json: bool,

    /// Prints the symbol table after the run
    #[arg(short, long)]
    symbols: bool,

    /// Prints the AST tree
    #[arg(short, long)]
    ast_print: bool,

    /// Batch mode: runs a .glt file, or every .glt file of a directory
    #[arg(short, long, value_name = "DIR|FILE")]
    test: Option<PathBuf>,

    /// Maximum depth of nested function calls
    #[arg(long, default_value_t = 1000)]
    max_depth: usize,

    /// Maximum number of executed statements
    #[arg(long)]
    max_steps: Option<u64>,

    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("can't read source file '{}': {}", .0.display(), .1)]
    ReadFile(PathBuf, io::Error),

    #[error("can't read test directory '{}': {}", .0.display(), .1)]
    ReadDir(PathBuf, io::Error),

    #[error("can't read from stdin: {0}")]
    Stdin(io::Error),

    #[error("can't serialize the report: {0}")]
    Json(#[from] serde_json::Error),
}

// Logs go to stderr, stdout is for the program output
fn init_logging(level: Option<LogLevel>) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = match level {
        Some(level) => EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .init();
}

fn open_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::ReadFile(path.to_path_buf(), e))
}

fn read_stdin() -> Result<String, CliError> {
    let mut code = String::new();
    io::stdin()
        .read_to_string(&mut code)
        .map_err(CliError::Stdin)?;

    Ok(code)
}

// Every .glt file of the directory, in name order
fn collect_test_files(path: &Path) -> Result<Vec<PathBuf>, CliError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(path)
        .map_err(|e| CliError::ReadDir(path.to_path_buf(), e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "glt"))
        .collect();
    files.sort();

    Ok(files)
}

/// Runs one source and prints what was asked. Returns the success flag.
fn interpretation_sequence(
    code: &str,
    config: &EvalConfig,
    cli: &Cli,
) -> Result<bool, CliError> {
    if cli.ast_print {
        let parsed = GoliteFrontEnd.parse(code);
        println!("\nAST:\n{:#?}", parsed.program);
    }

    let report = run(code, config);
    info!(
        success = report.success,
        errors = report.errors.len(),
        elapsed_ms = report.elapsed_ms,
        "run done"
    );

    match (cli.json, cli.symbols) {
        (true, true) => println!("{}", serde_json::to_string_pretty(&report.symbols_only())?),
        (true, false) => println!("{}", serde_json::to_string_pretty(&report)?),
        (false, _) => print_report(&report, cli.symbols),
    }

    Ok(report.success)
}

fn print_report(report: &RunReport, with_symbols: bool) {
    for line in &report.output {
        println!("{line}");
    }

    if !report.errors.is_empty() {
        eprintln!();
        for err in &report.errors {
            eprintln!("{err}");
        }
    }

    if with_symbols {
        println!("\n{}", "Symbol table".yellow().bold());
        println!(
            "{:<16} {:<16} {:<20} {:<16} {}",
            "identifier", "type", "scope", "value", "position"
        );
        for symbol in &report.symbols {
            println!(
                "{:<16} {:<16} {:<20} {:<16} {}:{}",
                symbol.identifier,
                symbol.type_label,
                symbol.scope,
                symbol.value,
                symbol.line,
                symbol.column
            );
        }
    }
}

// Each file gets its own run, nothing is shared between them
fn run_tests(path: &Path, config: &EvalConfig, cli: &Cli) -> Result<bool, CliError> {
    let files = collect_test_files(path)?;
    debug!(count = files.len(), "test files found");

    let mut failed = vec![];

    for file in &files {
        if !cli.json {
            println!("\n{} {}", "Running".cyan().bold(), file.display());
        }

        let code = open_file(file)?;
        if cli.json {
            let report = run(&code, config);
            println!("{}", serde_json::to_string_pretty(&report.errors_only())?);
            if !report.success {
                failed.push(file);
            }
        } else if !interpretation_sequence(&code, config, cli)? {
            failed.push(file);
        }
    }

    if !cli.json {
        let summary = format!("{}/{} passed", files.len() - failed.len(), files.len());
        match failed.is_empty() {
            true => println!("\n{}", summary.green().bold()),
            false => {
                println!("\n{}", summary.red().bold());
                for file in &failed {
                    println!("  {} {}", "failed:".red(), file.display());
                }
            }
        }
    }

    Ok(failed.is_empty())
}

fn start(cli: &Cli) -> Result<bool, CliError> {
    let config = EvalConfig {
        max_call_depth: cli.max_depth,
        max_steps: cli.max_steps,
    };

    if let Some(path) = &cli.test {
        return run_tests(path, &config, cli);
    }

    let code = match &cli.file {
        Some(path) => open_file(path)?,
        None => read_stdin()?,
    };

    interpretation_sequence(&code, &config, cli)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.log_level);

    match start(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}
