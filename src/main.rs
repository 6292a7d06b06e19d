//! Forjar CLI
//!
//! Fixture-forging entry point.
//!
//! # Usage
//!
//! ```bash
//! # Forge every fixture into the current directory
//! forjar all
//!
//! # Forge one fixture set
//! forjar fraud
//! forjar compat
//! forjar vision
//!
//! # Forge into a directory, in a text format
//! forjar all --output-dir fixtures/ --format json
//!
//! # Verify an artifact
//! forjar verify fraud_model.safetensors
//! ```

use clap::{Args, Parser, Subcommand};
use forjar::fixtures::Fixture;
use forjar::io::{save_model, ModelFormat, SaveConfig};
use forjar::output::{format_bytes, format_number};
use forjar::verify::verify_artifact;
use std::path::PathBuf;
use std::process::ExitCode;

/// Forjar: Model Fixture Forge
#[derive(Parser, Debug, Clone)]
#[command(name = "forjar")]
#[command(author = "PAIML")]
#[command(version)]
#[command(about = "Builds deterministic model fixtures and serializes them for verification tools")]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Forge the fraud-classifier fixture
    Fraud(ForgeArgs),

    /// Forge the backward-compatibility MLP fixture
    Compat(ForgeArgs),

    /// Forge the three vision fixtures
    Vision(ForgeArgs),

    /// Forge every fixture
    All(ForgeArgs),

    /// Verify an artifact on disk
    Verify(VerifyArgs),
}

/// Arguments for the forge commands
#[derive(Args, Debug, Clone)]
struct ForgeArgs {
    /// Output directory for the artifacts
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Artifact format: safetensors, json, or yaml
    #[arg(short, long, default_value = "safetensors")]
    format: String,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone)]
struct VerifyArgs {
    /// Artifact path
    #[arg(value_name = "PATH")]
    path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    let result = match cli.command {
        Command::Fraud(args) => run_forge(&[Fixture::Fraud], &args, log_level),
        Command::Compat(args) => run_forge(&[Fixture::Compat], &args, log_level),
        Command::Vision(args) => run_forge(&Fixture::VISION, &args, log_level),
        Command::All(args) => run_forge(&Fixture::ALL, &args, log_level),
        Command::Verify(args) => run_verify(&args, log_level),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

fn run_forge(fixtures: &[Fixture], args: &ForgeArgs, level: LogLevel) -> Result<(), String> {
    let format: ModelFormat = args.format.parse()?;
    let config = SaveConfig::new(format);

    std::fs::create_dir_all(&args.output_dir)
        .map_err(|e| format!("cannot create {}: {e}", args.output_dir.display()))?;

    for fixture in fixtures {
        log(
            level,
            LogLevel::Normal,
            &format!("Building {} ({})...", fixture.base_name(), fixture.description()),
        );

        let model = fixture
            .build()
            .map_err(|e| format!("build failed for {}: {e}", fixture.base_name()))?;

        let file_name = format!("{}.{}", fixture.base_name(), format.extension());
        let path = args.output_dir.join(file_name);
        save_model(&model, &path, &config)
            .map_err(|e| format!("export failed for {}: {e}", path.display()))?;

        let report = verify_artifact(&path)
            .map_err(|e| format!("verification failed for {}: {e}", path.display()))?;

        log(
            level,
            LogLevel::Normal,
            &format!(
                "  ✓ {} ({}, {} parameters, opset {})",
                path.display(),
                format_bytes(report.size_bytes),
                format_number(report.param_count),
                report.opset
            ),
        );
        log(level, LogLevel::Verbose, &format!("    digest: {}", report.digest));
    }

    log(level, LogLevel::Normal, "Done.");
    Ok(())
}

fn run_verify(args: &VerifyArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Verifying {}...", args.path.display()),
    );

    let report = verify_artifact(&args.path).map_err(|e| e.to_string())?;

    log(level, LogLevel::Normal, "Artifact is valid");
    println!();
    println!("Artifact Summary:");
    println!("  Name: {}", report.name);
    println!("  Architecture: {}", report.architecture);
    println!("  Format: {}", report.format);
    println!("  Size: {}", format_bytes(report.size_bytes));
    println!("  Tensors: {}", report.tensor_count);
    println!("  Parameters: {}", format_number(report.param_count));
    println!("  Opset: {}", report.opset);
    println!("  Digest: {}", report.digest);
    for spec in &report.inputs {
        println!("  Input '{}': {}", spec.name, render_dims(&spec.dims));
    }
    for spec in &report.outputs {
        println!("  Output '{}': {}", spec.name, render_dims(&spec.dims));
    }
    if level == LogLevel::Verbose {
        println!();
        println!("Checks:");
        for check in &report.checks {
            println!("  ✓ {check}");
        }
    }
    Ok(())
}

fn render_dims(dims: &[Option<usize>]) -> String {
    let parts: Vec<String> = dims
        .iter()
        .map(|d| d.map_or_else(|| "batch".to_string(), |v| v.to_string()))
        .collect();
    format!("[{}]", parts.join(", "))
}
