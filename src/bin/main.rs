//! Factcube CLI - Compile an exported XBRL filing into reports
//!
//! Usage:
//!   factcube compile <instance.json> [--config <factcube.toml>] [--output <dir>]
//!   factcube cubes <instance.json>
//!   factcube check <instance.json>
//!
//! Examples:
//!   factcube compile filing.json --output Reports
//!   RUST_LOG=debug factcube check filing.json

use clap::{Parser, Subcommand};
use factcube::compile::{compile_filing, CompileOptions};
use factcube::config::Settings;
use factcube::cube::{Cube, CubeId};
use factcube::diagnostics::Severity;
use factcube::emit::{JsonDirSink, MemorySink};
use factcube::model::Instance;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "factcube")]
#[command(about = "Factcube - Compiles XBRL filings into tabular financial reports")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a filing and write one JSON file per report
    Compile {
        /// Path to the exported instance (JSON)
        file: PathBuf,

        /// Settings file (defaults to the usual search path)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output folder (overrides the settings)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the cubes of a filing in report order
    Cubes {
        /// Path to the exported instance (JSON)
        file: PathBuf,
    },

    /// Compile without writing anything and print the diagnostics
    Check {
        /// Path to the exported instance (JSON)
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            config,
            output,
        } => cmd_compile(file, config, output),
        Commands::Cubes { file } => cmd_cubes(file),
        Commands::Check { file } => cmd_check(file),
    }
}

fn load_instance(file: &Path) -> Option<Instance> {
    match Instance::from_file(file) {
        Ok(instance) => Some(instance),
        Err(e) => {
            eprintln!("Error reading instance '{}': {}", file.display(), e);
            None
        }
    }
}

fn cmd_compile(file: PathBuf, config: Option<PathBuf>, output: Option<PathBuf>) -> ExitCode {
    let settings = match config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(instance) = load_instance(&file) else {
        return ExitCode::FAILURE;
    };

    let folder = match output {
        Some(folder) => folder,
        None => match settings.output.resolved_folder() {
            Ok(folder) => folder,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };
    let mut sink = match JsonDirSink::create(&folder) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Error creating '{}': {}", folder.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let options = CompileOptions::from(&settings);
    match compile_filing(&instance, &options, &mut sink) {
        Ok(output) => match serde_json::to_string_pretty(&output.summary) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing summary: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_cubes(file: PathBuf) -> ExitCode {
    let Some(instance) = load_instance(&file) else {
        return ExitCode::FAILURE;
    };

    let mut cubes: Vec<Cube> = instance
        .presentation_network()
        .linkroles()
        .enumerate()
        .map(|(i, role)| Cube::new(CubeId(i), role, instance.role_definition(role).unwrap_or(role)))
        .collect();
    cubes.sort_by(|a, b| a.definition.cmp(&b.definition));

    println!("File: {}", file.display());
    println!();
    if cubes.is_empty() {
        println!("No presentation linkroles.");
        return ExitCode::SUCCESS;
    }
    for cube in &cubes {
        println!("  - {} [{}] ({})", cube.short_name, cube.cube_type, cube.linkrole);
    }
    ExitCode::SUCCESS
}

fn cmd_check(file: PathBuf) -> ExitCode {
    let Some(instance) = load_instance(&file) else {
        return ExitCode::FAILURE;
    };

    let mut sink = MemorySink::new();
    match compile_filing(&instance, &CompileOptions::default(), &mut sink) {
        Ok(output) => {
            for diag in output.diagnostics.iter().filter(|d| d.severity > Severity::Debug) {
                println!("  {}", diag);
            }
            println!(
                "OK: {} reports, {} uncategorized facts",
                output.summary.reports.len(),
                output.summary.unused_facts
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}
