//! biokg CLI: assemble a biomedical knowledge graph from configured sources.
//!
//! Usage:
//!   biokg run --config pipeline.yaml [--out dir]
//!   biokg check --config pipeline.yaml

use biokg::{CsvExporter, PipelineConfig, PipelineError};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "biokg",
    version,
    about = "Biomedical knowledge-graph assembly with identifier reconciliation"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every active source and export node/edge tables
    Run {
        /// Path to the pipeline config (YAML)
        #[arg(long, short)]
        config: PathBuf,
        /// Output directory; overrides output.directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a config and list its sources without ingesting
    Check {
        /// Path to the pipeline config (YAML)
        #[arg(long, short)]
        config: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Option<PipelineConfig> {
    match PipelineConfig::load(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

async fn cmd_run(config_path: &Path, out: Option<PathBuf>) -> i32 {
    let Some(config) = load_config(config_path) else {
        return 1;
    };
    let directory = match out {
        Some(dir) => dir,
        None => match config.output_directory() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
    };
    let mut exporter = CsvExporter::new(directory, config.output.prefix.as_str());
    if config.output.date_stamp {
        exporter = exporter.with_date_stamp(Local::now().date_naive());
    }

    let mut pipeline = match config.build_pipeline() {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let output = match pipeline.run().await {
        Ok(output) => output,
        Err(PipelineError::Fatal {
            adapter,
            source,
            summary,
        }) => {
            error!(adapter = %adapter, error = %source, "run aborted");
            eprintln!("Error: run aborted by '{}': {}", adapter, source);
            match exporter.export_summary(&summary) {
                Ok(path) => eprintln!("Partial summary written to {}", path.display()),
                Err(e) => eprintln!("Error: {}", e),
            }
            return 2;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    match exporter.export(&output.entities, &output.edges, &output.summary) {
        Ok(paths) => {
            println!("Wrote {} nodes to {}", output.entities.len(), paths.nodes.display());
            println!("Wrote {} edges to {}", output.edges.len(), paths.edges.display());
            println!("Summary: {}", paths.summary.display());
            if !output.summary.is_clean() {
                println!("Some sources did not complete; see the summary for details");
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_check(config_path: &Path) -> i32 {
    let Some(config) = load_config(config_path) else {
        return 1;
    };
    let mut problems = 0;

    let schema = config.schema();
    println!(
        "Schema: {} entity types, {} edge types",
        schema.entity_types().count(),
        schema.edge_types().count()
    );
    for (edge_type, endpoint) in schema.dangling_edge_types() {
        println!("  edge type '{}' references undeclared entity type '{}'", edge_type, endpoint);
        problems += 1;
    }

    println!("Sources:");
    for source in &config.sources {
        let path = config.resolve_path(&source.path);
        let status = if source.skip {
            "skipped"
        } else if path.exists() {
            "ok"
        } else {
            problems += 1;
            "missing"
        };
        println!(
            "  {:<24} {:<10} {:<8} {}",
            source.name,
            source.format.as_str(),
            status,
            path.display()
        );
    }

    match config.output_directory() {
        Ok(dir) => println!("Output: {} (prefix '{}')", dir.display(), config.output.prefix),
        Err(e) => {
            eprintln!("Error: {}", e);
            problems += 1;
        }
    }

    if problems > 0 {
        println!("{} problem(s) found", problems);
        1
    } else {
        0
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let code = match cli.command {
        Commands::Run { config, out } => cmd_run(&config, out).await,
        Commands::Check { config } => cmd_check(&config),
    };
    std::process::exit(code);
}
