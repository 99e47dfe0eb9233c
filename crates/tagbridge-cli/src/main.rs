//! tagbridge - Move scenario objects between legacy and modern tag schemas
//!
//! Usage:
//!   tagbridge extract <tags_root> <scenario> [-o out.json]  - Extract objects to JSON
//!   tagbridge inject <tags_root> <scenario> <json>          - Inject objects from JSON
//!   tagbridge info <json>                                   - Show object graph counts
//!   tagbridge tables [--remap file]                         - Print remap tables
//!   tagbridge new <tags_root> <reference> <group> [-g gen]  - Create an empty document

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tagbridge::scenario_utils::{
    create_tag, extract_scenario, inject_scenario, load_options, print_tables, show_info,
};
use tagbridge::SchemaGeneration;

#[derive(Parser)]
#[command(name = "tagbridge")]
#[command(version = "0.1.0")]
#[command(about = "Move scenario objects between legacy and modern tag schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log per-field detail
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Generation {
    Legacy,
    Modern,
}

impl From<Generation> for SchemaGeneration {
    fn from(g: Generation) -> Self {
        match g {
            Generation::Legacy => SchemaGeneration::Legacy,
            Generation::Modern => SchemaGeneration::Modern,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the objects of a scenario to JSON
    Extract {
        /// Root directory of the tag store
        tags_root: PathBuf,
        /// Scenario path relative to the root (e.g., levels\multi\box\box)
        scenario: String,
        /// Output file (default: <scenario name>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inject objects from JSON into a scenario
    Inject {
        /// Root directory of the tag store
        tags_root: PathBuf,
        /// Scenario path relative to the root
        scenario: String,
        /// Object graph produced by `extract`
        json: PathBuf,
        /// Remap table file replacing the built-in tables
        #[arg(long)]
        remap: Option<PathBuf>,
        /// Keep every reference unchanged
        #[arg(long, conflicts_with = "remap")]
        no_remap: bool,
        /// Directory of the material shaders assigned to decals
        #[arg(long)]
        shader_root: Option<String>,
    },
    /// Show per-category counts of an object graph
    Info {
        /// Object graph JSON file
        json: PathBuf,
    },
    /// Print the active remap tables
    Tables {
        /// Remap table file replacing the built-in tables
        #[arg(long)]
        remap: Option<PathBuf>,
    },
    /// Create an empty document from a schema template
    New {
        /// Root directory of the tag store
        tags_root: PathBuf,
        /// Document path relative to the root
        reference: String,
        /// Tag group (e.g., scenario, decal_system)
        group: String,
        /// Schema generation of the new document
        #[arg(short, long, value_enum, default_value = "modern")]
        generation: Generation,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Extract {
            tags_root,
            scenario,
            output,
        } => {
            extract_scenario(&tags_root, &scenario, output.as_deref())?;
        }
        Commands::Inject {
            tags_root,
            scenario,
            json,
            remap,
            no_remap,
            shader_root,
        } => {
            let options = load_options(remap.as_deref(), no_remap, shader_root.as_deref())?;
            inject_scenario(&tags_root, &scenario, &json, options)?;
        }
        Commands::Info { json } => {
            show_info(&json)?;
        }
        Commands::Tables { remap } => {
            print_tables(remap.as_deref())?;
        }
        Commands::New {
            tags_root,
            reference,
            group,
            generation,
        } => {
            create_tag(&tags_root, &reference, &group, generation.into())?;
        }
    }

    Ok(())
}
