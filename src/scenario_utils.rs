//! Scenario conversion utility functions
//!
//! File-level helpers behind the command line tool: extracting a scenario to
//! JSON, injecting JSON into a scenario, and inspecting graphs and remap
//! tables.

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    model::ObjectDataContainer,
    objects::ObjectCategory,
    remap::{RemapCategory, RemapTables},
    report::{ConversionReport, StepOutcome},
    scenario::{ConversionOptions, ConversionStep, ScenarioConverter},
    schema::{new_document, SCENARIO_GROUP},
    tag::{FileTagStore, SchemaGeneration, TagReference, TagStore},
    utils::split_group,
};

/// Parse `path[.group]`, using `default_group` when no group is given
pub fn parse_reference(text: &str, default_group: &str) -> TagReference {
    match split_group(text) {
        Some((path, group)) => TagReference::new(path, group),
        None => TagReference::new(text, default_group),
    }
}

/// Build conversion options from command line settings
pub fn load_options(
    remap: Option<&Path>,
    no_remap: bool,
    shader_root: Option<&str>,
) -> Result<ConversionOptions> {
    let remap = match (remap, no_remap) {
        (_, true) => RemapTables::empty(),
        (Some(path), false) => RemapTables::from_path(path)
            .with_context(|| format!("Failed to load remap tables from {}", path.display()))?,
        (None, false) => RemapTables::builtin().context("Built-in remap tables are invalid")?,
    };
    let defaults = ConversionOptions::default();
    Ok(ConversionOptions {
        remap,
        material_shader_root: shader_root
            .map(str::to_string)
            .unwrap_or(defaults.material_shader_root),
    })
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(ConversionStep::ALL.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )?);
    Ok(pb)
}

fn print_report(report: &ConversionReport) {
    println!();
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Completed {
                definitions,
                placements,
            } => println!(
                "{:>16}: {} definitions, {} placements",
                step.step, definitions, placements
            ),
            StepOutcome::Skipped { reason } => {
                println!("{:>16}: skipped ({})", step.step, reason)
            }
        }
    }
    if !report.warnings.is_empty() {
        println!();
        println!("Warnings: {}", report.warnings.len());
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }
}

/// Default output file for an extracted scenario: `<name>.json`
pub fn default_output(scenario: &TagReference) -> PathBuf {
    let name = scenario
        .path
        .rsplit(['\\', '/'])
        .find(|p| !p.is_empty())
        .unwrap_or("scenario");
    PathBuf::from(format!("{}.json", name))
}

/// Extract the objects of a scenario to a JSON file
pub fn extract_scenario(tags_root: &Path, scenario: &str, output: Option<&Path>) -> Result<()> {
    let store = FileTagStore::new(tags_root);
    let reference = parse_reference(scenario, SCENARIO_GROUP);
    println!("Opening {}...", store.path_for(&reference).display());

    let pb = progress_bar()?;
    let (data, report) = {
        let mut converter = ScenarioConverter::new(&store, ConversionOptions::default())
            .with_progress(|i, _, step| {
                pb.set_position(i as u64);
                pb.set_message(step.name());
            });
        converter
            .extract(&reference)
            .with_context(|| format!("Failed to extract {}", reference))?
    };
    pb.finish_with_message("Done");

    let output = output.map(Path::to_path_buf).unwrap_or_else(|| default_output(&reference));
    let json = serde_json::to_string_pretty(&data)?;
    fs::write(&output, json).with_context(|| format!("Failed to write {}", output.display()))?;

    print_report(&report);
    println!();
    println!("Wrote {}", output.display());
    Ok(())
}

/// Inject a JSON object graph into a scenario
pub fn inject_scenario(
    tags_root: &Path,
    scenario: &str,
    json: &Path,
    options: ConversionOptions,
) -> Result<()> {
    let text = fs::read_to_string(json)
        .with_context(|| format!("Failed to read {}", json.display()))?;
    let data: ObjectDataContainer = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", json.display()))?;

    let store = FileTagStore::new(tags_root);
    let reference = parse_reference(scenario, SCENARIO_GROUP);
    println!("Opening {}...", store.path_for(&reference).display());

    let pb = progress_bar()?;
    let report = {
        let mut converter = ScenarioConverter::new(&store, options).with_progress(|i, _, step| {
            pb.set_position(i as u64);
            pb.set_message(step.name());
        });
        converter
            .inject(&reference, &data)
            .with_context(|| format!("Failed to inject into {}", reference))?
    };
    pb.finish_with_message("Done");

    print_report(&report);
    println!();
    println!("Saved {}", store.path_for(&reference).display());
    Ok(())
}

/// Show per-category counts of a JSON object graph
pub fn show_info(json: &Path) -> Result<()> {
    let text = fs::read_to_string(json)
        .with_context(|| format!("Failed to read {}", json.display()))?;
    let data: ObjectDataContainer = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", json.display()))?;

    println!("Object graph: {}", json.display());
    println!();
    println!("{:>16} {:>12} {:>12}", "Category", "Definitions", "Placements");
    for category in ObjectCategory::ALL {
        println!(
            "{:>16} {:>12} {:>12}",
            category.to_string(),
            data.definitions(category).len(),
            data.placements(category).len()
        );
    }
    let sector_points: usize = data.trigger_volumes.iter().map(|v| v.sector_points.len()).sum();
    println!(
        "{:>16} {:>12} {:>12}",
        "trigger volumes",
        "-",
        data.trigger_volumes.len()
    );
    println!();
    println!("Sector points: {}", sector_points);
    let materials: usize = data
        .decal_definitions
        .iter()
        .map(|d| d.decal_settings.len())
        .sum();
    println!("Decal materials: {}", materials);
    Ok(())
}

/// Print the active remap tables
pub fn print_tables(remap: Option<&Path>) -> Result<()> {
    let tables = load_options(remap, false, None)?.remap;
    println!("Remap tables (version {})", tables.version());

    for category in RemapCategory::ALL {
        let Some(table) = tables.table(category) else {
            continue;
        };
        println!();
        println!("[{}] {} entries", category, table.len());
        for (from, to) in table.entries() {
            println!("  {} -> {}", from, to);
        }
    }
    Ok(())
}

/// Create an empty document from a schema template
pub fn create_tag(
    tags_root: &Path,
    reference: &str,
    group: &str,
    generation: SchemaGeneration,
) -> Result<()> {
    let store = FileTagStore::new(tags_root);
    let reference = TagReference::new(reference, group);
    if store.exists(&reference) {
        bail!("{} already exists", store.path_for(&reference).display());
    }

    let document = new_document(reference, generation)
        .with_context(|| format!("No {} template for group '{}'", generation, group))?;
    store.store(&document)?;
    println!("Created {}", store.path_for(&document.reference).display());
    Ok(())
}
