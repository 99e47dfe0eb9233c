//! Scenario conversion passes
//!
//! A pass visits a fixed list of steps, one per object category plus trigger
//! volumes. A step that hits a field the schema lacks is skipped and recorded
//! in the report; any other error aborts the pass.

use std::fmt;
use tracing::{error, info};

use crate::decal::DEFAULT_MATERIAL_SHADER_ROOT;
use crate::error::Result;
use crate::model::ObjectDataContainer;
use crate::objects::{ObjectCategory, ObjectCodec};
use crate::remap::RemapTables;
use crate::report::{ConversionMode, ConversionReport, Diagnostics, StepOutcome, StepReport};
use crate::tag::{TagDocument, TagReference, TagStore};
use crate::trigger;

/// Options for a conversion pass
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Tables used to translate references when writing a modern scenario
    pub remap: RemapTables,
    /// Directory holding the material shaders assigned to decals
    pub material_shader_root: String,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            remap: RemapTables::empty(),
            material_shader_root: DEFAULT_MATERIAL_SHADER_ROOT.to_string(),
        }
    }
}

impl ConversionOptions {
    /// Default options with the built-in remap tables
    pub fn with_builtin_remap() -> Result<Self> {
        Ok(Self {
            remap: RemapTables::builtin()?,
            ..Default::default()
        })
    }
}

/// One step of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStep {
    Objects(ObjectCategory),
    TriggerVolumes,
}

impl ConversionStep {
    /// Steps in the order every pass visits them
    pub const ALL: [ConversionStep; 8] = [
        ConversionStep::Objects(ObjectCategory::Scenery),
        ConversionStep::Objects(ObjectCategory::Vehicle),
        ConversionStep::Objects(ObjectCategory::Equipment),
        ConversionStep::Objects(ObjectCategory::SoundScenery),
        ConversionStep::TriggerVolumes,
        ConversionStep::Objects(ObjectCategory::Crate),
        ConversionStep::Objects(ObjectCategory::Decal),
        ConversionStep::Objects(ObjectCategory::Weapon),
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConversionStep::Objects(category) => category.layout().label,
            ConversionStep::TriggerVolumes => "trigger volumes",
        }
    }
}

impl fmt::Display for ConversionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Called before each step with its zero-based position and the step count
pub type ProgressFn<'a> = Box<dyn FnMut(usize, usize, ConversionStep) + 'a>;

/// Converts scenarios held in a tag store to and from the object graph
pub struct ScenarioConverter<'s, S: TagStore> {
    store: &'s S,
    options: ConversionOptions,
    progress: Option<ProgressFn<'s>>,
}

impl<'s, S: TagStore> ScenarioConverter<'s, S> {
    pub fn new(store: &'s S, options: ConversionOptions) -> Self {
        Self {
            store,
            options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: impl FnMut(usize, usize, ConversionStep) + 's) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Read every category of `scenario` into an object graph
    pub fn extract(&mut self, scenario: &TagReference) -> Result<(ObjectDataContainer, ConversionReport)> {
        info!("Extracting {}", scenario);
        let store = self.store;
        let doc = store.open(scenario)?;
        let mut diagnostics = Diagnostics::new();
        let mut report = ConversionReport::new(ConversionMode::Extract);
        let mut data = ObjectDataContainer::default();

        {
            let mut codec = ObjectCodec::new(store, &self.options, &mut diagnostics);
            for (i, step) in ConversionStep::ALL.into_iter().enumerate() {
                notify(&mut self.progress, i, step);
                let outcome = match step {
                    ConversionStep::Objects(category) => {
                        codec.extract_from_scenario(&doc, category).map(|extracted| {
                            let counts = (extracted.definitions.len(), extracted.placements.len());
                            data.set_category(category, extracted);
                            counts
                        })
                    }
                    ConversionStep::TriggerVolumes => {
                        trigger::extract_from_scenario(store, &doc, codec.diagnostics()).map(
                            |volumes| {
                                let count = volumes.len();
                                data.trigger_volumes = volumes;
                                (0, count)
                            },
                        )
                    }
                };
                record(&mut report, step, outcome)?;
            }
        }

        report.warnings = diagnostics.into_warnings();
        info!(
            "Extracted {} with {} skipped steps and {} warnings",
            scenario,
            report.skipped().count(),
            report.warnings.len()
        );
        Ok((data, report))
    }

    /// Write the object graph into `scenario`, replacing its categories
    ///
    /// The scenario is saved and released on every exit path, including errors.
    pub fn inject(&mut self, scenario: &TagReference, data: &ObjectDataContainer) -> Result<ConversionReport> {
        info!("Injecting into {}", scenario);
        let store = self.store;
        let mut doc = store.open(scenario)?;
        let mut diagnostics = Diagnostics::new();
        let mut report = ConversionReport::new(ConversionMode::Inject);

        let result = self.inject_steps(&mut doc, data, &mut report, &mut diagnostics);
        let saved = doc.save();
        drop(doc);
        result?;
        saved?;

        report.warnings = diagnostics.into_warnings();
        info!(
            "Injected into {} with {} skipped steps and {} warnings",
            scenario,
            report.skipped().count(),
            report.warnings.len()
        );
        Ok(report)
    }

    fn inject_steps(
        &mut self,
        doc: &mut TagDocument,
        data: &ObjectDataContainer,
        report: &mut ConversionReport,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let mut codec = ObjectCodec::new(self.store, &self.options, diagnostics);
        for (i, step) in ConversionStep::ALL.into_iter().enumerate() {
            notify(&mut self.progress, i, step);
            let outcome = match step {
                ConversionStep::Objects(category) => {
                    let definitions = data.definitions(category);
                    let placements = data.placements(category);
                    codec
                        .inject(doc, category, definitions, placements)
                        .map(|()| (definitions.len(), placements.len()))
                }
                ConversionStep::TriggerVolumes => {
                    trigger::inject(doc, &data.trigger_volumes).map(|()| (0, data.trigger_volumes.len()))
                }
            };
            record(report, step, outcome)?;
        }
        Ok(())
    }
}

fn notify(progress: &mut Option<ProgressFn<'_>>, i: usize, step: ConversionStep) {
    if let Some(progress) = progress.as_mut() {
        progress(i, ConversionStep::ALL.len(), step);
    }
}

/// Record a finished step; only schema misses are absorbed
fn record(
    report: &mut ConversionReport,
    step: ConversionStep,
    outcome: Result<(usize, usize)>,
) -> Result<()> {
    let outcome = match outcome {
        Ok((definitions, placements)) => StepOutcome::Completed {
            definitions,
            placements,
        },
        Err(e) if e.is_schema_miss() => {
            error!("Skipping {}: {}", step, e);
            StepOutcome::Skipped {
                reason: e.to_string(),
            }
        }
        Err(e) => {
            error!("Aborting at {}: {}", step, e);
            return Err(e);
        }
    };
    report.steps.push(StepReport {
        step: step.name().to_string(),
        outcome,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{ObjectDefinition, ObjectPlacement};
    use crate::schema::{new_document, template};
    use crate::tag::{MemoryTagStore, SchemaGeneration};

    fn scenario_ref() -> TagReference {
        TagReference::new("levels\\test\\box\\box", "scenario")
    }

    fn scenery_data() -> ObjectDataContainer {
        ObjectDataContainer {
            scenery_definitions: vec![ObjectDefinition::new("objects\\scenery\\tree\\tree")],
            scenery_placements: vec![ObjectPlacement {
                type_index: 0,
                name_index: 0,
                position: [1.0, 2.0, 3.0],
                variant_name: Some("default".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_step_order() {
        let names: Vec<_> = ConversionStep::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "scenery",
                "vehicle",
                "equipment",
                "sound scenery",
                "trigger volumes",
                "crate",
                "decal",
                "weapon"
            ]
        );
    }

    #[test]
    fn test_missing_block_skips_step() {
        let store = MemoryTagStore::new();
        let mut root = template(SchemaGeneration::Modern, "scenario").unwrap();
        root.fields.retain(|f| f.name != "vehicles");
        store.insert(TagDocument::new(scenario_ref(), SchemaGeneration::Modern, root));

        let mut data = scenery_data();
        data.vehicle_placements.push(ObjectPlacement::default());
        let mut converter = ScenarioConverter::new(&store, ConversionOptions::default());
        let report = converter.inject(&scenario_ref(), &data).unwrap();

        let skipped: Vec<_> = report.skipped().map(|s| s.step.as_str()).collect();
        assert_eq!(skipped, vec!["vehicle"]);
        assert_eq!(report.steps.len(), 8);
        assert!(!report.is_clean());

        // later steps still ran
        let (read, report) = converter.extract(&scenario_ref()).unwrap();
        assert_eq!(read.scenery_placements.len(), 1);
        assert_eq!(report.skipped().count(), 1);
    }

    #[test]
    fn test_error_still_saves_and_releases() {
        let store = MemoryTagStore::new();
        store.insert(new_document(scenario_ref(), SchemaGeneration::Legacy).unwrap());

        let mut data = scenery_data();
        // a quaternion needs four components
        data.decal_definitions.push(ObjectDefinition::new("decals\\a\\a"));
        data.decal_placements.push(ObjectPlacement {
            type_index: 0,
            rotation: vec![0.0, 0.0, 0.0],
            ..Default::default()
        });

        let mut converter = ScenarioConverter::new(&store, ConversionOptions::default());
        let err = converter.inject(&scenario_ref(), &data).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { .. }));
        assert_eq!(store.open_tags().count(), 0);

        let saved = store.get(&scenario_ref()).unwrap();
        assert_eq!(saved.block_count("Block:scenery").unwrap(), 1);
    }

    #[test]
    fn test_open_scenario_is_locked() {
        let store = MemoryTagStore::new();
        store.insert(new_document(scenario_ref(), SchemaGeneration::Modern).unwrap());
        let held = store.open(&scenario_ref()).unwrap();

        let mut converter = ScenarioConverter::new(&store, ConversionOptions::default());
        let err = converter.extract(&scenario_ref()).unwrap_err();
        assert!(matches!(err, Error::DocumentLocked(_)));
        drop(held);
        assert!(converter.extract(&scenario_ref()).is_ok());
    }

    #[test]
    fn test_missing_scenario() {
        let store = MemoryTagStore::new();
        let mut converter = ScenarioConverter::new(&store, ConversionOptions::default());
        let err = converter
            .inject(&scenario_ref(), &ObjectDataContainer::default())
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[test]
    fn test_progress_callback() {
        let store = MemoryTagStore::new();
        store.insert(new_document(scenario_ref(), SchemaGeneration::Modern).unwrap());
        let mut seen = Vec::new();
        {
            let mut converter = ScenarioConverter::new(&store, ConversionOptions::default())
                .with_progress(|i, total, step| seen.push((i, total, step)));
            converter.extract(&scenario_ref()).unwrap();
        }
        assert_eq!(seen.len(), 8);
        assert_eq!(seen[4], (4, 8, ConversionStep::TriggerVolumes));
    }
}
