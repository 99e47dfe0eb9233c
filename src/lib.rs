//! # tagbridge
//!
//! A Rust library for moving scenario objects between legacy and modern tag
//! schemas through a JSON object graph.
//!
//! ## Overview
//!
//! Tag documents are trees of named, typed fields addressed with path
//! expressions such as `Block:scenery[0]/Struct:object data/Real:scale`. This
//! library provides:
//!
//! - Path-addressed documents built from per-generation schema templates
//! - Tag stores (in memory or JSON files on disk) with scoped open guards
//! - Extraction of placed objects, trigger volumes and decal materials
//! - Injection into either schema, with remapping of legacy asset references
//! - Derivation of modern decal materials and scales from legacy shaders
//!
//! ## Example - Extracting
//!
//! ```rust,no_run
//! use tagbridge::{ConversionOptions, FileTagStore, ScenarioConverter, TagReference};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = FileTagStore::new("tags");
//!     let mut converter = ScenarioConverter::new(&store, ConversionOptions::default());
//!
//!     let scenario = TagReference::new("levels\\multi\\box\\box", "scenario");
//!     let (objects, report) = converter.extract(&scenario)?;
//!     println!("{}", serde_json::to_string_pretty(&objects)?);
//!     for warning in &report.warnings {
//!         eprintln!("{}", warning);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Injecting
//!
//! ```rust,no_run
//! use tagbridge::{ConversionOptions, FileTagStore, ObjectDataContainer, ScenarioConverter, TagReference};
//!
//! fn main() -> anyhow::Result<()> {
//!     let objects: ObjectDataContainer =
//!         serde_json::from_str(&std::fs::read_to_string("box.json")?)?;
//!
//!     let store = FileTagStore::new("h2a_tags");
//!     let mut converter = ScenarioConverter::new(&store, ConversionOptions::with_builtin_remap()?);
//!     let report = converter.inject(&TagReference::new("levels\\multi\\box\\box", "scenario"), &objects)?;
//!     assert!(report.skipped().next().is_none());
//!     Ok(())
//! }
//! ```

pub mod decal;
pub mod error;
pub mod model;
pub mod objects;
pub mod remap;
pub mod report;
pub mod scenario;
pub mod scenario_utils;
pub mod schema;
pub mod tag;
pub mod trigger;
pub mod utils;

pub use decal::MaterialVariant;
pub use error::{Error, Result};
pub use model::{
    DecalMaterialSettings, ObjectDataContainer, ObjectDefinition, ObjectPlacement, SectorPoint,
    TriggerVolume,
};
pub use objects::ObjectCategory;
pub use remap::{RemapCategory, RemapTables};
pub use report::{ConversionReport, ConversionWarning};
pub use scenario::{ConversionOptions, ConversionStep, ScenarioConverter};
pub use schema::new_document;
pub use tag::{
    FileTagStore, MemoryTagStore, SchemaGeneration, TagDocument, TagReference, TagStore,
};
pub use utils::normalize_tag_path;
