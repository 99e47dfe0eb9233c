//! Asset reference remapping between schema generations
//!
//! The built-in tables ship as `data/remap_tables.json` and are embedded at
//! compile time. A replacement file with the same layout can be loaded at
//! runtime.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::normalize_tag_path;

const BUILTIN_TABLES: &str = include_str!("../data/remap_tables.json");

/// Highest table format version this build understands
pub const REMAP_FORMAT_VERSION: u32 = 1;

/// Categories that have a remap table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemapCategory {
    Vehicle,
    Equipment,
    Weapon,
}

impl RemapCategory {
    pub const ALL: [RemapCategory; 3] = [
        RemapCategory::Vehicle,
        RemapCategory::Equipment,
        RemapCategory::Weapon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RemapCategory::Vehicle => "vehicle",
            RemapCategory::Equipment => "equipment",
            RemapCategory::Weapon => "weapon",
        }
    }
}

impl fmt::Display for RemapCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// On-disk layout of a remap table file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RemapFile {
    version: u32,
    #[serde(default)]
    vehicle: BTreeMap<String, String>,
    #[serde(default)]
    equipment: BTreeMap<String, String>,
    #[serde(default)]
    weapon: BTreeMap<String, String>,
}

/// One category's table
#[derive(Debug, Clone, Default)]
pub struct RemapTable {
    // normalized source -> (source as written, target)
    entries: HashMap<String, (String, String)>,
}

impl RemapTable {
    fn from_map(map: BTreeMap<String, String>) -> Self {
        let entries = map
            .into_iter()
            .map(|(from, to)| (normalize_tag_path(&from), (from, to)))
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, tag: &str) -> Option<&str> {
        self.entries
            .get(&normalize_tag_path(tag))
            .map(|(_, to)| to.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by source path
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .entries
            .values()
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        entries.sort();
        entries
    }
}

/// Versioned set of remap tables
#[derive(Debug, Clone, Default)]
pub struct RemapTables {
    version: u32,
    tables: HashMap<RemapCategory, RemapTable>,
}

impl RemapTables {
    /// Tables embedded in the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLES)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: RemapFile = serde_json::from_str(text)?;
        if file.version == 0 || file.version > REMAP_FORMAT_VERSION {
            return Err(Error::InvalidRemapTable(format!(
                "unsupported version {} (expected 1..={})",
                file.version, REMAP_FORMAT_VERSION
            )));
        }

        let mut tables = HashMap::new();
        tables.insert(RemapCategory::Vehicle, RemapTable::from_map(file.vehicle));
        tables.insert(RemapCategory::Equipment, RemapTable::from_map(file.equipment));
        tables.insert(RemapCategory::Weapon, RemapTable::from_map(file.weapon));

        Ok(Self {
            version: file.version,
            tables,
        })
    }

    /// Tables with no entries; every lookup falls back
    pub fn empty() -> Self {
        Self {
            version: REMAP_FORMAT_VERSION,
            tables: HashMap::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn table(&self, category: RemapCategory) -> Option<&RemapTable> {
        self.tables.get(&category)
    }

    /// Look up the replacement for `tag`, or `None` when unmapped
    pub fn lookup(&self, category: RemapCategory, tag: &str) -> Option<&str> {
        self.tables.get(&category)?.lookup(tag)
    }
}
