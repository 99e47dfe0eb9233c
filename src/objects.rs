//! Extraction and injection of object palettes and placements
//!
//! Every object category goes through the same codec. What differs between
//! categories (block names, which optional fields exist, the remap table) is
//! described by one row of a static layout table.

use std::fmt;
use tracing::{debug, info};

use crate::decal::{self, DecalScaleCache};
use crate::error::{Error, Result};
use crate::model::{CategoryData, ObjectDefinition, ObjectPlacement, NEUTRAL_TEAM};
use crate::remap::RemapCategory;
use crate::report::Diagnostics;
use crate::scenario::ConversionOptions;
use crate::tag::{SchemaGeneration, TagDocument, TagReference, TagStore};
use crate::utils::format_reals;

/// Planar flag written to modern decal placements
pub const PLANAR_DECAL_FLAG: u32 = 1;

/// Path of the split-resource block in legacy scenarios
pub const SPLIT_RESOURCES: &str = "Block:scenario resources[0]/Block:new split resources[0]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectCategory {
    Scenery,
    Vehicle,
    Equipment,
    SoundScenery,
    Crate,
    Decal,
    Weapon,
}

/// Category-specific placement fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraFields {
    None,
    Sound,
    Weapon,
    Decal,
}

/// Whether data is read from the scenario itself or a split resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    Scenario,
    Resource,
}

/// Static description of how one category is laid out in a scenario
#[derive(Debug)]
pub struct CategoryLayout {
    pub category: ObjectCategory,
    pub label: &'static str,
    pub scenario_palette: &'static str,
    pub resource_palette: &'static str,
    pub scenario_block: &'static str,
    pub resource_block: &'static str,
    /// Reference field inside a palette element
    pub definition_field: &'static str,
    /// Tag group of the referenced definitions
    pub tag_group: &'static str,
    /// Reference field in the split-resource block
    pub resource_field: &'static str,
    /// Tag group of the split resource document
    pub resource_group: &'static str,
    /// `object id` type written by the modern schema
    pub modern_object_type: Option<i32>,
    pub has_variant: bool,
    pub has_team: bool,
    pub extra: ExtraFields,
    pub remap: Option<RemapCategory>,
}

static LAYOUTS: [CategoryLayout; 7] = [
    CategoryLayout {
        category: ObjectCategory::Scenery,
        label: "scenery",
        scenario_palette: "scenery palette",
        resource_palette: "scenery palette",
        scenario_block: "scenery",
        resource_block: "scenerys",
        definition_field: "name",
        tag_group: "scenery",
        resource_field: "scenery resource",
        resource_group: "scenario_scenery_resource",
        modern_object_type: Some(6),
        has_variant: true,
        has_team: true,
        extra: ExtraFields::None,
        remap: None,
    },
    CategoryLayout {
        category: ObjectCategory::Vehicle,
        label: "vehicle",
        scenario_palette: "vehicle palette",
        resource_palette: "vehicle palette",
        scenario_block: "vehicles",
        resource_block: "vehicles",
        definition_field: "name",
        tag_group: "vehicle",
        resource_field: "vehicle resource",
        resource_group: "scenario_vehicles_resource",
        modern_object_type: Some(1),
        has_variant: true,
        has_team: true,
        extra: ExtraFields::None,
        remap: Some(RemapCategory::Vehicle),
    },
    CategoryLayout {
        category: ObjectCategory::Equipment,
        label: "equipment",
        scenario_palette: "equipment palette",
        resource_palette: "equipment palette",
        scenario_block: "equipment",
        resource_block: "equipments",
        definition_field: "name",
        tag_group: "equipment",
        resource_field: "equipment resource",
        resource_group: "scenario_equipment_resource",
        modern_object_type: Some(3),
        has_variant: false,
        has_team: true,
        extra: ExtraFields::None,
        remap: Some(RemapCategory::Equipment),
    },
    CategoryLayout {
        category: ObjectCategory::SoundScenery,
        label: "sound scenery",
        scenario_palette: "sound scenery palette",
        resource_palette: "sound_scenery palette",
        scenario_block: "sound scenery",
        resource_block: "sound_scenerys",
        definition_field: "name",
        tag_group: "sound_scenery",
        resource_field: "sound scenery resource",
        resource_group: "scenario_sound_scenery_resource",
        modern_object_type: Some(10),
        has_variant: false,
        has_team: false,
        extra: ExtraFields::Sound,
        remap: None,
    },
    CategoryLayout {
        category: ObjectCategory::Crate,
        label: "crate",
        scenario_palette: "crate palette",
        resource_palette: "crate palette",
        scenario_block: "crates",
        resource_block: "crates",
        definition_field: "name",
        tag_group: "crate",
        resource_field: "scenery resource",
        resource_group: "scenario_scenery_resource",
        modern_object_type: Some(11),
        has_variant: true,
        has_team: true,
        extra: ExtraFields::None,
        remap: None,
    },
    CategoryLayout {
        category: ObjectCategory::Decal,
        label: "decal",
        scenario_palette: "decal palette",
        resource_palette: "palette",
        scenario_block: "decals",
        resource_block: "decals",
        definition_field: "reference",
        tag_group: "decal_system",
        resource_field: "decal resource",
        resource_group: "scenario_decals_resource",
        modern_object_type: None,
        has_variant: false,
        has_team: false,
        extra: ExtraFields::Decal,
        remap: None,
    },
    CategoryLayout {
        category: ObjectCategory::Weapon,
        label: "weapon",
        scenario_palette: "weapon palette",
        resource_palette: "weapon palette",
        scenario_block: "weapons",
        resource_block: "weapons",
        definition_field: "name",
        tag_group: "weapon",
        resource_field: "weapon resource",
        resource_group: "scenario_weapons_resource",
        modern_object_type: Some(2),
        has_variant: true,
        has_team: true,
        extra: ExtraFields::Weapon,
        remap: Some(RemapCategory::Weapon),
    },
];

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 7] = [
        ObjectCategory::Scenery,
        ObjectCategory::Vehicle,
        ObjectCategory::Equipment,
        ObjectCategory::SoundScenery,
        ObjectCategory::Crate,
        ObjectCategory::Decal,
        ObjectCategory::Weapon,
    ];

    pub fn layout(self) -> &'static CategoryLayout {
        match self {
            ObjectCategory::Scenery => &LAYOUTS[0],
            ObjectCategory::Vehicle => &LAYOUTS[1],
            ObjectCategory::Equipment => &LAYOUTS[2],
            ObjectCategory::SoundScenery => &LAYOUTS[3],
            ObjectCategory::Crate => &LAYOUTS[4],
            ObjectCategory::Decal => &LAYOUTS[5],
            ObjectCategory::Weapon => &LAYOUTS[6],
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.layout().label)
    }
}

impl CategoryLayout {
    pub fn palette(&self, role: SourceRole) -> &'static str {
        match role {
            SourceRole::Scenario => self.scenario_palette,
            SourceRole::Resource => self.resource_palette,
        }
    }

    pub fn placements(&self, role: SourceRole) -> &'static str {
        match role {
            SourceRole::Scenario => self.scenario_block,
            SourceRole::Resource => self.resource_block,
        }
    }
}

/// Treat a missing field as "this schema has no such field".
///
/// Returns whether the write happened.
pub fn write_if_present(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_schema_miss() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Split resource document a legacy scenario delegates `field` to, if any
pub fn split_resource(
    scenario: &TagDocument,
    field: &str,
    group: &str,
) -> Result<Option<TagReference>> {
    let path = format!("{}/Reference:{}", SPLIT_RESOURCES, field);
    match scenario.reference(&path) {
        Ok(Some(reference)) if !reference.path.is_empty() => {
            let mut reference = reference.clone();
            if reference.group.is_empty() {
                reference.group = group.to_string();
            }
            Ok(Some(reference))
        }
        Ok(_) => Ok(None),
        Err(e) if e.is_schema_miss() || matches!(e, Error::IndexOutOfRange { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Reads and writes object categories for one conversion pass
pub struct ObjectCodec<'p, S: TagStore> {
    store: &'p S,
    options: &'p ConversionOptions,
    diagnostics: &'p mut Diagnostics,
    decal_scales: DecalScaleCache,
}

impl<'p, S: TagStore> ObjectCodec<'p, S> {
    pub fn new(store: &'p S, options: &'p ConversionOptions, diagnostics: &'p mut Diagnostics) -> Self {
        Self {
            store,
            options,
            diagnostics,
            decal_scales: DecalScaleCache::default(),
        }
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    /// Extract a category from a scenario, following its split resource when set
    pub fn extract_from_scenario(
        &mut self,
        scenario: &TagDocument,
        category: ObjectCategory,
    ) -> Result<CategoryData> {
        let layout = category.layout();
        if let Some(resource) = split_resource(scenario, layout.resource_field, layout.resource_group)? {
            match self.store.open(&resource) {
                Ok(doc) => {
                    info!("Reading {} from resource {}", layout.label, resource);
                    return self.extract(&doc, category, SourceRole::Resource);
                }
                Err(e @ Error::DocumentNotFound(_)) => {
                    self.diagnostics.warn(
                        layout.label,
                        format!("{}, reading the scenario instead", e),
                    );
                }
                Err(e) => return Err(e),
            }
        }
        self.extract(scenario, category, SourceRole::Scenario)
    }

    /// Extract the palette and placements of `category` from `doc`
    pub fn extract(
        &mut self,
        doc: &TagDocument,
        category: ObjectCategory,
        role: SourceRole,
    ) -> Result<CategoryData> {
        let layout = category.layout();
        let definitions = self.extract_definitions(doc, layout, role)?;

        let block = layout.placements(role);
        let count = doc.block_count(&format!("Block:{}", block))?;
        let mut placements = Vec::with_capacity(count);
        for i in 0..count {
            placements.push(extract_placement(doc, layout, block, i)?);
        }

        info!(
            "Extracted {} {} definitions and {} placements",
            definitions.len(),
            layout.label,
            placements.len()
        );
        Ok(CategoryData {
            definitions,
            placements,
        })
    }

    fn extract_definitions(
        &mut self,
        doc: &TagDocument,
        layout: &CategoryLayout,
        role: SourceRole,
    ) -> Result<Vec<ObjectDefinition>> {
        let palette = layout.palette(role);
        let count = doc.block_count(&format!("Block:{}", palette))?;
        let mut definitions = Vec::with_capacity(count);

        for i in 0..count {
            let path = format!("Block:{}[{}]/Reference:{}", palette, i, layout.definition_field);
            let reference = doc.reference(&path)?.cloned();
            let mut definition =
                ObjectDefinition::new(reference.as_ref().map(|r| r.path.clone()).unwrap_or_default());
            debug!("{} definition {}: {}", layout.label, i, definition.tag);

            if layout.extra == ExtraFields::Decal {
                if let Some(system) = &reference {
                    definition.decal_settings =
                        decal::capture_settings(self.store, system, self.diagnostics);
                }
            }
            definitions.push(definition);
        }

        Ok(definitions)
    }

    /// Replace the palette and placements of `category` in `doc`
    pub fn inject(
        &mut self,
        doc: &mut TagDocument,
        category: ObjectCategory,
        definitions: &[ObjectDefinition],
        placements: &[ObjectPlacement],
    ) -> Result<()> {
        let layout = category.layout();
        self.inject_definitions(doc, layout, definitions)?;
        self.inject_placements(doc, layout, definitions, placements)?;
        info!(
            "Wrote {} {} definitions and {} placements",
            definitions.len(),
            layout.label,
            placements.len()
        );
        Ok(())
    }

    fn inject_definitions(
        &mut self,
        doc: &mut TagDocument,
        layout: &CategoryLayout,
        definitions: &[ObjectDefinition],
    ) -> Result<()> {
        let palette = format!("Block:{}", layout.scenario_palette);
        doc.remove_all_elements(&palette)?;

        for definition in definitions {
            let i = doc.add_element(&palette)?;
            let reference = if definition.tag.is_empty() {
                None
            } else {
                let tag = self.translate(layout, &definition.tag, doc.generation);
                Some(TagReference::new(tag, layout.tag_group))
            };
            debug!(
                "{} definition {}: {}",
                layout.label,
                i,
                reference.as_ref().map(|r| r.to_string()).unwrap_or_default()
            );

            let path = format!("{}[{}]/Reference:{}", palette, i, layout.definition_field);
            doc.set_reference(&path, reference.clone())?;

            if layout.extra == ExtraFields::Decal && doc.generation == SchemaGeneration::Modern {
                if let Some(system) = &reference {
                    if !definition.decal_settings.is_empty() {
                        decal::apply_material_settings(
                            self.store,
                            system,
                            &definition.decal_settings,
                            &self.options.material_shader_root,
                            self.diagnostics,
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Map a legacy reference to its modern equivalent, keeping it on a miss
    fn translate(&mut self, layout: &CategoryLayout, tag: &str, target: SchemaGeneration) -> String {
        let category = match (layout.remap, target) {
            (Some(category), SchemaGeneration::Modern) => category,
            _ => return tag.to_string(),
        };
        match self.options.remap.lookup(category, tag) {
            Some(mapped) => {
                debug!("Remapped {} {} -> {}", category, tag, mapped);
                mapped.to_string()
            }
            None => {
                self.diagnostics.warn(
                    layout.label,
                    format!("no {} remap entry for '{}', keeping the original reference", category, tag),
                );
                tag.to_string()
            }
        }
    }

    fn inject_placements(
        &mut self,
        doc: &mut TagDocument,
        layout: &CategoryLayout,
        definitions: &[ObjectDefinition],
        placements: &[ObjectPlacement],
    ) -> Result<()> {
        let block = format!("Block:{}", layout.scenario_block);
        doc.remove_all_elements(&block)?;

        for placement in placements {
            let i = doc.add_element(&block)?;
            let element = format!("{}[{}]", block, i);

            if layout.extra == ExtraFields::Decal {
                self.inject_decal_placement(doc, layout, &element, definitions, placement)?;
                continue;
            }

            let at = |field: &str| format!("{}/{}", element, field);
            doc.set_block_index(&at("ShortBlockIndex:type"), placement.type_index)?;
            doc.set_block_index(&at("ShortBlockIndex:name"), placement.name_index)?;
            doc.set_flags(&at("Struct:object data/Flags:placement flags"), placement.flags)?;
            doc.set_reals(&at("Struct:object data/RealPoint3d:position"), &placement.position)?;
            doc.set_reals(&at("Struct:object data/RealEulerAngles3d:rotation"), &placement.rotation)?;
            doc.set_real(&at("Struct:object data/Real:scale"), placement.scale)?;
            debug!(
                "{} placement {}: type {} position {}",
                layout.label,
                i,
                placement.type_index,
                format_reals(&placement.position)
            );

            if layout.has_variant {
                doc.set_string_id(
                    &at("Struct:permutation data/StringID:variant name"),
                    placement.variant_name.as_deref().unwrap_or(""),
                )?;
            }
            if layout.has_team {
                doc.set_enum(
                    &at("Struct:multiplayer data/CharEnum:owner team"),
                    placement.owner_team,
                )?;
            }
            if let Some(object_type) = layout.modern_object_type {
                write_if_present(
                    doc.set_enum(&at("Struct:object data/Struct:object id/CharEnum:type"), object_type),
                )?;
            }

            match layout.extra {
                ExtraFields::Sound => write_sound_fields(doc, &element, placement)?,
                ExtraFields::Weapon => write_weapon_fields(doc, &element, placement)?,
                ExtraFields::None | ExtraFields::Decal => {}
            }
        }

        Ok(())
    }

    fn inject_decal_placement(
        &mut self,
        doc: &mut TagDocument,
        layout: &CategoryLayout,
        element: &str,
        definitions: &[ObjectDefinition],
        placement: &ObjectPlacement,
    ) -> Result<()> {
        let at = |field: &str| format!("{}/{}", element, field);
        doc.set_block_index(&at("ShortBlockIndex:decal palette index"), placement.type_index)?;
        write_if_present(doc.set_flags(&at("ByteFlags:flags"), PLANAR_DECAL_FLAG))?;
        doc.set_reals(&at("RealPoint3d:position"), &placement.position)?;
        doc.set_reals(&at("RealQuaternion:rotation"), &placement.rotation)?;

        let requested = [placement.decal.scale_x, placement.decal.scale_y];
        let scale = if doc.generation == SchemaGeneration::Modern {
            match self.decal_system_scale(doc, layout, definitions, placement, requested) {
                Ok(scale) => scale,
                Err(e) => {
                    self.diagnostics.warn(
                        layout.label,
                        format!("{}: decal system unavailable ({}), keeping placement scale", element, e),
                    );
                    requested
                }
            }
        } else {
            requested
        };

        doc.set_real(&at("Real:scale x"), scale[0])?;
        doc.set_real(&at("Real:scale y"), scale[1])?;
        Ok(())
    }

    fn decal_system_scale(
        &mut self,
        doc: &TagDocument,
        layout: &CategoryLayout,
        definitions: &[ObjectDefinition],
        placement: &ObjectPlacement,
        requested: [f32; 2],
    ) -> Result<[f32; 2]> {
        let index = usize::try_from(placement.type_index).map_err(|_| {
            Error::DocumentNotFound(format!("decal palette entry {}", placement.type_index))
        })?;
        let path = format!(
            "Block:{}[{}]/Reference:{}",
            layout.scenario_palette, index, layout.definition_field
        );
        let system = doc
            .reference(&path)?
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound(format!("{} (empty palette entry)", path)))?;
        let captured_radius = definitions
            .get(index)
            .and_then(|d| d.decal_settings.first())
            .and_then(|s| s.radius);

        decal::apply_placement_scale(
            self.store,
            &system,
            requested,
            captured_radius,
            &mut self.decal_scales,
        )
    }
}

fn extract_placement(
    doc: &TagDocument,
    layout: &CategoryLayout,
    block: &str,
    i: usize,
) -> Result<ObjectPlacement> {
    let at = |field: &str| format!("Block:{}[{}]/{}", block, i, field);
    let mut placement = ObjectPlacement::default();

    if layout.extra == ExtraFields::Decal {
        placement.type_index = doc.block_index(&at("ShortBlockIndex:decal palette index"))?;
        placement.position = doc.reals_n(&at("RealPoint3d:position"))?;
        placement.rotation = doc.reals(&at("RealQuaternion:rotation"))?.to_vec();
        placement.decal.scale_x = doc.real(&at("Real:scale x"))?;
        placement.decal.scale_y = doc.real(&at("Real:scale y"))?;
        return Ok(placement);
    }

    placement.type_index = doc.block_index(&at("ShortBlockIndex:type"))?;
    placement.name_index = doc.block_index(&at("ShortBlockIndex:name"))?;
    placement.flags = doc.flags(&at("Struct:object data/Flags:placement flags"))?;
    placement.scale = doc.real(&at("Struct:object data/Real:scale"))?;
    placement.position = doc.reals_n(&at("Struct:object data/RealPoint3d:position"))?;
    placement.rotation = doc
        .reals(&at("Struct:object data/RealEulerAngles3d:rotation"))?
        .to_vec();

    if layout.has_variant {
        let variant = doc.string_id(&at("Struct:permutation data/StringID:variant name"))?;
        placement.variant_name = (!variant.is_empty()).then(|| variant.to_string());
    }
    placement.owner_team = if layout.has_team {
        doc.enum_value(&at("Struct:multiplayer data/CharEnum:owner team"))?
    } else {
        NEUTRAL_TEAM
    };

    match layout.extra {
        ExtraFields::Sound => read_sound_fields(doc, block, i, &mut placement)?,
        ExtraFields::Weapon => {
            placement.weapon.rounds_left = doc.integer(&at("Struct:weapon data/ShortInteger:rounds left"))?;
            placement.weapon.rounds_loaded =
                doc.integer(&at("Struct:weapon data/ShortInteger:rounds loaded"))?;
            placement.weapon.weap_flags = doc.flags(&at("Struct:weapon data/Flags:flags"))?;
        }
        ExtraFields::None | ExtraFields::Decal => {}
    }

    debug!(
        "{} placement {}: type {} position {}",
        layout.label,
        i,
        placement.type_index,
        format_reals(&placement.position)
    );
    Ok(placement)
}

const SOUND: &str = "Struct:sound_scenery";
const DISTANCES: &str = "Struct:sound_scenery/Struct:override distance parameters";

fn read_sound_fields(
    doc: &TagDocument,
    block: &str,
    i: usize,
    placement: &mut ObjectPlacement,
) -> Result<()> {
    let sound = |field: &str| format!("Block:{}[{}]/{}/{}", block, i, SOUND, field);
    let distance = |field: &str| format!("Block:{}[{}]/{}/Real:{}", block, i, DISTANCES, field);
    let fields = &mut placement.sound;

    fields.volume_type = doc.enum_value(&sound("LongEnum:volume type"))?;
    fields.height = doc.real(&sound("Real:height"))?;
    fields.cone_bounds = Some(doc.reals_n(&sound("AngleBounds:override cone angle bounds"))?);
    fields.cone_gain = doc.real(&sound("Real:override outer cone gain"))?;
    fields.obstr_distance = doc.real(&distance("don't obstruct distance"))?;
    fields.dnt_ply_distance = doc.real(&distance("don't play distance"))?;
    fields.atk_distance = doc.real(&distance("attack distance"))?;
    fields.min_distance = doc.real(&distance("minimum distance"))?;
    fields.sus_beg_distance = doc.real(&distance("sustain begin distance"))?;
    fields.sus_end_distance = doc.real(&distance("sustain end distance"))?;
    fields.max_distance = doc.real(&distance("maximum distance"))?;
    fields.sustain_db = doc.real(&distance("sustain db"))?;
    Ok(())
}

fn write_sound_fields(doc: &mut TagDocument, element: &str, placement: &ObjectPlacement) -> Result<()> {
    let sound = |field: &str| format!("{}/{}/{}", element, SOUND, field);
    let distance = |field: &str| format!("{}/{}/Real:{}", element, DISTANCES, field);
    let fields = &placement.sound;

    doc.set_enum(&sound("LongEnum:volume type"), fields.volume_type)?;
    doc.set_real(&sound("Real:height"), fields.height)?;
    doc.set_reals(
        &sound("AngleBounds:override cone angle bounds"),
        &fields.cone_bounds.unwrap_or_default(),
    )?;
    doc.set_real(&sound("Real:override outer cone gain"), fields.cone_gain)?;
    doc.set_real(&distance("don't obstruct distance"), fields.obstr_distance)?;
    doc.set_real(&distance("don't play distance"), fields.dnt_ply_distance)?;
    doc.set_real(&distance("attack distance"), fields.atk_distance)?;
    doc.set_real(&distance("minimum distance"), fields.min_distance)?;
    doc.set_real(&distance("sustain begin distance"), fields.sus_beg_distance)?;
    doc.set_real(&distance("sustain end distance"), fields.sus_end_distance)?;
    doc.set_real(&distance("maximum distance"), fields.max_distance)?;
    doc.set_real(&distance("sustain db"), fields.sustain_db)?;
    Ok(())
}

fn write_weapon_fields(doc: &mut TagDocument, element: &str, placement: &ObjectPlacement) -> Result<()> {
    let at = |field: &str| format!("{}/Struct:weapon data/{}", element, field);
    doc.set_integer(&at("ShortInteger:rounds left"), placement.weapon.rounds_left)?;
    doc.set_integer(&at("ShortInteger:rounds loaded"), placement.weapon.rounds_loaded)?;
    doc.set_flags(&at("Flags:flags"), placement.weapon.weap_flags)?;
    Ok(())
}
