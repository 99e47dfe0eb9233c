//! Schema templates for each tag group and generation
//!
//! Every document is created from one of these templates, so every field a
//! schema declares exists with a default value and every block knows its
//! element layout.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::objects::{CategoryLayout, ExtraFields, ObjectCategory, SourceRole};
use crate::tag::{FieldKind, FieldValue, SchemaGeneration, TagDocument, TagReference, TagStruct};

pub const SCENARIO_GROUP: &str = "scenario";
pub const DECAL_SYSTEM_GROUP: &str = "decal_system";
pub const BITMAP_GROUP: &str = "bitmap";
pub const TRIGGER_VOLUME_RESOURCE_GROUP: &str = "scenario_trigger_volumes_resource";

/// Split-resource reference fields of a legacy scenario
const SPLIT_RESOURCE_FIELDS: [&str; 11] = [
    "scenery resource",
    "biped resource",
    "vehicle resource",
    "equipment resource",
    "weapon resource",
    "device resource",
    "effect scenery",
    "decal resource",
    "trigger volume resource",
    "sound scenery resource",
    "decorator resource",
];

type Templates = HashMap<&'static str, TagStruct>;

fn object_data(generation: SchemaGeneration) -> TagStruct {
    let data = TagStruct::new()
        .with(FieldKind::Flags, "placement flags")
        .with(FieldKind::RealPoint3d, "position")
        .with(FieldKind::RealEulerAngles3d, "rotation")
        .with_value(FieldKind::Real, "scale", FieldValue::Real(1.0));
    match generation {
        SchemaGeneration::Legacy => data,
        SchemaGeneration::Modern => {
            data.with_struct("object id", TagStruct::new().with(FieldKind::CharEnum, "type"))
        }
    }
}

fn sound_scenery() -> TagStruct {
    let distances = [
        "don't obstruct distance",
        "don't play distance",
        "attack distance",
        "minimum distance",
        "sustain begin distance",
        "sustain end distance",
        "maximum distance",
        "sustain db",
    ]
    .iter()
    .fold(TagStruct::new(), |s, name| s.with(FieldKind::Real, name));

    TagStruct::new()
        .with(FieldKind::LongEnum, "volume type")
        .with(FieldKind::Real, "height")
        .with(FieldKind::AngleBounds, "override cone angle bounds")
        .with(FieldKind::Real, "override outer cone gain")
        .with_struct("override distance parameters", distances)
}

fn weapon_data() -> TagStruct {
    TagStruct::new()
        .with(FieldKind::ShortInteger, "rounds left")
        .with(FieldKind::ShortInteger, "rounds loaded")
        .with(FieldKind::Flags, "flags")
}

fn placement(generation: SchemaGeneration, extra: ExtraFields) -> TagStruct {
    if extra == ExtraFields::Decal {
        let decal = TagStruct::new().with(FieldKind::ShortBlockIndex, "decal palette index");
        let decal = match generation {
            SchemaGeneration::Legacy => decal,
            SchemaGeneration::Modern => decal.with(FieldKind::ByteFlags, "flags"),
        };
        return decal
            .with(FieldKind::RealPoint3d, "position")
            .with_value(
                FieldKind::RealQuaternion,
                "rotation",
                FieldValue::Reals(vec![0.0, 0.0, 0.0, 1.0]),
            )
            .with_value(FieldKind::Real, "scale x", FieldValue::Real(1.0))
            .with_value(FieldKind::Real, "scale y", FieldValue::Real(1.0));
    }

    let element = TagStruct::new()
        .with(FieldKind::ShortBlockIndex, "type")
        .with(FieldKind::ShortBlockIndex, "name")
        .with_struct("object data", object_data(generation))
        .with_struct(
            "permutation data",
            TagStruct::new().with(FieldKind::StringId, "variant name"),
        )
        .with_struct(
            "multiplayer data",
            TagStruct::new().with(FieldKind::CharEnum, "owner team"),
        );
    match extra {
        ExtraFields::Sound => element.with_struct("sound_scenery", sound_scenery()),
        ExtraFields::Weapon => element.with_struct("weapon data", weapon_data()),
        ExtraFields::None | ExtraFields::Decal => element,
    }
}

fn palette_entry(layout: &CategoryLayout) -> TagStruct {
    TagStruct::new().with(FieldKind::Reference, layout.definition_field)
}

fn trigger_volume() -> TagStruct {
    TagStruct::new()
        .with(FieldKind::StringId, "name")
        .with(FieldKind::ShortBlockIndex, "object name")
        .with(FieldKind::ShortInteger, "runtime node index")
        .with(FieldKind::StringId, "node name")
        .with(FieldKind::ShortEnum, "type")
        .with(FieldKind::RealVector3d, "forward")
        .with(FieldKind::RealVector3d, "up")
        .with(FieldKind::RealPoint3d, "position")
        .with(FieldKind::RealPoint3d, "extents")
        .with(FieldKind::Real, "z sink")
        .with_block(
            "sector points",
            TagStruct::new()
                .with(FieldKind::RealPoint3d, "position")
                .with(FieldKind::RealEulerAngles2d, "normal"),
        )
        .with(FieldKind::ShortBlockIndex, "kill trigger volume")
}

/// Add the palette and placement blocks of `layouts` under their `role` names
fn with_categories<'a>(
    mut root: TagStruct,
    generation: SchemaGeneration,
    role: SourceRole,
    layouts: impl IntoIterator<Item = &'a CategoryLayout>,
) -> TagStruct {
    for layout in layouts {
        root = root
            .with_block(layout.palette(role), palette_entry(layout))
            .with_block(layout.placements(role), placement(generation, layout.extra));
    }
    root
}

fn scenario(generation: SchemaGeneration) -> TagStruct {
    let layouts = ObjectCategory::ALL.iter().map(|c| c.layout());
    let root = with_categories(TagStruct::new(), generation, SourceRole::Scenario, layouts)
        .with_block("trigger volumes", trigger_volume());

    match generation {
        SchemaGeneration::Legacy => {
            let split = SPLIT_RESOURCE_FIELDS
                .iter()
                .fold(TagStruct::new(), |s, name| s.with(FieldKind::Reference, name));
            root.with_block(
                "scenario resources",
                TagStruct::new().with_block("new split resources", split),
            )
        }
        SchemaGeneration::Modern => root,
    }
}

fn decal_system(generation: SchemaGeneration) -> TagStruct {
    match generation {
        SchemaGeneration::Legacy => {
            let parameter = TagStruct::new()
                .with(FieldKind::StringId, "parameter name")
                .with(FieldKind::Reference, "bitmap")
                .with_block(
                    "animated parameters",
                    TagStruct::new().with(FieldKind::Custom, "animation function"),
                );
            let shader = TagStruct::new()
                .with_block("options", TagStruct::new().with(FieldKind::ShortInteger, "short"))
                .with_block("parameters", parameter);
            TagStruct::new().with_block(
                "decals",
                TagStruct::new()
                    .with_struct("actual shader?", shader)
                    .with(FieldKind::RealBounds, "radius"),
            )
        }
        SchemaGeneration::Modern => {
            let parameter = TagStruct::new()
                .with(FieldKind::StringId, "parameter name")
                .with(FieldKind::LongEnum, "parameter type")
                .with(FieldKind::Reference, "bitmap")
                .with(FieldKind::RealArgbColor, "color")
                .with(FieldKind::Real, "real")
                .with_block(
                    "function parameters",
                    TagStruct::new().with(FieldKind::Custom, "function"),
                );
            let material = TagStruct::new()
                .with(FieldKind::Reference, "material shader")
                .with_block("material parameters", parameter)
                .with(FieldKind::CharEnum, "alpha blend mode");
            TagStruct::new()
                .with_value(
                    FieldKind::RealPoint2d,
                    "decal scale override",
                    FieldValue::Reals(vec![1.0, 1.0]),
                )
                .with_block(
                    "decals",
                    TagStruct::new()
                        .with_struct("actual material?", material)
                        .with(FieldKind::RealBounds, "radius"),
                )
        }
    }
}

fn bitmap() -> TagStruct {
    TagStruct::new().with_block(
        "bitmaps",
        TagStruct::new()
            .with(FieldKind::ShortInteger, "width")
            .with(FieldKind::ShortInteger, "height"),
    )
}

fn build(generation: SchemaGeneration) -> Templates {
    let mut templates = Templates::new();
    templates.insert(SCENARIO_GROUP, scenario(generation));
    templates.insert(DECAL_SYSTEM_GROUP, decal_system(generation));
    templates.insert(BITMAP_GROUP, bitmap());

    if generation == SchemaGeneration::Legacy {
        // resource documents hold the blocks of every category sharing them
        for layout in ObjectCategory::ALL.iter().map(|c| c.layout()) {
            let root = templates
                .remove(layout.resource_group)
                .unwrap_or_default();
            let root = with_categories(root, generation, SourceRole::Resource, [layout]);
            templates.insert(layout.resource_group, root);
        }
        templates.insert(
            TRIGGER_VOLUME_RESOURCE_GROUP,
            TagStruct::new().with_block("trigger volumes", trigger_volume()),
        );
    }
    templates
}

fn templates(generation: SchemaGeneration) -> &'static Templates {
    static LEGACY: OnceLock<Templates> = OnceLock::new();
    static MODERN: OnceLock<Templates> = OnceLock::new();
    match generation {
        SchemaGeneration::Legacy => LEGACY.get_or_init(|| build(SchemaGeneration::Legacy)),
        SchemaGeneration::Modern => MODERN.get_or_init(|| build(SchemaGeneration::Modern)),
    }
}

/// Tag groups with a template in `generation`, sorted
pub fn groups(generation: SchemaGeneration) -> Vec<&'static str> {
    let mut groups: Vec<_> = templates(generation).keys().copied().collect();
    groups.sort_unstable();
    groups
}

/// Root layout of a fresh document of `group`
pub fn template(generation: SchemaGeneration, group: &str) -> Result<TagStruct> {
    templates(generation)
        .get(group)
        .cloned()
        .ok_or_else(|| Error::UnknownTagGroup {
            group: group.to_string(),
            generation: generation.to_string(),
        })
}

/// Create an empty document for `reference`, using its group's template
pub fn new_document(reference: TagReference, generation: SchemaGeneration) -> Result<TagDocument> {
    let root = template(generation, &reference.group)?;
    Ok(TagDocument::new(reference, generation, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_has_every_category() {
        for generation in [SchemaGeneration::Legacy, SchemaGeneration::Modern] {
            let doc = new_document(TagReference::new("levels\\a\\a", "scenario"), generation)
                .unwrap();
            for category in ObjectCategory::ALL {
                let layout = category.layout();
                assert!(doc.has_field(&format!("Block:{}", layout.scenario_palette)));
                assert!(doc.has_field(&format!("Block:{}", layout.scenario_block)));
            }
            assert!(doc.has_field("Block:trigger volumes"));
        }
    }

    #[test]
    fn test_generation_specific_fields() {
        let mut legacy =
            new_document(TagReference::new("a", "scenario"), SchemaGeneration::Legacy).unwrap();
        let mut modern =
            new_document(TagReference::new("a", "scenario"), SchemaGeneration::Modern).unwrap();
        legacy.add_element("Block:scenery").unwrap();
        modern.add_element("Block:scenery").unwrap();
        legacy.add_element("Block:decals").unwrap();
        modern.add_element("Block:decals").unwrap();

        let object_type = "Block:scenery[0]/Struct:object data/Struct:object id/CharEnum:type";
        assert!(!legacy.has_field(object_type));
        assert!(modern.has_field(object_type));
        assert!(!legacy.has_field("Block:decals[0]/ByteFlags:flags"));
        assert!(modern.has_field("Block:decals[0]/ByteFlags:flags"));
        assert!(legacy.has_field("Block:scenario resources"));
        assert!(!modern.has_field("Block:scenario resources"));
    }

    #[test]
    fn test_scenery_resource_holds_crates() {
        let doc = new_document(
            TagReference::new("levels\\a\\a_scenery", "scenario_scenery_resource"),
            SchemaGeneration::Legacy,
        )
        .unwrap();
        assert!(doc.has_field("Block:scenerys"));
        assert!(doc.has_field("Block:crates"));
        assert!(doc.has_field("Block:crate palette"));
        assert!(!doc.has_field("Block:vehicles"));
    }

    #[test]
    fn test_unknown_group() {
        let err = template(SchemaGeneration::Modern, "scenario_scenery_resource").unwrap_err();
        assert!(matches!(err, Error::UnknownTagGroup { .. }));
        assert!(groups(SchemaGeneration::Legacy).contains(&"scenario_decals_resource"));
    }

    #[test]
    fn test_defaults() {
        let doc = new_document(TagReference::new("d", "decal_system"), SchemaGeneration::Modern)
            .unwrap();
        assert_eq!(doc.reals("RealPoint2d:decal scale override").unwrap(), &[1.0, 1.0]);
    }
}
