//! Intermediate object graph exchanged as JSON

use serde::{Deserialize, Serialize};

use crate::objects::ObjectCategory;

/// Team value meaning "no team"
pub const NEUTRAL_TEAM: i32 = 8;

fn neutral_team() -> i32 {
    NEUTRAL_TEAM
}

fn no_index() -> i32 {
    -1
}

fn unit() -> f32 {
    1.0
}

fn zero_rotation() -> Vec<f32> {
    vec![0.0; 3]
}

/// Decal material configuration captured from one decal-system entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecalMaterialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bump_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint_colour: Option<[f32; 3]>,
    #[serde(default = "unit")]
    pub tint_intensity: f32,
    #[serde(default)]
    pub modulation: f32,
    #[serde(default)]
    pub blend_mode: i64,
    #[serde(default)]
    pub albedo_mode: i64,
    #[serde(default)]
    pub bump_mode: i64,
    #[serde(rename = "scaleXY", default, skip_serializing_if = "Option::is_none")]
    pub scale_xy: Option<[f32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<[f32; 2]>,
}

impl Default for DecalMaterialSettings {
    fn default() -> Self {
        Self {
            base_ref: None,
            alpha_ref: None,
            bump_ref: None,
            vector_ref: None,
            tint_colour: None,
            tint_intensity: 1.0,
            modulation: 0.0,
            blend_mode: 0,
            albedo_mode: 0,
            bump_mode: 0,
            scale_xy: None,
            radius: None,
        }
    }
}

/// One palette entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decal_settings: Vec<DecalMaterialSettings>,
}

impl ObjectDefinition {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            decal_settings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundSceneryFields {
    pub volume_type: i32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cone_bounds: Option<[f32; 2]>,
    pub cone_gain: f32,
    pub obstr_distance: f32,
    pub dnt_ply_distance: f32,
    pub atk_distance: f32,
    pub min_distance: f32,
    pub sus_beg_distance: f32,
    pub sus_end_distance: f32,
    pub max_distance: f32,
    pub sustain_db: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeaponFields {
    pub rounds_left: i64,
    pub rounds_loaded: i64,
    pub weap_flags: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecalPlacementFields {
    pub scale_x: f32,
    pub scale_y: f32,
}

/// One placed instance
///
/// Only the field group belonging to the placement's category is
/// meaningful; the other groups stay at their zero values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPlacement {
    #[serde(default = "no_index")]
    pub type_index: i32,
    #[serde(default = "no_index")]
    pub name_index: i32,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub position: [f32; 3],
    /// Euler angles, or a quaternion for decals
    #[serde(default = "zero_rotation")]
    pub rotation: Vec<f32>,
    #[serde(default = "unit")]
    pub scale: f32,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default = "neutral_team")]
    pub owner_team: i32,
    #[serde(flatten)]
    pub sound: SoundSceneryFields,
    #[serde(flatten)]
    pub weapon: WeaponFields,
    #[serde(flatten)]
    pub decal: DecalPlacementFields,
}

impl Default for ObjectPlacement {
    fn default() -> Self {
        Self {
            type_index: -1,
            name_index: -1,
            flags: 0,
            position: [0.0; 3],
            rotation: vec![0.0; 3],
            scale: 1.0,
            variant_name: None,
            owner_team: NEUTRAL_TEAM,
            sound: SoundSceneryFields::default(),
            weapon: WeaponFields::default(),
            decal: DecalPlacementFields::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorPoint {
    pub position: [f32; 3],
    pub normal: [f32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerVolume {
    #[serde(default)]
    pub name: String,
    #[serde(default = "no_index")]
    pub obj_name_index: i32,
    #[serde(default)]
    pub node_index: i64,
    #[serde(default)]
    pub node_name: String,
    #[serde(rename = "type", default)]
    pub volume_type: i32,
    #[serde(default)]
    pub forward: [f32; 3],
    #[serde(default)]
    pub up: [f32; 3],
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub extents: [f32; 3],
    #[serde(default)]
    pub z_sink: f32,
    #[serde(default)]
    pub sector_points: Vec<SectorPoint>,
    #[serde(default = "no_index")]
    pub kill_trig_vol: i32,
}

impl Default for TriggerVolume {
    fn default() -> Self {
        Self {
            name: String::new(),
            obj_name_index: -1,
            node_index: 0,
            node_name: String::new(),
            volume_type: 0,
            forward: [0.0; 3],
            up: [0.0; 3],
            position: [0.0; 3],
            extents: [0.0; 3],
            z_sink: 0.0,
            sector_points: Vec::new(),
            kill_trig_vol: -1,
        }
    }
}

/// Definitions and placements of one category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryData {
    pub definitions: Vec<ObjectDefinition>,
    pub placements: Vec<ObjectPlacement>,
}

/// Root of the object graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectDataContainer {
    pub scenery_definitions: Vec<ObjectDefinition>,
    pub scenery_placements: Vec<ObjectPlacement>,
    pub vehicle_definitions: Vec<ObjectDefinition>,
    pub vehicle_placements: Vec<ObjectPlacement>,
    pub equipment_definitions: Vec<ObjectDefinition>,
    pub equipment_placements: Vec<ObjectPlacement>,
    pub soundscen_definitions: Vec<ObjectDefinition>,
    pub soundscen_placements: Vec<ObjectPlacement>,
    pub trigger_volumes: Vec<TriggerVolume>,
    pub crate_definitions: Vec<ObjectDefinition>,
    pub crate_placements: Vec<ObjectPlacement>,
    pub decal_definitions: Vec<ObjectDefinition>,
    pub decal_placements: Vec<ObjectPlacement>,
    pub weapon_definitions: Vec<ObjectDefinition>,
    pub weapon_placements: Vec<ObjectPlacement>,
}

impl ObjectDataContainer {
    pub fn definitions(&self, category: ObjectCategory) -> &[ObjectDefinition] {
        match category {
            ObjectCategory::Scenery => &self.scenery_definitions,
            ObjectCategory::Vehicle => &self.vehicle_definitions,
            ObjectCategory::Equipment => &self.equipment_definitions,
            ObjectCategory::SoundScenery => &self.soundscen_definitions,
            ObjectCategory::Crate => &self.crate_definitions,
            ObjectCategory::Decal => &self.decal_definitions,
            ObjectCategory::Weapon => &self.weapon_definitions,
        }
    }

    pub fn placements(&self, category: ObjectCategory) -> &[ObjectPlacement] {
        match category {
            ObjectCategory::Scenery => &self.scenery_placements,
            ObjectCategory::Vehicle => &self.vehicle_placements,
            ObjectCategory::Equipment => &self.equipment_placements,
            ObjectCategory::SoundScenery => &self.soundscen_placements,
            ObjectCategory::Crate => &self.crate_placements,
            ObjectCategory::Decal => &self.decal_placements,
            ObjectCategory::Weapon => &self.weapon_placements,
        }
    }

    /// Store one category's data, replacing what was there
    pub fn set_category(&mut self, category: ObjectCategory, data: CategoryData) {
        let (definitions, placements) = match category {
            ObjectCategory::Scenery => (&mut self.scenery_definitions, &mut self.scenery_placements),
            ObjectCategory::Vehicle => (&mut self.vehicle_definitions, &mut self.vehicle_placements),
            ObjectCategory::Equipment => {
                (&mut self.equipment_definitions, &mut self.equipment_placements)
            }
            ObjectCategory::SoundScenery => {
                (&mut self.soundscen_definitions, &mut self.soundscen_placements)
            }
            ObjectCategory::Crate => (&mut self.crate_definitions, &mut self.crate_placements),
            ObjectCategory::Decal => (&mut self.decal_definitions, &mut self.decal_placements),
            ObjectCategory::Weapon => (&mut self.weapon_definitions, &mut self.weapon_placements),
        };
        *definitions = data.definitions;
        *placements = data.placements;
    }

    pub fn is_empty(&self) -> bool {
        self.trigger_volumes.is_empty()
            && ObjectCategory::ALL
                .iter()
                .all(|c| self.definitions(*c).is_empty() && self.placements(*c).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_json_names() {
        let placement = ObjectPlacement {
            type_index: 0,
            name_index: 2,
            position: [1.0, 2.0, 3.0],
            variant_name: Some("default".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&placement).unwrap();
        assert_eq!(value["typeIndex"], 0);
        assert_eq!(value["nameIndex"], 2);
        assert_eq!(value["variantName"], "default");
        assert_eq!(value["ownerTeam"], 8);
        assert!(value.get("susBegDistance").is_some());
        assert!(value.get("roundsLeft").is_some());
        assert!(value.get("scaleX").is_some());
    }

    #[test]
    fn test_placement_defaults_when_absent() {
        let placement: ObjectPlacement = serde_json::from_str(
            r#"{"typeIndex": 1, "nameIndex": 0, "flags": 0,
                "position": [1, 2, 3], "rotation": [0, 0, 0], "scale": 1,
                "variantName": null}"#,
        )
        .unwrap();
        assert_eq!(placement.owner_team, NEUTRAL_TEAM);
        assert_eq!(placement.variant_name, None);
        assert_eq!(placement.sound, SoundSceneryFields::default());
        assert_eq!(placement.position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_rotation_is_zero() {
        let placement: ObjectPlacement =
            serde_json::from_str(r#"{"typeIndex": 0, "position": [1, 2, 3]}"#).unwrap();
        assert_eq!(placement.rotation, vec![0.0, 0.0, 0.0]);
        assert_eq!(placement.rotation, ObjectPlacement::default().rotation);
    }

    #[test]
    fn test_sound_fields_flattened() {
        let placement: ObjectPlacement = serde_json::from_str(
            r#"{"typeIndex": 0, "nameIndex": -1, "position": [0,0,0], "rotation": [0,0,0],
                "volumeType": 2, "coneBounds": [0.5, 1.5], "sustainDb": -3.5}"#,
        )
        .unwrap();
        assert_eq!(placement.sound.volume_type, 2);
        assert_eq!(placement.sound.cone_bounds, Some([0.5, 1.5]));
        assert_eq!(placement.sound.sustain_db, -3.5);
    }

    #[test]
    fn test_decal_settings_names() {
        let settings = DecalMaterialSettings {
            base_ref: Some("decals\\base".into()),
            scale_xy: Some([0.5, 1.0]),
            tint_colour: Some([1.0, 0.5, 0.25]),
            ..Default::default()
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["baseRef"], "decals\\base");
        assert_eq!(value["scaleXY"][0], 0.5);
        assert_eq!(value["tintColour"][2], 0.25);
        assert!(value.get("alphaRef").is_none());
    }

    #[test]
    fn test_container_keys() {
        let mut container = ObjectDataContainer::default();
        assert!(container.is_empty());
        container.trigger_volumes.push(TriggerVolume {
            volume_type: 1,
            ..Default::default()
        });
        container.set_category(
            ObjectCategory::SoundScenery,
            CategoryData {
                definitions: vec![ObjectDefinition::new("sound\\birds")],
                placements: Vec::new(),
            },
        );
        let value = serde_json::to_value(&container).unwrap();
        assert_eq!(value["soundscenDefinitions"][0]["tag"], "sound\\birds");
        assert_eq!(value["triggerVolumes"][0]["type"], 1);
        assert!(value["cratePlacements"].as_array().unwrap().is_empty());

        let empty: ObjectDataContainer = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
