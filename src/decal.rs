//! Decal material selection, tinting and scale normalization
//!
//! Legacy decal systems describe each decal with a shader (option indices
//! plus named bitmap parameters). Modern decal systems use one of a fixed
//! set of material shaders instead. This module captures the legacy
//! configuration, picks the matching material variant and writes the
//! modern material parameters.

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::DecalMaterialSettings;
use crate::report::Diagnostics;
use crate::schema::BITMAP_GROUP;
use crate::tag::{SchemaGeneration, TagDocument, TagFunction, TagReference, TagStore};

/// Default location of the decal material shaders
pub const DEFAULT_MATERIAL_SHADER_ROOT: &str = "shaders\\material_shaders\\pepper";
pub const MATERIAL_SHADER_GROUP: &str = "material_shader";

/// Blend mode that cannot carry a normal map
pub const BLEND_MODE_MULTIPLY: i64 = 2;

/// Albedo options whose shader samples an alpha map
pub const ALPHA_ALBEDO_MODES: [i64; 5] = [2, 3, 6, 7, 10];

/// Albedo options whose shader samples a vector map
pub const VECTOR_ALBEDO_MODES: [i64; 2] = [8, 9];

const SCALE_OVERRIDE: &str = "RealPoint2d:decal scale override";

// legacy shader option slots
const OPTION_ALBEDO: usize = 0;
const OPTION_BLEND: usize = 1;
const OPTION_BUMP: usize = 4;
const OPTION_TINT: usize = 5;

// modern material parameter types
const PARAMETER_BITMAP: i32 = 0;
const PARAMETER_REAL: i32 = 1;
const PARAMETER_COLOR: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialVariant {
    Base,
    BaseAlpha,
    BaseNormal,
    BaseAlphaNormal,
    VectorAlpha,
    /// No variant fits the texture set
    Invalid,
}

impl MaterialVariant {
    /// Material shader file name, `None` for [`MaterialVariant::Invalid`]
    pub fn shader_name(self) -> Option<&'static str> {
        match self {
            MaterialVariant::Base => Some("decal_base"),
            MaterialVariant::BaseAlpha => Some("decal_base_alpha"),
            MaterialVariant::BaseNormal => Some("decal_base_normal"),
            MaterialVariant::BaseAlphaNormal => Some("decal_base_alpha_normal"),
            MaterialVariant::VectorAlpha => Some("decal_vector_alpha"),
            MaterialVariant::Invalid => None,
        }
    }

    pub fn is_valid(self) -> bool {
        self != MaterialVariant::Invalid
    }

    pub fn shader_path(self, root: &str) -> Option<String> {
        self.shader_name()
            .map(|name| format!("{}\\{}", root.trim_end_matches('\\'), name))
    }
}

impl fmt::Display for MaterialVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shader_name().unwrap_or("invalid"))
    }
}

/// Pick the material variant for a captured decal configuration
pub fn select_material_variant(settings: &DecalMaterialSettings) -> MaterialVariant {
    let base = settings.base_ref.is_some();
    let alpha = settings.alpha_ref.is_some();
    let bump = settings.bump_ref.is_some() && settings.bump_mode > 0;
    let vector =
        settings.vector_ref.is_some() && VECTOR_ALBEDO_MODES.contains(&settings.albedo_mode);
    let multiply = settings.blend_mode == BLEND_MODE_MULTIPLY;

    match (base, alpha, bump, vector) {
        (true, false, false, false) => MaterialVariant::Base,
        (true, true, false, false) => MaterialVariant::BaseAlpha,
        (true, false, true, false) if multiply => MaterialVariant::Base,
        (true, false, true, false) => MaterialVariant::BaseNormal,
        (true, true, true, false) if multiply => MaterialVariant::BaseAlpha,
        (true, true, true, false) => MaterialVariant::BaseAlphaNormal,
        (true, _, false, true) => MaterialVariant::VectorAlpha,
        _ => MaterialVariant::Invalid,
    }
}

/// Bitmap parameters `(name, bitmap path)` the variant samples, in write order
pub fn bitmap_parameters(
    variant: MaterialVariant,
    settings: &DecalMaterialSettings,
) -> Vec<(&'static str, &str)> {
    let mut parameters = Vec::new();
    if let Some(base) = settings.base_ref.as_deref() {
        parameters.push(("color_map", base));
    }

    let (alpha, normal, vector) = match variant {
        MaterialVariant::Base | MaterialVariant::Invalid => (false, false, false),
        MaterialVariant::BaseAlpha => (true, false, false),
        MaterialVariant::BaseNormal => (false, true, false),
        MaterialVariant::BaseAlphaNormal => (true, true, false),
        MaterialVariant::VectorAlpha => (true, false, true),
    };

    if alpha {
        if let Some(map) = settings.alpha_ref.as_deref() {
            parameters.push(("alpha_map", map));
        }
    }
    if normal {
        if let Some(map) = settings.bump_ref.as_deref() {
            parameters.push(("normal_map", map));
        }
    }
    if vector {
        if let Some(map) = settings.vector_ref.as_deref() {
            parameters.push(("vector_map", map));
        }
    }
    parameters
}

/// Decal scale derived from the base bitmap's aspect ratio
pub fn aspect_scale(width: i64, height: i64) -> [f32; 2] {
    if height > width && height > 0 {
        [width as f32 / height as f32, 1.0]
    } else if width > height && width > 0 {
        [1.0, height as f32 / width as f32]
    } else {
        [1.0, 1.0]
    }
}

/// A placement scale is neutral when each axis is 0 or 1
pub fn is_neutral_scale(scale: [f32; 2]) -> bool {
    scale.iter().all(|&axis| axis == 0.0 || axis == 1.0)
}

/// What to write for one decal placement and its decal system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalScaleResolution {
    pub placement_scale: [f32; 2],
    /// New decal-system scale override, `None` to leave it
    pub system_override: Option<[f32; 2]>,
    /// New radius for every decal in the system, `None` to leave it
    pub radius: Option<[f32; 2]>,
}

/// Reconcile a placement's scale with its decal system's override and radius
pub fn resolve_decal_scale(
    placement: [f32; 2],
    system_override: [f32; 2],
    captured_radius: Option<[f32; 2]>,
) -> DecalScaleResolution {
    if is_neutral_scale(placement) {
        DecalScaleResolution {
            placement_scale: system_override,
            system_override: None,
            radius: captured_radius,
        }
    } else {
        DecalScaleResolution {
            placement_scale: placement,
            system_override: Some([1.0, 1.0]),
            radius: Some([1.0, 1.0]),
        }
    }
}

/// Decal-system scale overrides as first read during a pass
#[derive(Debug, Default)]
pub struct DecalScaleCache {
    overrides: HashMap<String, [f32; 2]>,
}

impl DecalScaleCache {
    pub fn get(&self, system: &TagReference) -> Option<[f32; 2]> {
        self.overrides.get(&system.key()).copied()
    }

    pub fn insert(&mut self, system: &TagReference, scale: [f32; 2]) {
        self.overrides.insert(system.key(), scale);
    }
}

/// Capture the material settings of every decal in a legacy decal system.
///
/// Failures are reported to `diagnostics` and yield fewer settings.
pub fn capture_settings<S: TagStore>(
    store: &S,
    system: &TagReference,
    diagnostics: &mut Diagnostics,
) -> Vec<DecalMaterialSettings> {
    match read_legacy_settings(store, system, diagnostics) {
        Ok(settings) => settings,
        Err(e) => {
            diagnostics.warn("decal", format!("could not read decal system {}: {}", system, e));
            Vec::new()
        }
    }
}

fn read_legacy_settings<S: TagStore>(
    store: &S,
    system: &TagReference,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<DecalMaterialSettings>> {
    let tag = store.open(system)?;
    if tag.generation != SchemaGeneration::Legacy {
        debug!("{} already uses materials, nothing to capture", system);
        return Ok(Vec::new());
    }

    let count = tag.block_count("Block:decals")?;
    let mut settings = Vec::with_capacity(count);
    for i in 0..count {
        let mut decal = match read_legacy_decal(&tag, i) {
            Ok(decal) => decal,
            Err(e) => {
                diagnostics.warn(
                    "decal",
                    format!("could not read decal {} of {}: {}", i, system, e),
                );
                break;
            }
        };
        if let Some(base) = decal.base_ref.clone() {
            match read_bitmap_size(store, &base) {
                Ok((width, height)) => decal.scale_xy = Some(aspect_scale(width, height)),
                Err(e) => diagnostics.warn(
                    "decal",
                    format!("could not size base map {} of {}: {}", base, system, e),
                ),
            }
        }
        settings.push(decal);
    }
    Ok(settings)
}

fn read_legacy_decal(tag: &TagDocument, i: usize) -> Result<DecalMaterialSettings> {
    let shader = format!("Block:decals[{}]/Struct:actual shader?", i);
    let option = |slot: usize| -> Result<i64> {
        let options = format!("{}/Block:options", shader);
        if slot >= tag.block_count(&options)? {
            return Ok(0);
        }
        tag.integer(&format!("{}[{}]/ShortInteger:short", options, slot))
    };

    let albedo = option(OPTION_ALBEDO)?;
    let bump_mode = option(OPTION_BUMP)?;
    let tint_mode = option(OPTION_TINT)?;
    let mut settings = DecalMaterialSettings {
        blend_mode: option(OPTION_BLEND)?,
        albedo_mode: albedo,
        bump_mode,
        ..Default::default()
    };

    let parameters = format!("{}/Block:parameters", shader);
    for j in 0..tag.block_count(&parameters)? {
        let parameter = format!("{}[{}]", parameters, j);
        let name = tag.string_id(&format!("{}/StringID:parameter name", parameter))?;
        let bitmap = || -> Result<Option<String>> {
            Ok(tag
                .reference(&format!("{}/Reference:bitmap", parameter))?
                .map(|r| r.path.clone()))
        };

        match name {
            "base_map" => settings.base_ref = bitmap()?,
            "alpha_map" if ALPHA_ALBEDO_MODES.contains(&albedo) => settings.alpha_ref = bitmap()?,
            "bump_map" if bump_mode != 0 => settings.bump_ref = bitmap()?,
            "vector_map" if VECTOR_ALBEDO_MODES.contains(&albedo) => {
                settings.vector_ref = bitmap()?
            }
            "tint_color" if tint_mode != 0 => {
                settings.tint_colour = animated_function(tag, &parameter)?.map(|f| f.color)
            }
            "intensity" if tint_mode != 0 => {
                if let Some(function) = animated_function(tag, &parameter)? {
                    settings.tint_intensity = function.value;
                }
            }
            "modulation_factor" if tint_mode != 0 => {
                if let Some(function) = animated_function(tag, &parameter)? {
                    settings.modulation = function.value;
                }
            }
            other => debug!("Ignoring decal {} parameter '{}'", i, other),
        }
    }

    settings.radius = Some(tag.reals_n(&format!("Block:decals[{}]/RealBounds:radius", i))?);
    Ok(settings)
}

fn animated_function(tag: &TagDocument, parameter: &str) -> Result<Option<TagFunction>> {
    let animated = format!("{}/Block:animated parameters", parameter);
    if tag.block_count(&animated)? == 0 {
        return Ok(None);
    }
    let function = tag.function(&format!("{}[0]/Custom:animation function", animated))?;
    Ok(Some(*function))
}

fn read_bitmap_size<S: TagStore>(store: &S, bitmap: &str) -> Result<(i64, i64)> {
    let tag = store.open(&TagReference::new(bitmap, BITMAP_GROUP))?;
    let width = tag.integer("Block:bitmaps[0]/ShortInteger:width")?;
    let height = tag.integer("Block:bitmaps[0]/ShortInteger:height")?;
    Ok((width, height))
}

/// Write material shaders and parameters into a modern decal system.
///
/// Failures are reported to `diagnostics`; the scenario is unaffected.
pub fn apply_material_settings<S: TagStore>(
    store: &S,
    system: &TagReference,
    settings: &[DecalMaterialSettings],
    shader_root: &str,
    diagnostics: &mut Diagnostics,
) {
    if let Err(e) = write_materials(store, system, settings, shader_root, diagnostics) {
        diagnostics.warn("decal", format!("could not write materials to {}: {}", system, e));
    }
}

fn write_materials<S: TagStore>(
    store: &S,
    system: &TagReference,
    settings: &[DecalMaterialSettings],
    shader_root: &str,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let mut tag = store.open(system)?;
    info!("Writing decal materials to {}", system);

    let written = settings
        .iter()
        .enumerate()
        .try_for_each(|(i, s)| write_decal_material(&mut tag, i, s, shader_root, diagnostics));
    // partial edits are kept, like a failed step in the scenario
    let saved = tag.save();
    written?;
    saved
}

fn write_decal_material(
    doc: &mut TagDocument,
    i: usize,
    settings: &DecalMaterialSettings,
    shader_root: &str,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let material = format!("Block:decals[{}]/Struct:actual material?", i);
    let parameters = format!("{}/Block:material parameters", material);
    doc.remove_all_elements(&parameters)?;

    let variant = select_material_variant(settings);
    match variant.shader_path(shader_root) {
        Some(path) => {
            debug!("Decal {} uses {}", i, path);
            doc.set_reference(
                &format!("{}/Reference:material shader", material),
                Some(TagReference::new(path, MATERIAL_SHADER_GROUP)),
            )?;
        }
        None => diagnostics.warn(
            "decal",
            format!("decal {} of {}: no material shader fits its texture set", i, doc.reference),
        ),
    }

    for (name, bitmap) in bitmap_parameters(variant, settings) {
        let p = add_parameter(doc, &parameters, name, PARAMETER_BITMAP)?;
        doc.set_reference(
            &format!("{}/Reference:bitmap", p),
            Some(TagReference::new(bitmap, BITMAP_GROUP)),
        )?;
    }

    doc.set_enum(
        &format!("{}/CharEnum:alpha blend mode", material),
        settings.blend_mode as i32,
    )?;
    if let Some(scale) = settings.scale_xy {
        doc.set_reals(SCALE_OVERRIDE, &scale)?;
    }

    if has_tint(settings) {
        if let Some(colour) = settings.tint_colour.filter(|c| *c != [1.0, 1.0, 1.0]) {
            let p = add_parameter(doc, &parameters, "tint_color", PARAMETER_COLOR)?;
            doc.set_reals(
                &format!("{}/RealArgbColor:color", p),
                &[1.0, colour[0], colour[1], colour[2]],
            )?;
            let functions = format!("{}/Block:function parameters", p);
            let f = doc.add_element(&functions)?;
            doc.set_function(
                &format!("{}[{}]/Custom:function", functions, f),
                TagFunction {
                    color: colour,
                    value: 0.0,
                },
            )?;
        }

        let p = add_parameter(doc, &parameters, "tint_intensity", PARAMETER_REAL)?;
        doc.set_real(&format!("{}/Real:real", p), settings.tint_intensity)?;
        let p = add_parameter(doc, &parameters, "tint_modulation_factor", PARAMETER_REAL)?;
        doc.set_real(&format!("{}/Real:real", p), settings.modulation)?;
    }

    Ok(())
}

/// Whether a decal carries any tint data worth writing
fn has_tint(settings: &DecalMaterialSettings) -> bool {
    settings.tint_colour.is_some() || settings.tint_intensity != 1.0 || settings.modulation != 0.0
}

/// Append a named material parameter and return its element path
fn add_parameter(doc: &mut TagDocument, parameters: &str, name: &str, kind: i32) -> Result<String> {
    let index = doc.add_element(parameters)?;
    let element = format!("{}[{}]", parameters, index);
    doc.set_string_id(&format!("{}/StringID:parameter name", element), name)?;
    doc.set_enum(&format!("{}/LongEnum:parameter type", element), kind)?;
    Ok(element)
}

/// Apply scale normalization for one placement to its decal system and
/// return the scale to write on the placement.
pub fn apply_placement_scale<S: TagStore>(
    store: &S,
    system: &TagReference,
    placement: [f32; 2],
    captured_radius: Option<[f32; 2]>,
    cache: &mut DecalScaleCache,
) -> Result<[f32; 2]> {
    let mut tag = store.open(system)?;
    let system_override = match cache.get(system) {
        Some(scale) => scale,
        None => {
            let scale = tag.reals_n(SCALE_OVERRIDE)?;
            cache.insert(system, scale);
            scale
        }
    };

    let resolution = resolve_decal_scale(placement, system_override, captured_radius);
    if let Some(scale) = resolution.system_override {
        tag.set_reals(SCALE_OVERRIDE, &scale)?;
    }
    if let Some(radius) = resolution.radius {
        for x in 0..tag.block_count("Block:decals")? {
            tag.set_reals(&format!("Block:decals[{}]/RealBounds:radius", x), &radius)?;
        }
    }
    tag.save()?;

    debug!(
        "Decal scale {:?} -> {:?} via {}",
        placement, resolution.placement_scale, system
    );
    Ok(resolution.placement_scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::new_document;
    use crate::tag::MemoryTagStore;

    fn settings(
        alpha: bool,
        bump: bool,
        vector: bool,
        blend_mode: i64,
    ) -> DecalMaterialSettings {
        DecalMaterialSettings {
            base_ref: Some("decals\\base".into()),
            alpha_ref: alpha.then(|| "decals\\alpha".to_string()),
            bump_ref: bump.then(|| "decals\\bump".to_string()),
            vector_ref: vector.then(|| "decals\\vector".to_string()),
            bump_mode: if bump { 1 } else { 0 },
            albedo_mode: if vector { 8 } else { 0 },
            blend_mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_decision_table_rows() {
        use MaterialVariant::*;
        let cases = [
            (settings(false, false, false, 0), Base),
            (settings(true, false, false, 0), BaseAlpha),
            (settings(false, true, false, 0), BaseNormal),
            (settings(false, true, false, BLEND_MODE_MULTIPLY), Base),
            (settings(true, true, false, 0), BaseAlphaNormal),
            (settings(true, true, false, BLEND_MODE_MULTIPLY), BaseAlpha),
            (settings(false, false, true, 0), VectorAlpha),
            (settings(true, false, true, 0), VectorAlpha),
        ];
        for (input, expected) in cases {
            assert_eq!(select_material_variant(&input), expected, "{:?}", input);
        }
    }

    #[test]
    fn test_decision_table_fallthrough() {
        let mut no_base = settings(true, false, false, 0);
        no_base.base_ref = None;
        assert_eq!(select_material_variant(&no_base), MaterialVariant::Invalid);

        // bump plus vector matches no row
        let both = settings(false, true, true, 0);
        assert_eq!(select_material_variant(&both), MaterialVariant::Invalid);
    }

    #[test]
    fn test_inactive_maps_are_ignored() {
        // bump map present but bump option off
        let mut s = settings(false, true, false, 0);
        s.bump_mode = 0;
        assert_eq!(select_material_variant(&s), MaterialVariant::Base);

        // vector map present but albedo option does not sample it
        let mut s = settings(false, false, true, 0);
        s.albedo_mode = 2;
        assert_eq!(select_material_variant(&s), MaterialVariant::Base);
    }

    #[test]
    fn test_bitmap_parameters_follow_variant() {
        let s = settings(true, true, false, BLEND_MODE_MULTIPLY);
        let variant = select_material_variant(&s);
        assert_eq!(
            bitmap_parameters(variant, &s),
            vec![("color_map", "decals\\base"), ("alpha_map", "decals\\alpha")]
        );

        let s = settings(false, false, true, 0);
        assert_eq!(
            bitmap_parameters(select_material_variant(&s), &s),
            vec![("color_map", "decals\\base"), ("vector_map", "decals\\vector")]
        );

        let mut s = settings(true, false, false, 0);
        s.base_ref = None;
        assert!(bitmap_parameters(MaterialVariant::Invalid, &s).is_empty());
    }

    #[test]
    fn test_shader_path() {
        assert_eq!(
            MaterialVariant::BaseAlphaNormal.shader_path(DEFAULT_MATERIAL_SHADER_ROOT),
            Some("shaders\\material_shaders\\pepper\\decal_base_alpha_normal".to_string())
        );
        assert_eq!(MaterialVariant::Invalid.shader_path("x"), None);
    }

    #[test]
    fn test_aspect_scale() {
        assert_eq!(aspect_scale(256, 512), [0.5, 1.0]);
        assert_eq!(aspect_scale(512, 128), [1.0, 0.25]);
        assert_eq!(aspect_scale(64, 64), [1.0, 1.0]);
        assert_eq!(aspect_scale(0, 0), [1.0, 1.0]);
    }

    #[test]
    fn test_scale_neutrality() {
        let radius = Some([0.3, 0.7]);
        for neutral in [[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0]] {
            let r = resolve_decal_scale(neutral, [0.5, 2.0], radius);
            assert_eq!(r.radius, radius);
            assert_eq!(r.placement_scale, [0.5, 2.0]);
            assert_eq!(r.system_override, None);
        }

        let r = resolve_decal_scale([2.0, 1.5], [0.5, 2.0], radius);
        assert_eq!(r.radius, Some([1.0, 1.0]));
        assert_eq!(r.system_override, Some([1.0, 1.0]));
        assert_eq!(r.placement_scale, [2.0, 1.5]);
    }

    fn modern_decal_system(store: &MemoryTagStore, path: &str, decals: usize) -> TagReference {
        let reference = TagReference::new(path, "decal_system");
        let mut doc = new_document(reference.clone(), SchemaGeneration::Modern).unwrap();
        for _ in 0..decals {
            doc.add_element("Block:decals").unwrap();
        }
        store.insert(doc);
        reference
    }

    #[test]
    fn test_apply_materials_with_tint() {
        let store = MemoryTagStore::new();
        let system = modern_decal_system(&store, "decals\\dirt\\dirt", 1);
        let mut diag = Diagnostics::new();

        let mut s = settings(true, true, false, 0);
        s.tint_colour = Some([0.5, 0.25, 1.0]);
        s.tint_intensity = 0.75;
        s.modulation = 0.1;
        s.scale_xy = Some([0.5, 1.0]);

        apply_material_settings(&store, &system, &[s], DEFAULT_MATERIAL_SHADER_ROOT, &mut diag);
        assert!(diag.warnings().is_empty());
        assert_eq!(store.open_tags().count(), 0);

        let doc = store.get(&system).unwrap();
        let material = "Block:decals[0]/Struct:actual material?";
        assert_eq!(
            doc.reference(&format!("{}/Reference:material shader", material))
                .unwrap()
                .unwrap()
                .path,
            "shaders\\material_shaders\\pepper\\decal_base_alpha_normal"
        );
        let params = format!("{}/Block:material parameters", material);
        assert_eq!(doc.block_count(&params).unwrap(), 6);

        let name = |i: usize| {
            doc.string_id(&format!("{}[{}]/StringID:parameter name", params, i))
                .unwrap()
                .to_string()
        };
        assert_eq!(
            (0..6).map(name).collect::<Vec<_>>(),
            vec![
                "color_map",
                "alpha_map",
                "normal_map",
                "tint_color",
                "tint_intensity",
                "tint_modulation_factor"
            ]
        );
        assert_eq!(
            doc.reals(&format!("{}[3]/RealArgbColor:color", params)).unwrap(),
            &[1.0, 0.5, 0.25, 1.0]
        );
        assert_eq!(
            doc.function(&format!("{}[3]/Block:function parameters[0]/Custom:function", params))
                .unwrap()
                .color,
            [0.5, 0.25, 1.0]
        );
        assert_eq!(doc.enum_value(&format!("{}[4]/LongEnum:parameter type", params)).unwrap(), 1);
        assert_eq!(doc.real(&format!("{}[4]/Real:real", params)).unwrap(), 0.75);
        assert_eq!(doc.reals(SCALE_OVERRIDE).unwrap(), &[0.5, 1.0]);
    }

    #[test]
    fn test_white_tint_skips_colour() {
        let store = MemoryTagStore::new();
        let system = modern_decal_system(&store, "decals\\plain", 1);
        let mut diag = Diagnostics::new();

        let mut s = settings(false, false, false, 0);
        s.tint_colour = Some([1.0, 1.0, 1.0]);
        apply_material_settings(&store, &system, &[s], DEFAULT_MATERIAL_SHADER_ROOT, &mut diag);

        let doc = store.get(&system).unwrap();
        let params = "Block:decals[0]/Struct:actual material?/Block:material parameters";
        assert_eq!(doc.block_count(params).unwrap(), 3);
        assert_eq!(
            doc.string_id(&format!("{}[1]/StringID:parameter name", params)).unwrap(),
            "tint_intensity"
        );
    }

    #[test]
    fn test_tint_without_colour_is_written() {
        let store = MemoryTagStore::new();
        let system = modern_decal_system(&store, "decals\\glow", 1);
        let mut diag = Diagnostics::new();

        let mut s = settings(false, false, false, 0);
        s.tint_intensity = 0.75;
        s.modulation = 0.3;
        apply_material_settings(&store, &system, &[s], DEFAULT_MATERIAL_SHADER_ROOT, &mut diag);

        let doc = store.get(&system).unwrap();
        let params = "Block:decals[0]/Struct:actual material?/Block:material parameters";
        assert_eq!(doc.block_count(params).unwrap(), 3);
        assert_eq!(
            doc.string_id(&format!("{}[1]/StringID:parameter name", params)).unwrap(),
            "tint_intensity"
        );
        assert_eq!(doc.real(&format!("{}[1]/Real:real", params)).unwrap(), 0.75);
        assert_eq!(doc.real(&format!("{}[2]/Real:real", params)).unwrap(), 0.3);

        // untinted decals get only their bitmaps
        let plain = modern_decal_system(&store, "decals\\plain", 1);
        let s = settings(false, false, false, 0);
        apply_material_settings(&store, &plain, &[s], DEFAULT_MATERIAL_SHADER_ROOT, &mut diag);
        let doc = store.get(&plain).unwrap();
        assert_eq!(doc.block_count(params).unwrap(), 1);
    }

    #[test]
    fn test_capture_keeps_readable_decals() {
        let store = MemoryTagStore::new();
        let system = TagReference::new("decals\\scorch", "decal_system");
        let mut doc = new_document(system.clone(), SchemaGeneration::Legacy).unwrap();
        for i in 0..2 {
            doc.add_element("Block:decals").unwrap();
            doc.set_reals(&format!("Block:decals[{}]/RealBounds:radius", i), &[0.2, 0.4])
                .unwrap();
        }
        doc.block_mut("Block:decals").unwrap().elements[1]
            .fields
            .retain(|f| f.name != "radius");
        store.insert(doc);

        let mut diag = Diagnostics::new();
        let captured = capture_settings(&store, &system, &mut diag);
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].radius, Some([0.2, 0.4]));
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(store.open_tags().count(), 0);
    }

    #[test]
    fn test_invalid_variant_is_not_fatal() {
        let store = MemoryTagStore::new();
        let system = modern_decal_system(&store, "decals\\broken", 1);
        let mut diag = Diagnostics::new();

        let s = settings(false, true, true, 0);
        apply_material_settings(&store, &system, &[s], DEFAULT_MATERIAL_SHADER_ROOT, &mut diag);

        assert_eq!(diag.warnings().len(), 1);
        let doc = store.get(&system).unwrap();
        let material = "Block:decals[0]/Struct:actual material?";
        assert_eq!(doc.reference(&format!("{}/Reference:material shader", material)).unwrap(), None);
        assert_eq!(
            doc.block_count(&format!("{}/Block:material parameters", material)).unwrap(),
            1
        );
    }

    #[test]
    fn test_missing_decal_system_is_soft() {
        let store = MemoryTagStore::new();
        let mut diag = Diagnostics::new();
        let missing = TagReference::new("decals\\gone", "decal_system");

        apply_material_settings(
            &store,
            &missing,
            &[settings(false, false, false, 0)],
            DEFAULT_MATERIAL_SHADER_ROOT,
            &mut diag,
        );
        assert!(capture_settings(&store, &missing, &mut diag).is_empty());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn test_placement_scale_uses_first_override() {
        let store = MemoryTagStore::new();
        let system = modern_decal_system(&store, "decals\\stripe", 2);
        {
            let mut tag = store.open(&system).unwrap();
            tag.set_reals(SCALE_OVERRIDE, &[0.5, 1.0]).unwrap();
            tag.save().unwrap();
        }
        let mut cache = DecalScaleCache::default();
        let radius = Some([0.2, 0.4]);

        let first = apply_placement_scale(&store, &system, [1.0, 1.0], radius, &mut cache).unwrap();
        assert_eq!(first, [0.5, 1.0]);
        let doc = store.get(&system).unwrap();
        assert_eq!(doc.reals("Block:decals[1]/RealBounds:radius").unwrap(), &[0.2, 0.4]);

        let second = apply_placement_scale(&store, &system, [2.0, 1.5], radius, &mut cache).unwrap();
        assert_eq!(second, [2.0, 1.5]);
        let doc = store.get(&system).unwrap();
        assert_eq!(doc.reals(SCALE_OVERRIDE).unwrap(), &[1.0, 1.0]);
        assert_eq!(doc.reals("Block:decals[0]/RealBounds:radius").unwrap(), &[1.0, 1.0]);

        // the override forced above does not leak into later neutral placements
        let third = apply_placement_scale(&store, &system, [0.0, 0.0], radius, &mut cache).unwrap();
        assert_eq!(third, [0.5, 1.0]);
        assert_eq!(store.open_tags().count(), 0);
    }
}
