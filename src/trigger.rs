//! Trigger volume extraction and injection

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{SectorPoint, TriggerVolume};
use crate::objects::split_resource;
use crate::report::Diagnostics;
use crate::schema::TRIGGER_VOLUME_RESOURCE_GROUP;
use crate::tag::{TagDocument, TagStore};
use crate::utils::format_reals;

const BLOCK: &str = "Block:trigger volumes";
const RESOURCE_FIELD: &str = "trigger volume resource";

/// Read trigger volumes, following the scenario's split resource when set
pub fn extract_from_scenario<S: TagStore>(
    store: &S,
    scenario: &TagDocument,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<TriggerVolume>> {
    if let Some(resource) = split_resource(scenario, RESOURCE_FIELD, TRIGGER_VOLUME_RESOURCE_GROUP)? {
        match store.open(&resource) {
            Ok(doc) => {
                info!("Reading trigger volumes from resource {}", resource);
                return extract(&doc);
            }
            Err(e @ Error::DocumentNotFound(_)) => {
                diagnostics.warn(
                    "trigger volumes",
                    format!("{}, reading the scenario instead", e),
                );
            }
            Err(e) => return Err(e),
        }
    }
    extract(scenario)
}

/// Read every trigger volume of `doc` in block order
pub fn extract(doc: &TagDocument) -> Result<Vec<TriggerVolume>> {
    let count = doc.block_count(BLOCK)?;
    let mut volumes = Vec::with_capacity(count);

    for i in 0..count {
        let at = |field: &str| format!("{}[{}]/{}", BLOCK, i, field);
        let points = at("Block:sector points");
        let mut sector_points = Vec::new();
        for p in 0..doc.block_count(&points)? {
            sector_points.push(SectorPoint {
                position: doc.reals_n(&format!("{}[{}]/RealPoint3d:position", points, p))?,
                normal: doc.reals_n(&format!("{}[{}]/RealEulerAngles2d:normal", points, p))?,
            });
        }

        let volume = TriggerVolume {
            name: doc.string_id(&at("StringID:name"))?.to_string(),
            obj_name_index: doc.block_index(&at("ShortBlockIndex:object name"))?,
            node_index: doc.integer(&at("ShortInteger:runtime node index"))?,
            node_name: doc.string_id(&at("StringID:node name"))?.to_string(),
            volume_type: doc.enum_value(&at("ShortEnum:type"))?,
            forward: doc.reals_n(&at("RealVector3d:forward"))?,
            up: doc.reals_n(&at("RealVector3d:up"))?,
            position: doc.reals_n(&at("RealPoint3d:position"))?,
            extents: doc.reals_n(&at("RealPoint3d:extents"))?,
            z_sink: doc.real(&at("Real:z sink"))?,
            sector_points,
            kill_trig_vol: doc.block_index(&at("ShortBlockIndex:kill trigger volume"))?,
        };
        debug!(
            "trigger volume {} '{}' at {} with {} sector points",
            i,
            volume.name,
            format_reals(&volume.position),
            volume.sector_points.len()
        );
        volumes.push(volume);
    }

    info!("Extracted {} trigger volumes", volumes.len());
    Ok(volumes)
}

/// Replace the trigger volumes of `doc`
pub fn inject(doc: &mut TagDocument, volumes: &[TriggerVolume]) -> Result<()> {
    doc.remove_all_elements(BLOCK)?;

    for volume in volumes {
        let i = doc.add_element(BLOCK)?;
        let at = |field: &str| format!("{}[{}]/{}", BLOCK, i, field);

        doc.set_string_id(&at("StringID:name"), &volume.name)?;
        doc.set_block_index(&at("ShortBlockIndex:object name"), volume.obj_name_index)?;
        doc.set_integer(&at("ShortInteger:runtime node index"), volume.node_index)?;
        doc.set_string_id(&at("StringID:node name"), &volume.node_name)?;
        doc.set_enum(&at("ShortEnum:type"), volume.volume_type)?;
        doc.set_reals(&at("RealVector3d:forward"), &volume.forward)?;
        doc.set_reals(&at("RealVector3d:up"), &volume.up)?;
        doc.set_reals(&at("RealPoint3d:position"), &volume.position)?;
        doc.set_reals(&at("RealPoint3d:extents"), &volume.extents)?;
        doc.set_real(&at("Real:z sink"), volume.z_sink)?;

        let points = at("Block:sector points");
        for point in &volume.sector_points {
            let p = doc.add_element(&points)?;
            doc.set_reals(&format!("{}[{}]/RealPoint3d:position", points, p), &point.position)?;
            doc.set_reals(&format!("{}[{}]/RealEulerAngles2d:normal", points, p), &point.normal)?;
        }

        doc.set_block_index(&at("ShortBlockIndex:kill trigger volume"), volume.kill_trig_vol)?;
        debug!("trigger volume {} '{}'", i, volume.name);
    }

    info!("Wrote {} trigger volumes", volumes.len());
    Ok(())
}
