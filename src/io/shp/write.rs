//! Shapefile writing operations.

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow};
use geo::MultiPolygon;
use shapefile::{Writer, dbase::{FieldName, FieldValue, Record, TableWriterBuilder}};

use crate::{
    aggregate::DissolvedTable,
    common::{self, OverwritePolicy},
    units::UnitTable,
};

/// ESRI WKT for WGS 84 lon/lat, written as the `.prj` sidecar.
const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]";

/// A numeric dBase column: name and number of decimal places.
struct NumericField<'a> {
    name: &'a str,
    decimals: u8,
}

/// Write polygon features with numeric attributes; features without rings are skipped.
fn write_features<'a>(
    path: &Path,
    epsg: u32,
    fields: &[NumericField<'_>],
    features: impl Iterator<Item = (&'a MultiPolygon<f64>, Vec<Option<f64>>)>,
) -> Result<usize> {
    let builder = fields.iter().try_fold(TableWriterBuilder::new(), |builder, field| {
        let name = FieldName::try_from(field.name)
            .map_err(|e| anyhow!("[io::shp::write] Invalid dBase field name '{}': {:?}", field.name, e))?;
        let length = if field.decimals == 0 { 18 } else { 24 };
        Ok::<_, anyhow::Error>(builder.add_numeric_field(name, length, field.decimals))
    })?;

    let mut writer = Writer::from_path(path, builder)
        .with_context(|| format!("[io::shp::write] Failed to create shapefile: {}", path.display()))?;

    let mut written = 0;
    for (geometry, values) in features {
        let Some(shape) = common::multipolygon_to_shape(geometry) else {
            log::warn!("[io::shp::write] Skipping feature with empty geometry ({} = {:?})", fields[0].name, values[0]);
            continue
        };

        let mut record = Record::default();
        for (field, value) in fields.iter().zip(values) {
            record.insert(field.name.to_string(), FieldValue::Numeric(value));
        }
        writer.write_shape_and_record(&shape, &record)
            .with_context(|| format!("[io::shp::write] Failed to write feature to {}", path.display()))?;
        written += 1;
    }

    let prj = path.with_extension("prj");
    if epsg == 4326 {
        fs::write(&prj, WGS84_PRJ)
            .with_context(|| format!("[io::shp::write] Failed to write {}", prj.display()))?;
    } else if prj.exists() {
        fs::remove_file(&prj)?;
    }

    Ok(written)
}

/// Persist a unit table with its id, population, area, density and label attributes.
/// Returns `false` if the file was left untouched under `SkipIfExists`.
pub fn write_unit_shapefile(table: &UnitTable, path: &Path, policy: OverwritePolicy) -> Result<bool> {
    if !common::prepare_output(path, policy)? { return Ok(false) }

    let population = table.population_field().unwrap_or("pop");
    let fields = [
        NumericField { name: "adm_id", decimals: 0 },
        NumericField { name: population, decimals: 6 },
        NumericField { name: "area", decimals: 6 },
        NumericField { name: "density", decimals: 6 },
        NumericField { name: "label", decimals: 0 },
    ];

    let written = write_features(path, table.epsg(), &fields, table.iter().map(|unit| (
        unit.geometry(),
        vec![
            Some(unit.id() as f64),
            unit.population(),
            Some(unit.area()),
            Some(unit.density()),
            Some(unit.label() as f64),
        ],
    )))?;

    log::info!("[io::shp::write] Wrote {written} units to {}", path.display());
    Ok(true)
}

/// Persist a dissolved table with `adm_id` = final label.
/// Returns `false` if the file was left untouched under `SkipIfExists`.
pub fn save_shapefile(dissolved: &DissolvedTable, path: &Path, policy: OverwritePolicy) -> Result<bool> {
    if !common::prepare_output(path, policy)? { return Ok(false) }

    let population = dissolved.population_field().unwrap_or("pop");
    let fields = [
        NumericField { name: "adm_id", decimals: 0 },
        NumericField { name: population, decimals: 6 },
        NumericField { name: "area", decimals: 6 },
        NumericField { name: "members", decimals: 0 },
    ];

    let written = write_features(path, dissolved.epsg(), &fields, dissolved.iter().map(|unit| (
        &unit.geometry,
        vec![
            Some(unit.label as f64),
            Some(unit.population),
            Some(unit.area),
            Some(unit.members as f64),
        ],
    )))?;

    log::info!("[io::shp::write] Wrote {written} aggregated units to {}", path.display());
    Ok(true)
}
