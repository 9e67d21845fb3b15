//! Shapefile reading operations.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use shapefile::{Reader, dbase::{FieldValue, Record}};

use crate::{common, units::{AdminUnit, JoinColumns, UnitTable}};

/// Get the value of a numeric field from a Record, whatever its dBase encoding.
pub(super) fn numeric_field(record: &Record, field: &str) -> Option<f64> {
    match record.get(field)? {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(f) => f.map(f64::from),
        FieldValue::Double(d) => Some(*d),
        FieldValue::Integer(i) => Some(f64::from(*i)),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Guess the EPSG code from an ESRI `.prj` sidecar (WGS 84 only).
fn epsg_from_prj(path: &Path) -> Option<u32> {
    let wkt = fs::read_to_string(path.with_extension("prj")).ok()?;
    let is_wgs84 = wkt.contains("WGS_1984") || wkt.contains("WGS 84");
    if wkt.trim_start().starts_with("GEOGCS") && is_wgs84 {
        Some(4326)
    } else {
        log::warn!("[io::shp::read] Unrecognised projection in {}, assuming EPSG:4326", path.display());
        None
    }
}

/// Loads a unit table (geometries and attributes) from a given .shp file path.
///
/// The id field is `columns.unit_id`; population, `area`, `density` and `label`
/// are picked up when present.
pub fn read_shapefile(path: &Path, columns: &JoinColumns) -> Result<UnitTable> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp::read] Failed to open shapefile: {}", path.display()))?;

    let mut units = Vec::with_capacity(reader.shape_count()?);
    let mut has_population = false;
    for (row, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp::read] Error reading shape+record {row} of {}", path.display()))?;

        let Some(id) = numeric_field(&record, &columns.unit_id) else {
            bail!("[io::shp::read] Missing or invalid '{}' field in record {row}", columns.unit_id)
        };
        let geometry = common::shape_to_multipolygon(shape)
            .with_context(|| format!("[io::shp::read] Invalid geometry in record {row}"))?;

        let population = numeric_field(&record, &columns.population);
        has_population |= record.get(&columns.population).is_some();

        let mut unit = AdminUnit::new(id as i64, geometry).with_population(population);
        unit.area = numeric_field(&record, "area").unwrap_or(0.0);
        unit.density = numeric_field(&record, "density").unwrap_or(0.0);
        if let Some(label) = numeric_field(&record, "label") {
            unit.label = label as i64;
        }
        units.push(unit);
    }

    let mut table = UnitTable::new(units, epsg_from_prj(path))
        .with_context(|| format!("[io::shp::read] Invalid unit table in {}", path.display()))?;
    if has_population {
        table.set_population_field(&columns.population);
    }

    log::debug!("[io::shp::read] Read {} units from {}", table.len(), path.display());
    Ok(table)
}
