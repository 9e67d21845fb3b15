use std::collections::BTreeMap;

use anyhow::Result;
use geo::MultiPolygon;

use crate::units::{AdminUnit, UnitTable};

/// One aggregated unit: the union of all units sharing a label.
#[derive(Debug, Clone, PartialEq)]
pub struct DissolvedUnit {
    pub label: i64,
    pub geometry: MultiPolygon<f64>,
    /// Summed population of the members (missing or NaN counts as zero).
    pub population: f64,
    pub area: f64,
    /// Number of units merged into this one.
    pub members: usize,
}

/// Dissolved units, one per label, ordered by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DissolvedTable {
    units: Vec<DissolvedUnit>,
    epsg: Option<u32>,
    population_field: Option<String>,
}

impl DissolvedTable {
    #[inline] pub fn len(&self) -> usize { self.units.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.units.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &DissolvedUnit> { self.units.iter() }

    pub fn get(&self, label: i64) -> Option<&DissolvedUnit> {
        self.units.binary_search_by_key(&label, |u| u.label).ok().map(|i| &self.units[i])
    }

    #[inline] pub fn epsg(&self) -> u32 { self.epsg.unwrap_or(crate::raster::DEFAULT_EPSG) }

    #[inline] pub fn population_field(&self) -> Option<&str> { self.population_field.as_deref() }

    /// Labels in ascending order.
    pub fn labels(&self) -> Vec<i64> { self.units.iter().map(|u| u.label).collect() }

    pub fn total_population(&self) -> f64 { self.units.iter().map(|u| u.population).sum() }

    /// View the dissolved units as a fresh unit table keyed by label.
    pub fn to_unit_table(&self) -> Result<UnitTable> {
        let units = self.units.iter()
            .map(|u| AdminUnit::new(u.label, u.geometry.clone())
                .with_population(Some(u.population))
                .with_area(u.area))
            .collect();
        let mut table = UnitTable::new(units, self.epsg)?;
        if let Some(field) = &self.population_field {
            table.set_population_field(field);
        }
        Ok(table)
    }
}

/// Union the geometries of all units sharing a final label.
pub fn dissolve(table: &UnitTable) -> DissolvedTable {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (row, unit) in table.iter().enumerate() {
        groups.entry(unit.label()).or_default().push(row);
    }

    let geometries = table.geometries();
    let units: Vec<DissolvedUnit> = groups.into_iter()
        .map(|(label, rows)| DissolvedUnit {
            label,
            geometry: geometries.union_of(&rows),
            population: rows.iter().map(|&r| table.units()[r].population().filter(|p| p.is_finite()).unwrap_or(0.0)).sum(),
            area: rows.iter().map(|&r| table.units()[r].area()).sum(),
            members: rows.len(),
        })
        .collect();

    log::info!("[aggregate::dissolve] Dissolved {} units into {}", table.len(), units.len());
    DissolvedTable {
        units,
        epsg: Some(table.epsg()),
        population_field: table.population_field().map(str::to_string),
    }
}
