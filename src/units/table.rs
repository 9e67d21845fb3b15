use std::collections::BTreeSet;

use ahash::AHashMap;
use anyhow::{Result, bail};
use geo::{Coord, MultiPolygon, Rect};

use crate::{geom::Geometries, raster::DEFAULT_EPSG, units::AdminUnit};

/// The unit table shared by every pipeline stage: one row per admin unit,
/// indexed by id. Rows are reordered but never added or removed.
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: Vec<AdminUnit>,
    index: AHashMap<i64, usize>,
    epsg: Option<u32>,
    population_field: Option<String>,
}

impl UnitTable {
    /// Build a table from units with unique ids.
    pub fn new(units: Vec<AdminUnit>, epsg: Option<u32>) -> Result<Self> {
        let mut index = AHashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            if index.insert(unit.id(), i).is_some() {
                bail!("[units::table] Duplicate unit id {}", unit.id());
            }
        }
        Ok(Self { units, index, epsg, population_field: None })
    }

    #[inline] pub fn len(&self) -> usize { self.units.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.units.is_empty() }

    /// Units in their current order.
    #[inline] pub fn units(&self) -> &[AdminUnit] { &self.units }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &AdminUnit> { self.units.iter() }

    #[inline] pub(crate) fn units_mut(&mut self) -> &mut [AdminUnit] { &mut self.units }

    /// Row position of the unit with the given id.
    #[inline] pub fn position(&self, id: i64) -> Option<usize> { self.index.get(&id).copied() }

    #[inline] pub fn get(&self, id: i64) -> Option<&AdminUnit> { self.position(id).map(|i| &self.units[i]) }

    /// EPSG code of the geometries, defaulting to 4326.
    #[inline] pub fn epsg(&self) -> u32 { self.epsg.unwrap_or(DEFAULT_EPSG) }

    /// Name of the population attribute, if one has been joined.
    #[inline] pub fn population_field(&self) -> Option<&str> { self.population_field.as_deref() }

    #[inline]
    pub(crate) fn set_population_field(&mut self, name: &str) {
        self.population_field = Some(name.to_string());
    }

    /// Number of distinct labels (clusters) in the table.
    pub fn distinct_labels(&self) -> usize {
        self.units.iter().map(|u| u.label()).collect::<BTreeSet<_>>().len()
    }

    /// Sum of population over all units, missing values counting as zero.
    pub fn total_population(&self) -> f64 {
        self.units.iter().map(|u| u.population().unwrap_or(0.0)).sum()
    }

    /// Final label of every unit, keyed by id.
    pub fn labels(&self) -> AHashMap<i64, i64> {
        self.units.iter().map(|u| (u.id(), u.label())).collect()
    }

    /// Bounding rectangle of all non-empty geometries.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        use geo::BoundingRect;
        self.units.iter()
            .filter_map(|u| u.geometry().bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
    }

    /// Spatial index over the geometries, in current row order.
    pub(crate) fn geometries(&self) -> Geometries {
        let shapes: Vec<MultiPolygon<f64>> = self.units.iter().map(|u| u.geometry().clone()).collect();
        Geometries::new(&shapes)
    }

    /// Reorder rows so that row `i` becomes the former row `order[i]`.
    pub(crate) fn reorder(&mut self, order: &[usize]) {
        assert!(order.len() == self.units.len(), "order.len() must equal the number of units");
        let mut slots: Vec<Option<AdminUnit>> = std::mem::take(&mut self.units).into_iter().map(Some).collect();
        self.units = order.iter()
            .map(|&i| slots[i].take().expect("order must be a permutation"))
            .collect();
        self.index = self.units.iter().enumerate().map(|(i, u)| (u.id(), i)).collect();
    }

    /// Restore every unit to its pre-pairing state.
    pub(crate) fn reset_pairing(&mut self) {
        self.units.iter_mut().for_each(AdminUnit::reset_pairing);
    }
}
