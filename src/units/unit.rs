use geo::MultiPolygon;

/// One administrative unit: a polygon identified by its raster value,
/// its population attributes and its pairing state.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUnit {
    id: i64,
    geometry: MultiPolygon<f64>,
    pub(crate) population: Option<f64>,
    pub(crate) area: f64,
    pub(crate) density: f64,
    pub(crate) label: i64,
    pub(crate) paired: bool,
}

impl AdminUnit {
    /// A fresh, unclaimed unit with no population.
    pub fn new(id: i64, geometry: MultiPolygon<f64>) -> Self {
        Self { id, geometry, population: None, area: 0.0, density: 0.0, label: id, paired: false }
    }

    pub fn with_population(mut self, population: Option<f64>) -> Self {
        self.population = population;
        self
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    #[inline] pub fn id(&self) -> i64 { self.id }

    #[inline] pub fn geometry(&self) -> &MultiPolygon<f64> { &self.geometry }

    #[inline] pub fn population(&self) -> Option<f64> { self.population }

    #[inline] pub fn area(&self) -> f64 { self.area }

    #[inline] pub fn density(&self) -> f64 { self.density }

    /// Representative id of the cluster this unit belongs to.
    #[inline] pub fn label(&self) -> i64 { self.label }

    #[inline] pub fn paired(&self) -> bool { self.paired }

    /// Whether the unit can still start or receive a pairing.
    #[inline] pub fn is_unclaimed(&self) -> bool { self.label == self.id && !self.paired }

    /// Restore the pre-pairing state (`label = id`, `paired = false`).
    #[inline]
    pub(crate) fn reset_pairing(&mut self) {
        self.label = self.id;
        self.paired = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_unit_is_unclaimed() {
        let unit = AdminUnit::new(7, MultiPolygon(Vec::new())).with_area(2.0);
        assert_eq!(unit.label(), 7);
        assert!(unit.is_unclaimed());
        assert_eq!(unit.population(), None);
        assert_eq!(unit.area(), 2.0);
    }

    #[test]
    fn reset_clears_pairing_state() {
        let mut unit = AdminUnit::new(3, MultiPolygon(Vec::new()));
        unit.label = 9;
        unit.paired = true;
        assert!(!unit.is_unclaimed());

        unit.reset_pairing();
        assert!(unit.is_unclaimed());
    }
}
