use crate::{
    aggregate::{DissolvedTable, dissolve},
    units::UnitTable,
};

/// Apply the labels of `unconstrained` to a second polygonization of the same
/// ids, then dissolve it. Ids missing from `unconstrained` keep their own label.
pub fn aggr_constrained(unconstrained: &UnitTable, constrained: &mut UnitTable) -> DissolvedTable {
    let labels = unconstrained.labels();
    let mut orphans = 0usize;
    for unit in constrained.units_mut() {
        unit.label = match labels.get(&unit.id()) {
            Some(&label) => label,
            None => { orphans += 1; unit.id() }
        };
    }
    if orphans > 0 {
        log::warn!("[aggregate::constrained] {orphans} constrained units have no unconstrained counterpart");
    }
    dissolve(constrained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::AdminUnit;
    use geo::{MultiPolygon, Rect, coord};

    fn cell(col: f64, width: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new(coord! { x: col, y: 0.0 }, coord! { x: col + width, y: 1.0 }).to_polygon()])
    }

    #[test]
    fn constrained_units_follow_unconstrained_labels() {
        let mut unconstrained = UnitTable::new(vec![
            AdminUnit::new(1, cell(0.0, 1.0)),
            AdminUnit::new(2, cell(1.0, 1.0)),
        ], None).unwrap();
        unconstrained.units_mut()[1].label = 1;

        // built-up parts only: narrower, not touching
        let mut constrained = UnitTable::new(vec![
            AdminUnit::new(1, cell(0.0, 0.5)),
            AdminUnit::new(2, cell(1.5, 0.5)),
            AdminUnit::new(4, cell(3.0, 0.5)),
        ], None).unwrap();

        let dissolved = aggr_constrained(&unconstrained, &mut constrained);

        assert_eq!(dissolved.labels(), vec![1, 4]);
        let merged = dissolved.get(1).unwrap();
        assert_eq!(merged.members, 2);
        assert_eq!(merged.geometry.0.len(), 2);
    }
}
