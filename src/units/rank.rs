use crate::units::UnitTable;

/// Stable sort by density, densest first, and reset every unit to unclaimed.
pub fn sort_by_density(table: &mut UnitTable) {
    let mut order: Vec<usize> = (0..table.len()).collect();
    let units = table.units();
    order.sort_by(|&a, &b| units[b].density().total_cmp(&units[a].density()));

    table.reorder(&order);
    table.reset_pairing();
    log::debug!("[units::rank] Ranked {} units by density", table.len());
}
