use std::collections::VecDeque;

use ahash::AHashMap;
use anyhow::{Context, Result};

use crate::{
    graph::Graph,
    pairing::{PairingOptions, PairingSummary},
    units::UnitTable,
};

/// Greedily merge each unpaired unit with its first unpaired rook neighbor.
///
/// Units are visited in current row order (densest first after
/// `sort_by_density`), and neighbors are tried in the same order. The pass
/// stops as soon as the number of distinct labels reaches
/// `options.required_count(initial)`. Only `label` and `paired` are modified.
pub fn pair_units(table: &mut UnitTable, options: &PairingOptions) -> Result<PairingSummary> {
    options.validate()?;

    let adjacency = table.geometries().adjacencies()
        .context("[pairing] Failed to compute unit adjacency")?;
    let graph = Graph::new(table.len(), &adjacency);
    let isolated = (0..graph.node_count()).filter(|&node| graph.degree(node) == 0).count();
    log::debug!("[pairing] Adjacency graph has {} nodes, {} edges and {isolated} isolated nodes",
        graph.node_count(), graph.edge_count() / 2);

    let units = table.units_mut();

    let mut label_sizes: AHashMap<i64, usize> = AHashMap::new();
    for unit in units.iter() {
        *label_sizes.entry(unit.label).or_default() += 1;
    }
    let initial_labels = label_sizes.len();
    let required = options.required_count(initial_labels);

    let mut sentinels = 0usize;
    for unit in units.iter_mut().filter(|u| options.excluded.contains(&u.id())) {
        unit.paired = true;
        sentinels += 1;
    }
    if sentinels < options.excluded.len() {
        log::debug!("[pairing] {} excluded ids are not present in the table", options.excluded.len() - sentinels);
    }

    let mut pairs = 0usize;
    let mut queue: VecDeque<usize> = (0..units.len()).collect();
    while let Some(row) = queue.pop_front() {
        if label_sizes.len() <= required { break }

        let unit = &units[row];
        if options.excluded.contains(&unit.id()) || unit.paired { continue }
        let id = unit.id();

        let Some(neighbor) = graph.edges(row).find(|&n| !units[n].paired) else { continue };

        for target in [row, neighbor] {
            let old = std::mem::replace(&mut units[target].label, id);
            units[target].paired = true;
            if let Some(size) = label_sizes.get_mut(&old) {
                *size -= 1;
                if *size == 0 { label_sizes.remove(&old); }
            }
            *label_sizes.entry(id).or_default() += 1;
        }
        pairs += 1;
        log::trace!("[pairing] {} absorbs {}", id, units[neighbor].id());
    }

    let summary = PairingSummary { required, initial_labels, final_labels: label_sizes.len(), pairs };
    if summary.reached_target() {
        log::info!("[pairing] {} pairs reduced {} labels to {} (target {})",
            pairs, initial_labels, summary.final_labels, required);
    } else {
        log::warn!("[pairing] Target of {} labels not reachable; stopped at {} after {} pairs",
            required, summary.final_labels, pairs);
    }
    Ok(summary)
}
