use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};

use crate::{common::OverwritePolicy, io, units::UnitTable};

/// Column names linking unit polygons to the population table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinColumns {
    /// Unit id attribute on the polygons (and in aggregated outputs).
    pub unit_id: String,
    /// Key column of the population table.
    pub table_id: String,
    /// Population column of the population table.
    pub population: String,
}

impl Default for JoinColumns {
    fn default() -> Self {
        Self {
            unit_id: "adm_id".to_string(),
            table_id: "GID".to_string(),
            population: "P_2020".to_string(),
        }
    }
}

impl JoinColumns {
    /// The column of `df` holding unit ids for re-keying: the unit id column if
    /// present, else the table key.
    pub(crate) fn id_column<'a>(&'a self, df: &DataFrame) -> &'a str {
        if df.get_column_index(&self.unit_id).is_some() { &self.unit_id } else { &self.table_id }
    }
}

/// Left-join population values onto `table`, matching `columns.table_id` to the unit id.
///
/// Existing population values are replaced; units without a matching record get
/// `None`. When the key repeats, the first record wins. Returns the number of
/// matched units.
pub fn join_population(table: &mut UnitTable, df: &DataFrame, columns: &JoinColumns) -> Result<usize> {
    let key = columns.table_id.as_str();
    let pairs = io::csv::id_value_pairs(df, key, &columns.population)
        .context("[units::join] Failed to read population table")?;

    let mut lookup: AHashMap<i64, Option<f64>> = AHashMap::with_capacity(pairs.len());
    let mut duplicates = 0usize;
    for (id, value) in pairs {
        if lookup.contains_key(&id) {
            duplicates += 1;
        } else {
            lookup.insert(id, value);
        }
    }
    if duplicates > 0 {
        log::warn!("[units::join] {duplicates} duplicate '{key}' keys in population table, keeping first occurrence");
    }

    let mut matched = 0usize;
    for unit in table.units_mut() {
        unit.population = lookup.get(&unit.id()).copied().flatten();
        matched += usize::from(lookup.contains_key(&unit.id()));
    }
    table.set_population_field(&columns.population);

    if matched < table.len() {
        log::warn!("[units::join] {} of {} units have no population record", table.len() - matched, table.len());
    }
    log::info!("[units::join] Joined '{}' onto {matched} units", columns.population);
    Ok(matched)
}

/// File-backed join: read units from `shp_path`, join `csv_path`, and
/// overwrite `shp_path` in place with the joined attributes.
pub fn join_population_file(shp_path: &Path, csv_path: &Path, columns: &JoinColumns) -> Result<UnitTable> {
    let mut table = io::read_shapefile(shp_path, columns)?;
    let df = io::csv::read_csv(csv_path)?;
    join_population(&mut table, &df, columns)?;
    io::write_unit_shapefile(&table, shp_path, OverwritePolicy::Overwrite)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::AdminUnit;
    use geo::MultiPolygon;
    use polars::prelude::*;

    fn table() -> UnitTable {
        let units = [0, 1, 2, 3].into_iter()
            .map(|id| AdminUnit::new(id, MultiPolygon(Vec::new())).with_population(Some(99.0)))
            .collect();
        UnitTable::new(units, None).unwrap()
    }

    #[test]
    fn left_join_replaces_population() {
        let mut t = table();
        let df = DataFrame::new(vec![
            Column::new("GID".into(), vec![1i64, 2, 2, 7]),
            Column::new("P_2020".into(), vec![10.0f64, 20.0, 30.0, 70.0]),
        ]).unwrap();

        let matched = join_population(&mut t, &df, &JoinColumns::default()).unwrap();

        assert_eq!(matched, 2);
        assert_eq!(t.get(0).unwrap().population(), None);
        assert_eq!(t.get(1).unwrap().population(), Some(10.0));
        assert_eq!(t.get(2).unwrap().population(), Some(20.0));
        assert_eq!(t.get(3).unwrap().population(), None);
        assert_eq!(t.population_field(), Some("P_2020"));
    }

    #[test]
    fn table_key_wins_over_stale_unit_id_column() {
        let mut t = table();
        let df = DataFrame::new(vec![
            Column::new("adm_id".into(), vec![2i64, 1]),
            Column::new("GID".into(), vec![1i64, 2]),
            Column::new("B_Tot".into(), vec![10.0f64, 20.0]),
        ]).unwrap();
        let columns = JoinColumns { population: "B_Tot".to_string(), ..Default::default() };

        join_population(&mut t, &df, &columns).unwrap();
        assert_eq!(t.get(1).unwrap().population(), Some(10.0));
        assert_eq!(t.get(2).unwrap().population(), Some(20.0));
    }

    #[test]
    fn missing_table_key_is_an_error() {
        let mut t = table();
        let df = DataFrame::new(vec![
            Column::new("adm_id".into(), vec![1i64]),
            Column::new("P_2020".into(), vec![1.0f64]),
        ]).unwrap();
        assert!(join_population(&mut t, &df, &JoinColumns::default()).is_err());
    }

    #[test]
    fn join_columns_deserialize_with_defaults() {
        let columns: JoinColumns = serde_json::from_str(r#"{"population": "B_Tot"}"#).unwrap();
        assert_eq!(columns.table_id, "GID");
        assert_eq!(columns.population, "B_Tot");
    }
}
