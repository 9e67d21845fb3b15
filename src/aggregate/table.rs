use std::path::Path;

use anyhow::Result;
use polars::{frame::DataFrame, prelude::*};

use crate::{
    common::{self, OverwritePolicy},
    io,
    units::{JoinColumns, UnitTable},
};

/// Re-key population records by final label and sum them.
///
/// Each record's id (`unit_id` if the table has that column, else `table_id`)
/// is replaced by the label of the unit with that id; records with no unit keep
/// their own id. Missing and NaN populations count as zero. The result has
/// columns `{unit_id, population}`, one row per label, sorted by label.
pub fn aggregate_table(df: &DataFrame, table: &UnitTable, columns: &JoinColumns) -> Result<DataFrame> {
    let key = columns.id_column(df);
    let labels = table.labels();

    let (ids, values): (Vec<i64>, Vec<f64>) = io::csv::id_value_pairs(df, key, &columns.population)?
        .into_iter()
        .map(|(id, value)| (id, value.filter(|v| v.is_finite()).unwrap_or(0.0)))
        .unzip();

    let unmatched = ids.iter().filter(|id| !labels.contains_key(id)).count();
    if unmatched > 0 {
        log::warn!("[aggregate::table] {unmatched} population records have no unit and keep their own id");
    }
    let new_ids: Vec<i64> = ids.into_iter()
        .map(|id| labels.get(&id).copied().unwrap_or(id))
        .collect();

    let unit_id = columns.unit_id.as_str();
    let rekeyed = DataFrame::new(vec![
        Column::new(unit_id.into(), new_ids),
        Column::new(columns.population.as_str().into(), values),
    ])?;

    let aggregated = rekeyed.lazy()
        .group_by([col(unit_id)])
        .agg([col(columns.population.as_str()).sum()])
        .collect()?
        .sort([unit_id], SortMultipleOptions::default())?;

    log::info!("[aggregate::table] Aggregated {} records into {} rows", df.height(), aggregated.height());
    Ok(aggregated)
}

/// File variant of [`aggregate_table`]: read `csv_in`, aggregate, write `csv_out`.
/// Returns `false` if `csv_out` was left untouched under `SkipIfExists`.
pub fn aggr_table(csv_in: &Path, table: &UnitTable, csv_out: &Path, columns: &JoinColumns, policy: OverwritePolicy) -> Result<bool> {
    if !common::prepare_output(csv_out, policy)? { return Ok(false) }

    let df = io::csv::read_csv(csv_in)?;
    let mut aggregated = aggregate_table(&df, table, columns)?;
    io::csv::write_csv(&mut aggregated, csv_out)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::AdminUnit;
    use geo::MultiPolygon;

    fn table() -> UnitTable {
        let mut t = UnitTable::new(
            [0, 1, 2, 3].into_iter().map(|id| AdminUnit::new(id, MultiPolygon(Vec::new()))).collect(),
            None,
        ).unwrap();
        // 1 absorbed 2
        t.units_mut()[2].label = 1;
        t
    }

    fn population() -> DataFrame {
        DataFrame::new(vec![
            Column::new("GID".into(), vec![0i64, 1, 2, 3, 9]),
            Column::new("P_2020".into(), vec![0.0f64, 10.0, 5.0, 7.0, 1.5]),
        ]).unwrap()
    }

    #[test]
    fn population_is_summed_per_label() {
        let out = aggregate_table(&population(), &table(), &JoinColumns::default()).unwrap();

        let ids: Vec<i64> = out.column("adm_id").unwrap().i64().unwrap().into_no_null_iter().collect();
        let pop: Vec<f64> = out.column("P_2020").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(ids, vec![0, 1, 3, 9]);
        assert_eq!(pop, vec![0.0, 15.0, 7.0, 1.5]);
    }

    #[test]
    fn nan_population_counts_as_zero() {
        let df = DataFrame::new(vec![
            Column::new("GID".into(), vec![1i64, 2, 3]),
            Column::new("P_2020".into(), vec![Some(10.0f64), Some(f64::NAN), None]),
        ]).unwrap();
        let out = aggregate_table(&df, &table(), &JoinColumns::default()).unwrap();

        let pop: Vec<f64> = out.column("P_2020").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(pop, vec![10.0, 0.0]);
    }

    #[test]
    fn population_mass_is_conserved() {
        let df = population();
        let out = aggregate_table(&df, &table(), &JoinColumns::default()).unwrap();
        let total_in: f64 = df.column("P_2020").unwrap().f64().unwrap().sum().unwrap();
        let total_out: f64 = out.column("P_2020").unwrap().f64().unwrap().sum().unwrap();
        assert!((total_in - total_out).abs() < 1e-9);
    }
}
