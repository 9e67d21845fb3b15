use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use polars::{frame::DataFrame, prelude::*};
use serde::Serialize;

use crate::{
    aggregate,
    common::{self, OverwritePolicy},
    io,
    pairing::{self, PairingSummary},
    pipeline::PipelineOptions,
    raster,
    units,
};

/// One end-to-end aggregation: admin raster, population table and area raster
/// in; aggregated raster, population table and shapefile out.
#[derive(Debug, Clone)]
pub struct AggregateUnits {
    pub admin_raster: PathBuf,
    pub population_table: PathBuf,
    pub area_raster: PathBuf,
    pub out_admin_raster: PathBuf,
    pub out_population_table: PathBuf,
    pub out_admin_shapefile: PathBuf,
    pub options: PipelineOptions,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationReport {
    pub units: usize,
    pub clusters: usize,
    pub pairing: PairingSummary,
    pub population_in: f64,
    pub population_out: f64,
    /// Outputs actually written; ones skipped under `SkipIfExists` are left out.
    pub written: Vec<PathBuf>,
}

impl AggregateUnits {
    /// Name the three outputs `<admin stem>_aggr.{tif,csv,shp}` inside `out_dir`.
    pub fn new(admin_raster: &Path, population_table: &Path, area_raster: &Path, out_dir: &Path, options: PipelineOptions) -> Self {
        let stem = admin_raster.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "admin".to_string());
        Self {
            admin_raster: admin_raster.to_path_buf(),
            population_table: population_table.to_path_buf(),
            area_raster: area_raster.to_path_buf(),
            out_admin_raster: out_dir.join(format!("{stem}_aggr.tif")),
            out_population_table: out_dir.join(format!("{stem}_aggr.csv")),
            out_admin_shapefile: out_dir.join(format!("{stem}_aggr.shp")),
            options,
        }
    }

    /// Where the raw polygonization goes when `save_admin_shape` is set.
    pub fn admin_shape_path(&self) -> PathBuf { self.admin_raster.with_extension("shp") }

    fn outputs(&self) -> Vec<PathBuf> {
        let mut outputs = vec![
            self.out_admin_raster.clone(),
            self.out_population_table.clone(),
            self.out_admin_shapefile.clone(),
        ];
        if self.options.save_admin_shape { outputs.push(self.admin_shape_path()) }
        outputs
    }

    /// Refuse to start if any output would be clobbered under `FailIfExists`.
    fn check_outputs(&self) -> Result<()> {
        if self.options.overwrite != OverwritePolicy::FailIfExists { return Ok(()) }
        for path in self.outputs() {
            if path.exists() {
                bail!("[pipeline] Output already exists: {}", path.display());
            }
        }
        Ok(())
    }

    /// Run every stage in order and persist the outputs.
    pub fn run(&self) -> Result<AggregationReport> {
        let options = &self.options;
        let policy = options.overwrite;
        options.pairing.validate()?;
        self.check_outputs()?;

        let mut written = Vec::new();

        log::info!("[pipeline] Polygonizing {}", self.admin_raster.display());
        let admin = raster::read_raster(&self.admin_raster)?;
        let mut table = raster::polygonize(&admin)?;

        log::info!("[pipeline] Joining population from {}", self.population_table.display());
        let population = io::csv::read_csv(&self.population_table)?;
        units::join_population(&mut table, &population, &options.columns)?;

        log::info!("[pipeline] Computing density from {}", self.area_raster.display());
        let area = raster::read_area_raster(&self.area_raster)?;
        units::compute_density(&mut table, &area)?;

        if options.save_admin_shape {
            let path = self.admin_shape_path();
            if io::write_unit_shapefile(&table, &path, policy)? { written.push(path) }
        }

        log::info!("[pipeline] Pairing {} units", table.len());
        units::sort_by_density(&mut table);
        let summary = pairing::pair_units(&mut table, &options.pairing)?;

        let dissolved = aggregate::dissolve(&table);

        let labels = raster::rasterize(&dissolved, admin.grid())?;
        if raster::write_raster(&self.out_admin_raster, &labels, policy)? {
            written.push(self.out_admin_raster.clone());
        }

        let mut aggregated = aggregate::aggregate_table(&population, &table, &options.columns)?;
        if common::prepare_output(&self.out_population_table, policy)? {
            io::csv::write_csv(&mut aggregated, &self.out_population_table)?;
            written.push(self.out_population_table.clone());
        }

        if io::save_shapefile(&dissolved, &self.out_admin_shapefile, policy)? {
            written.push(self.out_admin_shapefile.clone());
        }

        let report = AggregationReport {
            units: table.len(),
            clusters: dissolved.len(),
            pairing: summary,
            population_in: column_total(&population, &options.columns.population)?,
            population_out: column_total(&aggregated, &options.columns.population)?,
            written,
        };
        log::info!("[pipeline] {} units -> {} clusters, population {} -> {}, {} files written",
            report.units, report.clusters, report.population_in, report.population_out, report.written.len());
        Ok(report)
    }
}

/// Sum of a numeric column, counting nulls and non-finite values as zero.
fn column_total(df: &DataFrame, name: &str) -> Result<f64> {
    let values = df.column(name)
        .with_context(|| format!("[pipeline] Missing column '{name}'"))?
        .cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().flatten().filter(|v| v.is_finite()).sum())
}
