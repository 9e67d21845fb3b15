use anyhow::{Context, Result};

use crate::{
    aggregate::DissolvedTable,
    raster::{Raster, RasterGrid, scanline},
};

/// Burn each dissolved unit's label into a raster congruent with `template`.
///
/// Cells whose centre is not covered keep the template's nodata value.
/// Overlapping geometries resolve to the last one written.
pub fn rasterize(dissolved: &DissolvedTable, template: &RasterGrid) -> Result<Raster<i64>> {
    let nodata = template.nodata
        .filter(|v| v.fract() == 0.0)
        .context("[raster::rasterize] Template raster needs an integral nodata value")?;

    let mut raster = Raster::filled(template.clone(), nodata as i64);
    let mut burned = 0usize;
    for unit in dissolved.iter() {
        scanline::for_each_covered_run(template, &unit.geometry, |row, cols| {
            burned += cols.len();
            for col in cols {
                raster.set(row, col, unit.label);
            }
        });
    }

    log::debug!("[raster::rasterize] Burned {} labels into {burned} of {} cells",
        dissolved.len(), template.cell_count());
    Ok(raster)
}
