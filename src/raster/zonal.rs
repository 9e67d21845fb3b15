use geo::MultiPolygon;

use crate::raster::{Raster, scanline};

/// Sum of the valid cells of `raster` whose centres fall inside `shape`.
pub(crate) fn zonal_sum(raster: &Raster<f64>, shape: &MultiPolygon<f64>) -> f64 {
    let width = raster.width();
    let data = raster.data();
    let mut sum = 0.0;
    scanline::for_each_covered_run(raster.grid(), shape, |row, cols| {
        sum += data[row * width + cols.start..row * width + cols.end].iter()
            .filter(|&&v| raster.is_valid(v))
            .sum::<f64>();
    });
    sum
}
