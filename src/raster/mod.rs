#[cfg(feature = "gdal")]
mod gdal;
mod grid;
mod polygonize;
mod raster;
mod rasterize;
mod scanline;
mod zonal;

use std::path::Path;

use anyhow::Result;

use crate::{common::{self, OverwritePolicy}, io};

pub(crate) use grid::DEFAULT_EPSG;
#[cfg(feature = "gdal")]
pub use self::gdal::{polygonize_gdal, rasterize_gdal};
pub use grid::{GeoTransform, RasterGrid};
pub use polygonize::{polygonize, raster_to_polygon};
pub use raster::Raster;
pub use rasterize::rasterize;
pub(crate) use zonal::zonal_sum;

/// Read a single-band categorical GeoTIFF.
pub fn read_raster(path: &Path) -> Result<Raster<i64>> {
    io::tiff::read_raster_i64(path)
}

/// Read a single-band continuous GeoTIFF (e.g. pixel areas).
pub fn read_area_raster(path: &Path) -> Result<Raster<f64>> {
    io::tiff::read_raster_f64(path)
}

/// Write a label raster as a signed 32-bit GeoTIFF.
/// Returns `false` if the file was left untouched under `SkipIfExists`.
pub fn write_raster(path: &Path, raster: &Raster<i64>, policy: OverwritePolicy) -> Result<bool> {
    if !common::prepare_output(path, policy)? { return Ok(false) }
    io::tiff::write_raster_i32(path, raster)?;
    Ok(true)
}
