//! GeoTIFF writing operations.

use std::{fs::File, io::{BufWriter, Seek, Write}, path::Path};

use anyhow::{Context, Result};
use tiff::{
    encoder::{DirectoryEncoder, TiffEncoder, TiffKind, colortype::ColorType, compression::Lzw},
    tags::{PhotometricInterpretation, SampleFormat, Tag},
};

use crate::raster::{Raster, RasterGrid};

/// Single-channel signed 32-bit samples.
pub(crate) struct GrayI32;

impl ColorType for GrayI32 {
    type Inner = i32;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[32];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Int];
}

/// Write `raster` to `path` as an LZW-compressed signed 32-bit GeoTIFF.
/// Fails before creating the file if any cell does not fit in i32 or the EPSG
/// code does not fit in a GeoKey.
pub(crate) fn write_raster_i32(path: &Path, raster: &Raster<i64>) -> Result<()> {
    let epsg = u16::try_from(raster.grid().epsg())
        .with_context(|| format!("[io::tiff::write] EPSG:{} does not fit in a GeoKey", raster.grid().epsg()))?;
    let data = raster.data().iter()
        .map(|&v| i32::try_from(v)
            .with_context(|| format!("[io::tiff::write] Cell value {v} does not fit in a 32-bit raster")))
        .collect::<Result<Vec<i32>>>()?;

    let file = File::create(path)
        .with_context(|| format!("[io::tiff::write] Failed to create raster: {}", path.display()))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = encoder.new_image_with_compression::<GrayI32, _>(
        raster.width() as u32,
        raster.height() as u32,
        Lzw::default(),
    )?;

    write_georeference(image.encoder(), raster.grid(), epsg)?;
    image.write_data(&data)
        .with_context(|| format!("[io::tiff::write] Failed to write raster data: {}", path.display()))?;

    log::debug!("[io::tiff::write] Wrote {}x{} raster to {}", raster.width(), raster.height(), path.display());
    Ok(())
}

/// Write ModelPixelScale, ModelTiepoint, GDAL nodata and GeoKey tags.
fn write_georeference<W: Write + Seek, K: TiffKind>(dir: &mut DirectoryEncoder<'_, W, K>, grid: &RasterGrid, epsg: u16) -> Result<()> {
    let t = &grid.transform;
    let pixel_scale = [t.pixel_width.abs(), t.pixel_height.abs(), 0.0];
    dir.write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;

    let tie_points = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    dir.write_tag(Tag::ModelTiepointTag, &tie_points[..])?;

    if let Some(nodata) = grid.nodata {
        dir.write_tag(Tag::GdalNodata, nodata.to_string().as_str())?;
    }

    let (model_type, crs_key) = if is_geographic(grid.epsg()) { (2, 2048) } else { (1, 3072) };
    let geo_keys: [u16; 16] = [
        1, 1, 0, 3,                 // version, revision, minor, key count
        1024, 0, 1, model_type,     // GTModelTypeGeoKey
        1025, 0, 1, 1,              // GTRasterTypeGeoKey = PixelIsArea
        crs_key, 0, 1, epsg,
    ];
    dir.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;
    Ok(())
}

/// Geographic (lon/lat) EPSG codes live in the 4000 range.
fn is_geographic(epsg: u32) -> bool {
    (4000..5000).contains(&epsg)
}
