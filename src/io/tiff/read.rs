//! GeoTIFF reading operations.

use std::{fs::File, io::{BufReader, Read, Seek}, path::Path};

use anyhow::{Context, Result, bail, ensure};
use tiff::{ColorType, decoder::{Decoder, DecodingResult, Limits}, tags::Tag};

use crate::raster::{GeoTransform, Raster, RasterGrid};

const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;
const USER_DEFINED_GEO_KEY_VALUE: u16 = 32767;

/// Open `path` and decode its georeferencing and single band of samples.
fn read_geotiff(path: &Path) -> Result<(RasterGrid, DecodingResult)> {
    let file = File::open(path)
        .with_context(|| format!("[io::tiff::read] Failed to open raster: {}", path.display()))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .with_context(|| format!("[io::tiff::read] Not a TIFF file: {}", path.display()))?
        .with_limits(Limits::unlimited());

    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => bail!("[io::tiff::read] Only single-band rasters are supported, {} is {:?}", path.display(), other),
    }

    let (width, height) = decoder.dimensions()?;
    let transform = read_geo_transform(&mut decoder)
        .with_context(|| format!("[io::tiff::read] Missing georeferencing in {}", path.display()))?;

    let mut grid = RasterGrid::new(width as usize, height as usize, transform);
    grid.nodata = read_nodata(&mut decoder);
    grid.epsg = read_epsg(&mut decoder);

    let samples = decoder.read_image()
        .with_context(|| format!("[io::tiff::read] Failed to decode raster data: {}", path.display()))?;

    log::debug!("[io::tiff::read] {} is {}x{}, nodata {:?}, epsg {:?}",
        path.display(), grid.width, grid.height, grid.nodata, grid.epsg);

    Ok((grid, samples))
}

/// Derive a north-up transform from ModelPixelScale + ModelTiepoint, or ModelTransformation.
fn read_geo_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let (Ok(scale), Ok(tie)) = (
        decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag),
        decoder.get_tag_f64_vec(Tag::ModelTiepointTag),
    ) {
        ensure!(scale.len() >= 2, "ModelPixelScale must have at least 2 values");
        ensure!(tie.len() >= 6, "ModelTiepoint must have 6 values");
        ensure!(scale[0] != 0.0 && scale[1] != 0.0, "ModelPixelScale has a zero cell size");
        return Ok(GeoTransform::new(
            tie[3] - tie[0] * scale[0],
            tie[4] + tie[1] * scale[1],
            scale[0],
            -scale[1],
        ));
    }

    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        ensure!(m.len() >= 8, "ModelTransformation must have 16 values");
        ensure!(m[1] == 0.0 && m[4] == 0.0, "Rotated rasters are not supported");
        return Ok(GeoTransform::new(m[3], m[7], m[0], m[5]));
    }

    bail!("neither ModelPixelScale/ModelTiepoint nor ModelTransformation tags are present")
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder.get_tag_ascii_string(Tag::GdalNodata).ok()
        .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse::<f64>().ok())
}

/// EPSG code from inline GeoKeys, preferring the projected system over the geographic one.
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    if keys.len() < 4 { return None }

    let mut geographic = None;
    let mut projected = None;
    for key in keys[4..].chunks_exact(4) {
        // [key id, tag location (0 = inline), count, value]
        if key[1] != 0 || key[3] == USER_DEFINED_GEO_KEY_VALUE { continue }
        match key[0] {
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(key[3] as u32),
            PROJECTED_CS_TYPE_GEO_KEY => projected = Some(key[3] as u32),
            _ => {}
        }
    }
    projected.or(geographic)
}

/// Read a categorical raster; samples must be integral (NaN maps to nodata).
pub(crate) fn read_raster_i64(path: &Path) -> Result<Raster<i64>> {
    let (grid, samples) = read_geotiff(path)?;
    let nodata = grid.nodata.filter(|v| v.fract() == 0.0).map(|v| v as i64);

    let float_to_i64 = |v: f64| -> Result<i64> {
        if v.is_nan() {
            nodata.context("NaN cell in a raster without an integral nodata value")
        } else if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
            Ok(v as i64)
        } else {
            bail!("non-integral cell value {v}")
        }
    };

    let data: Vec<i64> = match samples {
        DecodingResult::U8(v) => v.into_iter().map(i64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(i64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(i64::from).collect(),
        DecodingResult::U64(v) => v.into_iter()
            .map(|x| i64::try_from(x).context("cell value exceeds i64"))
            .collect::<Result<_>>()?,
        DecodingResult::I8(v) => v.into_iter().map(i64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(i64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(i64::from).collect(),
        DecodingResult::I64(v) => v,
        DecodingResult::F32(v) => v.into_iter().map(|x| float_to_i64(f64::from(x))).collect::<Result<_>>()
            .with_context(|| format!("[io::tiff::read] {} is not categorical", path.display()))?,
        DecodingResult::F64(v) => v.into_iter().map(float_to_i64).collect::<Result<_>>()
            .with_context(|| format!("[io::tiff::read] {} is not categorical", path.display()))?,
    };

    Ok(Raster::new(grid, data))
}

/// Read a continuous raster (e.g. pixel areas) as f64.
pub(crate) fn read_raster_f64(path: &Path) -> Result<Raster<f64>> {
    let (grid, samples) = read_geotiff(path)?;

    let data: Vec<f64> = match samples {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    };

    Ok(Raster::new(grid, data))
}
