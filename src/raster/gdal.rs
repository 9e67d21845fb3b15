//! GDAL-backed polygonize and rasterize over in-memory datasets.

use std::collections::BTreeMap;

use ::gdal::{
    Dataset, DriverManager,
    cpl::CslStringList,
    raster::GdalType,
    spatial_ref::SpatialRef,
    vector::{FieldValue, LayerAccess, LayerOptions, OGRFieldType, ToGdal},
};
use anyhow::{Context, Result, bail};
use geo::{Geometry, MultiPolygon, Polygon, orient::{Direction, Orient}};

use crate::{
    aggregate::DissolvedTable,
    raster::{Raster, RasterGrid},
    units::{AdminUnit, UnitTable},
};

const VALUE_FIELD: &str = "Value";
const LABEL_FIELD: &str = "label";

fn check_rc(rc: gdal_sys::CPLErr::Type, method: &str) -> Result<()> {
    if rc != gdal_sys::CPLErr::CE_None {
        bail!("[raster::gdal] {method} failed with error code {rc}");
    }
    Ok(())
}

fn geo_transform(grid: &RasterGrid) -> [f64; 6] {
    let t = &grid.transform;
    [t.origin_x, t.pixel_width, 0.0, t.origin_y, 0.0, t.pixel_height]
}

/// Labels as 32-bit cells, the widest integer type `GDALPolygonize` reads losslessly.
fn to_i32(data: &[i64]) -> Result<Vec<i32>> {
    data.iter()
        .map(|&v| i32::try_from(v).with_context(|| format!("[raster::gdal] Label {v} does not fit in 32 bits")))
        .collect()
}

/// In-memory raster dataset whose single band reads and writes `data` directly.
/// `data` must outlive the dataset.
fn create_in_memory_with_data<T: GdalType>(grid: &RasterGrid, data: &mut [T]) -> Result<Dataset> {
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut ds = driver.create("in_mem", grid.width, grid.height, 0)?;

    let mut options = CslStringList::new();
    options.add_string(&format!("DATAPOINTER={:p}", data.as_mut_ptr()))?;
    check_rc(unsafe { gdal_sys::GDALAddBand(ds.c_dataset(), T::gdal_ordinal(), options.as_ptr()) }, "GDALAddBand")?;

    ds.set_geo_transform(&geo_transform(grid))?;
    ds.set_spatial_ref(&SpatialRef::from_epsg(grid.epsg())?)?;
    ds.rasterband(1)?.set_no_data_value(grid.nodata)?;
    Ok(ds)
}

fn create_vector_in_memory() -> Result<Dataset> {
    Ok(DriverManager::get_driver_by_name("Memory")?.create_vector_only("in_mem")?)
}

/// [`polygonize`](crate::raster::polygonize) through `GDALPolygonize`.
///
/// Nodata cells are masked out; the polygons of each value are collected into
/// one multipolygon per unit, ordered by id.
pub fn polygonize_gdal(raster: &Raster<i64>) -> Result<UnitTable> {
    if raster.grid().nodata.is_none() {
        bail!("[raster::gdal] Raster has no nodata value")
    }
    let mut cells = to_i32(raster.data())?;
    let ds = create_in_memory_with_data(raster.grid(), &mut cells)?;
    let band = ds.rasterband(1)?;
    let mask = band.open_mask_band()?;

    let mut vector = create_vector_in_memory()?;
    let srs = ds.spatial_ref()?;
    let mut layer = vector.create_layer(LayerOptions { name: "units", srs: Some(&srs), ..Default::default() })?;
    layer.create_defn_fields(&[(VALUE_FIELD, OGRFieldType::OFTInteger)])?;

    check_rc(unsafe {
        gdal_sys::GDALPolygonize(
            band.c_rasterband(),
            mask.c_rasterband(),
            layer.c_layer(),
            0,
            std::ptr::null_mut(),
            None,
            std::ptr::null_mut(),
        )
    }, "GDALPolygonize")?;

    let mut parts: BTreeMap<i64, Vec<Polygon<f64>>> = BTreeMap::new();
    for feature in layer.features() {
        let id = feature.field_as_integer(0)?
            .context("[raster::gdal] Polygon without a value")?;
        let geometry = feature.geometry()
            .context("[raster::gdal] Feature without geometry")?
            .to_geo()?;
        let entry = parts.entry(id as i64).or_default();
        match geometry {
            Geometry::Polygon(polygon) => entry.push(polygon),
            Geometry::MultiPolygon(multi) => entry.extend(multi.0),
            other => bail!("[raster::gdal] Unexpected geometry {other:?} for value {id}"),
        }
    }

    let units: Vec<AdminUnit> = parts.into_iter()
        .map(|(id, polygons)| AdminUnit::new(id, MultiPolygon(polygons).orient(Direction::Default)))
        .collect();
    log::debug!("[raster::gdal] Polygonized {} units", units.len());
    UnitTable::new(units, raster.grid().epsg)
}

/// Owns a `GDALRasterizeOptions` handle for the duration of one call.
struct RasterizeOptions {
    options: *mut gdal_sys::GDALRasterizeOptions,
}

impl RasterizeOptions {
    fn new(args: &[&str]) -> Result<Self> {
        let mut c_args = CslStringList::new();
        for arg in args {
            c_args.add_string(arg)?;
        }
        let options = unsafe { gdal_sys::GDALRasterizeOptionsNew(c_args.as_ptr(), std::ptr::null_mut()) };
        if options.is_null() {
            bail!("[raster::gdal] Failed to create rasterize options");
        }
        Ok(Self { options })
    }
}

impl Drop for RasterizeOptions {
    fn drop(&mut self) {
        unsafe { gdal_sys::GDALRasterizeOptionsFree(self.options) };
    }
}

/// [`rasterize`](crate::raster::rasterize) through `GDALRasterize`.
///
/// Burns with GDAL's default pixel-centre rule, in label order, so it agrees
/// with the pure-Rust rasterizer cell for cell.
pub fn rasterize_gdal(dissolved: &DissolvedTable, template: &RasterGrid) -> Result<Raster<i64>> {
    let nodata = template.nodata
        .filter(|v| v.fract() == 0.0)
        .context("[raster::gdal] Template raster needs an integral nodata value")?;
    let fill = i32::try_from(nodata as i64)
        .with_context(|| format!("[raster::gdal] Nodata {nodata} does not fit in 32 bits"))?;

    let mut vector = create_vector_in_memory()?;
    let mut layer = vector.create_layer(LayerOptions { name: "dissolved", ..Default::default() })?;
    layer.create_defn_fields(&[(LABEL_FIELD, OGRFieldType::OFTInteger64)])?;
    for unit in dissolved.iter() {
        layer.create_feature_fields(
            unit.geometry.to_gdal()?,
            &[LABEL_FIELD],
            &[FieldValue::Integer64Value(unit.label)],
        )?;
    }

    let mut cells = vec![fill; template.cell_count()];
    {
        let mut target = create_in_memory_with_data(template, &mut cells)?;
        let options = RasterizeOptions::new(&["-a", LABEL_FIELD])?;
        let mut usage_error: std::ffi::c_int = 0;
        let handle = unsafe {
            gdal_sys::GDALRasterize(
                std::ptr::null(),
                target.c_dataset(),
                vector.c_dataset(),
                options.options,
                &mut usage_error,
            )
        };
        if handle.is_null() || usage_error != 0 {
            bail!("[raster::gdal] GDALRasterize failed");
        }
        target.flush_cache()?;
    }

    log::debug!("[raster::gdal] Burned {} labels into {} cells", dissolved.len(), template.cell_count());
    Ok(Raster::new(template.clone(), cells.into_iter().map(i64::from).collect()))
}
