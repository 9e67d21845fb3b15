use anyhow::{Result, bail};
use geo::Intersects;

use crate::{
    raster::{self, Raster},
    units::UnitTable,
};

/// Population per unit area, with degenerate results normalised to zero.
#[inline]
fn density(population: f64, area: f64) -> f64 {
    let d = population / area;
    if d.is_finite() { d } else { 0.0 }
}

/// Fill `area` (zonal sum of `area_raster` over each unit) and `density`.
///
/// Missing or non-finite population becomes zero and pairing state is reset.
/// The raster must share the table's coordinate system and overlap its extent.
pub fn compute_density(table: &mut UnitTable, area_raster: &Raster<f64>) -> Result<()> {
    let grid = area_raster.grid();
    if grid.epsg() != table.epsg() {
        bail!("[units::density] Area raster is EPSG:{} but units are EPSG:{}", grid.epsg(), table.epsg());
    }
    if let Some(bounds) = table.bounds() {
        if !bounds.intersects(&grid.bounds()) {
            bail!("[units::density] Area raster extent {:?} does not overlap unit extent {:?}", grid.bounds(), bounds);
        }
    }

    let mut degenerate = 0usize;
    for unit in table.units_mut() {
        let population = unit.population.filter(|p| p.is_finite()).unwrap_or(0.0);
        unit.population = Some(population);
        unit.area = raster::zonal_sum(area_raster, unit.geometry());
        unit.density = density(population, unit.area);
        degenerate += usize::from(unit.area <= 0.0);
        unit.reset_pairing();
    }

    if degenerate > 0 {
        log::debug!("[units::density] {degenerate} units cover no valid area; their density is 0");
    }
    log::info!("[units::density] Computed density for {} units", table.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{raster::{GeoTransform, RasterGrid}, units::AdminUnit};
    use geo::{MultiPolygon, Rect, coord};

    fn cell(col: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Rect::new(coord! { x: col, y: 0.0 }, coord! { x: col + 1.0, y: 1.0 }).to_polygon()])
    }

    fn area_raster(epsg: u32) -> Raster<f64> {
        let grid = RasterGrid::new(3, 1, GeoTransform::new(0.0, 1.0, 1.0, -1.0))
            .with_nodata(-1.0)
            .with_epsg(epsg);
        Raster::new(grid, vec![2.0, 4.0, -1.0])
    }

    fn table() -> UnitTable {
        UnitTable::new(vec![
            AdminUnit::new(1, cell(0.0)).with_population(Some(10.0)),
            AdminUnit::new(2, cell(1.0)),
            AdminUnit::new(3, cell(2.0)).with_population(Some(5.0)),
        ], None).unwrap()
    }

    #[test]
    fn density_is_population_over_area() {
        let mut t = table();
        t.units_mut()[0].label = 2;
        t.units_mut()[0].paired = true;

        compute_density(&mut t, &area_raster(4326)).unwrap();

        let u1 = t.get(1).unwrap();
        assert_eq!((u1.area(), u1.density()), (2.0, 5.0));
        assert!(u1.is_unclaimed());

        let u2 = t.get(2).unwrap();
        assert_eq!((u2.population(), u2.density()), (Some(0.0), 0.0));

        // nodata-only coverage: zero area, density normalised to 0
        let u3 = t.get(3).unwrap();
        assert_eq!((u3.area(), u3.density()), (0.0, 0.0));
    }

    #[test]
    fn nan_population_is_zeroed() {
        let mut t = table();
        t.units_mut()[0].population = Some(f64::NAN);
        t.units_mut()[2].population = Some(f64::INFINITY);

        compute_density(&mut t, &area_raster(4326)).unwrap();

        for id in [1, 3] {
            let unit = t.get(id).unwrap();
            assert_eq!((unit.population(), unit.density()), (Some(0.0), 0.0));
        }
    }

    #[test]
    fn crs_mismatch_is_fatal() {
        let err = compute_density(&mut table(), &area_raster(3035)).unwrap_err();
        assert!(err.to_string().contains("EPSG:3035"));
    }

    #[test]
    fn disjoint_extent_is_fatal() {
        let mut far = UnitTable::new(vec![AdminUnit::new(1, cell(100.0))], None).unwrap();
        assert!(compute_density(&mut far, &area_raster(4326)).is_err());
    }

    #[test]
    fn degenerate_densities_are_zero() {
        assert_eq!(density(0.0, 0.0), 0.0);
        assert_eq!(density(3.0, 0.0), 0.0);
        assert_eq!(density(3.0, 1.5), 2.0);
    }
}
