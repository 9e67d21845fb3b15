use geo::{Coord, Rect};

/// Default EPSG code for rasters that do not declare one (WGS 84 lon/lat).
pub(crate) const DEFAULT_EPSG: u32 = 4326;

/// North-up affine transform from pixel space (col, row) to world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up rasters.
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Map fractional pixel coordinates to world coordinates.
    #[inline]
    pub fn to_world(&self, col: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + col * self.pixel_width,
            y: self.origin_y + row * self.pixel_height,
        }
    }

    /// Map world coordinates to fractional pixel coordinates (col, row).
    #[inline]
    pub fn to_pixel(&self, coord: Coord<f64>) -> (f64, f64) {
        (
            (coord.x - self.origin_x) / self.pixel_width,
            (coord.y - self.origin_y) / self.pixel_height,
        )
    }
}

/// Raster geometry: size, georeferencing and nodata, without the cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    pub epsg: Option<u32>,
}

impl RasterGrid {
    pub fn new(width: usize, height: usize, transform: GeoTransform) -> Self {
        Self { width, height, transform, nodata: None, epsg: None }
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn with_epsg(mut self, epsg: u32) -> Self {
        self.epsg = Some(epsg);
        self
    }

    #[inline] pub fn cell_count(&self) -> usize { self.width * self.height }

    /// EPSG code, defaulting to 4326 when the file declares none.
    #[inline] pub fn epsg(&self) -> u32 { self.epsg.unwrap_or(DEFAULT_EPSG) }

    /// World-space extent of the grid.
    pub fn bounds(&self) -> Rect<f64> {
        Rect::new(
            self.transform.to_world(0.0, 0.0),
            self.transform.to_world(self.width as f64, self.height as f64),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_round_trip() {
        let t = GeoTransform::new(10.0, 50.0, 0.5, -0.25);
        let c = t.to_world(2.0, 4.0);
        assert_eq!(c, Coord { x: 11.0, y: 49.0 });
        assert_eq!(t.to_pixel(c), (2.0, 4.0));
    }

    #[test]
    fn bounds_are_normalised() {
        let grid = RasterGrid::new(4, 2, GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        let b = grid.bounds();
        assert_eq!(b.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(b.max(), Coord { x: 4.0, y: 2.0 });
        assert_eq!(grid.cell_count(), 8);
        assert_eq!(grid.epsg(), 4326);
    }
}
