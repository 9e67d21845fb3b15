use crate::raster::RasterGrid;

/// A single-band raster held in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    grid: RasterGrid,
    data: Vec<T>,
}

impl<T: Copy> Raster<T> {
    /// Wrap `data` in `grid`. Panics if the buffer does not match the grid size.
    pub fn new(grid: RasterGrid, data: Vec<T>) -> Self {
        assert!(data.len() == grid.cell_count(),
            "data.len() ({}) must equal width * height ({})", data.len(), grid.cell_count());
        Self { grid, data }
    }

    /// A raster of `grid` with every cell set to `value`.
    pub fn filled(grid: RasterGrid, value: T) -> Self {
        let data = vec![value; grid.cell_count()];
        Self { grid, data }
    }

    #[inline] pub fn grid(&self) -> &RasterGrid { &self.grid }

    #[inline] pub fn width(&self) -> usize { self.grid.width }

    #[inline] pub fn height(&self) -> usize { self.grid.height }

    #[inline] pub fn data(&self) -> &[T] { &self.data }

    #[inline] pub fn into_data(self) -> Vec<T> { self.data }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.grid.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let width = self.grid.width;
        self.data[row * width + col] = value;
    }
}

impl Raster<i64> {
    /// Nodata as an integer cell value, if the grid declares an integral one.
    pub fn nodata_value(&self) -> Option<i64> {
        self.grid.nodata
            .filter(|v| v.fract() == 0.0 && v.is_finite())
            .map(|v| v as i64)
    }
}

impl Raster<f64> {
    /// Whether the cell value should take part in statistics.
    #[inline]
    pub(crate) fn is_valid(&self, value: f64) -> bool {
        !value.is_nan() && self.grid.nodata.is_none_or(|nodata| value != nodata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    fn grid() -> RasterGrid {
        RasterGrid::new(3, 2, GeoTransform::new(0.0, 2.0, 1.0, -1.0)).with_nodata(-1.0)
    }

    #[test]
    fn row_major_indexing() {
        let mut r = Raster::new(grid(), vec![0i64, 1, 2, 3, 4, 5]);
        assert_eq!(r.get(1, 0), 3);
        r.set(0, 2, 9);
        assert_eq!(r.data()[2], 9);
        assert_eq!(r.nodata_value(), Some(-1));
    }

    #[test]
    #[should_panic(expected = "must equal width * height")]
    fn size_mismatch_panics() {
        let _ = Raster::new(grid(), vec![0i64; 5]);
    }

    #[test]
    fn nodata_and_nan_are_invalid() {
        let r = Raster::filled(grid(), 1.0f64);
        assert!(r.is_valid(0.5));
        assert!(!r.is_valid(-1.0));
        assert!(!r.is_valid(f64::NAN));
    }
}
