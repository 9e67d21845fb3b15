use geo::{Coord, MultiPolygon};

use crate::raster::RasterGrid;

/// A polygon edge in fractional pixel coordinates.
#[derive(Debug, Clone, Copy)]
struct Edge {
    a: (f64, f64),
    b: (f64, f64),
}

/// Visit every cell of `grid` whose centre lies inside `shape` (even-odd rule).
///
/// Calls `visit(row, col_start..col_end)` once per run of covered cells.
pub(crate) fn for_each_covered_run(
    grid: &RasterGrid,
    shape: &MultiPolygon<f64>,
    mut visit: impl FnMut(usize, std::ops::Range<usize>),
) {
    let to_pixel = |c: &Coord<f64>| grid.transform.to_pixel(*c);
    let edges: Vec<Edge> = shape.iter()
        .flat_map(|poly| std::iter::once(poly.exterior()).chain(poly.interiors()))
        .flat_map(|ring| ring.lines())
        .map(|line| Edge { a: to_pixel(&line.start), b: to_pixel(&line.end) })
        .filter(|e| e.a.1 != e.b.1)
        .collect();
    if edges.is_empty() { return }

    let (min_y, max_y) = edges.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| (lo.min(e.a.1.min(e.b.1)), hi.max(e.a.1.max(e.b.1))));

    // rows whose centre (row + 0.5) falls inside [min_y, max_y]
    let first_row = (min_y - 0.5).ceil().max(0.0) as usize;
    let last_row = ((max_y - 0.5).floor() + 1.0).clamp(0.0, grid.height as f64) as usize;

    let mut crossings = Vec::new();
    for row in first_row..last_row {
        let yc = row as f64 + 0.5;
        crossings.clear();
        crossings.extend(edges.iter()
            .filter(|e| (e.a.1 <= yc) != (e.b.1 <= yc))
            .map(|e| e.a.0 + (yc - e.a.1) * (e.b.0 - e.a.0) / (e.b.1 - e.a.1)));
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            // columns whose centre (col + 0.5) falls in [span[0], span[1])
            let start = (span[0] - 0.5).ceil().clamp(0.0, grid.width as f64) as usize;
            let end = (span[1] - 0.5).ceil().clamp(0.0, grid.width as f64) as usize;
            if start < end {
                visit(row, start..end);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use geo::{Rect, coord, polygon};

    fn grid() -> RasterGrid {
        // 4x4 cells of size 1, origin at top-left (0, 4)
        RasterGrid::new(4, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0))
    }

    fn covered(shape: &MultiPolygon<f64>) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for_each_covered_run(&grid(), shape, |row, cols| cells.extend(cols.map(|c| (row, c))));
        cells
    }

    #[test]
    fn aligned_rectangle_covers_its_cells() {
        let rect = Rect::new(coord! { x: 1.0, y: 1.0 }, coord! { x: 3.0, y: 3.0 });
        let cells = covered(&MultiPolygon(vec![rect.to_polygon()]));
        assert_eq!(cells, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
    }

    #[test]
    fn hole_is_excluded() {
        let shape = MultiPolygon(vec![polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 3.0), (x: 0.0, y: 3.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 2.0)]],
        )]);
        let cells = covered(&shape);
        assert_eq!(cells.len(), 8);
        assert!(!cells.contains(&(2, 1)));
    }

    #[test]
    fn centre_rule_skips_slivers() {
        // covers the left 40% of cell (0, 0) only
        let rect = Rect::new(coord! { x: 0.0, y: 3.0 }, coord! { x: 0.4, y: 4.0 });
        assert!(covered(&MultiPolygon(vec![rect.to_polygon()])).is_empty());
    }

    #[test]
    fn shapes_outside_the_grid_are_clipped() {
        let rect = Rect::new(coord! { x: -5.0, y: -5.0 }, coord! { x: 1.0, y: 10.0 });
        let cells = covered(&MultiPolygon(vec![rect.to_polygon()]));
        assert_eq!(cells, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }
}
