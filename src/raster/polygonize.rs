use std::{collections::BTreeMap, path::Path};

use ahash::AHashMap;
use anyhow::{Context, Result, bail};
use geo::{Coord, LineString, MultiPolygon, Polygon, orient::{Direction, Orient}};
use smallvec::SmallVec;

use crate::{
    common::OverwritePolicy,
    io,
    raster::{GeoTransform, Raster},
    units::{AdminUnit, UnitTable},
};

/// A corner of the pixel lattice: (col, row), both in `0..=width` / `0..=height`.
type Vertex = (u32, u32);

/// A directed boundary edge, oriented so that the region lies on its right
/// (in row-down pixel space).
type Edge = (Vertex, Vertex);

const UNLABELLED: u32 = u32::MAX;

/// Turn a categorical raster into one (possibly multi-part) polygon per distinct
/// non-nodata value, ordered by ascending value.
///
/// Pixels are 4-connected: edge-sharing pixels of one value form a single part,
/// diagonal-only contact yields separate parts.
pub fn polygonize(raster: &Raster<i64>) -> Result<UnitTable> {
    let Some(nodata) = raster.grid().nodata else {
        bail!("[raster::polygonize] Raster has no nodata value")
    };
    let nodata = (nodata.fract() == 0.0).then_some(nodata as i64);

    let (components, values) = label_components(raster, nodata);
    let boundaries = boundary_edges(raster.width(), raster.height(), &components, values.len());

    let mut parts: BTreeMap<i64, Vec<Polygon<f64>>> = BTreeMap::new();
    for (component, edges) in boundaries.iter().enumerate() {
        let polygons = assemble_polygons(trace_rings(edges), &raster.grid().transform);
        parts.entry(values[component]).or_default().extend(polygons);
    }

    let units = parts.into_iter()
        .map(|(value, polygons)| AdminUnit::new(value, MultiPolygon(polygons)))
        .collect::<Vec<_>>();

    log::info!("[raster::polygonize] {} components grouped into {} units", values.len(), units.len());
    UnitTable::new(units, raster.grid().epsg)
}

/// Read the raster at `path`, polygonize it, and optionally persist the result.
pub fn raster_to_polygon(path: &Path, out_shp: Option<&Path>, policy: OverwritePolicy) -> Result<UnitTable> {
    if let Some(out) = out_shp.filter(|out| out.exists()) {
        if policy == OverwritePolicy::FailIfExists {
            bail!("[raster::polygonize] Output already exists: {}", out.display());
        }
    }

    let raster = io::tiff::read_raster_i64(path)?;
    let table = polygonize(&raster)
        .with_context(|| format!("[raster::polygonize] Failed to polygonize {}", path.display()))?;

    if let Some(out) = out_shp {
        io::write_unit_shapefile(&table, out, policy)?;
    }
    Ok(table)
}

/// Label 4-connected components of equal value. Returns the per-cell component
/// index (`UNLABELLED` for nodata) and the value of each component.
fn label_components(raster: &Raster<i64>, nodata: Option<i64>) -> (Vec<u32>, Vec<i64>) {
    let (width, height) = (raster.width(), raster.height());
    let data = raster.data();
    let mut components = vec![UNLABELLED; data.len()];
    let mut values = Vec::new();
    let mut stack = Vec::new();

    for start in 0..data.len() {
        let value = data[start];
        if Some(value) == nodata || components[start] != UNLABELLED { continue }

        let component = values.len() as u32;
        values.push(value);
        components[start] = component;
        stack.push(start);

        while let Some(i) = stack.pop() {
            let (row, col) = (i / width, i % width);
            let neighbours = [
                (row > 0).then(|| i - width),
                (row + 1 < height).then(|| i + width),
                (col > 0).then(|| i - 1),
                (col + 1 < width).then(|| i + 1),
            ];
            for j in neighbours.into_iter().flatten() {
                if data[j] == value && components[j] == UNLABELLED {
                    components[j] = component;
                    stack.push(j);
                }
            }
        }
    }

    (components, values)
}

/// Collect the boundary edges of every component, clockwise around each cell.
fn boundary_edges(width: usize, height: usize, components: &[u32], count: usize) -> Vec<Vec<Edge>> {
    let mut edges = vec![Vec::new(); count];
    let other = |row: Option<usize>, col: Option<usize>| -> u32 {
        match (row, col) {
            (Some(r), Some(c)) if r < height && c < width => components[r * width + c],
            _ => UNLABELLED,
        }
    };

    for row in 0..height {
        for col in 0..width {
            let k = components[row * width + col];
            if k == UNLABELLED { continue }
            let (c, r) = (col as u32, row as u32);
            let out = &mut edges[k as usize];

            if other(row.checked_sub(1), Some(col)) != k { out.push(((c, r), (c + 1, r))) }
            if other(Some(row), Some(col + 1)) != k { out.push(((c + 1, r), (c + 1, r + 1))) }
            if other(Some(row + 1), Some(col)) != k { out.push(((c + 1, r + 1), (c, r + 1))) }
            if other(Some(row), col.checked_sub(1)) != k { out.push(((c, r + 1), (c, r))) }
        }
    }
    edges
}

#[inline]
fn direction((a, b): Edge) -> (i64, i64) {
    (i64::from(b.0) - i64::from(a.0), i64::from(b.1) - i64::from(a.1))
}

/// Chain the edges of one component into closed rings.
///
/// Where two diagonal cells of the component meet at a corner, the tracer turns
/// left so each ring follows a single background region: the outer boundary and
/// every hole stay separate rings that may touch at a point.
fn trace_rings(edges: &[Edge]) -> Vec<Vec<Vertex>> {
    let mut outgoing: AHashMap<Vertex, SmallVec<[usize; 2]>> = AHashMap::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.0).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        if used[start] { continue }

        let mut ring = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(edges[current].0);

            let Some(candidates) = outgoing.get(&edges[current].1) else { break };
            let (dx, dy) = direction(edges[current]);
            let next = match candidates.as_slice() {
                [only] => *only,
                _ => candidates.iter().copied()
                    .find(|&j| direction(edges[j]) == (dy, -dx))
                    .unwrap_or(candidates[0]),
            };
            if next == start || used[next] { break }
            current = next;
        }
        rings.push(drop_collinear(ring));
    }
    rings
}

/// Remove vertices where the ring continues straight on.
fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len();
    let step = |a: Vertex, b: Vertex| direction((a, b));
    (0..n)
        .filter(|&i| step(ring[(i + n - 1) % n], ring[i]) != step(ring[i], ring[(i + 1) % n]))
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed area in row-down pixel space; positive for outer rings.
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n).map(|i| {
        let (x0, y0) = (i64::from(ring[i].0), i64::from(ring[i].1));
        let (x1, y1) = (i64::from(ring[(i + 1) % n].0), i64::from(ring[(i + 1) % n].1));
        x0 * y1 - x1 * y0
    }).sum()
}

/// Even-odd test of a point against a lattice ring.
fn ring_contains(ring: &[Vertex], (x, y): (f64, f64)) -> bool {
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let (x0, y0) = (f64::from(ring[i].0), f64::from(ring[i].1));
        let (x1, y1) = (f64::from(ring[(i + 1) % n].0), f64::from(ring[(i + 1) % n].1));
        if (y0 <= y) != (y1 <= y) && x < x0 + (y - y0) * (x1 - x0) / (y1 - y0) {
            inside = !inside;
        }
    }
    inside
}

/// Centre of the background cell to the left of a hole ring's first edge.
fn hole_sample(ring: &[Vertex]) -> (f64, f64) {
    let (dx, dy) = direction((ring[0], ring[1]));
    let (ux, uy) = (dx.signum() as f64, dy.signum() as f64);
    (
        f64::from(ring[0].0) + 0.5 * ux + 0.5 * uy,
        f64::from(ring[0].1) + 0.5 * uy - 0.5 * ux,
    )
}

/// Pair holes with their enclosing outer ring and convert to world coordinates.
fn assemble_polygons(rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> Vec<Polygon<f64>> {
    let (outers, holes): (Vec<_>, Vec<_>) = rings.into_iter()
        .filter(|ring| ring.len() >= 4)
        .map(|ring| (signed_area2(&ring), ring))
        .partition(|(area, _)| *area > 0);

    let mut interiors: Vec<Vec<LineString<f64>>> = vec![Vec::new(); outers.len()];
    for (_, hole) in &holes {
        let owner = if outers.len() == 1 { Some(0) } else {
            let sample = hole_sample(hole);
            outers.iter().enumerate()
                .filter(|(_, (_, outer))| ring_contains(outer, sample))
                .min_by_key(|(_, (area, _))| *area)
                .map(|(i, _)| i)
        };
        match owner {
            Some(i) => interiors[i].push(to_world(hole, transform)),
            None => log::warn!("[raster::polygonize] Dropping a hole with no enclosing ring"),
        }
    }

    outers.iter().zip(interiors)
        .map(|((_, outer), holes)| Polygon::new(to_world(outer, transform), holes).orient(Direction::Default))
        .collect()
}

fn to_world(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    ring.iter()
        .map(|&(c, r)| transform.to_world(f64::from(c), f64::from(r)))
        .collect::<Vec<Coord<f64>>>()
        .into()
}
