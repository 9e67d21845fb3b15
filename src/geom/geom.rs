use anyhow::Result;
use geo::{BooleanOps, BoundingRect, MultiPolygon, Relate};
use rstar::{RTree, AABB};

use crate::geom::BoundingBox;

/// Unit geometries in row order, with an R-tree over their envelopes.
/// Empty geometries are kept in row order but never indexed.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a slice of MultiPolygons.
    pub(crate) fn new(polygons: &[MultiPolygon<f64>]) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(i, polygon)| polygon.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes: polygons.to_vec(),
        }
    }

    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Rook adjacency lists for every row, each sorted by row index.
    ///
    /// Two rows are adjacent when their geometries share a boundary segment of
    /// positive length. Uses DE-9IM: require `touches` AND boundary/boundary
    /// intersection of dimension 1.
    pub(crate) fn adjacencies(&self) -> Result<Vec<Vec<u32>>> {
        let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); self.len()];

        for i in 0..self.len() {
            let Some(rect) = self.shapes[i].bounding_rect() else { continue };
            let search = AABB::from_corners(rect.min().into(), rect.max().into());

            for candidate in self.rtree.locate_in_envelope_intersecting(&search) {
                let j = candidate.idx();
                if j <= i { continue } // check each unordered pair once

                let im = self.shapes[i].relate(&self.shapes[j]);
                if im.is_touches() && im.matches("****1****")? {
                    adjacency[i].push(j as u32);
                    adjacency[j].push(i as u32);
                }
            }
        }

        adjacency.iter_mut().for_each(|neighbors| neighbors.sort_unstable());
        Ok(adjacency)
    }

    /// Union of the geometries at `rows`, or an empty MultiPolygon.
    pub(crate) fn union_of(&self, rows: &[usize]) -> MultiPolygon<f64> {
        match rows {
            [] => MultiPolygon(Vec::new()),
            [only] => self.shapes[*only].clone(),
            _ => rows.iter()
                .map(|&i| self.shapes[i].clone())
                .reduce(|a, b| a.union(&b))
                .unwrap_or_else(|| MultiPolygon(Vec::new())),
        }
    }
}
