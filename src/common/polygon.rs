use anyhow::{Result, bail};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile as shp;

/// Convert a shapefile shape into a geo::MultiPolygon<f64>.
/// Null shapes become an empty MultiPolygon; non-areal shapes are rejected.
pub(crate) fn shape_to_multipolygon(shape: shp::Shape) -> Result<MultiPolygon<f64>> {
    match shape {
        shp::Shape::Polygon(p) => Ok(rings_to_multipolygon(
            p.rings().iter().map(|ring| match ring {
                shp::PolygonRing::Outer(pts) => (true, pts.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect()),
                shp::PolygonRing::Inner(pts) => (false, pts.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect()),
            }),
        )),
        shp::Shape::PolygonZ(p) => Ok(rings_to_multipolygon(
            p.rings().iter().map(|ring| match ring {
                shp::PolygonRing::Outer(pts) => (true, pts.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect()),
                shp::PolygonRing::Inner(pts) => (false, pts.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect()),
            }),
        )),
        shp::Shape::NullShape => Ok(MultiPolygon(Vec::new())),
        other => bail!("[common::polygon] Expected a polygon shape, found {:?}", other.shapetype()),
    }
}

/// Group rings into polygons; shapefiles list each outer ring before its holes.
fn rings_to_multipolygon(rings: impl Iterator<Item = (bool, Vec<Coord<f64>>)>) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes = Vec::new();

    for (is_outer, coords) in rings {
        if is_outer {
            if let Some(ext) = exterior.take() {
                polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(LineString(coords));
        } else if exterior.is_some() {
            holes.push(LineString(coords));
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polygons)
}

/// Convert a geo::MultiPolygon<f64> into a shapefile polygon, or `None` if it has no rings.
pub(crate) fn multipolygon_to_shape(mp: &MultiPolygon<f64>) -> Option<shp::Polygon> {
    let to_points = |ls: &LineString<f64>| -> Vec<shp::Point> {
        ls.coords().map(|c| shp::Point { x: c.x, y: c.y }).collect()
    };

    let rings = mp.iter()
        .filter(|poly| poly.exterior().0.len() >= 4)
        .flat_map(|poly| {
            std::iter::once(shp::PolygonRing::Outer(to_points(poly.exterior())))
                .chain(poly.interiors().iter().map(|hole| shp::PolygonRing::Inner(to_points(hole))))
        })
        .collect::<Vec<_>>();

    // with_rings closes each ring and fixes its orientation (outer CW, inner CCW)
    (!rings.is_empty()).then(|| shp::Polygon::with_rings(rings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, polygon};

    fn square_with_hole() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0), (x: 1.0, y: 2.0)]],
        )])
    }

    #[test]
    fn shape_conversion_keeps_holes() {
        let mp = square_with_hole();
        let shape = multipolygon_to_shape(&mp).unwrap();
        assert_eq!(shape.rings().len(), 2);

        let back = shape_to_multipolygon(shp::Shape::Polygon(shape)).unwrap();
        assert_eq!(back.0.len(), 1);
        assert_eq!(back.0[0].interiors().len(), 1);
        assert!((back.unsigned_area() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn empty_geometry_has_no_shape() {
        assert!(multipolygon_to_shape(&MultiPolygon(Vec::new())).is_none());
    }

    #[test]
    fn null_shape_is_empty() {
        let mp = shape_to_multipolygon(shp::Shape::NullShape).unwrap();
        assert!(mp.0.is_empty());
    }

    #[test]
    fn point_shape_is_rejected() {
        let shape = shp::Shape::Point(shp::Point { x: 0.0, y: 0.0 });
        assert!(shape_to_multipolygon(shape).is_err());
    }
}
