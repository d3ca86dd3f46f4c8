//! Geometry values held by the in-memory engine.
//!
//! Text goes through the `wkt` crate and measures through `geo`, so the
//! reference backend agrees with any other consumer of those crates.

use std::f64::consts::PI;

use geo::{Area, Coord, CoordsIter, EuclideanLength, LineString, MapCoords, Polygon};
use wkt::{ToWkt, TryFromWkt};

/// Spherical mercator earth radius, metres.
const EARTH_RADIUS: f64 = 6_378_137.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Geometry(geo::Geometry<f64>);

impl Geometry {
    /// Parses well-known text. The error text ends up in the native message.
    pub fn parse(text: &str) -> Result<Self, String> {
        <geo::Geometry<f64> as TryFromWkt<f64>>::try_from_wkt_str(text.trim())
            .map(Self)
            .map_err(|e| e.to_string())
    }

    /// Well-known text with a space after the type tag, as the native
    /// library writes it.
    pub fn to_wkt(&self) -> String {
        let text = self.0.wkt_string();
        match text.find('(') {
            Some(open) if open > 0 && !text[..open].ends_with(' ') => {
                format!("{} {}", &text[..open], &text[open..])
            }
            _ => text,
        }
    }

    /// Planar area. Holes are subtracted from their shell.
    pub fn area(&self) -> f64 {
        self.0.unsigned_area()
    }

    /// Planar length; perimeter for polygons.
    pub fn length(&self) -> f64 {
        length(&self.0)
    }

    pub fn is_valid(&self) -> bool {
        let finite = self
            .0
            .coords_iter()
            .all(|c| c.x.is_finite() && c.y.is_finite());
        finite
            && match &self.0 {
                geo::Geometry::LineString(line) => line.0.len() >= 2,
                geo::Geometry::Polygon(polygon) => rings(polygon).all(valid_ring),
                geo::Geometry::MultiPolygon(polygons) => {
                    polygons.0.iter().flat_map(rings).all(valid_ring)
                }
                _ => true,
            }
    }

    pub fn map_coords(&self, f: fn(Coord) -> Coord) -> Self {
        Self(self.0.map_coords(f))
    }
}

/// Longitude/latitude degrees to web mercator metres.
pub fn to_web_mercator(c: Coord) -> Coord {
    Coord {
        x: EARTH_RADIUS * c.x.to_radians(),
        y: EARTH_RADIUS * (PI / 4.0 + c.y.to_radians() / 2.0).tan().ln(),
    }
}

/// Web mercator metres to longitude/latitude degrees.
pub fn from_web_mercator(c: Coord) -> Coord {
    Coord {
        x: (c.x / EARTH_RADIUS).to_degrees(),
        y: (2.0 * (c.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
    }
}

fn length(geometry: &geo::Geometry<f64>) -> f64 {
    match geometry {
        geo::Geometry::Line(line) => line.euclidean_length(),
        geo::Geometry::LineString(line) => line.euclidean_length(),
        geo::Geometry::MultiLineString(lines) => lines.euclidean_length(),
        geo::Geometry::Polygon(polygon) => perimeter(polygon),
        geo::Geometry::MultiPolygon(polygons) => polygons.0.iter().map(perimeter).sum(),
        geo::Geometry::Rect(rect) => perimeter(&rect.to_polygon()),
        geo::Geometry::Triangle(triangle) => perimeter(&triangle.to_polygon()),
        geo::Geometry::GeometryCollection(items) => items.0.iter().map(length).sum(),
        geo::Geometry::Point(_) | geo::Geometry::MultiPoint(_) => 0.0,
    }
}

fn rings(polygon: &Polygon) -> impl Iterator<Item = &LineString> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

fn perimeter(polygon: &Polygon) -> f64 {
    rings(polygon).map(|ring| ring.euclidean_length()).sum()
}

fn valid_ring(ring: &LineString) -> bool {
    ring.0.len() >= 4
        && ring.is_closed()
        && Polygon::new(ring.clone(), Vec::new()).unsigned_area() > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        let point = Geometry::parse("POINT (1 2)").unwrap();
        assert_eq!(point.to_wkt(), "POINT (1 2)");

        let line = Geometry::parse("LINESTRING(0 0, 3 4)").unwrap();
        assert_eq!(line.to_wkt(), "LINESTRING (0 0,3 4)");
        assert_eq!(line.length(), 5.0);
        assert_eq!(line.area(), 0.0);
    }

    #[test]
    fn test_polygon_area_with_hole() {
        let poly = Geometry::parse(
            "POLYGON ((0 0,10 0,10 10,0 10,0 0),(2 2,4 2,4 4,2 4,2 2))",
        )
        .unwrap();
        assert_eq!(poly.area(), 96.0);
        assert_eq!(poly.length(), 48.0);
        assert!(poly.is_valid());
    }

    #[test]
    fn test_invalid_geometries() {
        assert!(Geometry::parse("CIRCLE (0 0)").is_err());
        assert!(Geometry::parse("POINT (1)").is_err());
        assert!(Geometry::parse("POINT (").is_err());

        let flat = Geometry::parse("POLYGON ((0 0,1 1,2 2,0 0))").unwrap();
        assert!(!flat.is_valid());
        let short_line = Geometry::parse("LINESTRING (0 0)").unwrap();
        assert!(!short_line.is_valid());
    }

    #[test]
    fn test_mercator_round_trip() {
        let c = to_web_mercator(Coord { x: 180.0, y: 0.0 });
        assert!((c.x - 20_037_508.342789244).abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);

        let back = from_web_mercator(to_web_mercator(Coord { x: 12.5, y: 41.9 }));
        assert!((back.x - 12.5).abs() < 1e-9);
        assert!((back.y - 41.9).abs() < 1e-9);
    }

    #[test]
    fn test_transform_keeps_shape() {
        let line = Geometry::parse("LINESTRING (0 0,10 0)").unwrap();
        let there = line.map_coords(to_web_mercator);
        assert!((there.length() - 1_113_194.907).abs() < 1e-2);

        let back = there.map_coords(from_web_mercator);
        assert!((back.length() - 10.0).abs() < 1e-9);
    }
}
