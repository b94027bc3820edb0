//! GeoJSON parsing and planar geometry helpers.
//!
//! Geometry travels through the API and the database as raw GeoJSON
//! (`serde_json::Value` / JSONB). This module parses those documents into
//! typed rings for validation and for deriving the bounding box and
//! centroid that geo-search queries run against. All math is planar in
//! EPSG:4326 degrees; that is sufficient for overlap tests and area
//! guards at project scale.

use serde_json::{Value, json};

use crate::error::AppError;

/// A lon/lat position.
pub type Position = (f64, f64);

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bbox {
    /// Area in square degrees.
    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x) * (self.max_y - self.min_y)
    }

    /// True if the two boxes overlap (touching edges count).
    pub fn intersects(&self, other: &Bbox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bbox) -> Bbox {
        Bbox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

/// A polygon: one exterior ring plus zero or more interior rings (holes).
///
/// Rings are closed (first position repeated last) and hold at least four
/// positions, as required by the GeoJSON spec.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Position>,
    pub interiors: Vec<Vec<Position>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl Polygon {
    /// Unsigned planar area (holes subtracted), square degrees.
    pub fn area(&self) -> f64 {
        let outer = signed_ring_area(&self.exterior).abs();
        let holes: f64 = self
            .interiors
            .iter()
            .map(|r| signed_ring_area(r).abs())
            .sum();
        (outer - holes).max(0.0)
    }

    fn bbox(&self) -> Bbox {
        ring_bbox(&self.exterior)
    }
}

impl MultiPolygon {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total unsigned area, square degrees.
    pub fn area(&self) -> f64 {
        self.0.iter().map(Polygon::area).sum()
    }

    pub fn bbox(&self) -> Bbox {
        let mut boxes = self.0.iter().map(Polygon::bbox);
        let first = boxes.next().expect("non-empty multipolygon");
        boxes.fold(first, |acc, b| acc.union(&b))
    }

    /// Area-weighted centroid across member polygons.
    ///
    /// Falls back to the vertex average for degenerate (zero-area) input.
    pub fn centroid(&self) -> Position {
        let mut cx = 0.0;
        let mut cy = 0.0;
        let mut total = 0.0;
        for poly in &self.0 {
            let a = signed_ring_area(&poly.exterior).abs();
            let (x, y) = ring_centroid(&poly.exterior);
            cx += x * a;
            cy += y * a;
            total += a;
        }
        if total > f64::EPSILON {
            (cx / total, cy / total)
        } else {
            vertex_average(self.0.iter().flat_map(|p| p.exterior.iter().copied()))
        }
    }

    /// Render back to a GeoJSON MultiPolygon document.
    pub fn to_geojson(&self) -> Value {
        let coords: Vec<Vec<Vec<[f64; 2]>>> = self
            .0
            .iter()
            .map(|poly| {
                let mut rings = Vec::with_capacity(1 + poly.interiors.len());
                rings.push(poly.exterior.iter().map(|&(x, y)| [x, y]).collect());
                for hole in &poly.interiors {
                    rings.push(hole.iter().map(|&(x, y)| [x, y]).collect());
                }
                rings
            })
            .collect();
        json!({ "type": "MultiPolygon", "coordinates": coords })
    }
}

/// Parse a GeoJSON document into a [`MultiPolygon`].
///
/// Accepts `Polygon`, `MultiPolygon`, a `Feature` wrapping either, or a
/// `FeatureCollection` whose polygonal features are merged. Everything
/// else is rejected with [`AppError::InvalidGeoJson`].
pub fn parse_multipolygon(value: &Value) -> Result<MultiPolygon, AppError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("expected a GeoJSON object"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing \"type\" member"))?;

    match kind {
        "Polygon" => {
            let poly = parse_polygon_coordinates(required(obj, "coordinates")?)?;
            Ok(MultiPolygon(vec![poly]))
        }
        "MultiPolygon" => {
            let coords = required(obj, "coordinates")?
                .as_array()
                .ok_or_else(|| invalid("MultiPolygon coordinates must be an array"))?;
            let polys = coords
                .iter()
                .map(parse_polygon_coordinates)
                .collect::<Result<Vec<_>, _>>()?;
            if polys.is_empty() {
                return Err(invalid("MultiPolygon has no member polygons"));
            }
            Ok(MultiPolygon(polys))
        }
        "Feature" => {
            let geometry = obj
                .get("geometry")
                .filter(|g| !g.is_null())
                .ok_or_else(|| invalid("Feature has no geometry"))?;
            parse_multipolygon(geometry)
        }
        "FeatureCollection" => {
            let features = required(obj, "features")?
                .as_array()
                .ok_or_else(|| invalid("features must be an array"))?;
            let mut polys = Vec::new();
            for feature in features {
                polys.extend(parse_multipolygon(feature)?.0);
            }
            if polys.is_empty() {
                return Err(invalid("FeatureCollection contains no polygons"));
            }
            Ok(MultiPolygon(polys))
        }
        other => Err(invalid(&format!(
            "unsupported geometry type \"{other}\", expected Polygon or MultiPolygon"
        ))),
    }
}

/// Validate a GeoJSON document as a single polygon (priority areas).
pub fn parse_polygon(value: &Value) -> Result<Polygon, AppError> {
    let mp = parse_multipolygon(value)?;
    match <[Polygon; 1]>::try_from(mp.0) {
        Ok([poly]) => Ok(poly),
        Err(_) => Err(invalid("expected a single Polygon")),
    }
}

/// Count the features of a GeoJSON FeatureCollection, validating shape.
pub fn feature_count(value: &Value) -> Result<usize, AppError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("expected a GeoJSON object"))?;
    if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(invalid("tasks must be a FeatureCollection"));
    }
    let features = required(obj, "features")?
        .as_array()
        .ok_or_else(|| invalid("features must be an array"))?;
    Ok(features.len())
}

/// Build a GeoJSON FeatureCollection from prepared feature values.
pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

/// Wrap a geometry in a GeoJSON Feature with the given properties.
pub fn feature(geometry: Value, properties: Value) -> Value {
    json!({ "type": "Feature", "geometry": geometry, "properties": properties })
}

// -- Ring parsing and math --

fn required<'a>(
    obj: &'a serde_json::Map<String, Value>,
    key: &str,
) -> Result<&'a Value, AppError> {
    obj.get(key)
        .ok_or_else(|| invalid(&format!("missing \"{key}\" member")))
}

fn invalid(msg: &str) -> AppError {
    AppError::InvalidGeoJson(msg.to_string())
}

fn parse_polygon_coordinates(coords: &Value) -> Result<Polygon, AppError> {
    let rings = coords
        .as_array()
        .ok_or_else(|| invalid("Polygon coordinates must be an array of rings"))?;
    if rings.is_empty() {
        return Err(invalid("Polygon has no rings"));
    }
    let mut parsed = rings.iter().map(|r| parse_ring(r));
    let exterior = parsed.next().expect("non-empty rings")?;
    let interiors = parsed.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon {
        exterior,
        interiors,
    })
}

fn parse_ring(value: &Value) -> Result<Vec<Position>, AppError> {
    let raw = value
        .as_array()
        .ok_or_else(|| invalid("ring must be an array of positions"))?;
    let mut ring = Vec::with_capacity(raw.len());
    for pos in raw {
        let pair = pos
            .as_array()
            .ok_or_else(|| invalid("position must be an array"))?;
        if pair.len() < 2 {
            return Err(invalid("position needs longitude and latitude"));
        }
        let x = pair[0]
            .as_f64()
            .ok_or_else(|| invalid("longitude must be a number"))?;
        let y = pair[1]
            .as_f64()
            .ok_or_else(|| invalid("latitude must be a number"))?;
        if !x.is_finite() || !y.is_finite() || x.abs() > 180.0 || y.abs() > 90.0 {
            return Err(invalid(&format!("position ({x}, {y}) out of range")));
        }
        ring.push((x, y));
    }
    if ring.len() < 4 {
        return Err(invalid("ring must have at least four positions"));
    }
    if ring.first() != ring.last() {
        return Err(invalid("ring is not closed"));
    }
    Ok(ring)
}

/// Shoelace formula over a closed ring; positive for counter-clockwise.
fn signed_ring_area(ring: &[Position]) -> f64 {
    let mut sum = 0.0;
    for window in ring.windows(2) {
        let (x1, y1) = window[0];
        let (x2, y2) = window[1];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

fn ring_centroid(ring: &[Position]) -> Position {
    let a = signed_ring_area(ring);
    if a.abs() <= f64::EPSILON {
        return vertex_average(ring.iter().copied());
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for window in ring.windows(2) {
        let (x1, y1) = window[0];
        let (x2, y2) = window[1];
        let cross = x1 * y2 - x2 * y1;
        cx += (x1 + x2) * cross;
        cy += (y1 + y2) * cross;
    }
    (cx / (6.0 * a), cy / (6.0 * a))
}

fn vertex_average(points: impl Iterator<Item = Position>) -> Position {
    let mut n = 0usize;
    let (mut sx, mut sy) = (0.0, 0.0);
    for (x, y) in points {
        sx += x;
        sy += y;
        n += 1;
    }
    if n == 0 {
        (0.0, 0.0)
    } else {
        (sx / n as f64, sy / n as f64)
    }
}

fn ring_bbox(ring: &[Position]) -> Bbox {
    let mut bbox = Bbox {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };
    for &(x, y) in ring {
        bbox.min_x = bbox.min_x.min(x);
        bbox.min_y = bbox.min_y.min(y);
        bbox.max_x = bbox.max_x.max(x);
        bbox.max_y = bbox.max_y.max(y);
    }
    bbox
}
