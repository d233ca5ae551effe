//! Stored parcel geometry to GeoJSON.
//!
//! Parcels are stored as `MULTIPOLYGON`, but rows loaded from dirty sources
//! can still come back as a `GeometryCollection`. [`normalize`] reduces those
//! to the polygonal shape the API promises.

use geojson::{Geometry, PolygonType, Value};

/// Reduce a geometry to a single polygonal value.
///
/// Collections keep only their polygonal members: one member is returned as
/// is, several are merged into a `MultiPolygon`, none yields `None`.
/// Non-collection values pass through untouched.
pub fn normalize(value: Value) -> Option<Value> {
    let members = match value {
        Value::GeometryCollection(members) => members,
        other => return Some(other),
    };

    let mut polygonal = Vec::new();
    collect_polygonal(members, &mut polygonal);

    match polygonal.len() {
        0 => None,
        1 => polygonal.pop(),
        _ => Some(Value::MultiPolygon(
            polygonal.into_iter().flat_map(into_polygons).collect(),
        )),
    }
}

fn collect_polygonal(members: Vec<Geometry>, out: &mut Vec<Value>) {
    for member in members {
        match member.value {
            value @ (Value::Polygon(_) | Value::MultiPolygon(_)) => out.push(value),
            Value::GeometryCollection(nested) => collect_polygonal(nested, out),
            _ => {}
        }
    }
}

fn into_polygons(value: Value) -> Vec<PolygonType> {
    match value {
        Value::Polygon(polygon) => vec![polygon],
        Value::MultiPolygon(polygons) => polygons,
        _ => Vec::new(),
    }
}

/// Parse the `ST_AsGeoJSON` text of a stored geometry and normalize it.
pub fn from_stored(text: &str) -> Option<Geometry> {
    match serde_json::from_str::<Geometry>(text) {
        Ok(geometry) => normalize(geometry.value).map(Geometry::new),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unparseable stored geometry");
            None
        }
    }
}
