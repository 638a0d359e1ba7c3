//! Geometry sources: where raw map features come from.
//!
//! The pipeline only sees the [`GeometrySource`] trait. Acquisition, caching
//! and download policy live behind it; by the time the core runs, fetching
//! is a plain in-memory lookup or a local file read.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use geo::Intersects;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::geometry::{
    Coord, Geometry, LineString, MultiLineString, MultiPolygon, Point, Polygon, Rect, bounding_box,
};

/// One geographic feature: a geometry tagged with string attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, String>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry, attributes: BTreeMap::new() }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// True when any of `keys` maps to exactly `name`.
    pub fn is_named<S: AsRef<str>>(&self, name: &str, keys: &[S]) -> bool {
        keys.iter()
            .any(|k| self.attributes.get(k.as_ref()).is_some_and(|v| v == name))
    }
}

/// Provider of raw features for a dataset.
///
/// `Send + Sync` so independent layers can be fetched from worker threads.
pub trait GeometrySource: Send + Sync {
    /// Features of `dataset` whose bounding box meets `region` (WGS84 degrees).
    ///
    /// A dataset that cannot be produced is an error; an empty list is not.
    fn fetch_features(&self, dataset: &str, region: &Rect) -> Result<Vec<Feature>>;
}

fn in_region(feature: &Feature, region: &Rect) -> bool {
    bounding_box(&feature.geometry).is_some_and(|bbox| bbox.intersects(region))
}

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Datasets held in memory, keyed by dataset id.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: BTreeMap<String, Vec<Feature>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>, features: Vec<Feature>) -> Self {
        self.datasets.insert(dataset.into(), features);
        self
    }

    pub fn insert(&mut self, dataset: impl Into<String>, features: Vec<Feature>) {
        self.datasets.insert(dataset.into(), features);
    }
}

impl GeometrySource for MemorySource {
    fn fetch_features(&self, dataset: &str, region: &Rect) -> Result<Vec<Feature>> {
        let features = self.datasets.get(dataset).ok_or_else(|| Error::Source {
            dataset: dataset.to_string(),
            reason: "dataset not loaded".to_string(),
        })?;
        Ok(features.iter().filter(|f| in_region(f, region)).cloned().collect())
    }
}

// ============================================================================
// GEOJSON DIRECTORY SOURCE
// ============================================================================

/// Reads `<dir>/<dataset>.geojson` feature collections.
#[derive(Debug, Clone)]
pub struct GeoJsonDirSource {
    dir: PathBuf,
}

impl GeoJsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, dataset: &str) -> PathBuf {
        self.dir.join(format!("{dataset}.geojson"))
    }
}

impl GeometrySource for GeoJsonDirSource {
    fn fetch_features(&self, dataset: &str, region: &Rect) -> Result<Vec<Feature>> {
        let path = self.path_for(dataset);
        let source_err = |reason: String| Error::Source { dataset: dataset.to_string(), reason };

        let content = fs::read_to_string(&path)
            .map_err(|e| source_err(format!("{}: {}", path.display(), e)))?;
        let features = parse_feature_collection(&content).map_err(source_err)?;
        let total = features.len();
        let kept: Vec<Feature> = features.into_iter().filter(|f| in_region(f, region)).collect();
        debug!(dataset, total, kept = kept.len(), "loaded GeoJSON dataset");
        Ok(kept)
    }
}

/// Parse a GeoJSON `FeatureCollection` into features.
///
/// Supported geometry types: Point, LineString, MultiLineString, Polygon,
/// MultiPolygon. Anything else is skipped with a warning.
pub fn parse_feature_collection(json: &str) -> std::result::Result<Vec<Feature>, String> {
    let root: Value = serde_json::from_str(json).map_err(|e| format!("invalid JSON: {e}"))?;
    let items = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or("not a FeatureCollection")?;

    let mut features = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(geometry) = item.get("geometry").filter(|g| !g.is_null()) else {
            warn!(index = i, "feature without geometry skipped");
            continue;
        };
        let geometry = match parse_geometry(geometry) {
            Ok(g) => g,
            Err(reason) => {
                warn!(index = i, %reason, "feature skipped");
                continue;
            }
        };

        let mut feature = Feature::new(geometry);
        if let Some(props) = item.get("properties").and_then(Value::as_object) {
            for (key, value) in props {
                let text = match value {
                    Value::Null => continue,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                feature.attributes.insert(key.clone(), text);
            }
        }
        features.push(feature);
    }
    Ok(features)
}

fn parse_geometry(value: &Value) -> std::result::Result<Geometry, String> {
    let kind = value.get("type").and_then(Value::as_str).ok_or("geometry without type")?;
    let coords = value.get("coordinates").ok_or("geometry without coordinates")?;
    Ok(match kind {
        "Point" => Geometry::Point(Point::from(parse_coord(coords)?)),
        "LineString" => Geometry::LineString(parse_line(coords)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString::new(
            as_array(coords)?.iter().map(parse_line).collect::<std::result::Result<_, _>>()?,
        )),
        "Polygon" => Geometry::Polygon(parse_polygon(coords)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
            as_array(coords)?.iter().map(parse_polygon).collect::<std::result::Result<_, _>>()?,
        )),
        other => return Err(format!("unsupported geometry type {other}")),
    })
}

fn as_array(value: &Value) -> std::result::Result<&Vec<Value>, String> {
    value.as_array().ok_or_else(|| "expected an array".to_string())
}

fn parse_coord(value: &Value) -> std::result::Result<Coord, String> {
    let pair = as_array(value)?;
    match (pair.first().and_then(Value::as_f64), pair.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err("bad coordinate".to_string()),
    }
}

fn parse_line(value: &Value) -> std::result::Result<LineString, String> {
    Ok(LineString::from(
        as_array(value)?.iter().map(parse_coord).collect::<std::result::Result<Vec<_>, _>>()?,
    ))
}

fn parse_polygon(value: &Value) -> std::result::Result<Polygon, String> {
    let mut rings = as_array(value)?.iter().map(parse_line);
    let exterior = rings.next().ok_or("polygon without rings")??;
    let interiors = rings.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"NAME": "Squareland", "POP": 12},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature", "properties": {"name": "far river"},
             "geometry": {"type": "LineString", "coordinates": [[50,50],[60,60]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "GeometryCollection", "geometries": []}},
            {"type": "Feature", "properties": {}, "geometry": null}
        ]
    }"#;

    fn everywhere() -> Rect {
        Rect::new((-180.0, -90.0), (180.0, 90.0))
    }

    #[test]
    fn parses_supported_features() {
        let features = parse_feature_collection(SAMPLE).unwrap();
        assert_eq!(features.len(), 2, "unsupported and null geometries are skipped");
        assert_eq!(features[0].attributes.get("POP").map(String::as_str), Some("12"));
        assert!(features[0].is_named("Squareland", &["NAME", "ADMIN"]));
        assert!(!features[1].is_named("Squareland", &["NAME"]));
    }

    #[test]
    fn rejects_non_collection() {
        assert!(parse_feature_collection(r#"{"type": "Feature"}"#).is_err());
        assert!(parse_feature_collection("not json").is_err());
    }

    #[test]
    fn memory_source_filters_by_region() {
        let features = parse_feature_collection(SAMPLE).unwrap();
        let source = MemorySource::new().with_dataset("countries", features);
        let near = source
            .fetch_features("countries", &Rect::new((-1.0, -1.0), (11.0, 11.0)))
            .unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(source.fetch_features("countries", &everywhere()).unwrap().len(), 2);
    }

    #[test]
    fn missing_dataset_is_an_error() {
        let source = MemorySource::new();
        assert!(matches!(
            source.fetch_features("lakes", &everywhere()),
            Err(Error::Source { .. })
        ));
        let dir = GeoJsonDirSource::new("/nonexistent/gpx2fab");
        assert!(matches!(dir.fetch_features("lakes", &everywhere()), Err(Error::Source { .. })));
    }
}
