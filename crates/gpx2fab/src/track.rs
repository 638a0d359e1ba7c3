//! GPX track loading.
//!
//! A track is flattened into one line string in file order: every
//! track-segment point first, then every route point. Coordinates are
//! `(lon, lat)` so they feed the transformer directly.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::geometry::{Coord, LineString};

/// Load a track from a GPX file.
pub fn load_track<P: AsRef<Path>>(path: P) -> Result<LineString> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::TrackParse(format!("{}: {}", path.display(), e)))?;
    let track = parse_track(BufReader::new(file))?;
    info!(path = %path.display(), points = track.0.len(), "loaded track");
    Ok(track)
}

/// Parse a GPX document into a track line.
///
/// Fails with `TrackParse` on malformed XML or when fewer than two points
/// are present.
pub fn parse_track<R: Read>(reader: R) -> Result<LineString> {
    let gpx = gpx::read(reader).map_err(|e| Error::TrackParse(e.to_string()))?;

    let track_points = gpx
        .tracks
        .iter()
        .flat_map(|t| &t.segments)
        .flat_map(|s| &s.points);
    let route_points = gpx.routes.iter().flat_map(|r| &r.points);

    let coords: Vec<Coord> = track_points
        .chain(route_points)
        .map(|wp| wp.point().0)
        .collect();

    if coords.len() < 2 {
        return Err(Error::TrackParse(format!(
            "track needs at least 2 points, found {}",
            coords.len()
        )));
    }
    Ok(LineString::from(coords))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gpx(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">{body}</gpx>"#
        )
    }

    #[test]
    fn tracks_then_routes_in_order() {
        let doc = gpx(r#"
            <rte><rtept lat="3" lon="30"/></rte>
            <trk><trkseg><trkpt lat="1" lon="10"/><trkpt lat="2" lon="20"/></trkseg></trk>"#);
        let track = parse_track(doc.as_bytes()).unwrap();
        let xs: Vec<f64> = track.0.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![10.0, 20.0, 30.0], "track points come before route points");
        assert_eq!(track.0[0].y, 1.0, "y holds latitude");
    }

    #[test]
    fn single_point_is_rejected() {
        let doc = gpx(r#"<trk><trkseg><trkpt lat="1" lon="10"/></trkseg></trk>"#);
        assert!(matches!(parse_track(doc.as_bytes()), Err(Error::TrackParse(_))));
    }

    #[test]
    fn malformed_xml_is_rejected() {
        assert!(matches!(parse_track("<gpx><trk>".as_bytes()), Err(Error::TrackParse(_))));
    }

    #[test]
    fn missing_file_is_track_error() {
        assert!(matches!(load_track("/nonexistent/trail.gpx"), Err(Error::TrackParse(_))));
    }
}
