//! Geographic -> page coordinate transform.
//!
//! One [`CoordTransformer`] is built per generation run from the region's
//! bounding box and then shared (by reference) with every stage, so every
//! layer of both output drawings lands in the same page frame.
//!
//! The mapping is: projection (pluggable) -> uniform scale -> translation
//! that centres the projected box inside the target rectangle. Page space
//! has Y growing downward, so the projected Y axis is flipped.

use geo::MapCoords;

use crate::error::{Error, Result};
use crate::geometry::{Coord, Geometry, Polygon, Rect};

/// Web Mercator bounds in meters (EPSG:3857).
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Maximum latitude that can be represented in Web Mercator.
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Geographic-to-planar projection.
///
/// ## Rust Lesson #24: Traits as seams
///
/// A trait is an interface. `CoordTransformer` stores a `Box<dyn Projection>`
/// so callers can plug in any projection without the transformer knowing
/// which one. `Send + Sync` lets the transformer be shared across threads.
pub trait Projection: Send + Sync + std::fmt::Debug {
    /// Project a (lon, lat) coordinate into planar (x, y) with y pointing north.
    fn project(&self, c: Coord) -> Coord;

    /// Inverse of [`project`](Self::project).
    fn unproject(&self, c: Coord) -> Coord;
}

/// Spherical Web Mercator (EPSG:4326 -> EPSG:3857).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl Projection for WebMercator {
    #[inline]
    fn project(&self, c: Coord) -> Coord {
        let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let x = c.x * EARTH_MERCATOR_MAX / 180.0;
        let lat_rad = lat.to_radians();
        let y = (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() * EARTH_MERCATOR_MAX / std::f64::consts::PI;
        Coord { x, y }
    }

    #[inline]
    fn unproject(&self, c: Coord) -> Coord {
        let lon = c.x * 180.0 / EARTH_MERCATOR_MAX;
        let lat = (c.y * std::f64::consts::PI / EARTH_MERCATOR_MAX).sinh().atan().to_degrees();
        Coord { x: lon, y: lat }
    }
}

/// Pass-through projection, for inputs that are already planar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planar;

impl Projection for Planar {
    #[inline]
    fn project(&self, c: Coord) -> Coord {
        c
    }

    #[inline]
    fn unproject(&self, c: Coord) -> Coord {
        c
    }
}

/// Fixed parameters mapping one geographic region onto one page rectangle.
///
/// Immutable after construction; there are no setters.
#[derive(Debug)]
pub struct CoordTransformer {
    projection: Box<dyn Projection>,
    /// Projected bounding box of the region
    source: Rect,
    /// Target rectangle in page millimetres
    target: Rect,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl CoordTransformer {
    /// Fit `region_bbox` (in the projection's input space) into `target`.
    ///
    /// `inset` multiplies the fitted scale; `1.0` touches the target on the
    /// tight axis, smaller values leave a margin around the region.
    pub fn new(
        region_bbox: Rect,
        target: Rect,
        projection: Box<dyn Projection>,
        inset: f64,
    ) -> Result<Self> {
        let a = projection.project(region_bbox.min());
        let b = projection.project(region_bbox.max());
        let source = Rect::new(a, b);

        let width = source.width();
        let height = source.height();
        let degenerate = |v: f64| !v.is_finite() || v <= 0.0;
        if degenerate(width) || degenerate(height) || degenerate(target.width()) || degenerate(target.height()) {
            return Err(Error::DegenerateRegion { width, height });
        }

        let sx = target.width() / width;
        let sy = target.height() / height;
        let scale = sx.min(sy) * inset;

        let projected_w = width * scale;
        let projected_h = height * scale;
        let offset_x = target.min().x + (target.width() - projected_w) / 2.0;
        let offset_y = target.min().y + (target.height() - projected_h) / 2.0;

        Ok(Self {
            projection,
            source,
            target,
            scale,
            offset_x,
            offset_y,
        })
    }

    /// Web Mercator transformer with no inset.
    pub fn web_mercator(region_bbox: Rect, target: Rect) -> Result<Self> {
        Self::new(region_bbox, target, Box::new(WebMercator), 1.0)
    }

    /// Uniform scale factor (page units per projected unit).
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Target rectangle in page units.
    pub fn target(&self) -> Rect {
        self.target
    }

    /// Page-space box the region's bounding box maps onto.
    pub fn fitted_rect(&self) -> Rect {
        Rect::new(
            self.planar_to_page(Coord { x: self.source.min().x, y: self.source.max().y }),
            self.planar_to_page(Coord { x: self.source.max().x, y: self.source.min().y }),
        )
    }

    /// Convert a projected-space length into page units.
    #[inline]
    pub fn to_page_length(&self, projected: f64) -> f64 {
        projected * self.scale
    }

    /// Apply scale + translation to an already projected coordinate.
    #[inline]
    pub fn planar_to_page(&self, c: Coord) -> Coord {
        Coord {
            x: (c.x - self.source.min().x) * self.scale + self.offset_x,
            y: (self.source.max().y - c.y) * self.scale + self.offset_y,
        }
    }

    /// Map one geographic coordinate to page space.
    #[inline]
    pub fn project_coord(&self, c: Coord) -> Coord {
        self.planar_to_page(self.projection.project(c))
    }

    /// Inverse of [`planar_to_page`](Self::planar_to_page).
    #[inline]
    pub fn page_to_planar(&self, c: Coord) -> Coord {
        Coord {
            x: (c.x - self.offset_x) / self.scale + self.source.min().x,
            y: self.source.max().y - (c.y - self.offset_y) / self.scale,
        }
    }

    /// Geographic box covering a page-space rectangle.
    ///
    /// Used to ask geometry sources for everything that can land on the page.
    pub fn geographic_bounds(&self, page: Rect) -> Rect {
        let a = self.projection.unproject(self.page_to_planar(page.min()));
        let b = self.projection.unproject(self.page_to_planar(page.max()));
        Rect::new(a, b)
    }

    /// Map every coordinate of a geometry to page space.
    ///
    /// Pure and deterministic: the same geometry and transformer always give
    /// bit-identical output.
    pub fn project(&self, geometry: &Geometry) -> Geometry {
        geometry.map_coords(|c| self.project_coord(c))
    }

    /// Typed variant of [`project`](Self::project) for polygons.
    pub fn project_polygon(&self, polygon: &Polygon) -> Polygon {
        polygon.map_coords(|c| self.project_coord(c))
    }
}

// ============================================================================
// TESTS
// ============================================================================
