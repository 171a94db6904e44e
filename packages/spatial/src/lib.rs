#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory county boundary index.
//!
//! Loads named county polygons from a `GeoJSON` feature collection, builds
//! an R-tree over their bounding boxes, and answers point-in-polygon
//! lookups. Boundaries keep the order they were supplied in; when a point
//! falls inside more than one boundary the earliest one wins.

pub mod attribution;

use std::path::{Path, PathBuf};

use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use geojson::{Feature, GeoJson};
use rstar::{AABB, RTree, RTreeObject};

pub use attribution::annotate_counties;

/// Errors that can occur while loading county boundaries.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The boundary file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The input is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[source] Box<geojson::Error>),

    /// The input parsed but holds no features.
    #[error("Expected a GeoJSON Feature or FeatureCollection")]
    NotAFeatureCollection,
}

impl From<geojson::Error> for SpatialError {
    fn from(err: geojson::Error) -> Self {
        Self::GeoJson(Box::new(err))
    }
}

/// A named county polygon in `(lon, lat)` coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyBoundary {
    pub name: String,
    pub polygon: MultiPolygon<f64>,
}

/// Narrow lookup interface used by the aggregation pass.
pub trait CountyLookup {
    /// Name of the county containing `point`, or `None` if no boundary
    /// contains it.
    fn attribute_county(&self, point: Point<f64>) -> Option<&str>;
}

/// A boundary stored in the R-tree along with its supply order.
struct BoundaryEntry {
    order: usize,
    name: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Result of a detailed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution<'a> {
    /// Winning county (earliest supplied boundary containing the point).
    pub county: Option<&'a str>,
    /// Further boundaries that also contain the point, in supply order.
    /// Non-empty only for overlapping or malformed boundary data.
    pub also_matched: Vec<&'a str>,
}

impl Attribution<'_> {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        !self.also_matched.is_empty()
    }
}

/// Pre-built spatial index over county boundaries.
pub struct CountyIndex {
    boundaries: RTree<BoundaryEntry>,
}

impl CountyIndex {
    /// Builds the index from boundaries in priority order.
    #[must_use]
    pub fn new(boundaries: Vec<CountyBoundary>) -> Self {
        let entries = boundaries
            .into_iter()
            .enumerate()
            .map(|(order, boundary)| BoundaryEntry {
                order,
                envelope: compute_envelope(&boundary.polygon),
                name: boundary.name,
                polygon: boundary.polygon,
            })
            .collect();

        Self {
            boundaries: RTree::bulk_load(entries),
        }
    }

    /// Parses a `GeoJSON` string holding county features.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `GeoJSON` or is a bare
    /// geometry.
    pub fn from_geojson_str(geojson_str: &str) -> Result<Self, SpatialError> {
        let geojson: GeoJson = geojson_str.parse()?;
        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => return Err(SpatialError::NotAFeatureCollection),
        };

        let boundaries: Vec<CountyBoundary> =
            features.into_iter().filter_map(feature_to_boundary).collect();

        Ok(Self::new(boundaries))
    }

    /// Reads county features from a `GeoJSON` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SpatialError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SpatialError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_geojson_str(&contents)?;
        log::info!(
            "Loaded {} county boundaries from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.size() == 0
    }

    /// Looks up every boundary containing the point.
    ///
    /// Points on a boundary edge count as inside. A point inside a hole is
    /// outside the polygon.
    #[must_use]
    pub fn attribute_detailed(&self, point: Point<f64>) -> Attribution<'_> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        let mut matches: Vec<&BoundaryEntry> = self
            .boundaries
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&point))
            .collect();
        matches.sort_by_key(|entry| entry.order);

        let mut names = matches.into_iter().map(|entry| entry.name.as_str());
        let county = names.next();

        Attribution {
            county,
            also_matched: names.collect(),
        }
    }
}

impl CountyLookup for CountyIndex {
    fn attribute_county(&self, point: Point<f64>) -> Option<&str> {
        let attribution = self.attribute_detailed(point);
        if attribution.is_ambiguous() {
            log::warn!(
                "Point ({}, {}) lies in {} boundaries; using {:?}, also matched {:?}",
                point.x(),
                point.y(),
                attribution.also_matched.len() + 1,
                attribution.county,
                attribution.also_matched
            );
        }
        attribution.county
    }
}

/// Converts a `GeoJSON` feature with a `name` property and a polygon or
/// multipolygon geometry into a [`CountyBoundary`].
fn feature_to_boundary(feature: Feature) -> Option<CountyBoundary> {
    let Some(name) = feature
        .property("name")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
    else {
        log::warn!("Skipping boundary feature without a name");
        return None;
    };

    let Some(geometry) = feature.geometry else {
        log::warn!("Skipping boundary {name}: no geometry");
        return None;
    };

    let polygon = match geo::Geometry::<f64>::try_from(geometry) {
        Ok(geo::Geometry::MultiPolygon(mp)) => mp,
        Ok(geo::Geometry::Polygon(p)) => MultiPolygon(vec![p]),
        Ok(_) => {
            log::debug!("Skipping boundary {name}: not a polygon");
            return None;
        }
        Err(e) => {
            log::warn!("Failed to convert geometry for boundary {name}: {e}");
            return None;
        }
    };

    Some(CountyBoundary { name, polygon })
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
