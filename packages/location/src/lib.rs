#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static location lookup for samples.
//!
//! Samples are never geocoded. A postcode resolves through the postcode
//! table to a coordinate pair and county; a hospital resolves to its
//! postcode through the hospital table first. A missing key is a normal
//! outcome: the sample is left out of geographic aggregation but stays in
//! every other view.

pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mimosa_sample_models::SampleProperties;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// County value used by the postcode table for "no county assigned".
const NO_COUNTY: &str = "0";

/// Errors that can occur while loading lookup tables.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    /// The table file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The table is not valid JSON or has the wrong shape.
    #[error("Invalid lookup table: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which location key a view resolves samples by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LocationMode {
    /// Resolve by the sample's `PostCode`.
    #[default]
    PostCode,
    /// Resolve by the sample's `Hospital`, joined through its postcode.
    Hospital,
}

/// One row of the postcode table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEntry {
    /// `[lat, lon]`.
    pub coordinates: [f64; 2],
    #[serde(rename = "County", default)]
    pub county: String,
    #[serde(rename = "postaltown", default)]
    pub postal_town: Option<String>,
}

impl LocationEntry {
    /// County name, or `None` when the table marks the postcode as
    /// unassigned.
    #[must_use]
    pub fn county(&self) -> Option<&str> {
        let county = self.county.trim();
        if county.is_empty() || county == NO_COUNTY {
            None
        } else {
            Some(county)
        }
    }
}

/// One row of the hospital table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalEntry {
    #[serde(rename = "PostCode")]
    pub post_code: String,
}

/// Postcode (`"SE-75185"`) -> [`LocationEntry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostcodeTable(BTreeMap<String, LocationEntry>);

impl PostcodeTable {
    /// Parses the table from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Json`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, LocationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses the table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LocationError> {
        let table = Self::from_json(&read_table(path)?)?;
        log::info!("Loaded {} postcodes from {}", table.len(), path.display());
        Ok(table)
    }

    #[must_use]
    pub fn get(&self, post_code: &str) -> Option<&LocationEntry> {
        self.0.get(post_code)
    }

    #[must_use]
    pub fn contains(&self, post_code: &str) -> bool {
        self.0.contains_key(post_code)
    }

    pub fn insert(&mut self, post_code: impl Into<String>, entry: LocationEntry) {
        self.0.insert(post_code.into(), entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Hospital name -> [`HospitalEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HospitalTable(BTreeMap<String, HospitalEntry>);

impl HospitalTable {
    /// Parses the table from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::Json`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, LocationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses the table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, LocationError> {
        let table = Self::from_json(&read_table(path)?)?;
        log::info!("Loaded {} hospitals from {}", table.len(), path.display());
        Ok(table)
    }

    #[must_use]
    pub fn get(&self, hospital: &str) -> Option<&HospitalEntry> {
        self.0.get(hospital)
    }

    pub fn insert(&mut self, hospital: impl Into<String>, post_code: impl Into<String>) {
        self.0.insert(
            hospital.into(),
            HospitalEntry {
                post_code: post_code.into(),
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn read_table(path: &Path) -> Result<String, LocationError> {
    std::fs::read_to_string(path).map_err(|source| LocationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// A successfully resolved sample location.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation<'a> {
    /// Postcode the lookup went through.
    pub post_code: &'a str,
    pub lat: f64,
    pub lon: f64,
    /// County recorded in the postcode table, if assigned.
    pub county: Option<&'a str>,
    pub postal_town: Option<&'a str>,
}

/// Resolves sample location keys against the static lookup tables.
#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    postcodes: PostcodeTable,
    hospitals: HospitalTable,
}

impl LocationResolver {
    #[must_use]
    pub const fn new(postcodes: PostcodeTable, hospitals: HospitalTable) -> Self {
        Self {
            postcodes,
            hospitals,
        }
    }

    #[must_use]
    pub const fn postcodes(&self) -> &PostcodeTable {
        &self.postcodes
    }

    #[must_use]
    pub const fn hospitals(&self) -> &HospitalTable {
        &self.hospitals
    }

    /// Looks up a postcode.
    #[must_use]
    pub fn resolve_post_code(&self, post_code: &str) -> Option<ResolvedLocation<'_>> {
        let (key, entry) = self.postcodes.0.get_key_value(post_code)?;
        let [lat, lon] = entry.coordinates;
        Some(ResolvedLocation {
            post_code: key,
            lat,
            lon,
            county: entry.county(),
            postal_town: entry.postal_town.as_deref(),
        })
    }

    /// Looks up a hospital through its postcode.
    #[must_use]
    pub fn resolve_hospital(&self, hospital: &str) -> Option<ResolvedLocation<'_>> {
        let entry = self.hospitals.get(hospital)?;
        let resolved = self.resolve_post_code(&entry.post_code);
        if resolved.is_none() {
            log::debug!(
                "Hospital {hospital} maps to postcode {} which is not in the postcode table",
                entry.post_code
            );
        }
        resolved
    }

    /// Resolves a sample by the key `mode` selects.
    ///
    /// Returns `None` if the key is absent from the sample or from the
    /// lookup tables.
    #[must_use]
    pub fn resolve<'a>(
        &'a self,
        sample: &SampleProperties,
        mode: LocationMode,
    ) -> Option<ResolvedLocation<'a>> {
        let resolved = match mode {
            LocationMode::PostCode => self.resolve_post_code(sample.post_code.as_deref()?),
            LocationMode::Hospital => self.resolve_hospital(sample.hospital.as_deref()?),
        };
        if resolved.is_none() {
            log::debug!("No {mode} location for sample {}", sample.id);
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> LocationResolver {
        let postcodes = PostcodeTable::from_json(
            r#"{
                "SE-75185": { "coordinates": [59.8498, 17.6389], "County": "Uppsala", "postaltown": "Uppsala" },
                "SE-70185": { "coordinates": [59.2741, 15.2066], "County": "Örebro", "postaltown": "Örebro" },
                "SE-99999": { "coordinates": [0.0, 0.0], "County": "0", "postaltown": "Nowhere" }
            }"#,
        )
        .unwrap();
        let hospitals = HospitalTable::from_json(
            r#"{
                "Akademiska sjukhuset": { "PostCode": "SE-75185" },
                "Ghost Hospital": { "PostCode": "SE-00000" }
            }"#,
        )
        .unwrap();
        LocationResolver::new(postcodes, hospitals)
    }

    fn sample(post_code: Option<&str>, hospital: Option<&str>) -> SampleProperties {
        SampleProperties {
            id: "S1".to_string(),
            post_code: post_code.map(str::to_string),
            hospital: hospital.map(str::to_string),
            ..SampleProperties::default()
        }
    }

    #[test]
    fn resolves_post_code() {
        let resolver = resolver();
        let loc = resolver.resolve_post_code("SE-75185").unwrap();
        assert!((loc.lat - 59.8498).abs() < f64::EPSILON);
        assert!((loc.lon - 17.6389).abs() < f64::EPSILON);
        assert_eq!(loc.county, Some("Uppsala"));
        assert_eq!(loc.postal_town, Some("Uppsala"));
    }

    #[test]
    fn zero_county_means_unassigned() {
        let resolver = resolver();
        let loc = resolver.resolve_post_code("SE-99999").unwrap();
        assert_eq!(loc.county, None);
    }

    #[test]
    fn resolves_hospital_through_post_code() {
        let resolver = resolver();
        let loc = resolver.resolve_hospital("Akademiska sjukhuset").unwrap();
        assert_eq!(loc.post_code, "SE-75185");
        assert_eq!(loc.county, Some("Uppsala"));
    }

    #[test]
    fn hospital_with_unknown_post_code_is_not_found() {
        assert!(resolver().resolve_hospital("Ghost Hospital").is_none());
    }

    #[test]
    fn resolve_uses_mode_key() {
        let resolver = resolver();
        let props = sample(Some("SE-70185"), Some("Akademiska sjukhuset"));

        let by_post_code = resolver.resolve(&props, LocationMode::PostCode).unwrap();
        assert_eq!(by_post_code.county, Some("Örebro"));

        let by_hospital = resolver.resolve(&props, LocationMode::Hospital).unwrap();
        assert_eq!(by_hospital.county, Some("Uppsala"));
    }

    #[test]
    fn missing_keys_are_not_found() {
        let resolver = resolver();
        assert!(resolver.resolve(&sample(None, None), LocationMode::PostCode).is_none());
        assert!(resolver.resolve(&sample(None, None), LocationMode::Hospital).is_none());
        assert!(
            resolver
                .resolve(&sample(Some("SE-12345"), None), LocationMode::PostCode)
                .is_none()
        );
    }

    #[test]
    fn parses_location_mode() {
        assert_eq!("postcode".parse::<LocationMode>().unwrap(), LocationMode::PostCode);
        assert_eq!("Hospital".parse::<LocationMode>().unwrap(), LocationMode::Hospital);
        assert_eq!(LocationMode::Hospital.to_string(), "hospital");
        assert!("county".parse::<LocationMode>().is_err());
    }

    #[test]
    fn rejects_malformed_table() {
        assert!(matches!(
            PostcodeTable::from_json("[1, 2, 3]"),
            Err(LocationError::Json(_))
        ));
    }
}
