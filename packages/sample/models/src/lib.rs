#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sample feature and aggregation types.
//!
//! These types mirror the documents handed to the analysis core by the
//! storage layer: a flat list of sample features, each carrying a location
//! key, a collection date, a cluster identifier, and an analysis profile.
//! The `County` and `Color` properties are derived by the core and are
//! overwritten on every annotation pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Sentinel used both for unresolved counties and for samples without a
/// cluster assignment.
pub const UNKNOWN: &str = "Unknown";

/// Substring marking a cluster identifier as a singleton (matched
/// case-insensitively).
pub const SINGLETON_MARKER: &str = "singleton";

/// What a cluster identifier stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterKind {
    /// No cluster assignment (`"Unknown"` or empty).
    Unknown,
    /// The sample clusters with no other sample.
    Singleton,
    /// A real strain-typing cluster.
    Cluster,
}

/// A strain-typing cluster label assigned by the upstream pipeline.
///
/// Only comparable within the same analysis profile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classifies the identifier.
    ///
    /// The singleton check is a case-insensitive substring match on the raw
    /// label, so an ordinary cluster whose name happens to contain
    /// "singleton" is classified as a singleton as well.
    #[must_use]
    pub fn kind(&self) -> ClusterKind {
        let trimmed = self.0.trim();
        if trimmed.is_empty() || self.0 == UNKNOWN {
            ClusterKind::Unknown
        } else if trimmed.to_lowercase().contains(SINGLETON_MARKER) {
            ClusterKind::Singleton
        } else {
            ClusterKind::Cluster
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.kind() == ClusterKind::Unknown
    }
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClusterId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The `properties` object of a sample feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleProperties {
    /// Sample identifier.
    #[serde(rename = "ID", default)]
    pub id: String,
    /// Postal code in `"<CC>-<5 digits>"` form (e.g. `"SE-75185"`).
    #[serde(rename = "PostCode", default, skip_serializing_if = "Option::is_none")]
    pub post_code: Option<String>,
    /// Name of the submitting hospital.
    #[serde(rename = "Hospital", default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    /// Collection date (`YYYY-MM-DD`). `null` reads as empty.
    #[serde(rename = "Date", default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(rename = "Cluster_ID", alias = "ClusterID", default)]
    pub cluster_id: ClusterId,
    /// Typing scheme namespace (e.g. `"staphylococcus_aureus"`).
    #[serde(rename = "analysis_profile", alias = "AnalysisProfile", default)]
    pub analysis_profile: String,
    /// MLST sequence type. Typing pipelines emit it as a string or a
    /// number; both are kept as text.
    #[serde(
        rename = "ST",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub st: Option<String>,
    /// Derived: attributed county name.
    #[serde(rename = "County", default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    /// Derived: display color.
    #[serde(rename = "Color", default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Any other properties, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(value) => Some(value),
        value @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)) => {
            Some(value.to_string())
        }
        other => {
            return Err(D::Error::custom(format!(
                "expected a string or number for ST, got {other}"
            )));
        }
    })
}

/// A sample as delivered by the storage layer.
///
/// Geometry is not consulted by the core; coordinates come from the
/// postcode and hospital tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleFeature {
    #[serde(rename = "type", default = "feature_type")]
    pub feature_type: String,
    pub properties: SampleProperties,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub geometry: serde_json::Value,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl SampleFeature {
    #[must_use]
    pub fn new(properties: SampleProperties) -> Self {
        Self {
            feature_type: feature_type(),
            properties,
            geometry: serde_json::Value::Null,
        }
    }
}

/// Per-county case counts for one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyCount {
    /// Number of samples attributed to the county.
    pub total: u64,
    /// Samples per cluster identifier.
    #[serde(rename = "Cluster_ID")]
    pub clusters: BTreeMap<ClusterId, u64>,
}

impl CountyCount {
    /// Sum of the per-cluster counts. Always equal to [`Self::total`] for
    /// counts built through [`CountyCounts::record`].
    #[must_use]
    pub fn cluster_sum(&self) -> u64 {
        self.clusters.values().sum()
    }
}

/// County name -> [`CountyCount`].
///
/// Always built from scratch for the current sample set; there is no
/// incremental update path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountyCounts(BTreeMap<String, CountyCount>);

impl CountyCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one sample of `cluster_id` in `county`.
    pub fn record(&mut self, county: &str, cluster_id: &ClusterId) {
        let entry = self.0.entry(county.to_string()).or_default();
        entry.total += 1;
        *entry.clusters.entry(cluster_id.clone()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn get(&self, county: &str) -> Option<&CountyCount> {
        self.0.get(county)
    }

    /// Iterates counties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CountyCount)> {
        self.0.iter().map(|(name, count)| (name.as_str(), count))
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

impl From<BTreeMap<String, CountyCount>> for CountyCounts {
    fn from(map: BTreeMap<String, CountyCount>) -> Self {
        Self(map)
    }
}

/// One county's share of an outbreak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyContribution {
    pub county: String,
    pub count: u64,
}

/// A cluster whose aggregate case count across counties meets the
/// outbreak threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutbreakEntry {
    pub cluster_id: ClusterId,
    /// Sum of [`Self::counties`] counts.
    pub total: u64,
    /// Contributing counties in order of first encounter.
    pub counties: Vec<CountyContribution>,
}

impl OutbreakEntry {
    /// One-line narrative, e.g. `"Cluster C1: 3 cases in Uppsala and Örebro"`.
    #[must_use]
    pub fn message(&self) -> String {
        let names: Vec<&str> = self.counties.iter().map(|c| c.county.as_str()).collect();
        let places = match names.as_slice() {
            [] => String::new(),
            [only] => (*only).to_string(),
            [head @ .., last] => format!("{} and {last}", head.join(", ")),
        };
        let noun = if self.total == 1 { "case" } else { "cases" };

        if places.is_empty() {
            format!("Cluster {}: {} {noun}", self.cluster_id, self.total)
        } else {
            format!("Cluster {}: {} {noun} in {places}", self.cluster_id, self.total)
        }
    }
}

/// Pairwise distance payload for one analysis profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistancePayload {
    #[serde(default)]
    pub samples: Vec<String>,
    #[serde(default)]
    pub matrix: Vec<Vec<f64>>,
    #[serde(default)]
    pub newick: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_cluster_ids() {
        assert_eq!(ClusterId::new("Unknown").kind(), ClusterKind::Unknown);
        assert_eq!(ClusterId::new("").kind(), ClusterKind::Unknown);
        assert_eq!(ClusterId::new("Singleton-7").kind(), ClusterKind::Singleton);
        assert_eq!(ClusterId::new("st8_SINGLETON").kind(), ClusterKind::Singleton);
        assert_eq!(ClusterId::new("C12").kind(), ClusterKind::Cluster);
        // "unknown" in lowercase is an ordinary label
        assert_eq!(ClusterId::new("unknown").kind(), ClusterKind::Cluster);
    }

    #[test]
    fn county_total_matches_cluster_sum() {
        let mut counts = CountyCounts::new();
        counts.record("Uppsala", &ClusterId::new("C1"));
        counts.record("Uppsala", &ClusterId::new("C1"));
        counts.record("Uppsala", &ClusterId::new("C2"));
        counts.record("Örebro", &ClusterId::new("C1"));

        for (_, count) in counts.iter() {
            assert_eq!(count.total, count.cluster_sum());
        }
        let uppsala = counts.get("Uppsala").unwrap();
        assert_eq!(uppsala.total, 3);
        assert_eq!(uppsala.clusters[&ClusterId::new("C1")], 2);
    }

    #[test]
    fn deserializes_wire_names() {
        let value = serde_json::json!({
            "type": "Feature",
            "properties": {
                "ID": "S1",
                "PostCode": "SE-75185",
                "Date": "2024-03-01",
                "ClusterID": "C4",
                "AnalysisProfile": "staphylococcus_aureus",
                "QC_Status": "passed"
            },
            "geometry": { "type": "Point", "coordinates": [] }
        });
        let feature: SampleFeature = serde_json::from_value(value).unwrap();
        let props = &feature.properties;
        assert_eq!(props.id, "S1");
        assert_eq!(props.post_code.as_deref(), Some("SE-75185"));
        assert_eq!(props.hospital, None);
        assert_eq!(props.cluster_id, ClusterId::new("C4"));
        assert_eq!(props.analysis_profile, "staphylococcus_aureus");
        assert!(props.county.is_none());
    }

    #[test]
    fn missing_cluster_defaults_to_unknown() {
        let value = serde_json::json!({ "properties": { "ID": "S2" } });
        let feature: SampleFeature = serde_json::from_value(value).unwrap();
        assert!(feature.properties.cluster_id.is_unknown());
    }

    #[test]
    fn accepts_numeric_sequence_type_and_null_date() {
        let value = serde_json::json!({
            "properties": { "ID": "S3", "ST": 8, "Date": null, "Cluster_ID": "C1" }
        });
        let feature: SampleFeature = serde_json::from_value(value).unwrap();
        assert_eq!(feature.properties.st.as_deref(), Some("8"));
        assert_eq!(feature.properties.date, "");
        assert_eq!(feature.properties.cluster_id, ClusterId::new("C1"));

        let value = serde_json::json!({ "properties": { "ID": "S4", "ST": "22" } });
        let feature: SampleFeature = serde_json::from_value(value).unwrap();
        assert_eq!(feature.properties.st.as_deref(), Some("22"));

        let value = serde_json::json!({ "properties": { "ID": "S5", "ST": null } });
        let feature: SampleFeature = serde_json::from_value(value).unwrap();
        assert_eq!(feature.properties.st, None);

        let value = serde_json::json!({ "properties": { "ID": "S6", "ST": [8] } });
        assert!(serde_json::from_value::<SampleFeature>(value).is_err());
    }

    #[test]
    fn narrates_outbreaks() {
        let contribution = |county: &str, count| CountyContribution {
            county: county.to_string(),
            count,
        };
        let mut entry = OutbreakEntry {
            cluster_id: ClusterId::new("C1"),
            total: 2,
            counties: vec![contribution("A", 2)],
        };
        assert_eq!(entry.message(), "Cluster C1: 2 cases in A");

        entry.total = 5;
        entry.counties = vec![contribution("A", 3), contribution("B", 2)];
        assert_eq!(entry.message(), "Cluster C1: 5 cases in A and B");

        entry.total = 6;
        entry.counties.push(contribution("C", 1));
        assert_eq!(entry.message(), "Cluster C1: 6 cases in A, B and C");
    }

    #[test]
    fn outbreak_entry_uses_camel_case() {
        let entry = OutbreakEntry {
            cluster_id: ClusterId::new("C1"),
            total: 3,
            counties: vec![CountyContribution {
                county: "A".to_string(),
                count: 3,
            }],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["clusterId"], "C1");
        assert_eq!(json["counties"][0]["county"], "A");
    }
}
