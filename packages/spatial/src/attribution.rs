//! County attribution pass over a sample set.
//!
//! Every call walks the full sample list and rebuilds [`CountyCounts`]
//! from nothing. Samples whose location cannot be resolved, or whose
//! coordinate falls outside every boundary, are tagged `"Unknown"` and
//! left out of the counts.

use geo::Point;
use mimosa_location::{LocationMode, LocationResolver};
use mimosa_sample_models::{CountyCounts, SampleFeature, SampleProperties, UNKNOWN};

use crate::CountyLookup;

/// Resolves a sample to its county name.
fn attribute_sample<'a, L: CountyLookup + ?Sized>(
    sample: &SampleProperties,
    resolver: &LocationResolver,
    lookup: &'a L,
    mode: LocationMode,
) -> Option<&'a str> {
    let location = resolver.resolve(sample, mode)?;
    let county = lookup.attribute_county(Point::new(location.lon, location.lat));
    if county.is_none() {
        log::debug!(
            "Sample {} at ({}, {}) is outside every county boundary",
            sample.id,
            location.lat,
            location.lon
        );
    }
    county.filter(|name| *name != UNKNOWN)
}

/// Tags every sample with its county (or `"Unknown"`) and returns the
/// counts for the attributed ones.
pub fn annotate_counties<L: CountyLookup + ?Sized>(
    samples: &mut [SampleFeature],
    resolver: &LocationResolver,
    lookup: &L,
    mode: LocationMode,
) -> CountyCounts {
    let mut counts = CountyCounts::new();
    let mut unattributed = 0_usize;

    for sample in samples.iter_mut() {
        let props = &mut sample.properties;
        let county = attribute_sample(props, resolver, lookup, mode);

        if let Some(county) = county {
            counts.record(county, &props.cluster_id);
            props.county = Some(county.to_string());
        } else {
            unattributed += 1;
            props.county = Some(UNKNOWN.to_string());
        }
    }

    if unattributed > 0 {
        log::info!(
            "{unattributed} of {} samples could not be attributed to a county",
            samples.len()
        );
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CountyIndex;
    use crate::tests::square;
    use mimosa_location::{HospitalTable, LocationEntry, PostcodeTable};
    use mimosa_sample_models::ClusterId;

    fn resolver() -> LocationResolver {
        let mut postcodes = PostcodeTable::default();
        for (code, lat, lon, county) in [
            ("SE-00001", 1.0, 1.0, "A"),
            ("SE-00002", 2.0, 2.0, "A"),
            ("SE-00011", 1.0, 11.0, "B"),
            ("SE-99999", 50.0, 50.0, "0"),
        ] {
            postcodes.insert(
                code,
                LocationEntry {
                    coordinates: [lat, lon],
                    county: county.to_string(),
                    postal_town: None,
                },
            );
        }
        let mut hospitals = HospitalTable::default();
        hospitals.insert("Hospital B", "SE-00011");
        LocationResolver::new(postcodes, hospitals)
    }

    fn index() -> CountyIndex {
        CountyIndex::new(vec![square("A", 0.0, 0.0, 10.0), square("B", 10.5, 0.0, 10.0)])
    }

    fn sample(id: &str, post_code: &str, hospital: &str, cluster: &str) -> SampleFeature {
        SampleFeature::new(SampleProperties {
            id: id.to_string(),
            post_code: Some(post_code.to_string()),
            hospital: Some(hospital.to_string()),
            cluster_id: ClusterId::new(cluster),
            analysis_profile: "staphylococcus_aureus".to_string(),
            ..SampleProperties::default()
        })
    }

    fn county_counts(
        samples: &[SampleFeature],
        resolver: &LocationResolver,
        index: &CountyIndex,
        mode: LocationMode,
    ) -> CountyCounts {
        let mut samples = samples.to_vec();
        annotate_counties(&mut samples, resolver, index, mode)
    }

    fn samples() -> Vec<SampleFeature> {
        vec![
            sample("S1", "SE-00001", "Hospital B", "C1"),
            sample("S2", "SE-00002", "Hospital B", "C1"),
            sample("S3", "SE-00002", "Hospital B", "C2"),
            sample("S4", "SE-00011", "Hospital B", "C1"),
            // resolves, but lies outside both boundaries
            sample("S5", "SE-99999", "Nowhere", "C1"),
            // postcode not in the table
            sample("S6", "SE-12345", "Nowhere", "C1"),
        ]
    }

    #[test]
    fn counts_samples_per_county_and_cluster() {
        let counts = county_counts(&samples(), &resolver(), &index(), LocationMode::PostCode);

        assert_eq!(counts.len(), 2);
        let a = counts.get("A").unwrap();
        assert_eq!(a.total, 3);
        assert_eq!(a.clusters[&ClusterId::new("C1")], 2);
        assert_eq!(a.clusters[&ClusterId::new("C2")], 1);
        let b = counts.get("B").unwrap();
        assert_eq!(b.total, 1);
        assert_eq!(b.clusters[&ClusterId::new("C1")], 1);

        for (_, count) in counts.iter() {
            assert_eq!(count.total, count.cluster_sum());
        }
    }

    #[test]
    fn hospital_mode_resolves_through_hospital_table() {
        let counts = county_counts(&samples(), &resolver(), &index(), LocationMode::Hospital);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("B").unwrap().total, 4);
    }

    #[test]
    fn annotates_unresolved_samples_as_unknown() {
        let mut samples = samples();
        let counts = annotate_counties(&mut samples, &resolver(), &index(), LocationMode::PostCode);

        let counties: Vec<&str> = samples
            .iter()
            .map(|s| s.properties.county.as_deref().unwrap())
            .collect();
        assert_eq!(counties, vec!["A", "A", "A", "B", UNKNOWN, UNKNOWN]);
        assert_eq!(
            counts,
            county_counts(&samples, &resolver(), &index(), LocationMode::PostCode)
        );
    }

    #[test]
    fn recomputes_from_scratch() {
        let resolver = resolver();
        let index = index();
        let all = samples();

        let full = county_counts(&all, &resolver, &index, LocationMode::PostCode);
        let subset = county_counts(&all[..1], &resolver, &index, LocationMode::PostCode);
        let again = county_counts(&all, &resolver, &index, LocationMode::PostCode);

        assert_eq!(subset.get("A").unwrap().total, 1);
        assert!(subset.get("B").is_none());
        assert_eq!(full, again);
    }

    #[test]
    fn empty_input_yields_empty_counts() {
        let counts = county_counts(&[], &resolver(), &index(), LocationMode::PostCode);
        assert!(counts.is_empty());
    }
}
