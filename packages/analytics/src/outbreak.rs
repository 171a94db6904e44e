//! Outbreak detection over per-county cluster counts.
//!
//! A cluster is an outbreak when its case count summed across all counties
//! reaches the threshold. The gate is on the aggregate: a cluster with one
//! case in each of two counties qualifies just like two cases in one.

use std::collections::BTreeMap;

use mimosa_sample_models::{ClusterId, CountyContribution, CountyCounts, OutbreakEntry};

/// Finds clusters with at least `min_cases` cases across all counties.
///
/// The `"Unknown"` cluster and zero counts are skipped. Entries appear in
/// order of first encounter while walking counties by name, and each
/// entry's counties are listed in the same order.
#[must_use]
pub fn detect_outbreaks(counts: &CountyCounts, min_cases: u64) -> Vec<OutbreakEntry> {
    let mut entries: Vec<OutbreakEntry> = Vec::new();
    let mut positions: BTreeMap<&ClusterId, usize> = BTreeMap::new();

    for (county, county_count) in counts.iter() {
        for (cluster_id, &count) in &county_count.clusters {
            if count == 0 || cluster_id.is_unknown() {
                continue;
            }

            let position = *positions.entry(cluster_id).or_insert_with(|| {
                entries.push(OutbreakEntry {
                    cluster_id: cluster_id.clone(),
                    total: 0,
                    counties: Vec::new(),
                });
                entries.len() - 1
            });

            let entry = &mut entries[position];
            entry.total += count;
            entry.counties.push(CountyContribution {
                county: county.to_string(),
                count,
            });
        }
    }

    entries.retain(|entry| entry.total >= min_cases);

    log::debug!(
        "Detected {} outbreaks across {} counties",
        entries.len(),
        counts.len()
    );

    entries
}

/// Renders outbreak entries as a plain-text alert, or an empty string
/// when there is nothing to report.
#[must_use]
pub fn outbreak_report(entries: &[OutbreakEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut report = String::from("Outbreak Alert!\n");
    for entry in entries {
        report.push_str(&entry.message());
        report.push('\n');
    }
    report
}
