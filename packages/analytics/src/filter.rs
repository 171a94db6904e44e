//! Sample filtering ahead of aggregation and color assignment.
//!
//! Each list criterion accepts everything when empty. County and postal
//! town criteria are matched against the postcode table entry of the
//! sample's postcode.

use chrono::NaiveDate;
use mimosa_location::PostcodeTable;
use mimosa_location::validation::parse_sample_date;
use mimosa_sample_models::{SampleFeature, SampleProperties};
use serde::{Deserialize, Serialize};

/// Inclusive collection date range. Without an `end` the range covers the
/// `start` day only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        let end = self.end.unwrap_or(self.start);
        self.start <= date && date <= end
    }
}

/// Criteria narrowing the sample set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleFilter {
    pub analysis_profile: Option<String>,
    pub ids: Vec<String>,
    pub post_codes: Vec<String>,
    pub hospitals: Vec<String>,
    /// MLST sequence types.
    pub sequence_types: Vec<String>,
    pub counties: Vec<String>,
    pub postal_towns: Vec<String>,
    pub date_range: Option<DateRange>,
}

fn accepts(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}

impl SampleFilter {
    /// Returns `true` if no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Checks one sample against every criterion.
    #[must_use]
    pub fn matches(&self, sample: &SampleProperties, postcodes: &PostcodeTable) -> bool {
        if self
            .analysis_profile
            .as_ref()
            .is_some_and(|profile| *profile != sample.analysis_profile)
        {
            return false;
        }

        if !accepts(&self.ids, Some(sample.id.as_str()))
            || !accepts(&self.post_codes, sample.post_code.as_deref())
            || !accepts(&self.hospitals, sample.hospital.as_deref())
            || !accepts(&self.sequence_types, sample.st.as_deref())
        {
            return false;
        }

        if !self.counties.is_empty() || !self.postal_towns.is_empty() {
            let entry = sample.post_code.as_deref().and_then(|pc| postcodes.get(pc));
            if !accepts(&self.counties, entry.and_then(|e| e.county()))
                || !accepts(
                    &self.postal_towns,
                    entry.and_then(|e| e.postal_town.as_deref()),
                )
            {
                return false;
            }
        }

        if let Some(range) = &self.date_range {
            match parse_sample_date(&sample.date) {
                Some(date) if range.contains(date) => {}
                _ => return false,
            }
        }

        true
    }

    /// Returns the samples that pass the filter, in input order.
    #[must_use]
    pub fn apply(
        &self,
        samples: &[SampleFeature],
        postcodes: &PostcodeTable,
    ) -> Vec<SampleFeature> {
        let filtered: Vec<SampleFeature> = samples
            .iter()
            .filter(|sample| self.matches(&sample.properties, postcodes))
            .cloned()
            .collect();

        log::debug!("Filter kept {} of {} samples", filtered.len(), samples.len());

        filtered
    }
}
