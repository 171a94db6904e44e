//! Full recompute of a view: filter, attribute, count, color, detect.
//!
//! Every refresh starts from the raw sample set. Nothing is carried over
//! between refreshes; the color state is rebuilt from the filtered
//! samples each time.

use std::path::Path;

use chrono::NaiveDate;
use mimosa_analytics::color::LegendEntry;
use mimosa_analytics::{
    AnalyticsConfig, ClusterColorAssigner, ColorAssignmentState, SampleFilter, detect_outbreaks,
};
use mimosa_location::validation::validate_sample;
use mimosa_location::{LocationMode, LocationResolver};
use mimosa_sample_models::{CountyCounts, OutbreakEntry, SampleFeature};
use mimosa_spatial::{CountyLookup, annotate_counties};
use serde::{Deserialize, Serialize};

/// Sample input as either a bare feature array or a `FeatureCollection`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SampleInput {
    Features(Vec<SampleFeature>),
    Collection { features: Vec<SampleFeature> },
}

/// Parses sample features from JSON.
///
/// # Errors
///
/// Returns an error if the JSON is neither a feature array nor a feature
/// collection.
pub fn parse_samples(json: &str) -> Result<Vec<SampleFeature>, serde_json::Error> {
    let input: SampleInput = serde_json::from_str(json)?;
    Ok(match input {
        SampleInput::Features(features) | SampleInput::Collection { features } => features,
    })
}

/// Reads sample features from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_samples(path: &Path) -> Result<Vec<SampleFeature>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let samples = parse_samples(&contents)?;
    log::info!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

/// Derived state of one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refresh {
    /// Filtered samples with `County` and `Color` filled in.
    pub samples: Vec<SampleFeature>,
    pub county_counts: CountyCounts,
    pub outbreaks: Vec<OutbreakEntry>,
    pub legend: Vec<LegendEntry>,
}

/// Static inputs shared by every refresh of a view.
pub struct Pipeline<L> {
    resolver: LocationResolver,
    lookup: L,
    mode: LocationMode,
    colors: ClusterColorAssigner,
    min_cases: u64,
}

impl<L: CountyLookup> Pipeline<L> {
    #[must_use]
    pub fn new(
        config: &AnalyticsConfig,
        resolver: LocationResolver,
        lookup: L,
        mode: LocationMode,
    ) -> Self {
        Self {
            resolver,
            lookup,
            mode,
            colors: ClusterColorAssigner::new(&config.colors),
            min_cases: config.outbreak.min_cases,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> LocationMode {
        self.mode
    }

    /// Checks the postcode and date of every sample and logs the failures.
    ///
    /// Flagged samples stay in the set; returns how many were flagged.
    pub fn check_samples(&self, samples: &[SampleFeature], today: NaiveDate) -> usize {
        let mut flagged = 0_usize;

        for sample in samples {
            let errors = validate_sample(&sample.properties, self.resolver.postcodes(), today);
            if errors.is_empty() {
                continue;
            }
            flagged += 1;
            for e in &errors {
                log::warn!("Sample {}: {e}", sample.properties.id);
            }
        }

        if flagged > 0 {
            log::warn!("{flagged} of {} samples failed validation", samples.len());
        }

        flagged
    }

    /// Recomputes everything derived from `samples` under `filter`.
    #[must_use]
    pub fn refresh(&self, samples: &[SampleFeature], filter: &SampleFilter) -> Refresh {
        let mut samples = filter.apply(samples, self.resolver.postcodes());

        let county_counts =
            annotate_counties(&mut samples, &self.resolver, &self.lookup, self.mode);

        let mut state = ColorAssignmentState::new();
        self.colors.annotate_colors(&mut state, &mut samples);
        let legend = state.legend(&self.colors);

        let outbreaks = detect_outbreaks(&county_counts, self.min_cases);
        if !outbreaks.is_empty() {
            log::warn!("{} clusters over the outbreak threshold", outbreaks.len());
        }

        Refresh {
            samples,
            county_counts,
            outbreaks,
            legend,
        }
    }
}
