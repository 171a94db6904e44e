//! Deterministic cluster colors.
//!
//! A cluster earns a palette color only once it occurs often enough in the
//! current sample set; until then it shares the neutral default color so a
//! one-off sample does not look like part of a notable group. The palette
//! index is a hash of `"{cluster}-{profile}"`, so the same cluster keeps
//! the same color across refreshes and restarts.

use std::collections::BTreeMap;

use mimosa_sample_models::{ClusterId, ClusterKind, SampleFeature, SampleProperties};
use serde::{Deserialize, Serialize};

use crate::config::ColorConfig;

/// Neutral color for unknown and not-yet-notable clusters.
pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// Color for singleton clusters.
pub const SINGLETON_COLOR: &str = "#D3D3D3";

/// Built-in palette.
pub const DEFAULT_PALETTE: &[&str] = &[
    "#E6194B", "#3CB44B", "#FFE119", "#4363D8", "#F58231", "#911EB4", "#46F0F0", "#F032E6",
    "#BCF60C", "#FABEBE", "#008080", "#E6BEFF", "#9A6324", "#FFFAC8", "#800000", "#AAFFC3",
    "#808000", "#FFD8B1", "#000075", "#808080",
];

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `key`.
#[must_use]
pub fn fnv1a(key: &str) -> u32 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// The string colors are hashed from.
#[must_use]
pub fn color_key(cluster_id: &ClusterId, analysis_profile: &str) -> String {
    format!("{cluster_id}-{analysis_profile}")
}

/// Occurrence counts of every `(cluster, profile)` pair in the current
/// sample set.
///
/// Owned by the caller and rebuilt with [`Self::count_occurrences`] before
/// each round of color lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorAssignmentState {
    /// profile -> cluster -> occurrences
    counts: BTreeMap<String, BTreeMap<ClusterId, u64>>,
}

impl ColorAssignmentState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fresh state from `samples`.
    #[must_use]
    pub fn from_samples(samples: &[SampleFeature]) -> Self {
        let mut state = Self::new();
        state.count_occurrences(samples);
        state
    }

    /// Discards all previous counts and recounts from `samples`.
    ///
    /// Samples with a blank cluster identifier or profile are not counted.
    pub fn count_occurrences(&mut self, samples: &[SampleFeature]) {
        self.counts.clear();

        for sample in samples {
            let props = &sample.properties;
            if props.cluster_id.as_str().is_empty() || props.analysis_profile.is_empty() {
                continue;
            }
            *self
                .counts
                .entry(props.analysis_profile.clone())
                .or_default()
                .entry(props.cluster_id.clone())
                .or_insert(0) += 1;
        }

        log::debug!(
            "Counted occurrences for {} cluster/profile pairs",
            self.counts.values().map(BTreeMap::len).sum::<usize>()
        );
    }

    /// Current occurrence count of a `(cluster, profile)` pair.
    #[must_use]
    pub fn occurrences(&self, cluster_id: &ClusterId, analysis_profile: &str) -> u64 {
        self.counts
            .get(analysis_profile)
            .and_then(|clusters| clusters.get(cluster_id))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Every counted pair with its resolved color, ordered by profile then
    /// cluster.
    #[must_use]
    pub fn legend(&self, assigner: &ClusterColorAssigner) -> Vec<LegendEntry> {
        self.counts
            .iter()
            .flat_map(|(profile, clusters)| {
                clusters.iter().map(move |(cluster_id, &occurrences)| LegendEntry {
                    cluster_id: cluster_id.clone(),
                    analysis_profile: profile.clone(),
                    occurrences,
                    color: assigner.get_color(self, cluster_id, profile, false).to_string(),
                })
            })
            .collect()
    }
}

/// One row of the color legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub cluster_id: ClusterId,
    pub analysis_profile: String,
    pub occurrences: u64,
    pub color: String,
}

/// Maps clusters to colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterColorAssigner {
    default_color: String,
    singleton_color: String,
    min_occurrences: u64,
    palette: Vec<String>,
}

impl Default for ClusterColorAssigner {
    fn default() -> Self {
        Self::new(&ColorConfig::default())
    }
}

impl ClusterColorAssigner {
    /// Builds an assigner from validated color settings.
    #[must_use]
    pub fn new(config: &ColorConfig) -> Self {
        Self {
            default_color: config.default_color.clone(),
            singleton_color: config.singleton_color.clone(),
            min_occurrences: config.min_occurrences,
            palette: config.palette.clone(),
        }
    }

    #[must_use]
    pub fn default_color(&self) -> &str {
        &self.default_color
    }

    #[must_use]
    pub fn singleton_color(&self) -> &str {
        &self.singleton_color
    }

    /// Palette slot for a `(cluster, profile)` pair, ignoring occurrence
    /// counts.
    #[must_use]
    pub fn palette_color(&self, cluster_id: &ClusterId, analysis_profile: &str) -> Option<&str> {
        if self.palette.is_empty() {
            return None;
        }
        let hash = fnv1a(&color_key(cluster_id, analysis_profile));
        let index = usize::try_from(hash).unwrap_or(usize::MAX) % self.palette.len();
        Some(self.palette[index].as_str())
    }

    /// Resolves the display color of a cluster.
    ///
    /// `"Unknown"` clusters get the default color and singletons the
    /// singleton color, whatever their counts. Other clusters get their
    /// palette color when `force` is set or they occur at least
    /// `min_occurrences` times in `state`; otherwise the default color.
    #[must_use]
    pub fn get_color<'a>(
        &'a self,
        state: &ColorAssignmentState,
        cluster_id: &ClusterId,
        analysis_profile: &str,
        force: bool,
    ) -> &'a str {
        match cluster_id.kind() {
            ClusterKind::Unknown => self.default_color.as_str(),
            ClusterKind::Singleton => self.singleton_color.as_str(),
            ClusterKind::Cluster => {
                if force || state.occurrences(cluster_id, analysis_profile) >= self.min_occurrences
                {
                    self.palette_color(cluster_id, analysis_profile)
                        .unwrap_or(self.default_color.as_str())
                } else {
                    self.default_color.as_str()
                }
            }
        }
    }

    /// Color of a single sample.
    #[must_use]
    pub fn sample_color<'a>(
        &'a self,
        state: &ColorAssignmentState,
        sample: &SampleProperties,
    ) -> &'a str {
        self.get_color(state, &sample.cluster_id, &sample.analysis_profile, false)
    }

    /// Recounts occurrences from `samples` and writes each sample's color.
    pub fn annotate_colors(&self, state: &mut ColorAssignmentState, samples: &mut [SampleFeature]) {
        state.count_occurrences(samples);

        for sample in samples.iter_mut() {
            let color = self.sample_color(state, &sample.properties).to_string();
            sample.properties.color = Some(color);
        }
    }
}
