//! Distance matrix layout in tree order.

use std::collections::BTreeMap;

use mimosa_sample_models::DistancePayload;
use serde::{Deserialize, Serialize};

use crate::newick::display_order;

/// A square sub-matrix with rows and columns in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedMatrix {
    pub samples: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
    /// Largest distance in the full payload, at least 1. Used to scale the
    /// cell colors.
    pub max_distance: f64,
}

/// Lays out the payload matrix for `selection` (or every sample when
/// `None`) in tree order.
///
/// Selected samples unknown to the payload are dropped. Cells missing from
/// a ragged matrix read as 0.
#[must_use]
pub fn reorder_matrix(payload: &DistancePayload, selection: Option<&[String]>) -> OrderedMatrix {
    let index: BTreeMap<&str, usize> = payload
        .samples
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();

    let selected: Vec<String> = match selection {
        Some(selection) => {
            let (known, unknown): (Vec<&String>, Vec<&String>) = selection
                .iter()
                .partition(|s| index.contains_key(s.as_str()));
            if !unknown.is_empty() {
                log::debug!("Ignoring {} selected samples absent from the matrix", unknown.len());
            }
            known.into_iter().cloned().collect()
        }
        None => payload.samples.clone(),
    };

    let samples = display_order(&payload.newick, &selected);
    let positions: Vec<usize> = samples.iter().map(|s| index[s.as_str()]).collect();

    let matrix: Vec<Vec<f64>> = positions
        .iter()
        .map(|&row| {
            positions
                .iter()
                .map(|&col| cell(payload, row, col))
                .collect()
        })
        .collect();

    let max_distance = payload
        .matrix
        .iter()
        .flatten()
        .copied()
        .fold(1.0_f64, f64::max);

    OrderedMatrix {
        samples,
        matrix,
        max_distance,
    }
}

fn cell(payload: &DistancePayload, row: usize, col: usize) -> f64 {
    payload
        .matrix
        .get(row)
        .and_then(|r| r.get(col))
        .copied()
        .unwrap_or(0.0)
}
