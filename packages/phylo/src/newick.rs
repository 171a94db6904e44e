//! Leaf order extraction from Newick strings.
//!
//! Not a Newick parser: the string is split on the structural characters
//! and every token naming a known sample is kept in string order. Branch
//! lengths and internal node labels fall out because they never match a
//! sample identifier.

use std::collections::BTreeSet;

const STRUCTURAL: &[char] = &['(', ')', ',', ':', ';'];

/// Sample identifiers in the order their leaves appear in `newick`.
///
/// Tokens are whitespace-trimmed before matching, so a pretty-printed or
/// newline-wrapped tree still yields its leaves. A leaf named more than
/// once is kept at its first position only. Both depart from a plain
/// exact-token split, which would miss padded labels and repeat
/// duplicated ones. Tokens that match no entry of `samples` are ignored.
#[must_use]
pub fn leaf_order(newick: &str, samples: &[String]) -> Vec<String> {
    let known: BTreeSet<&str> = samples.iter().map(String::as_str).collect();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    newick
        .split(STRUCTURAL)
        .map(str::trim)
        .filter(|token| known.contains(token) && seen.insert(*token))
        .map(str::to_string)
        .collect()
}

fn is_balanced(newick: &str) -> bool {
    let mut depth = 0_i64;
    for c in newick.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Row/column order for displaying `samples` against the tree.
///
/// Samples are sorted by leaf position; samples missing from the tree
/// follow in their original order. A blank tree, or one that names none
/// of the samples, leaves `samples` unchanged.
#[must_use]
pub fn display_order(newick: &str, samples: &[String]) -> Vec<String> {
    if newick.trim().is_empty() {
        return samples.to_vec();
    }

    if !is_balanced(newick) {
        log::warn!("Newick string has unbalanced parentheses; leaf order may be unreliable");
    }

    let order = leaf_order(newick, samples);
    if order.is_empty() {
        log::warn!("Newick string names none of the {} samples", samples.len());
        return samples.to_vec();
    }

    let placed: BTreeSet<&str> = order.iter().map(String::as_str).collect();
    let missing = samples
        .iter()
        .filter(|s| !placed.contains(s.as_str()))
        .cloned()
        .collect::<Vec<_>>();

    if !missing.is_empty() {
        log::debug!("{} samples are not in the tree", missing.len());
    }

    order.into_iter().chain(missing).collect()
}
