#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tree-aligned layout for pairwise distance matrices.
//!
//! The tree itself is built elsewhere and arrives as a Newick string. This
//! crate only reads the left-to-right leaf order out of it and lays the
//! matrix rows and columns out in that order.

pub mod matrix;
pub mod newick;

pub use matrix::{OrderedMatrix, reorder_matrix};
pub use newick::{display_order, leaf_order};
