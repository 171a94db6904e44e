#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Derived annotations for a sample set.
//!
//! - [`color`]: deterministic cluster colors gated on current occurrence
//!   counts.
//! - [`outbreak`]: clusters whose case count across counties meets the
//!   outbreak threshold.
//! - [`filter`]: the sample filters applied before either of the above.
//!
//! Everything here is recomputed from the full current sample set on each
//! refresh; nothing is updated incrementally.

pub mod color;
pub mod config;
pub mod filter;
pub mod outbreak;

pub use color::{ClusterColorAssigner, ColorAssignmentState};
pub use config::{AnalyticsConfig, ConfigError};
pub use filter::SampleFilter;
pub use outbreak::{detect_outbreaks, outbreak_report};
