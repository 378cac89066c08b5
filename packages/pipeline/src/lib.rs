#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The pure core of the dashboard: reconciliation of raw records with
//! accumulated edits, filter-state views, metric styling, and summary
//! aggregation.
//!
//! Every function here is deterministic and side-effect free. Each stage
//! takes complete values and produces complete new values, so a pipeline
//! pass is atomic from the perspective of any observer.

pub mod aggregate;
pub mod filters;
pub mod reconcile;
pub mod style;
