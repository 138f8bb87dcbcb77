//! Hierarchical material-demand pipeline: loads a tree of per-location CSV
//! tables, resolves inheritance down to every leaf and computes required
//! resources and their indicator emissions per (location, year).

pub mod common;
pub mod domain;
pub mod pipeline;
pub mod sdf;
pub mod table;

pub use common::PipelineConfig;
pub use domain::{
    ErrorCategory, LocationPath, MatDpError, MatDpResult, Resource, TechKey, Year,
};
pub use pipeline::{PipelineOutput, PipelineReport, run, run_with_builder, run_with_config};
pub use sdf::{SdfMetadata, SdfNode, load, save};
