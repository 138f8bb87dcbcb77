pub mod calculation;
pub mod flatten;
pub mod output;
pub mod overlay;
pub mod processable;
pub mod report;
pub mod sparse;

pub use calculation::{ProcessedOutput, calculate};
pub use flatten::{FlattenedLeaf, flatten, flatten_with_limit};
pub use output::{LabelledOutput, OutputKey, PipelineOutput};
pub use overlay::overlay_in_order;
pub use processable::{DenseMatrix, DenseYearsBuilder, ProcessableInput, ProcessableInputBuilder};
pub use report::{OutputSummary, PipelineReport, render_human_summary, write_report_file};
pub use sparse::SparseYearsInput;

use crate::common::PipelineConfig;
use crate::domain::{LocationPath, MatDpError, MatDpResult, Year};
use crate::sdf::{SdfNode, TechMetadata};
use rayon::prelude::*;
use tracing::{info, instrument};

/// One independent calculation, tagged with where and when it applies.
struct CalculationUnit {
    path: LocationPath,
    year: Year,
    input: ProcessableInput,
}

pub fn run(root: &SdfNode) -> MatDpResult<PipelineOutput> {
    run_with_config(root, &PipelineConfig::default())
}

pub fn run_with_config(root: &SdfNode, config: &PipelineConfig) -> MatDpResult<PipelineOutput> {
    run_with_builder(root, config, &DenseYearsBuilder)
}

/// Flattens `root`, expands every leaf with `builder` and calculates all
/// (path, year) units on a dedicated worker pool.
///
/// The first failing unit aborts the run; no partial output is returned.
#[instrument(skip_all, fields(workers = config.worker_count()))]
pub fn run_with_builder(
    root: &SdfNode,
    config: &PipelineConfig,
    builder: &dyn ProcessableInputBuilder,
) -> MatDpResult<PipelineOutput> {
    let leaves = flatten_with_limit(root, config.collapse_limit())?;

    let mut tech_metadata = TechMetadata::new();
    let mut units = Vec::new();
    for leaf in &leaves {
        tech_metadata.merge(&leaf.input.tech_metadata);
        for (year, input) in builder.build(&leaf.path, &leaf.input)? {
            units.push(CalculationUnit {
                path: leaf.path.clone(),
                year,
                input,
            });
        }
    }
    info!(leaves = leaves.len(), units = units.len(), "expanded calculation units");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .build()
        .map_err(|source| {
            MatDpError::internal(
                "SYS.WORKER_POOL",
                format!("failed to start calculation workers: {}", source),
            )
        })?;

    let outputs = pool.install(|| {
        units
            .into_par_iter()
            .map(|unit| {
                calculate(unit.input).map(|output| LabelledOutput {
                    year: unit.year,
                    path: unit.path,
                    output,
                })
            })
            .collect::<MatDpResult<Vec<_>>>()
    })?;

    let output = PipelineOutput::new(outputs, tech_metadata, root.metadata().clone())?;
    info!(
        outputs = output.len(),
        years = output.years().len(),
        "pipeline run complete"
    );
    Ok(output)
}
