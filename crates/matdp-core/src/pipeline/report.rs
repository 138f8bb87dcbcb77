use super::output::PipelineOutput;
use crate::domain::{LocationPath, MatDpError, MatDpResult, Resource, Year};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub main_label: String,
    pub tail_labels: Vec<String>,
    pub indicators: Vec<String>,
    pub years: Vec<Year>,
    pub path_count: usize,
    pub output_count: usize,
    pub outputs: Vec<OutputSummary>,
}

/// Totals over technologies for one (year, path) output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub year: Year,
    pub path: LocationPath,
    pub technology_count: usize,
    pub resources: BTreeMap<Resource, f64>,
    pub emissions: BTreeMap<String, f64>,
}

impl PipelineReport {
    pub fn from_output(output: &PipelineOutput) -> Self {
        let outputs = output
            .iter()
            .map(|labelled| {
                let technologies = labelled.technologies.len();
                let resources = labelled
                    .resources
                    .iter()
                    .enumerate()
                    .map(|(resource, name)| {
                        let total: f64 = (0..technologies)
                            .map(|technology| labelled.required(technology, resource))
                            .sum();
                        (name.clone(), total)
                    })
                    .collect();
                let emissions = labelled
                    .indicators
                    .iter()
                    .enumerate()
                    .map(|(indicator, name)| {
                        let mut total = 0.0;
                        for technology in 0..technologies {
                            for resource in 0..labelled.resources.len() {
                                total += labelled.emission(indicator, technology, resource);
                            }
                        }
                        (name.clone(), total)
                    })
                    .collect();

                OutputSummary {
                    year: labelled.year,
                    path: labelled.path.clone(),
                    technology_count: technologies,
                    resources,
                    emissions,
                }
            })
            .collect::<Vec<_>>();

        Self {
            main_label: output.metadata().main_label.clone(),
            tail_labels: output.metadata().tail_labels.clone(),
            indicators: output.indicators().iter().cloned().collect(),
            years: output.years().into_iter().collect(),
            path_count: output.paths().len(),
            output_count: outputs.len(),
            outputs,
        }
    }
}

pub fn render_human_summary(report: &PipelineReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Outputs: {} ({} {} paths, {} years)",
        report.output_count,
        report.path_count,
        report.main_label,
        report.years.len()
    ));
    if !report.tail_labels.is_empty() {
        lines.push(format!("Tail labels: {}", report.tail_labels.join(" / ")));
    }
    lines.push(format!("Indicators: {}", report.indicators.join(", ")));

    for summary in &report.outputs {
        let emissions = summary
            .emissions
            .iter()
            .map(|(indicator, total)| format!("{indicator}={total:.4}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "{} {}: {} technologies, {} resources ({})",
            summary.year,
            summary.path,
            summary.technology_count,
            summary.resources.len(),
            emissions
        ));
    }

    lines.join("\n")
}

pub fn write_report_file(report_path: &Path, report: &PipelineReport) -> MatDpResult<()> {
    if let Some(parent_dir) = report_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent_dir).map_err(|source| {
            MatDpError::io_system(
                "IO.REPORT_DIRECTORY",
                format!(
                    "failed to create report directory '{}': {}",
                    parent_dir.display(),
                    source
                ),
            )
        })?;
    }

    let report_json = serde_json::to_string_pretty(report).map_err(|source| {
        MatDpError::internal(
            "SYS.REPORT_SERIALIZE",
            format!("failed to serialize report '{}': {}", report_path.display(), source),
        )
    })?;
    fs::write(report_path, report_json).map_err(|source| {
        MatDpError::io_system(
            "IO.REPORT_WRITE",
            format!("failed to write report '{}': {}", report_path.display(), source),
        )
    })
}
