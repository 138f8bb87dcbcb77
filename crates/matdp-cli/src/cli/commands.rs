use super::CliError;
use anyhow::Context;
use matdp_core::common::PipelineConfig;
use matdp_core::domain::MatDpError;
use matdp_core::pipeline::{
    PipelineReport, render_human_summary, run_with_config, write_report_file,
};
use matdp_core::sdf::{DataSource, SdfLabels, SdfSources, StoredSource, create_sdf, load};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// SDF root directory
    #[arg(value_name = "SDF_DIR")]
    sdf_dir: PathBuf,

    /// Pipeline config JSON path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calculation worker count (overrides the config file)
    #[arg(long)]
    workers: Option<usize>,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct BuildArgs {
    /// Directory tree holding intensities*.csv files
    #[arg(long)]
    intensities: PathBuf,

    /// Directory tree holding indicators*.csv files
    #[arg(long)]
    indicators: PathBuf,

    /// Directory tree holding targets.csv files (repeatable)
    #[arg(long, required = true)]
    targets: Vec<PathBuf>,

    /// Output SDF directory; must be missing or empty
    #[arg(long)]
    output: PathBuf,

    /// Label of the hierarchy levels
    #[arg(long)]
    main_label: Option<String>,

    /// Label of a trailing hierarchy level (repeatable, outermost first)
    #[arg(long = "tail-label")]
    tail_labels: Vec<String>,
}

impl RunArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig, CliError> {
        let config = match &self.config {
            Some(path) => PipelineConfig::from_json_path(path).map_err(CliError::Compute)?,
            None => PipelineConfig::default(),
        };
        Ok(match self.workers {
            Some(0) => {
                return Err(CliError::Usage(
                    "Invalid worker count '0'; expected a positive integer.".to_string(),
                ));
            }
            Some(workers) => config.with_workers(workers),
            None => config,
        })
    }
}

impl BuildArgs {
    fn labels(&self) -> SdfLabels {
        SdfLabels {
            main_label: self.main_label.clone(),
            tail_labels: (!self.tail_labels.is_empty()).then(|| self.tail_labels.clone()),
        }
    }
}

pub(super) fn run_pipeline_command(args: RunArgs) -> Result<i32, CliError> {
    let config = args.pipeline_config()?;
    let root = load(&args.sdf_dir).map_err(CliError::Compute)?;
    let output = run_with_config(&root, &config).map_err(CliError::Compute)?;

    let report = PipelineReport::from_output(&output);
    println!("{}", render_human_summary(&report));
    if let Some(report_path) = &args.report {
        write_report_file(report_path, &report).map_err(CliError::Compute)?;
        println!("JSON report: {}", report_path.display());
    }
    Ok(0)
}

pub(super) fn run_build_command(args: BuildArgs) -> Result<i32, CliError> {
    ensure_empty_output(&args.output)?;

    let intensities = StoredSource::intensities(&args.intensities);
    let indicators = StoredSource::indicators(&args.indicators);
    let targets: Vec<StoredSource> = args.targets.iter().map(StoredSource::targets).collect();
    let sources = SdfSources {
        intensities: &intensities,
        indicators: &indicators,
        targets: targets.iter().map(|source| source as &dyn DataSource).collect(),
    };

    let root = create_sdf(&sources, &args.labels()).map_err(CliError::Compute)?;
    fs::create_dir_all(&args.output).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            args.output.display()
        )
    })?;
    root.save(&args.output).map_err(CliError::Compute)?;
    info!(output = %args.output.display(), leaves = root.leaf_count(), "SDF written");

    println!(
        "Wrote SDF with {} leaves to {}",
        root.leaf_count(),
        args.output.display()
    );
    Ok(0)
}

fn ensure_empty_output(output: &Path) -> Result<(), CliError> {
    if !output.exists() {
        return Ok(());
    }
    let mut entries = fs::read_dir(output)
        .with_context(|| format!("failed to read output directory '{}'", output.display()))?;
    if entries.next().is_some() {
        return Err(CliError::Compute(MatDpError::input_validation(
            "INPUT.CLI_OUTPUT_NOT_EMPTY",
            format!("output directory '{}' is not empty", output.display()),
        )));
    }
    Ok(())
}
