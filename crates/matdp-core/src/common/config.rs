use crate::domain::{MatDpError, MatDpResult};
use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

pub const DEFAULT_MISMATCH_COLLAPSE_LIMIT: usize = 7;

/// Run-time knobs for the pipeline. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineConfig {
    /// Calculation worker count; `None` uses the available parallelism.
    #[serde(default)]
    pub workers: Option<NonZeroUsize>,
    /// Path-tree groups with more children than this are reported as a count
    /// in resource-mismatch warnings.
    #[serde(default)]
    pub mismatch_collapse_limit: Option<usize>,
}

impl PipelineConfig {
    pub fn from_json_str(source: &str) -> MatDpResult<Self> {
        serde_json::from_str(source).map_err(|source| {
            MatDpError::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("failed to parse pipeline config: {}", source),
            )
        })
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> MatDpResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| {
            MatDpError::io_system(
                "IO.CONFIG_READ",
                format!("failed to read pipeline config '{}': {}", path.display(), source),
            )
        })?;
        Self::from_json_str(&source).map_err(|error| {
            MatDpError::input_validation(
                error.placeholder(),
                format!("{} ({})", error.message(), path.display()),
            )
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = NonZeroUsize::new(workers);
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }

    pub fn collapse_limit(&self) -> usize {
        self.mismatch_collapse_limit
            .unwrap_or(DEFAULT_MISMATCH_COLLAPSE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_MISMATCH_COLLAPSE_LIMIT, PipelineConfig};
    use crate::domain::ErrorCategory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PipelineConfig::from_json_str("{}").expect("config should parse");
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.collapse_limit(), DEFAULT_MISMATCH_COLLAPSE_LIMIT);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn explicit_fields_are_honoured() {
        let config = PipelineConfig::from_json_str(r#"{"workers": 3, "mismatchCollapseLimit": 2}"#)
            .expect("config should parse");
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.collapse_limit(), 2);
    }

    #[test]
    fn zero_workers_and_unknown_fields_are_rejected() {
        let zero = PipelineConfig::from_json_str(r#"{"workers": 0}"#)
            .expect_err("zero workers should be rejected");
        assert_eq!(zero.category(), ErrorCategory::InputValidation);

        let unknown = PipelineConfig::from_json_str(r#"{"threads": 4}"#)
            .expect_err("unknown fields should be rejected");
        assert_eq!(unknown.placeholder(), "INPUT.CONFIG_PARSE");
    }

    #[test]
    fn config_file_errors_name_the_path() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("pipeline.json");
        fs::write(&path, "{ not json").expect("config should be written");

        let error = PipelineConfig::from_json_path(&path).expect_err("config should fail");
        assert!(error.message().contains("pipeline.json"));

        let missing = PipelineConfig::from_json_path(temp.path().join("missing.json"))
            .expect_err("missing config should fail");
        assert_eq!(missing.category(), ErrorCategory::IoSystem);
    }
}
