use super::io::TableIoError;
use super::loader::load;
use super::metadata::{SDF_METADATA_FILE_NAME, SdfMetadata};
use super::node::SdfNode;
use super::source::DataSource;
use crate::domain::LoadResult;
use std::fs;
use tempfile::TempDir;
use tracing::{info, instrument};

/// The sources an SDF is assembled from. Several targets sources may write
/// disjoint parts of the tree.
pub struct SdfSources<'a> {
    pub intensities: &'a dyn DataSource,
    pub indicators: &'a dyn DataSource,
    pub targets: Vec<&'a dyn DataSource>,
}

/// Labels that take precedence over whatever the sources suggest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdfLabels {
    pub main_label: Option<String>,
    pub tail_labels: Option<Vec<String>>,
}

/// Builds an SDF from data sources: every source writes into a scratch
/// directory, `metadata.json` is derived from the labels, and the result is
/// loaded like any stored SDF.
#[instrument(skip_all, fields(targets = sources.targets.len()))]
pub fn create_sdf(sources: &SdfSources<'_>, labels: &SdfLabels) -> LoadResult<SdfNode> {
    let scratch = TempDir::new().map_err(|source| TableIoError::Io {
        path: std::env::temp_dir(),
        source,
    })?;
    let root = scratch.path();

    for target in &sources.targets {
        target.write_sdf(root)?;
    }
    sources.intensities.write_sdf(root)?;
    sources.indicators.write_sdf(root)?;

    let metadata = resolve_metadata(sources, labels);
    let path = root.join(SDF_METADATA_FILE_NAME);
    let json = serde_json::to_string_pretty(&metadata).map_err(|source| TableIoError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| TableIoError::Io { path, source })?;

    info!(
        main_label = %metadata.main_label,
        tail_labels = ?metadata.tail_labels,
        "loading assembled SDF"
    );
    load(root)
}

/// Main label: explicit, then the intensities source, then the indicators
/// source. Tail labels: explicit, then the targets sources if they all agree.
fn resolve_metadata(sources: &SdfSources<'_>, labels: &SdfLabels) -> SdfMetadata {
    let mut metadata = SdfMetadata::default();

    if let Some(label) = labels
        .main_label
        .as_deref()
        .or_else(|| sources.intensities.main_label())
        .or_else(|| sources.indicators.main_label())
    {
        metadata.main_label = label.to_string();
    }

    metadata.tail_labels = match &labels.tail_labels {
        Some(explicit) => explicit.clone(),
        None => {
            let mut suggested = sources
                .targets
                .iter()
                .map(|target| target.tail_labels().unwrap_or_default());
            match suggested.next() {
                Some(first) if suggested.all(|other| other == first) => first.to_vec(),
                _ => Vec::new(),
            }
        }
    };

    metadata
}

#[cfg(test)]
mod tests {
    use super::{SdfLabels, SdfSources, create_sdf, resolve_metadata};
    use crate::sdf::source::StoredSource;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent directory should be created");
        }
        fs::write(path, contents).expect("fixture should be written");
    }

    #[test]
    fn sources_are_assembled_and_loaded() {
        let data = TempDir::new().expect("tempdir should be created");
        write(
            &data.path().join("intensities/World/intensities.csv"),
            "Category,Specific,Material Unit,Production Unit,steel\nPower plant,Solar,t,MW,2\n",
        );
        write(
            &data.path().join("indicators/World/indicators.csv"),
            "Resource,CO2\nsteel,1\n",
        );
        write(
            &data.path().join("targets/World/UK/SSP1/targets.csv"),
            "Category,Specific,2030\nPower plant,Solar,10\n",
        );

        let intensities =
            StoredSource::intensities(data.path().join("intensities")).with_main_label("Country");
        let indicators = StoredSource::indicators(data.path().join("indicators"));
        let targets =
            StoredSource::targets(data.path().join("targets")).with_tail_labels(["Scenario"]);
        let sources = SdfSources {
            intensities: &intensities,
            indicators: &indicators,
            targets: vec![&targets],
        };

        let node = create_sdf(&sources, &SdfLabels::default()).expect("SDF should be created");
        assert_eq!(node.metadata().main_label, "Country");
        assert_eq!(node.metadata().tail_labels, vec!["Scenario"]);

        let world = node.child("World").expect("World should exist");
        assert_eq!(world.base_intensities().row_count(), 1);
        assert_eq!(world.base_indicators().row_count(), 1);
        assert!(
            world
                .child("UK")
                .and_then(|uk| uk.child("SSP1"))
                .is_some_and(|leaf| leaf.targets().is_some())
        );
    }

    #[test]
    fn labels_resolve_by_precedence() {
        let intensities = StoredSource::intensities("unused");
        let indicators = StoredSource::indicators("unused").with_main_label("Region");
        let first = StoredSource::targets("unused").with_tail_labels(["Model", "Scenario"]);
        let second = StoredSource::targets("unused").with_tail_labels(["Model", "Scenario"]);
        let other = StoredSource::targets("unused").with_tail_labels(["Scenario"]);

        let agreeing = SdfSources {
            intensities: &intensities,
            indicators: &indicators,
            targets: vec![&first, &second],
        };
        let metadata = resolve_metadata(&agreeing, &SdfLabels::default());
        assert_eq!(metadata.main_label, "Region");
        assert_eq!(metadata.tail_labels, vec!["Model", "Scenario"]);

        let disagreeing = SdfSources {
            intensities: &intensities,
            indicators: &indicators,
            targets: vec![&first, &other],
        };
        let metadata = resolve_metadata(&disagreeing, &SdfLabels::default());
        assert!(metadata.tail_labels.is_empty());

        let explicit = SdfLabels {
            main_label: Some("Location".to_string()),
            tail_labels: Some(vec!["Pathway".to_string()]),
        };
        let metadata = resolve_metadata(&disagreeing, &explicit);
        assert_eq!(metadata.main_label, "Location");
        assert_eq!(metadata.tail_labels, vec!["Pathway"]);
    }
}
