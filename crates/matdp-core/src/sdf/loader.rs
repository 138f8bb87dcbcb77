use super::io::{TableIoError, list_directory};
use super::metadata::{SDF_METADATA_FILE_NAME, SdfMetadata, TechMetadata};
use super::node::{ROOT_NAME, SdfNode, SdfNodeBuilder};
use super::reader::{FileRole, ParsedTable, SdfFileKind, SdfFilePatterns, reader_for};
use crate::domain::{LoadResult, MatDpError, Year};
use crate::table::{ResourceTable, TechTable};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Loads the SDF tree rooted at `root_dir`.
///
/// Every directory is a node. Children are loaded before their parent is
/// built, so a node only exists once its whole subtree validated. Directories
/// without any SDF file and without surviving children are skipped with a
/// warning; an empty root is an error.
#[instrument(skip_all, fields(root = %root_dir.as_ref().display()))]
pub fn load(root_dir: impl AsRef<Path>) -> LoadResult<SdfNode> {
    let root_dir = root_dir.as_ref();
    if !root_dir.is_dir() {
        return Err(MatDpError::io_system(
            "IO.SDF_ROOT",
            format!("SDF root '{}' is not a directory", root_dir.display()),
        ));
    }

    let patterns = SdfFilePatterns::new()?;
    let root = load_node(root_dir, ROOT_NAME.to_string(), &patterns, true)?;
    root.ok_or_else(|| {
        MatDpError::input_validation(
            "INPUT.SDF_EMPTY",
            format!("no SDF files found under '{}'", root_dir.display()),
        )
    })
}

fn load_node(
    dir: &Path,
    name: String,
    patterns: &SdfFilePatterns,
    is_root: bool,
) -> LoadResult<Option<SdfNode>> {
    let (files, sub_dirs) = list_directory(dir)?;

    let mut tables = NodeTables::default();
    for file in &files {
        let Some((kind, role)) = patterns.classify(file)? else {
            continue;
        };
        debug!(file = %file.display(), %kind, "reading SDF table");
        let parsed = reader_for(kind).read(file)?;
        tables.absorb(file, role, parsed)?;
    }

    let mut children = Vec::with_capacity(sub_dirs.len());
    for sub_dir in &sub_dirs {
        let child_name = sub_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(child) = load_node(sub_dir, child_name, patterns, false)? {
            children.push(child);
        }
    }

    if tables.is_empty() && children.is_empty() {
        if !is_root {
            warn!(directory = %dir.display(), "no SDF files found, ignoring directory");
        }
        return Ok(None);
    }

    let metadata = if is_root {
        read_metadata(dir)?
    } else {
        SdfMetadata::default()
    };

    tables
        .into_builder(name)
        .children(children)
        .metadata(metadata)
        .build()
        .map(Some)
}

fn read_metadata(dir: &Path) -> Result<SdfMetadata, TableIoError> {
    let path = dir.join(SDF_METADATA_FILE_NAME);
    if !path.is_file() {
        return Ok(SdfMetadata::default());
    }
    let source = fs::read_to_string(&path).map_err(|source| TableIoError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| TableIoError::Json { path, source })
}

/// Tables found in one directory, before metadata extraction.
#[derive(Default)]
struct NodeTables {
    base_intensities: Option<(TechTable, TechMetadata)>,
    intensities_yearly: BTreeMap<Year, (TechTable, TechMetadata)>,
    base_indicators: Option<ResourceTable>,
    indicators_yearly: BTreeMap<Year, ResourceTable>,
    targets: Option<TechTable>,
}

impl NodeTables {
    fn is_empty(&self) -> bool {
        self.base_intensities.is_none()
            && self.intensities_yearly.is_empty()
            && self.base_indicators.is_none()
            && self.indicators_yearly.is_empty()
            && self.targets.is_none()
    }

    fn absorb(
        &mut self,
        path: &Path,
        role: FileRole,
        parsed: ParsedTable,
    ) -> Result<(), TableIoError> {
        let duplicate = |kind: SdfFileKind| TableIoError::DuplicateFile {
            path: path.to_path_buf(),
            what: match role {
                FileRole::Base => format!("base {kind}"),
                FileRole::Yearly(year) => format!("{kind} for {year}"),
            },
        };

        match (parsed, role) {
            (ParsedTable::Intensities { values, metadata }, FileRole::Base) => {
                fill_once(&mut self.base_intensities, (values, metadata))
                    .map_err(|_| duplicate(SdfFileKind::Intensities))
            }
            (ParsedTable::Intensities { values, metadata }, FileRole::Yearly(year)) => {
                insert_once(&mut self.intensities_yearly, year, (values, metadata))
                    .map_err(|_| duplicate(SdfFileKind::Intensities))
            }
            (ParsedTable::Indicators(table), FileRole::Base) => {
                fill_once(&mut self.base_indicators, table)
                    .map_err(|_| duplicate(SdfFileKind::Indicators))
            }
            (ParsedTable::Indicators(table), FileRole::Yearly(year)) => {
                insert_once(&mut self.indicators_yearly, year, table)
                    .map_err(|_| duplicate(SdfFileKind::Indicators))
            }
            (ParsedTable::Targets(table), _) => {
                fill_once(&mut self.targets, table).map_err(|_| duplicate(SdfFileKind::Targets))
            }
        }
    }

    /// Moves the metadata columns out of every intensities table into the
    /// node's tech metadata: base first, then years ascending, later values
    /// winning.
    fn into_builder(self, name: String) -> SdfNodeBuilder {
        let mut tech_metadata = TechMetadata::new();
        let mut builder = SdfNode::builder(name);

        if let Some((values, metadata)) = self.base_intensities {
            tech_metadata.merge(&metadata);
            builder = builder.base_intensities(values);
        }
        for (year, (values, metadata)) in self.intensities_yearly {
            tech_metadata.merge(&metadata);
            builder = builder.intensities_for_year(year, values);
        }
        if let Some(table) = self.base_indicators {
            builder = builder.base_indicators(table);
        }
        for (year, table) in self.indicators_yearly {
            builder = builder.indicators_for_year(year, table);
        }
        if let Some(table) = self.targets {
            builder = builder.targets(table);
        }

        builder.tech_metadata(tech_metadata)
    }
}

fn fill_once<T>(slot: &mut Option<T>, value: T) -> Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(value);
    Ok(())
}

fn insert_once<T>(map: &mut BTreeMap<Year, T>, year: Year, value: T) -> Result<(), ()> {
    match map.entry(year) {
        Entry::Occupied(_) => Err(()),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::load;
    use crate::sdf::metadata::SdfMetadata;
    use crate::domain::{ErrorCategory, TechKey};
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
    fn directory_tree_loads_as_node_tree() {
        let temp = TempDir::new().expect("tempdir should be created");
        let root = temp.path();
        write(
            &root.join("World/intensities.csv"),
            "Category,Specific,Description,Material Unit,Production Unit,steel\n\
             Power plant,Solar,PV,t,MW,2\n",
        );
        write(
            &root.join("World/intensities_2030.csv"),
            "Category,Specific,Description,Material Unit,Production Unit,steel\n\
             Power plant,Solar,PV (2030),,,1.5\n",
        );
        write(&root.join("World/indicators.csv"), "Resource,CO2\nsteel,1\n");
        write(
            &root.join("World/UK/targets.csv"),
            "Category,Specific,2030\nPower plant,Solar,10\n",
        );
        write(
            &root.join("metadata.json"),
            r#"{"main_label": "Region", "tail_labels": ["Scenario"]}"#,
        );

        let node = load(root).expect("SDF should load");
        assert_eq!(node.name(), "/");
        assert_eq!(node.metadata().main_label, "Region");
        assert_eq!(node.metadata().tail_labels, vec!["Scenario"]);

        let world = node.child("World").expect("World should be loaded");
        let solar = TechKey::new("Power plant", "Solar");
        assert_eq!(world.base_intensities().columns(), ["steel".to_string()]);
        assert_eq!(world.base_intensities().get(&solar, "steel"), Some(2.0));
        assert_eq!(
            world.intensities_yearly()[&2030].get(&solar, "steel"),
            Some(1.5)
        );
        let info = world.tech_metadata().get(&solar).expect("metadata should be extracted");
        assert_eq!(info.description.as_deref(), Some("PV (2030)"));
        assert_eq!(info.material_unit.as_deref(), Some("t"));

        let uk = world.child("UK").expect("UK should be loaded");
        assert!(uk.is_leaf());
        assert_eq!(
            uk.targets().and_then(|targets| targets.get(&solar, "2030")),
            Some(10.0)
        );
        assert_eq!(uk.metadata(), &SdfMetadata::default());
    }

    #[test]
    fn empty_directories_are_dropped() {
        let temp = TempDir::new().expect("tempdir should be created");
        write(
            &temp.path().join("UK/targets.csv"),
            "Category,Specific,2030\nPower plant,Solar,10\n",
        );
        fs::create_dir_all(temp.path().join("Empty/Nested")).expect("dir should be created");
        write(&temp.path().join("Notes/readme.txt"), "not an SDF file");

        let node = load(temp.path()).expect("SDF should load");
        assert_eq!(node.children().keys().collect::<Vec<_>>(), vec!["UK"]);
    }

    #[test]
    fn empty_root_is_rejected() {
        let temp = TempDir::new().expect("tempdir should be created");
        let error = load(temp.path()).expect_err("empty SDF should fail");
        assert_eq!(error.placeholder(), "INPUT.SDF_EMPTY");

        let error = load(temp.path().join("missing")).expect_err("missing root should fail");
        assert_eq!(error.category(), ErrorCategory::IoSystem);
    }

    #[test]
    fn malformed_year_suffix_fails_the_load() {
        let temp = TempDir::new().expect("tempdir should be created");
        write(&temp.path().join("indicators_20x5.csv"), "Resource,CO2\nsteel,1\n");

        let error = load(temp.path()).expect_err("malformed suffix should fail");
        assert_eq!(error.placeholder(), "INPUT.SDF_FILE_NAME");
        assert!(error.message().contains("indicators_20x5.csv"));
    }

    #[test]
    fn two_files_for_the_same_year_are_rejected() {
        let temp = TempDir::new().expect("tempdir should be created");
        write(&temp.path().join("indicators.csv"), "Resource,CO2\nsteel,1\n");
        write(&temp.path().join("indicators_2030.csv"), "Resource,CO2\nsteel,2\n");
        write(&temp.path().join("indicators2030.csv"), "Resource,CO2\nsteel,3\n");

        let error = load(temp.path()).expect_err("duplicate year should fail");
        assert_eq!(error.placeholder(), "INPUT.SDF_FILE_NAME");
        assert!(error.message().contains("indicators for 2030"));
    }

    #[test]
    fn repeated_value_header_fails_the_load() {
        let temp = TempDir::new().expect("tempdir should be created");
        write(&temp.path().join("A/indicators.csv"), "Resource,CO2,CO2\nsteel,1,5\n");

        let error = load(temp.path()).expect_err("repeated header should fail");
        assert_eq!(error.category(), ErrorCategory::InputValidation);
        assert_eq!(error.placeholder(), "INPUT.SDF_TABLE");
        assert!(error.message().contains("'CO2'"));
    }

    #[test]
    fn yearly_keys_outside_base_fail_with_node_name() {
        let temp = TempDir::new().expect("tempdir should be created");
        write(&temp.path().join("EU/indicators.csv"), "Resource,CO2\nsteel,1\n");
        write(&temp.path().join("EU/indicators_2040.csv"), "Resource,CO2\ncopper,4\n");
        write(
            &temp.path().join("EU/FR/targets.csv"),
            "Category,Specific,2040\nPower plant,Solar,1\n",
        );

        let error = load(temp.path()).expect_err("new yearly key should fail");
        assert_eq!(error.placeholder(), "INPUT.SDF_YEARLY_KEYS");
        assert!(error.message().starts_with("EU"));
        assert!(error.message().contains("2040"));
    }
}
