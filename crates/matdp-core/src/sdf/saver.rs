use super::io::{TableIoError, format_cell, write_records};
use super::metadata::{SDF_METADATA_FILE_NAME, TechInfo, TechMetadata};
use super::node::SdfNode;
use super::reader::{
    CATEGORY_COLUMN, RESOURCE_COLUMN, SPECIFIC_COLUMN, SdfFileKind, TECH_METADATA_COLUMNS,
};
use crate::domain::{MatDpResult, TechKey};
use crate::table::{ResourceTable, TechTable};
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

impl SdfNode {
    /// Writes this tree under `root_dir`; see [`save`].
    pub fn save(&self, root_dir: impl AsRef<Path>) -> MatDpResult<()> {
        save(self, root_dir)
    }
}

/// Writes `node` back to the directory layout [`super::load`] reads.
///
/// Intensities get the node's tech metadata joined back in, children land in
/// sub-directories named after them and `metadata.json` is written at the root
/// only.
#[instrument(skip_all, fields(root = %root_dir.as_ref().display()))]
pub fn save(node: &SdfNode, root_dir: impl AsRef<Path>) -> MatDpResult<()> {
    let root_dir = root_dir.as_ref();
    save_node(node, root_dir)?;

    let path = root_dir.join(SDF_METADATA_FILE_NAME);
    let mut json = serde_json::to_string_pretty(node.metadata()).map_err(|source| {
        TableIoError::Json {
            path: path.clone(),
            source,
        }
    })?;
    json.push('\n');
    fs::write(&path, json).map_err(|source| TableIoError::Io { path, source })?;
    Ok(())
}

fn save_node(node: &SdfNode, dir: &Path) -> Result<(), TableIoError> {
    fs::create_dir_all(dir).map_err(|source| TableIoError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    debug!(node = node.name(), directory = %dir.display(), "writing SDF node");

    let kind = SdfFileKind::Intensities;
    if node.base_intensities().row_count() > 0 {
        write_intensities(
            &dir.join(kind.base_file_name()),
            node.base_intensities(),
            node.tech_metadata(),
        )?;
    }
    for (year, table) in node.intensities_yearly() {
        write_intensities(&dir.join(kind.yearly_file_name(*year)), table, node.tech_metadata())?;
    }

    let kind = SdfFileKind::Indicators;
    if node.base_indicators().row_count() > 0 {
        write_indicators(&dir.join(kind.base_file_name()), node.base_indicators())?;
    }
    for (year, table) in node.indicators_yearly() {
        write_indicators(&dir.join(kind.yearly_file_name(*year)), table)?;
    }

    if let Some(targets) = node.targets() {
        write_targets(&dir.join(SdfFileKind::Targets.base_file_name()), targets)?;
    }

    for (name, child) in node.children() {
        save_node(child, &dir.join(name))?;
    }
    Ok(())
}

fn write_intensities(
    path: &Path,
    table: &TechTable,
    metadata: &TechMetadata,
) -> Result<(), TableIoError> {
    let headers = [CATEGORY_COLUMN, SPECIFIC_COLUMN]
        .into_iter()
        .chain(TECH_METADATA_COLUMNS)
        .map(str::to_owned)
        .chain(table.columns().iter().cloned())
        .collect::<Vec<_>>();

    let empty = TechInfo::default();
    let records = table.iter().map(|(key, values)| {
        let info = metadata.get(key).unwrap_or(&empty);
        let text = [&info.description, &info.material_unit, &info.production_unit]
            .into_iter()
            .map(|value| value.clone().unwrap_or_default());
        tech_key_fields(key)
            .into_iter()
            .chain(text)
            .chain(values.iter().copied().map(format_cell))
            .collect()
    });
    write_records(path, &headers, records)
}

fn write_indicators(path: &Path, table: &ResourceTable) -> Result<(), TableIoError> {
    let headers = std::iter::once(RESOURCE_COLUMN.to_owned())
        .chain(table.columns().iter().cloned())
        .collect::<Vec<_>>();
    let records = table.iter().map(|(resource, values)| {
        std::iter::once(resource.clone())
            .chain(values.iter().copied().map(format_cell))
            .collect()
    });
    write_records(path, &headers, records)
}

fn write_targets(path: &Path, table: &TechTable) -> Result<(), TableIoError> {
    let headers = [CATEGORY_COLUMN, SPECIFIC_COLUMN]
        .into_iter()
        .map(str::to_owned)
        .chain(table.columns().iter().cloned())
        .collect::<Vec<_>>();
    let records = table.iter().map(|(key, values)| {
        tech_key_fields(key)
            .into_iter()
            .chain(values.iter().copied().map(format_cell))
            .collect()
    });
    write_records(path, &headers, records)
}

fn tech_key_fields(key: &TechKey) -> [String; 2] {
    [key.category.clone(), key.specific.clone()]
}
