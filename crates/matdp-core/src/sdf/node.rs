use super::metadata::{SdfMetadata, TechMetadata};
use crate::domain::{LoadResult, MatDpError, Year};
use crate::table::{ResourceTable, Table, TechTable};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Debug;
use tracing::warn;

/// Name carried by the root node of every SDF tree.
pub const ROOT_NAME: &str = "/";

/// One level of the SDF hierarchy.
///
/// A node either has children or carries a targets table (a leaf), never
/// both. Yearly intensities/indicators may only restate keys that the base
/// table of the same node already has. Both rules are checked when the node is
/// built; after that the node is read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct SdfNode {
    name: String,
    base_intensities: TechTable,
    intensities_yearly: BTreeMap<Year, TechTable>,
    base_indicators: ResourceTable,
    indicators_yearly: BTreeMap<Year, ResourceTable>,
    targets: Option<TechTable>,
    children: BTreeMap<String, SdfNode>,
    tech_metadata: TechMetadata,
    metadata: SdfMetadata,
}

impl SdfNode {
    pub fn builder(name: impl Into<String>) -> SdfNodeBuilder {
        SdfNodeBuilder::new(name)
    }

    pub fn root_builder() -> SdfNodeBuilder {
        SdfNodeBuilder::new(ROOT_NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_intensities(&self) -> &TechTable {
        &self.base_intensities
    }

    pub fn intensities_yearly(&self) -> &BTreeMap<Year, TechTable> {
        &self.intensities_yearly
    }

    pub fn base_indicators(&self) -> &ResourceTable {
        &self.base_indicators
    }

    pub fn indicators_yearly(&self) -> &BTreeMap<Year, ResourceTable> {
        &self.indicators_yearly
    }

    pub fn targets(&self) -> Option<&TechTable> {
        self.targets.as_ref()
    }

    pub fn children(&self) -> &BTreeMap<String, SdfNode> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&SdfNode> {
        self.children.get(name)
    }

    pub fn tech_metadata(&self) -> &TechMetadata {
        &self.tech_metadata
    }

    pub fn metadata(&self) -> &SdfMetadata {
        &self.metadata
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            return 1;
        }
        self.children.values().map(SdfNode::leaf_count).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SdfNodeBuilder {
    name: String,
    base_intensities: TechTable,
    intensities_yearly: BTreeMap<Year, TechTable>,
    base_indicators: ResourceTable,
    indicators_yearly: BTreeMap<Year, ResourceTable>,
    targets: Option<TechTable>,
    children: Vec<SdfNode>,
    tech_metadata: TechMetadata,
    metadata: SdfMetadata,
}

impl SdfNodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn base_intensities(mut self, table: TechTable) -> Self {
        self.base_intensities = table;
        self
    }

    pub fn intensities_for_year(mut self, year: Year, table: TechTable) -> Self {
        self.intensities_yearly.insert(year, table);
        self
    }

    pub fn base_indicators(mut self, table: ResourceTable) -> Self {
        self.base_indicators = table;
        self
    }

    pub fn indicators_for_year(mut self, year: Year, table: ResourceTable) -> Self {
        self.indicators_yearly.insert(year, table);
        self
    }

    pub fn targets(mut self, table: TechTable) -> Self {
        self.targets = Some(table);
        self
    }

    pub fn child(mut self, child: SdfNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = SdfNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn tech_metadata(mut self, tech_metadata: TechMetadata) -> Self {
        self.tech_metadata = tech_metadata;
        self
    }

    pub fn metadata(mut self, metadata: SdfMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn build(self) -> LoadResult<SdfNode> {
        validate_yearly_keys(
            &self.name,
            "intensities",
            &self.base_intensities,
            &self.intensities_yearly,
        )?;
        validate_yearly_keys(
            &self.name,
            "indicators",
            &self.base_indicators,
            &self.indicators_yearly,
        )?;

        if self.targets.is_some() && !self.children.is_empty() {
            return Err(MatDpError::input_validation(
                "INPUT.SDF_TARGETS_ON_BRANCH",
                format!(
                    "{}: targets are only allowed on leaves, but the node has {} children",
                    self.name,
                    self.children.len()
                ),
            ));
        }

        let mut children = BTreeMap::new();
        for child in self.children {
            match children.entry(child.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(MatDpError::input_validation(
                        "INPUT.SDF_DUPLICATE_CHILD",
                        format!("{}: duplicate child '{}'", self.name, child.name),
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert(child);
                }
            }
        }

        // Conflicting units only matter if the technology reaches a target;
        // the output index enforces them once the run is computed.
        if let Err(error) = self.tech_metadata.validate_units() {
            warn!(node = %self.name, "{}", error.message());
        }

        Ok(SdfNode {
            name: self.name,
            base_intensities: self.base_intensities,
            intensities_yearly: self.intensities_yearly,
            base_indicators: self.base_indicators,
            indicators_yearly: self.indicators_yearly,
            targets: self.targets,
            children,
            tech_metadata: self.tech_metadata,
            metadata: self.metadata,
        })
    }
}

fn validate_yearly_keys<K: Ord + Clone + Debug>(
    node: &str,
    what: &str,
    base: &Table<K>,
    yearly: &BTreeMap<Year, Table<K>>,
) -> LoadResult<()> {
    for (year, table) in yearly {
        if table.row_count() > 0 && base.row_count() == 0 {
            return Err(MatDpError::input_validation(
                "INPUT.SDF_MISSING_BASE",
                format!("{node}: yearly {what} ({year}) provided without base {what}"),
            ));
        }

        let new_keys = table.keys_missing_from(base);
        if !new_keys.is_empty() {
            return Err(MatDpError::input_validation(
                "INPUT.SDF_YEARLY_KEYS",
                format!("{node}: yearly {what} ({year}) introduce new items: {new_keys:?}"),
            ));
        }
    }
    Ok(())
}
