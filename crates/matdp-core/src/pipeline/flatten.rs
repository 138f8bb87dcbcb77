use super::overlay::overlay_in_order;
use super::sparse::SparseYearsInput;
use crate::common::{DEFAULT_MISMATCH_COLLAPSE_LIMIT, PathTree};
use crate::domain::{LoadResult, LocationPath, MatDpError, Resource};
use crate::sdf::SdfNode;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

/// One leaf of the SDF tree with everything it inherits resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedLeaf {
    pub path: LocationPath,
    pub input: SparseYearsInput,
}

pub fn flatten(root: &SdfNode) -> LoadResult<Vec<FlattenedLeaf>> {
    flatten_with_limit(root, DEFAULT_MISMATCH_COLLAPSE_LIMIT)
}

/// Resolves every leaf of `root` against its ancestors, depth first.
///
/// Resource mismatches between intensities and indicators do not stop the
/// traversal; leaves sharing the same mismatch are reported in one warning,
/// with path groups above `collapse_limit` children shown as a count.
#[instrument(skip_all, fields(collapse_limit = collapse_limit))]
pub fn flatten_with_limit(
    root: &SdfNode,
    collapse_limit: usize,
) -> LoadResult<Vec<FlattenedLeaf>> {
    let mut flattened = Vec::new();
    visit(root, &SparseYearsInput::default(), LocationPath::root(), &mut flattened)?;

    for (resources, paths) in &mismatch_groups(&flattened) {
        warn!(
            resources = ?resources,
            leaves = paths.len(),
            "mismatched resources between intensities and indicators:\n        {}",
            mismatch_lines(paths, collapse_limit).join("\n        ")
        );
    }

    debug!(leaves = flattened.len(), "flattened SDF tree");
    Ok(flattened)
}

/// Leaves keyed by their mismatched resource set, in traversal order.
pub(crate) fn mismatch_groups(
    leaves: &[FlattenedLeaf],
) -> BTreeMap<Vec<Resource>, Vec<LocationPath>> {
    let mut groups: BTreeMap<Vec<Resource>, Vec<LocationPath>> = BTreeMap::new();
    for leaf in leaves {
        let mismatched = leaf.input.mismatched_resources();
        if !mismatched.is_empty() {
            groups
                .entry(mismatched.into_iter().collect())
                .or_default()
                .push(leaf.path.clone());
        }
    }
    groups
}

pub(crate) fn mismatch_lines(paths: &[LocationPath], collapse_limit: usize) -> Vec<String> {
    PathTree::from_paths(paths).render(Some(collapse_limit))
}

fn visit(
    node: &SdfNode,
    accumulated: &SparseYearsInput,
    path: LocationPath,
    flattened: &mut Vec<FlattenedLeaf>,
) -> LoadResult<()> {
    check_indicator_names(node, accumulated, &path)?;

    let mut overlaid = SparseYearsInput {
        intensities: overlay_in_order(
            &accumulated.intensities,
            node.base_intensities(),
            node.intensities_yearly(),
        ),
        indicators: overlay_in_order(
            &accumulated.indicators,
            node.base_indicators(),
            node.indicators_yearly(),
        ),
        targets: Default::default(),
        tech_metadata: accumulated.tech_metadata.merged(node.tech_metadata()),
    };

    if !node.is_leaf() {
        for (name, child) in node.children() {
            visit(child, &overlaid, path.join(name.as_str()), flattened)?;
        }
        return Ok(());
    }

    let Some(targets) = node.targets() else {
        return Err(MatDpError::input_validation(
            "INPUT.SDF_LEAF_TARGETS",
            format!("{path}: leaf has no targets"),
        ));
    };
    overlaid.tech_metadata = overlaid.tech_metadata.restrict_to(targets.keys());
    overlaid.targets = targets.clone();

    flattened.push(FlattenedLeaf {
        path,
        input: overlaid,
    });
    Ok(())
}

/// Indicator names must stay the same down a branch: every non-empty
/// indicators table of the node has to carry the accumulated column set.
fn check_indicator_names(
    node: &SdfNode,
    accumulated: &SparseYearsInput,
    path: &LocationPath,
) -> LoadResult<()> {
    if accumulated.indicators.is_empty() {
        return Ok(());
    }
    let expected = accumulated.indicators.column_set();

    let own_tables =
        std::iter::once(node.base_indicators()).chain(node.indicators_yearly().values());
    for table in own_tables.filter(|table| !table.is_empty()) {
        let found: BTreeSet<&str> = table.column_set();
        if found != expected {
            return Err(MatDpError::input_validation(
                "INPUT.SDF_INDICATOR_NAMES",
                format!(
                    "{path}: indicator names have to be the same on every level, \
                     expected {expected:?} but found {found:?}"
                ),
            ));
        }
    }
    Ok(())
}
