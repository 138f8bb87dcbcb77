use crate::domain::{MatDpError, MatDpResult, TechKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

pub const SDF_METADATA_FILE_NAME: &str = "metadata.json";
pub const DEFAULT_MAIN_LABEL: &str = "Location";

/// Root-level document describing what the SDF path segments mean.
///
/// `tail_labels` names the lowest path segments, e.g. `["Model", "Scenario"]`;
/// whatever is above them is described by `main_label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdfMetadata {
    #[serde(default = "default_main_label")]
    pub main_label: String,
    #[serde(default)]
    pub tail_labels: Vec<String>,
}

impl Default for SdfMetadata {
    fn default() -> Self {
        Self {
            main_label: default_main_label(),
            tail_labels: Vec::new(),
        }
    }
}

fn default_main_label() -> String {
    DEFAULT_MAIN_LABEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TechInfo {
    pub description: Option<String>,
    pub material_unit: Option<String>,
    pub production_unit: Option<String>,
}

impl TechInfo {
    /// Units of ours that `newer` would replace with a different non-missing
    /// unit, as (column, current, replacement).
    fn unit_changes<'a>(&'a self, newer: &'a TechInfo) -> Vec<(&'static str, &'a str, &'a str)> {
        [
            ("material unit", &self.material_unit, &newer.material_unit),
            ("production unit", &self.production_unit, &newer.production_unit),
        ]
        .into_iter()
        .filter_map(|(column, current, replacement)| {
            match (current.as_deref(), replacement.as_deref()) {
                (Some(current), Some(replacement)) if current != replacement => {
                    Some((column, current, replacement))
                }
                _ => None,
            }
        })
        .collect()
    }

    /// Field-wise overlay: values present in `newer` replace ours.
    fn absorb(&mut self, newer: &TechInfo) {
        if newer.description.is_some() {
            self.description.clone_from(&newer.description);
        }
        if newer.material_unit.is_some() {
            self.material_unit.clone_from(&newer.material_unit);
        }
        if newer.production_unit.is_some() {
            self.production_unit.clone_from(&newer.production_unit);
        }
    }
}

/// Descriptive and unit columns per technology, split off the intensities
/// tables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TechMetadata {
    entries: BTreeMap<TechKey, TechInfo>,
}

impl TechMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: TechKey, info: TechInfo) {
        self.entries.insert(key, info);
    }

    pub fn get(&self, key: &TechKey) -> Option<&TechInfo> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TechKey, &TechInfo)> {
        self.entries.iter()
    }

    /// Last-write-wins merge: for every key, non-missing fields of `newer`
    /// replace the current ones. Replacing a unit with a different one is
    /// logged.
    pub fn merge(&mut self, newer: &TechMetadata) {
        for (key, info) in &newer.entries {
            let current = self.entries.entry(key.clone()).or_default();
            for (column, replaced, replacement) in current.unit_changes(info) {
                warn!(
                    technology = %key,
                    "{column} '{replaced}' replaced by '{replacement}'"
                );
            }
            current.absorb(info);
        }
    }

    pub fn merged(&self, newer: &TechMetadata) -> TechMetadata {
        let mut merged = self.clone();
        merged.merge(newer);
        merged
    }

    /// Reindexes onto exactly `keys`; keys without an entry get an empty one.
    pub fn restrict_to<'a>(&self, keys: impl IntoIterator<Item = &'a TechKey>) -> TechMetadata {
        TechMetadata {
            entries: keys
                .into_iter()
                .map(|key| (key.clone(), self.entries.get(key).cloned().unwrap_or_default()))
                .collect(),
        }
    }

    /// Every technology category must use one material unit and one
    /// production unit.
    pub fn validate_units(&self) -> MatDpResult<()> {
        let mut material: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut production: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (key, info) in &self.entries {
            if let Some(unit) = info.material_unit.as_deref() {
                material.entry(&key.category).or_default().insert(unit);
            }
            if let Some(unit) = info.production_unit.as_deref() {
                production.entry(&key.category).or_default().insert(unit);
            }
        }

        let conflicting = |units: &BTreeMap<&str, BTreeSet<&str>>| -> Vec<String> {
            units
                .iter()
                .filter(|(_, distinct)| distinct.len() > 1)
                .map(|(category, distinct)| {
                    format!(
                        "{} ({})",
                        category,
                        distinct.iter().copied().collect::<Vec<_>>().join(", ")
                    )
                })
                .collect()
        };

        let material_conflicts = conflicting(&material);
        if !material_conflicts.is_empty() {
            return Err(MatDpError::computation(
                "RUN.TECH_MATERIAL_UNITS",
                format!(
                    "tech categories with non-unique Material Unit: {}",
                    material_conflicts.join("; ")
                ),
            ));
        }

        let production_conflicts = conflicting(&production);
        if !production_conflicts.is_empty() {
            return Err(MatDpError::computation(
                "RUN.TECH_PRODUCTION_UNITS",
                format!(
                    "tech categories with non-unique Production Unit: {}",
                    production_conflicts.join("; ")
                ),
            ));
        }

        Ok(())
    }
}

impl FromIterator<(TechKey, TechInfo)> for TechMetadata {
    fn from_iter<T: IntoIterator<Item = (TechKey, TechInfo)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
