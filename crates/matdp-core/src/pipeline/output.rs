use super::calculation::ProcessedOutput;
use crate::domain::{ComputeResult, LocationPath, MatDpError, TechKey, Year};
use crate::sdf::{SdfMetadata, TechMetadata};
use crate::table::{TechTable, YearlyTable};
use std::collections::{BTreeSet, HashMap};
use std::ops::Deref;

/// A processed output tagged with the leaf and year it was computed for.
#[derive(Debug, Clone)]
pub struct LabelledOutput {
    pub year: Year,
    pub path: LocationPath,
    pub output: ProcessedOutput,
}

impl Deref for LabelledOutput {
    type Target = ProcessedOutput;

    fn deref(&self) -> &Self::Target {
        &self.output
    }
}

/// Lookup key for a single output; converts from `(year, path)` as well as
/// `(path, year)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputKey {
    pub year: Year,
    pub path: LocationPath,
}

impl<P: Into<LocationPath>> From<(Year, P)> for OutputKey {
    fn from((year, path): (Year, P)) -> Self {
        Self {
            year,
            path: path.into(),
        }
    }
}

impl From<(LocationPath, Year)> for OutputKey {
    fn from((path, year): (LocationPath, Year)) -> Self {
        Self { year, path }
    }
}

impl From<(&LocationPath, Year)> for OutputKey {
    fn from((path, year): (&LocationPath, Year)) -> Self {
        Self {
            year,
            path: path.clone(),
        }
    }
}

impl From<(&str, Year)> for OutputKey {
    fn from((path, year): (&str, Year)) -> Self {
        Self {
            year,
            path: LocationPath::parse(path),
        }
    }
}

/// Every result of a run, indexed by year and by path.
///
/// Construction checks the run-wide invariants: all outputs share one set of
/// indicator names, and every technology category reaching the output uses a
/// single material unit and a single production unit.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    outputs: Vec<LabelledOutput>,
    by_year: HashMap<Year, HashMap<LocationPath, usize>>,
    by_path: HashMap<LocationPath, HashMap<Year, usize>>,
    indicators: BTreeSet<String>,
    tech_metadata: TechMetadata,
    metadata: SdfMetadata,
}

impl PipelineOutput {
    pub fn new(
        mut outputs: Vec<LabelledOutput>,
        tech_metadata: TechMetadata,
        metadata: SdfMetadata,
    ) -> ComputeResult<Self> {
        outputs.sort_by(|left, right| (left.year, &left.path).cmp(&(right.year, &right.path)));

        let indicators: BTreeSet<String> = outputs
            .first()
            .map(|first| first.indicators.iter().cloned().collect())
            .unwrap_or_default();
        let expected: BTreeSet<&str> = indicators.iter().map(String::as_str).collect();
        if let Some(odd) = outputs
            .iter()
            .find(|output| output.indicator_set() != expected)
        {
            return Err(MatDpError::computation(
                "RUN.OUTPUT_INDICATORS",
                format!(
                    "every output must carry the same indicators: expected {:?}, {} ({}) has {:?}",
                    expected,
                    odd.path,
                    odd.year,
                    odd.indicator_set()
                ),
            ));
        }

        tech_metadata.validate_units()?;

        let mut by_year: HashMap<Year, HashMap<LocationPath, usize>> = HashMap::new();
        let mut by_path: HashMap<LocationPath, HashMap<Year, usize>> = HashMap::new();
        for (index, output) in outputs.iter().enumerate() {
            let previous = by_year
                .entry(output.year)
                .or_default()
                .insert(output.path.clone(), index);
            if previous.is_some() {
                return Err(MatDpError::internal(
                    "SYS.OUTPUT_DUPLICATE",
                    format!("{} ({}) was computed twice", output.path, output.year),
                ));
            }
            by_path
                .entry(output.path.clone())
                .or_default()
                .insert(output.year, index);
        }

        Ok(Self {
            outputs,
            by_year,
            by_path,
            indicators,
            tech_metadata,
            metadata,
        })
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// All outputs, grouped by year and ordered by path within a year.
    pub fn iter(&self) -> impl Iterator<Item = &LabelledOutput> {
        self.outputs.iter()
    }

    pub fn indicators(&self) -> &BTreeSet<String> {
        &self.indicators
    }

    pub fn tech_metadata(&self) -> &TechMetadata {
        &self.tech_metadata
    }

    pub fn metadata(&self) -> &SdfMetadata {
        &self.metadata
    }

    pub fn years(&self) -> BTreeSet<Year> {
        self.by_year.keys().copied().collect()
    }

    pub fn paths(&self) -> BTreeSet<&LocationPath> {
        self.by_path.keys().collect()
    }

    /// Outputs of one year, ordered by path.
    pub fn for_year(&self, year: Year) -> Vec<&LabelledOutput> {
        let mut found: Vec<&LabelledOutput> = self
            .by_year
            .get(&year)
            .map(|paths| paths.values().map(|index| &self.outputs[*index]).collect())
            .unwrap_or_default();
        found.sort_by(|left, right| left.path.cmp(&right.path));
        found
    }

    /// Outputs of one path, ordered by year.
    pub fn for_path(&self, path: impl Into<LocationPath>) -> Vec<&LabelledOutput> {
        let path = path.into();
        let mut found: Vec<&LabelledOutput> = self
            .by_path
            .get(&path)
            .map(|years| years.values().map(|index| &self.outputs[*index]).collect())
            .unwrap_or_default();
        found.sort_by_key(|output| output.year);
        found
    }

    pub fn get(&self, key: impl Into<OutputKey>) -> Option<&LabelledOutput> {
        let key = key.into();
        let index = self.by_year.get(&key.year)?.get(&key.path)?;
        Some(&self.outputs[*index])
    }

    /// Required resources of one path, stacked over its years.
    pub fn resources(&self, path: impl Into<LocationPath>) -> Option<YearlyTable<TechKey>> {
        let outputs = self.for_path(path);
        if outputs.is_empty() {
            return None;
        }
        Some(stack(
            outputs
                .iter()
                .map(|output| (output.year, output.required_resources_table())),
        ))
    }

    /// Emissions of one indicator for one path, stacked over its years.
    pub fn emissions(
        &self,
        path: impl Into<LocationPath>,
        indicator: &str,
    ) -> Option<YearlyTable<TechKey>> {
        let outputs = self.for_path(path);
        if outputs.is_empty() || !self.indicators.contains(indicator) {
            return None;
        }
        let tables = outputs
            .iter()
            .filter_map(|output| Some((output.year, output.emissions_table(indicator)?)))
            .collect::<Vec<_>>();
        Some(stack(tables))
    }
}

impl<'a> IntoIterator for &'a PipelineOutput {
    type Item = &'a LabelledOutput;
    type IntoIter = std::slice::Iter<'a, LabelledOutput>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.iter()
    }
}

fn stack(
    tables: impl IntoIterator<Item = (Year, TechTable)>,
) -> YearlyTable<TechKey> {
    tables
        .into_iter()
        .fold(YearlyTable::new(), |stacked, (year, table)| {
            table.with_year(year).combine_first(&stacked)
        })
}
