use super::sparse::SparseYearsInput;
use crate::domain::{BASE_YEAR, LoadResult, LocationPath, MatDpError, Resource, TechKey, Year};
use crate::table::{Table, TechTable, YearlyTable};
use faer::Mat;
use std::collections::BTreeSet;
use tracing::debug;

/// Dense matrix used by the calculation engine.
pub type DenseMatrix = Mat<f64>;

const TARGET_COLUMN: &str = "target";

/// Inputs of one (leaf, year) calculation, aligned on a single technology
/// axis.
///
/// `intensities` is technologies × resources, `targets` has one entry per
/// technology and `indicators` is resources × indicator names.
#[derive(Debug, Clone)]
pub struct ProcessableInput {
    pub technologies: Vec<TechKey>,
    pub resources: Vec<Resource>,
    pub indicator_names: Vec<String>,
    pub intensities: DenseMatrix,
    pub targets: Vec<f64>,
    pub indicators: DenseMatrix,
}

/// Expands one leaf's sparse data into calculation units.
///
/// Implementations must produce exactly one unit per output year and keep the
/// technology axis identical across the three inputs of a unit.
pub trait ProcessableInputBuilder: Sync {
    fn build(
        &self,
        path: &LocationPath,
        input: &SparseYearsInput,
    ) -> LoadResult<Vec<(Year, ProcessableInput)>>;
}

/// Default builder: step-resolves each output year from the sparse tables.
///
/// Output years are the explicit override years of intensities and
/// indicators plus the target years; without any of them the leaf yields a
/// single unit at year 0. Every cell takes the value of the latest year not
/// after the output year, and missing cells become zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseYearsBuilder;

impl ProcessableInputBuilder for DenseYearsBuilder {
    fn build(
        &self,
        path: &LocationPath,
        input: &SparseYearsInput,
    ) -> LoadResult<Vec<(Year, ProcessableInput)>> {
        let targets = TargetSchedule::from_table(path, &input.targets)?;

        let mut years: BTreeSet<Year> = input
            .intensities
            .years()
            .into_iter()
            .chain(input.indicators.years())
            .chain(targets.years())
            .filter(|year| *year != BASE_YEAR)
            .collect();
        if years.is_empty() {
            years.insert(BASE_YEAR);
        }

        let technologies: Vec<TechKey> = input.targets.keys().cloned().collect();
        let resources: Vec<Resource> = input.intensities.columns().to_vec();
        let indicator_names: Vec<String> = input.indicators.columns().to_vec();

        let with_intensities = input.intensities.distinct_keys();
        let without_intensities = technologies
            .iter()
            .filter(|key| !with_intensities.contains(*key))
            .count();
        if without_intensities > 0 {
            debug!(
                %path,
                technologies = without_intensities,
                "targets without intensities contribute nothing"
            );
        }

        let units = years
            .into_iter()
            .map(|year| {
                let intensities = input.intensities.resolve_at(year);
                let indicators = input.indicators.resolve_at(year);
                let target_values = targets.resolve_at(year);

                let unit = ProcessableInput {
                    intensities: dense(&intensities, &technologies, &resources),
                    indicators: dense(&indicators, &resources, &indicator_names),
                    targets: technologies
                        .iter()
                        .map(|key| target_values.get(key, TARGET_COLUMN).unwrap_or(0.0))
                        .collect(),
                    technologies: technologies.clone(),
                    resources: resources.clone(),
                    indicator_names: indicator_names.clone(),
                };
                (year, unit)
            })
            .collect();
        Ok(units)
    }
}

fn dense<K: Ord + Clone>(table: &Table<K>, rows: &[K], columns: &[String]) -> DenseMatrix {
    Mat::from_fn(rows.len(), columns.len(), |row, column| {
        table.get(&rows[row], &columns[column]).unwrap_or(0.0)
    })
}

/// Targets keyed by year: either year-headed columns or one column that
/// applies to every year.
enum TargetSchedule {
    Yearly(YearlyTable<TechKey>),
    Constant(TechTable),
}

impl TargetSchedule {
    fn from_table(path: &LocationPath, targets: &TechTable) -> LoadResult<Self> {
        let parsed: Option<Vec<Year>> =
            targets.columns().iter().map(|column| parse_year(column)).collect();

        match (parsed, targets.column_count()) {
            (_, 0) => Err(MatDpError::input_validation(
                "INPUT.TARGETS_COLUMNS",
                format!("{path}: targets have no value columns"),
            )),
            (Some(years), _) => {
                let mut yearly = YearlyTable::with_columns([TARGET_COLUMN]);
                for (key, values) in targets.iter() {
                    for (year, value) in years.iter().zip(values) {
                        if value.is_some() {
                            yearly.set((*year, key.clone()), TARGET_COLUMN, *value);
                        }
                    }
                }
                Ok(Self::Yearly(yearly))
            }
            (None, 1) => {
                let mut constant = TechTable::with_columns([TARGET_COLUMN]);
                for (key, values) in targets.iter() {
                    constant.insert_row(key.clone(), values.to_vec());
                }
                Ok(Self::Constant(constant))
            }
            (None, _) => Err(MatDpError::input_validation(
                "INPUT.TARGETS_COLUMNS",
                format!(
                    "{path}: targets need year columns or a single value column, found {:?}",
                    targets.columns()
                ),
            )),
        }
    }

    fn years(&self) -> BTreeSet<Year> {
        match self {
            Self::Yearly(yearly) => yearly.years(),
            Self::Constant(_) => BTreeSet::new(),
        }
    }

    fn resolve_at(&self, year: Year) -> TechTable {
        match self {
            Self::Yearly(yearly) => yearly.resolve_at(year),
            Self::Constant(constant) => constant.clone(),
        }
    }
}

fn parse_year(column: &str) -> Option<Year> {
    let trimmed = column.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}
