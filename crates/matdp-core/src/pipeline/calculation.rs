use super::processable::{DenseMatrix, ProcessableInput};
use crate::domain::{ComputeResult, MatDpError, Resource, TechKey};
use crate::table::TechTable;
use std::collections::BTreeSet;

/// Results of one (leaf, year) calculation.
///
/// `required_resources` is technologies × resources. `emissions` stacks one
/// technologies × resources block per indicator, so row
/// `indicator * technologies.len() + technology` holds that pair.
#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    pub technologies: Vec<TechKey>,
    pub resources: Vec<Resource>,
    pub indicators: Vec<String>,
    pub required_resources: DenseMatrix,
    pub emissions: DenseMatrix,
}

impl ProcessedOutput {
    pub fn indicator_set(&self) -> BTreeSet<&str> {
        self.indicators.iter().map(String::as_str).collect()
    }

    pub fn required(&self, technology: usize, resource: usize) -> f64 {
        self.required_resources[(technology, resource)]
    }

    pub fn emission(&self, indicator: usize, technology: usize, resource: usize) -> f64 {
        self.emissions[(indicator * self.technologies.len() + technology, resource)]
    }

    pub fn required_resources_table(&self) -> TechTable {
        self.block_table(|technology, resource| self.required(technology, resource))
    }

    /// Emissions of one indicator as a technology × resource table.
    pub fn emissions_table(&self, indicator: &str) -> Option<TechTable> {
        let index = self.indicators.iter().position(|name| name == indicator)?;
        Some(self.block_table(|technology, resource| {
            self.emission(index, technology, resource)
        }))
    }

    fn block_table(&self, value: impl Fn(usize, usize) -> f64) -> TechTable {
        let mut table = TechTable::with_columns(self.resources.iter().cloned());
        for (row, key) in self.technologies.iter().enumerate() {
            let values = (0..self.resources.len())
                .map(|column| Some(value(row, column)))
                .collect();
            table.insert_row(key.clone(), values);
        }
        table
    }
}

/// Required resources are intensities scaled by each technology's target;
/// emissions multiply them by the per-resource indicator factors.
///
/// Inputs whose axes disagree are a contract violation of the builder and
/// fail as an internal error.
pub fn calculate(input: ProcessableInput) -> ComputeResult<ProcessedOutput> {
    check_alignment(&input)?;

    let technologies = input.technologies.len();
    let resources = input.resources.len();
    let indicators = input.indicator_names.len();

    let required_resources = DenseMatrix::from_fn(technologies, resources, |technology, resource| {
        input.intensities[(technology, resource)] * input.targets[technology]
    });

    let mut emissions = DenseMatrix::zeros(indicators * technologies, resources);
    for indicator in 0..indicators {
        for technology in 0..technologies {
            for resource in 0..resources {
                emissions[(indicator * technologies + technology, resource)] =
                    required_resources[(technology, resource)]
                        * input.indicators[(resource, indicator)];
            }
        }
    }

    Ok(ProcessedOutput {
        technologies: input.technologies,
        resources: input.resources,
        indicators: input.indicator_names,
        required_resources,
        emissions,
    })
}

fn check_alignment(input: &ProcessableInput) -> ComputeResult<()> {
    let technologies = input.technologies.len();
    let resources = input.resources.len();
    let indicators = input.indicator_names.len();

    let shapes = [
        (
            "intensities",
            (input.intensities.nrows(), input.intensities.ncols()),
            (technologies, resources),
        ),
        (
            "indicators",
            (input.indicators.nrows(), input.indicators.ncols()),
            (resources, indicators),
        ),
        ("targets", (input.targets.len(), 1), (technologies, 1)),
    ];
    for (name, found, expected) in shapes {
        if found != expected {
            return Err(MatDpError::internal(
                "SYS.CALC_MISALIGNED",
                format!("{name} shape {found:?} does not match the aligned axes {expected:?}"),
            ));
        }
    }
    Ok(())
}
