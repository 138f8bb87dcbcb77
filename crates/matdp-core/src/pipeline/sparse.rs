use crate::domain::{Resource, TechKey};
use crate::sdf::TechMetadata;
use crate::table::{TechTable, YearlyTable};
use std::collections::BTreeSet;

/// A leaf's inherited data with every explicitly specified year kept apart.
///
/// Intensities and indicators carry a Year level in their row keys (year 0
/// for base tables); targets and tech metadata are the leaf's own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseYearsInput {
    pub intensities: YearlyTable<TechKey>,
    pub indicators: YearlyTable<Resource>,
    pub targets: TechTable,
    pub tech_metadata: TechMetadata,
}

impl SparseYearsInput {
    /// Resources named by intensities but not by indicators, or the other way
    /// around.
    pub fn mismatched_resources(&self) -> BTreeSet<Resource> {
        let from_intensities: BTreeSet<Resource> =
            self.intensities.columns().iter().cloned().collect();
        let from_indicators = self.indicators.distinct_keys();
        from_intensities
            .symmetric_difference(&from_indicators)
            .cloned()
            .collect()
    }
}
