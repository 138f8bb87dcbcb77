use crate::domain::{BASE_YEAR, Year};
use crate::table::{Table, YearlyTable};
use std::collections::BTreeMap;

/// Overlays a node's own tables onto the accumulated yearly table.
///
/// `base` counts as the year-0 contribution. Contributions are applied in
/// ascending year order; empty ones are skipped. Each one is tagged with its
/// year and combined with the running result, its own cells winning. Cells it
/// leaves unspecified keep their inherited values, so a yearly table only
/// changes the (year, key) pairs it names.
///
/// Precedence is per year: a closer node's base value only replaces the
/// inherited year-0 cell, so an ancestor's later yearly override of the same
/// cell still applies from its year on.
pub fn overlay_in_order<K: Ord + Clone>(
    accumulated: &YearlyTable<K>,
    base: &Table<K>,
    yearly: &BTreeMap<Year, Table<K>>,
) -> YearlyTable<K> {
    let mut contributions: Vec<(Year, &Table<K>)> = Vec::with_capacity(yearly.len() + 1);
    contributions.push((BASE_YEAR, base));
    contributions.extend(yearly.iter().map(|(year, table)| (*year, table)));
    contributions.sort_by_key(|(year, _)| *year);

    let mut overlaid = accumulated.clone();
    for (year, table) in contributions {
        if table.is_empty() {
            continue;
        }
        let update = table.with_year(year);
        overlaid = if overlaid.is_empty() {
            update
        } else {
            update.combine_first(&overlaid)
        };
    }
    overlaid
}
