//! Labelled numeric tables keyed by ordered row keys.
//!
//! Cells are `Option<f64>`; `None` is a missing value. Row order follows the
//! key ordering, column order is insertion order.

use crate::domain::{Resource, TechKey, Year};
use std::collections::{BTreeMap, BTreeSet};

pub type TechTable = Table<TechKey>;
pub type ResourceTable = Table<Resource>;
pub type YearlyTable<K> = Table<(Year, K)>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table<K> {
    columns: Vec<String>,
    rows: BTreeMap<K, Vec<Option<f64>>>,
}

impl<K> Default for Table<K> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> Table<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for column in columns {
            table.ensure_column(&column.into());
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|candidate| candidate == column)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Empty in the dataframe sense: no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(index) = self.column_index(column) {
            return index;
        }
        self.columns.push(column.to_owned());
        for values in self.rows.values_mut() {
            values.push(None);
        }
        self.columns.len() - 1
    }

    /// Inserts or replaces a whole row. `values` is aligned with `columns()`;
    /// short rows are padded with missing cells.
    pub fn insert_row(&mut self, key: K, mut values: Vec<Option<f64>>) {
        debug_assert!(values.len() <= self.columns.len());
        values.resize(self.columns.len(), None);
        self.rows.insert(key, values);
    }

    pub fn set(&mut self, key: K, column: &str, value: Option<f64>) {
        let index = self.ensure_column(column);
        let width = self.columns.len();
        let row = self
            .rows
            .entry(key)
            .or_insert_with(|| vec![None; width]);
        row[index] = value;
    }

    pub fn get(&self, key: &K, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.rows.get(key).and_then(|values| values[index])
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[Option<f64>])> {
        self.rows.iter().map(|(key, values)| (key, values.as_slice()))
    }

    /// Keys of `self` that `other` does not have.
    pub fn keys_missing_from<'a>(&'a self, other: &Table<K>) -> Vec<&'a K> {
        self.rows
            .keys()
            .filter(|key| !other.rows.contains_key(*key))
            .collect()
    }

    pub fn column_set(&self) -> BTreeSet<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Cell-wise union preferring `self`: every non-missing cell of `self`
    /// wins, everything else falls back to `fallback`. Rows and columns of
    /// both tables survive.
    pub fn combine_first(&self, fallback: &Table<K>) -> Table<K> {
        let mut combined = fallback.clone();
        for column in &self.columns {
            combined.ensure_column(column);
        }

        let positions: Vec<usize> = self
            .columns
            .iter()
            .filter_map(|column| combined.column_index(column))
            .collect();
        let width = combined.columns.len();

        for (key, values) in &self.rows {
            let row = combined
                .rows
                .entry(key.clone())
                .or_insert_with(|| vec![None; width]);
            for (value, position) in values.iter().zip(&positions) {
                if value.is_some() {
                    row[*position] = *value;
                }
            }
        }

        combined
    }

    /// Adds a leading Year level to every row key.
    pub fn with_year(&self, year: Year) -> YearlyTable<K> {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|(key, values)| ((year, key.clone()), values.clone()))
                .collect(),
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.rows.retain(|key, _| keep(key));
    }
}

impl<K: Ord + Clone> Table<(Year, K)> {
    pub fn years(&self) -> BTreeSet<Year> {
        self.rows.keys().map(|(year, _)| *year).collect()
    }

    pub fn distinct_keys(&self) -> BTreeSet<K> {
        self.rows.keys().map(|(_, key)| key.clone()).collect()
    }

    /// Step-resolves the table at `year`: each cell takes the value of the
    /// latest year not after `year` that specifies it.
    pub fn resolve_at(&self, year: Year) -> Table<K> {
        let mut resolved = Table::with_columns(self.columns.iter().cloned());
        let width = self.columns.len();
        for ((row_year, key), values) in &self.rows {
            if *row_year > year {
                continue;
            }
            let row = resolved
                .rows
                .entry(key.clone())
                .or_insert_with(|| vec![None; width]);
            for (slot, value) in row.iter_mut().zip(values) {
                if value.is_some() {
                    *slot = *value;
                }
            }
        }
        resolved
    }
}
