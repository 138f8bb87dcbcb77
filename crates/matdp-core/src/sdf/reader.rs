use super::io::{RawTable, TableIoError, read_raw_table};
use super::metadata::{TechInfo, TechMetadata};
use crate::domain::{TechKey, Year};
use crate::table::{ResourceTable, Table, TechTable};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const CATEGORY_COLUMN: &str = "Category";
pub const SPECIFIC_COLUMN: &str = "Specific";
pub const RESOURCE_COLUMN: &str = "Resource";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const MATERIAL_UNIT_COLUMN: &str = "Material Unit";
pub const PRODUCTION_UNIT_COLUMN: &str = "Production Unit";

pub const TECH_KEY_COLUMNS: [&str; 2] = [CATEGORY_COLUMN, SPECIFIC_COLUMN];
pub const TECH_METADATA_COLUMNS: [&str; 3] =
    [DESCRIPTION_COLUMN, MATERIAL_UNIT_COLUMN, PRODUCTION_UNIT_COLUMN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdfFileKind {
    Intensities,
    Indicators,
    Targets,
}

impl SdfFileKind {
    pub const ALL: [SdfFileKind; 3] = [Self::Intensities, Self::Indicators, Self::Targets];

    pub const fn stem(self) -> &'static str {
        match self {
            Self::Intensities => "intensities",
            Self::Indicators => "indicators",
            Self::Targets => "targets",
        }
    }

    pub const fn glob(self) -> &'static str {
        match self {
            Self::Intensities => "intensities*.csv",
            Self::Indicators => "indicators*.csv",
            Self::Targets => "targets.csv",
        }
    }

    pub const fn supports_years(self) -> bool {
        !matches!(self, Self::Targets)
    }

    pub fn base_file_name(self) -> String {
        format!("{}.csv", self.stem())
    }

    pub fn yearly_file_name(self, year: Year) -> String {
        format!("{}_{}.csv", self.stem(), year)
    }
}

impl Display for SdfFileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.stem())
    }
}

/// Whether a matched file holds the base table or a yearly override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Base,
    Yearly(Year),
}

/// File-name matcher for the three SDF table kinds.
pub struct SdfFilePatterns {
    kinds: Vec<SdfFileKind>,
    set: GlobSet,
}

impl SdfFilePatterns {
    pub fn new() -> Result<Self, TableIoError> {
        Self::for_kinds(&SdfFileKind::ALL)
    }

    pub fn for_kinds(kinds: &[SdfFileKind]) -> Result<Self, TableIoError> {
        let mut builder = GlobSetBuilder::new();
        for kind in kinds {
            let glob = Glob::new(kind.glob()).map_err(|source| TableIoError::Pattern {
                pattern: kind.glob().to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| TableIoError::Pattern {
            pattern: kinds
                .iter()
                .map(|kind| kind.glob())
                .collect::<Vec<_>>()
                .join(","),
            source,
        })?;
        Ok(Self {
            kinds: kinds.to_vec(),
            set,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.set.is_match(Path::new(name)))
    }

    /// Classifies a file by name. Files outside the three kinds yield
    /// `Ok(None)`; a known stem with a malformed year suffix is an error.
    pub fn classify(&self, path: &Path) -> Result<Option<(SdfFileKind, FileRole)>, TableIoError> {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return Ok(None);
        };
        let Some(index) = self.set.matches(name).into_iter().next() else {
            return Ok(None);
        };
        let kind = self.kinds[index];
        if !kind.supports_years() {
            return Ok(Some((kind, FileRole::Base)));
        }

        let suffix = name
            .strip_prefix(kind.stem())
            .and_then(|rest| rest.strip_suffix(".csv"))
            .unwrap_or_default();
        if suffix.is_empty() {
            return Ok(Some((kind, FileRole::Base)));
        }

        let digits = suffix.strip_prefix('_').unwrap_or(suffix);
        if digits.len() == 4 && digits.bytes().all(|byte| byte.is_ascii_digit()) {
            let year = digits.parse::<Year>().map_err(|_| TableIoError::YearSuffix {
                path: path.to_path_buf(),
                suffix: suffix.to_string(),
            })?;
            return Ok(Some((kind, FileRole::Yearly(year))));
        }

        Err(TableIoError::YearSuffix {
            path: path.to_path_buf(),
            suffix: suffix.to_string(),
        })
    }
}

/// A table read from one SDF file.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedTable {
    Intensities {
        values: TechTable,
        metadata: TechMetadata,
    },
    Indicators(ResourceTable),
    Targets(TechTable),
}

/// Parses one pattern-matched file into a table.
pub trait InputReader {
    fn kind(&self) -> SdfFileKind;

    fn read(&self, path: &Path) -> Result<ParsedTable, TableIoError>;
}

pub struct IntensitiesReader;

pub struct IndicatorsReader;

pub struct TargetsReader;

impl InputReader for IntensitiesReader {
    fn kind(&self) -> SdfFileKind {
        SdfFileKind::Intensities
    }

    fn read(&self, path: &Path) -> Result<ParsedTable, TableIoError> {
        let raw = read_raw_table(path, &TECH_KEY_COLUMNS, &TECH_METADATA_COLUMNS)?;
        let mut metadata = TechMetadata::new();
        for row in &raw.rows {
            metadata.insert(
                tech_key(&row.keys),
                TechInfo {
                    description: row.text[0].clone(),
                    material_unit: row.text[1].clone(),
                    production_unit: row.text[2].clone(),
                },
            );
        }
        let values = into_table(path, raw, tech_key)?;
        Ok(ParsedTable::Intensities { values, metadata })
    }
}

impl InputReader for IndicatorsReader {
    fn kind(&self) -> SdfFileKind {
        SdfFileKind::Indicators
    }

    fn read(&self, path: &Path) -> Result<ParsedTable, TableIoError> {
        let raw = read_raw_table(path, &[RESOURCE_COLUMN], &[])?;
        into_table(path, raw, |keys| keys[0].clone()).map(ParsedTable::Indicators)
    }
}

impl InputReader for TargetsReader {
    fn kind(&self) -> SdfFileKind {
        SdfFileKind::Targets
    }

    fn read(&self, path: &Path) -> Result<ParsedTable, TableIoError> {
        let raw = read_raw_table(path, &TECH_KEY_COLUMNS, &[])?;
        into_table(path, raw, tech_key).map(ParsedTable::Targets)
    }
}

pub fn reader_for(kind: SdfFileKind) -> Box<dyn InputReader> {
    match kind {
        SdfFileKind::Intensities => Box::new(IntensitiesReader),
        SdfFileKind::Indicators => Box::new(IndicatorsReader),
        SdfFileKind::Targets => Box::new(TargetsReader),
    }
}

fn tech_key(keys: &[String]) -> TechKey {
    TechKey::new(keys[0].clone(), keys[1].clone())
}

fn into_table<K, F>(path: &Path, raw: RawTable, make_key: F) -> Result<Table<K>, TableIoError>
where
    K: Ord + Clone + std::fmt::Debug,
    F: Fn(&[String]) -> K,
{
    let mut table = Table::with_columns(raw.value_columns);
    for row in raw.rows {
        let key = make_key(&row.keys);
        if table.contains_key(&key) {
            return Err(TableIoError::DuplicateKey {
                path: path.to_path_buf(),
                key: format!("{key:?}"),
            });
        }
        table.insert_row(key, row.values);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::{FileRole, InputReader, ParsedTable, SdfFileKind, SdfFilePatterns, reader_for};
    use crate::domain::TechKey;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn file_names_classify_by_kind_and_year() {
        let patterns = SdfFilePatterns::new().expect("patterns should compile");
        let classify = |name: &str| patterns.classify(Path::new(name));

        assert_eq!(
            classify("intensities.csv").expect("name should classify"),
            Some((SdfFileKind::Intensities, FileRole::Base))
        );
        assert_eq!(
            classify("intensities_2030.csv").expect("name should classify"),
            Some((SdfFileKind::Intensities, FileRole::Yearly(2030)))
        );
        assert_eq!(
            classify("indicators2025.csv").expect("name should classify"),
            Some((SdfFileKind::Indicators, FileRole::Yearly(2025)))
        );
        assert_eq!(
            classify("targets.csv").expect("name should classify"),
            Some((SdfFileKind::Targets, FileRole::Base))
        );
        assert_eq!(classify("metadata.json").expect("name should classify"), None);
        assert_eq!(classify("README.md").expect("name should classify"), None);
    }

    #[test]
    fn malformed_year_suffix_is_rejected() {
        let patterns = SdfFilePatterns::new().expect("patterns should compile");
        for name in ["intensities_20x0.csv", "indicators_203.csv", "intensities_v2.csv"] {
            let error = patterns
                .classify(Path::new(name))
                .expect_err("suffix should be rejected");
            assert!(error.to_string().contains("malformed year suffix"), "{name}");
        }
    }

    #[test]
    fn restricted_patterns_ignore_other_kinds() {
        let patterns =
            SdfFilePatterns::for_kinds(&[SdfFileKind::Targets]).expect("patterns should compile");
        assert!(patterns.matches(Path::new("World/UK/targets.csv")));
        assert!(!patterns.matches(Path::new("World/intensities.csv")));
    }

    #[test]
    fn intensities_reader_splits_off_metadata() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("intensities.csv");
        fs::write(
            &path,
            "Category,Specific,Description,Material Unit,Production Unit,steel\n\
             Power plant,Solar,PV,t,MW,2\n",
        )
        .expect("csv should be written");

        let reader = reader_for(SdfFileKind::Intensities);
        assert_eq!(reader.kind(), SdfFileKind::Intensities);
        let ParsedTable::Intensities { values, metadata } =
            reader.read(&path).expect("intensities should parse")
        else {
            panic!("intensities reader should produce intensities");
        };

        let key = TechKey::new("Power plant", "Solar");
        assert_eq!(values.columns(), ["steel".to_string()]);
        assert_eq!(values.get(&key, "steel"), Some(2.0));
        let info = metadata.get(&key).expect("metadata should be extracted");
        assert_eq!(info.material_unit.as_deref(), Some("t"));
        assert_eq!(info.production_unit.as_deref(), Some("MW"));
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("indicators.csv");
        fs::write(&path, "Resource,CO2\nsteel,1\nsteel,2\n").expect("csv should be written");

        let error = reader_for(SdfFileKind::Indicators)
            .read(&path)
            .expect_err("duplicate rows should fail");
        assert!(error.to_string().contains("repeats the row key"));
    }
}
