use crate::domain::MatDpError;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum TableIoError {
    #[error("failed to open '{}': {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },
    #[error("failed to read '{}': {source}", path.display())]
    Read { path: PathBuf, source: csv::Error },
    #[error("'{}' has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: String },
    #[error(
        "'{}' line {line}: column '{column}' holds non-numeric value '{value}'",
        path.display()
    )]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
    #[error("'{}' repeats the column '{column}'", path.display())]
    DuplicateColumn { path: PathBuf, column: String },
    #[error("'{}' repeats the row key {key}", path.display())]
    DuplicateKey { path: PathBuf, key: String },
    #[error("'{}' has a malformed year suffix '{suffix}'", path.display())]
    YearSuffix { path: PathBuf, suffix: String },
    #[error("'{}' and another file both provide {what}", path.display())]
    DuplicateFile { path: PathBuf, what: String },
    #[error("refusing to overwrite existing file '{}'", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },
}

impl From<TableIoError> for MatDpError {
    fn from(error: TableIoError) -> Self {
        let message = error.to_string();
        match error {
            TableIoError::Open { .. }
            | TableIoError::Write { .. }
            | TableIoError::Io { .. } => MatDpError::io_system("IO.SDF_ACCESS", message),
            TableIoError::Read { ref source, .. } if source.is_io_error() => {
                MatDpError::io_system("IO.SDF_ACCESS", message)
            }
            TableIoError::Read { .. }
            | TableIoError::MissingColumn { .. }
            | TableIoError::InvalidNumber { .. }
            | TableIoError::DuplicateColumn { .. }
            | TableIoError::DuplicateKey { .. } => {
                MatDpError::input_validation("INPUT.SDF_TABLE", message)
            }
            TableIoError::YearSuffix { .. } | TableIoError::DuplicateFile { .. } => {
                MatDpError::input_validation("INPUT.SDF_FILE_NAME", message)
            }
            TableIoError::AlreadyExists { .. } => {
                MatDpError::input_validation("INPUT.SDF_SOURCE_CONFLICT", message)
            }
            TableIoError::Json { .. } => {
                MatDpError::input_validation("INPUT.SDF_METADATA", message)
            }
            TableIoError::Pattern { .. } => MatDpError::internal("SYS.SDF_PATTERN", message),
        }
    }
}

/// One parsed CSV file split into key columns, optional text columns and
/// numeric value columns.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawTable {
    pub(crate) value_columns: Vec<String>,
    pub(crate) rows: Vec<RawRow>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    pub(crate) keys: Vec<String>,
    pub(crate) text: Vec<Option<String>>,
    pub(crate) values: Vec<Option<f64>>,
}

/// Reads `path`, requiring every `key_columns` header and picking up the
/// `text_columns` headers that are present. Every other column must hold
/// numbers or missing markers.
pub(crate) fn read_raw_table(
    path: &Path,
    key_columns: &[&str],
    text_columns: &[&str],
) -> Result<RawTable, TableIoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| TableIoError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let headers = reader
        .headers()
        .map_err(|source| TableIoError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    if let Some(column) = headers
        .iter()
        .enumerate()
        .find(|(position, header)| headers.iter().take(*position).any(|seen| seen == *header))
        .map(|(_, header)| header.to_string())
    {
        return Err(TableIoError::DuplicateColumn {
            path: path.to_path_buf(),
            column,
        });
    }

    let key_positions = key_columns
        .iter()
        .map(|column| {
            header_position(&headers, column).ok_or_else(|| TableIoError::MissingColumn {
                path: path.to_path_buf(),
                column: (*column).to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let text_positions: Vec<Option<usize>> = text_columns
        .iter()
        .map(|column| header_position(&headers, column))
        .collect();
    let value_positions: Vec<usize> = (0..headers.len())
        .filter(|position| {
            !key_positions.contains(position) && !text_positions.contains(&Some(*position))
        })
        .collect();

    let mut table = RawTable {
        value_columns: value_positions
            .iter()
            .map(|position| headers[*position].to_string())
            .collect(),
        rows: Vec::new(),
    };

    for record in reader.records() {
        let record = record.map_err(|source| TableIoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |position| position.line());
        let field = |position: usize| record.get(position).unwrap_or("");

        let keys = key_positions
            .iter()
            .map(|position| field(*position).to_string())
            .collect();
        let text = text_positions
            .iter()
            .map(|position| {
                position
                    .map(field)
                    .filter(|value| !value.is_empty())
                    .map(str::to_owned)
            })
            .collect();
        let values = value_positions
            .iter()
            .map(|position| {
                let raw = field(*position);
                parse_cell(raw).ok_or_else(|| TableIoError::InvalidNumber {
                    path: path.to_path_buf(),
                    line,
                    column: headers[*position].to_string(),
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        table.rows.push(RawRow { keys, text, values });
    }

    Ok(table)
}

fn header_position(headers: &StringRecord, column: &str) -> Option<usize> {
    headers.iter().position(|header| header == column)
}

/// `Some(None)` for a missing marker, `Some(Some(v))` for a number, `None`
/// when the text is neither.
pub(crate) fn parse_cell(raw: &str) -> Option<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || ["nan", "na", "n/a", "null"]
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return Some(None);
    }
    trimmed.parse::<f64>().ok().map(|value| (!value.is_nan()).then_some(value))
}

pub(crate) fn format_cell(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub(crate) fn write_records<I>(
    path: &Path,
    headers: &[String],
    records: I,
) -> Result<(), TableIoError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let write_error = |source| TableIoError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_error)?;
    writer.write_record(headers).map_err(write_error)?;
    for record in records {
        writer.write_record(&record).map_err(write_error)?;
    }
    writer.flush().map_err(|source| TableIoError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Files and sub-directories directly under `dir`, each list sorted by path.
pub(crate) fn list_directory(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), TableIoError> {
    let access_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| TableIoError::Io { path, source }
    };

    let mut files = Vec::new();
    let mut directories = Vec::new();
    for entry in fs::read_dir(dir).map_err(access_error(dir))? {
        let entry = entry.map_err(access_error(dir))?;
        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(access_error(&entry_path))?;
        if file_type.is_dir() {
            directories.push(entry_path);
        } else if file_type.is_file() {
            files.push(entry_path);
        }
    }
    files.sort();
    directories.sort();
    Ok((files, directories))
}
