//! The Standard Data Format: a directory tree of CSV tables, one directory per
//! hierarchy level, and its in-memory node model.

pub mod create;
pub mod io;
pub mod loader;
pub mod metadata;
pub mod node;
pub mod reader;
pub mod saver;
pub mod source;

pub use create::{SdfLabels, SdfSources, create_sdf};
pub use io::TableIoError;
pub use loader::load;
pub use metadata::{DEFAULT_MAIN_LABEL, SDF_METADATA_FILE_NAME, SdfMetadata, TechInfo, TechMetadata};
pub use node::{ROOT_NAME, SdfNode, SdfNodeBuilder};
pub use reader::{
    FileRole, IndicatorsReader, InputReader, IntensitiesReader, ParsedTable, SdfFileKind,
    SdfFilePatterns, TargetsReader, reader_for,
};
pub use saver::save;
pub use source::{DataSource, StoredSource};
