pub mod config;
pub mod path_tree;

pub use config::{DEFAULT_MISMATCH_COLLAPSE_LIMIT, PipelineConfig};
pub use path_tree::PathTree;
