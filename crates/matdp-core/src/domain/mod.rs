pub mod errors;

pub use errors::{ComputeResult, ErrorCategory, LoadResult, MatDpError, MatDpResult};

use serde::{Serialize, Serializer};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Calendar year of a yearly override. Base tables live at year 0.
pub type Year = i32;

pub const BASE_YEAR: Year = 0;

/// Name of a tracked material or substance (an intensities column, an
/// indicators row).
pub type Resource = String;

/// Two-part technology identifier, e.g. ("Power plant", "Offshore wind").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TechKey {
    pub category: String,
    pub specific: String,
}

impl TechKey {
    pub fn new(category: impl Into<String>, specific: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            specific: specific.into(),
        }
    }
}

impl Display for TechKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.category, self.specific)
    }
}

/// Position of a node in the SDF hierarchy, excluding the root sentinel.
///
/// Parsed from slash-separated text; leading, trailing and repeated slashes are
/// ignored, so `"/World/UK"` and `"World/UK/"` name the same location. The
/// root renders as `"/"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LocationPath {
    segments: Vec<String>,
}

impl LocationPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        Self {
            segments: text
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Display for LocationPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            f.write_str("/")
        } else {
            f.write_str(&self.segments.join("/"))
        }
    }
}

impl FromStr for LocationPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for LocationPath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for LocationPath {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&LocationPath> for LocationPath {
    fn from(value: &LocationPath) -> Self {
        value.clone()
    }
}

impl Serialize for LocationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
