//! Index formats and annotation merge strategies.

use std::fmt;
use std::str::FromStr;

use crate::error::IndexError;

/// How data objects and annotations are associated during indexing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Pick annotation-only or strict pairs from what was discovered.
    #[default]
    Auto,
    /// Pairs only: data objects without a `.json` sibling are skipped.
    Strict,
    /// Pairs where present, bare data objects otherwise.
    Bare,
    /// Annotation files for already indexed data objects.
    Annotation,
    /// Labels inferred from the directory layout.
    Infer,
    /// Label Studio export files pointing at their data objects.
    LabelStudio,
}

impl Format {
    /// Canonical name, as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Format::Auto => "auto",
            Format::Strict => "strict",
            Format::Bare => "bare",
            Format::Annotation => "annot",
            Format::Infer => "infer",
            Format::LabelStudio => "label-studio",
        }
    }

    /// Whether discovery should pull in the counterpart of each matched file.
    pub fn pairs(self) -> bool {
        matches!(self, Format::Auto | Format::Strict | Format::Bare)
    }

    /// Resolve `Auto` from discovery results: annotation-only when nothing
    /// but annotations was found, strict pairs otherwise.
    pub fn autodetect(self, num_data_objects: usize, num_annotations: usize) -> Format {
        match self {
            Format::Auto if num_data_objects == 0 && num_annotations > 0 => Format::Annotation,
            Format::Auto => Format::Strict,
            other => other,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" | "auto-detect" => Ok(Format::Auto),
            "strict" | "strict-pairs" => Ok(Format::Strict),
            "bare" | "bare-pairs" => Ok(Format::Bare),
            "annot" | "annotation-only" => Ok(Format::Annotation),
            "infer" | "tensorflow-inferred" => Ok(Format::Infer),
            "label-studio" => Ok(Format::LabelStudio),
            other => Err(IndexError::Indexing(format!(
                "Not a valid indexing format: {other}"
            ))),
        }
    }
}

/// What to do with a data object's current annotation when a new one arrives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MergeStrategy {
    /// The new annotation replaces the current one.
    #[default]
    Replace,
    /// Shallow-merge the new object into the current one, new keys winning.
    Merge,
}

impl FromStr for MergeStrategy {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(MergeStrategy::Replace),
            "merge" => Ok(MergeStrategy::Merge),
            other => Err(IndexError::Indexing(format!(
                "Not a valid annotation merge strategy: {other}"
            ))),
        }
    }
}
