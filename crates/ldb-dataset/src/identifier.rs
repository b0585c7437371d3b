//! Dataset identifiers and name validation.
//!
//! Identifiers take the form `ds:<name>` or `ds:<name>.v<N>` with `N >= 1`.
//! Valid dataset names:
//! - Must be non-empty
//! - Must not contain whitespace, `/`, `\`, `:` or control characters
//! - Must not start with `.`
//! - Must not end in `.v<digits>`, which would read as a version suffix
//! - Must not be `root`, which names the root collection

use std::fmt;
use std::str::FromStr;

use crate::error::{DatasetError, DatasetResult};

/// Prefix shared by every dataset identifier.
pub const DATASET_PREFIX: &str = "ds:";

/// Reserved name of the root dataset.
pub const ROOT: &str = "root";

/// Characters that are forbidden anywhere in a dataset name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':'];

/// A parsed `ds:` argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatasetIdentifier {
    pub name: String,
    /// `None` means the latest version.
    pub version: Option<u32>,
}

impl DatasetIdentifier {
    pub fn new(name: impl Into<String>, version: Option<u32>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Whether this names the root collection.
    pub fn is_root(&self) -> bool {
        self.name == ROOT
    }

    /// Parse `ds:<name>[.v<N>]`.
    ///
    /// The root dataset is accepted here; use [`validate_dataset_name`] when
    /// a name is about to be written.
    pub fn parse(identifier: &str) -> DatasetResult<Self> {
        let invalid = |reason: &str| DatasetError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.to_string(),
        };
        let rest = identifier
            .strip_prefix(DATASET_PREFIX)
            .ok_or_else(|| invalid("must start with \"ds:\""))?;
        let (name, version) = match split_version(rest) {
            Some((name, version)) => (name, Some(version)),
            None => (rest, None),
        };
        if version == Some(0) {
            return Err(invalid("versions start at 1"));
        }
        check_chars(name).map_err(|reason| invalid(&reason))?;
        Ok(Self::new(name, version))
    }

    /// Whether `arg` looks like a dataset identifier at all.
    pub fn is_identifier(arg: &str) -> bool {
        arg.starts_with(DATASET_PREFIX)
    }
}

impl fmt::Display for DatasetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_identifier(&self.name, self.version))
    }
}

impl FromStr for DatasetIdentifier {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `ds:<name>` or `ds:<name>.v<N>`.
pub fn format_identifier(name: &str, version: Option<u32>) -> String {
    match version {
        Some(v) => format!("{DATASET_PREFIX}{name}.v{v}"),
        None => format!("{DATASET_PREFIX}{name}"),
    }
}

/// Validate a name a dataset record is about to be written under.
///
/// # Examples
///
/// ```
/// use ldb_dataset::validate_dataset_name;
///
/// assert!(validate_dataset_name("cats").is_ok());
/// assert!(validate_dataset_name("cats.v2").is_err());
/// assert!(validate_dataset_name("root").is_err());
/// ```
pub fn validate_dataset_name(name: &str) -> DatasetResult<()> {
    let invalid = |reason: String| DatasetError::InvalidName {
        name: name.to_string(),
        reason,
    };
    check_chars(name).map_err(invalid)?;
    if name == ROOT {
        return Err(invalid("\"root\" is reserved".into()));
    }
    if split_version(name).is_some() {
        return Err(invalid("must not end with a version suffix".into()));
    }
    Ok(())
}

fn check_chars(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("dataset name must not be empty".into());
    }
    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(format!("contains forbidden character: {ch:?}"));
    }
    if name.starts_with('.') {
        return Err("must not start with '.'".into());
    }
    Ok(())
}

/// Split `name.v<N>` into its parts.
fn split_version(s: &str) -> Option<(&str, u32)> {
    let (name, digits) = s.rsplit_once(".v")?;
    if name.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|v| (name, v))
}
