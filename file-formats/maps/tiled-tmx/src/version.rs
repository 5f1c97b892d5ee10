//! Document versions

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// TMX document versions this crate reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TmxVersion {
    /// Version 1.0
    #[default]
    V1_0,
}

impl TmxVersion {
    /// The only version string accepted on `<map version>`
    pub const SUPPORTED: &'static str = "1.0";

    /// Version string as written in a document
    pub fn as_str(self) -> &'static str {
        match self {
            TmxVersion::V1_0 => Self::SUPPORTED,
        }
    }

    /// Check the `version` attribute of a map
    ///
    /// A missing attribute is reported as an empty version.
    pub fn from_attribute(value: Option<&str>) -> Result<Self> {
        let found = value.unwrap_or_default();
        found.parse().map_err(|()| Error::UnsupportedVersion {
            expected: Self::SUPPORTED,
            found: found.to_string(),
        })
    }
}

impl FromStr for TmxVersion {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            Self::SUPPORTED => Ok(TmxVersion::V1_0),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TmxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_check() {
        assert_eq!(TmxVersion::from_attribute(Some("1.0")).unwrap(), TmxVersion::V1_0);

        for bad in [Some("1.9"), Some("0.9"), None] {
            match TmxVersion::from_attribute(bad) {
                Err(Error::UnsupportedVersion { expected, found }) => {
                    assert_eq!(expected, "1.0");
                    assert_eq!(found, bad.unwrap_or_default());
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }
}
