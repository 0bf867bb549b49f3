//! `\\host\share\path` parsing

use crate::error::{Error, Result};
use std::fmt;

/// A UNC path split into host, share and the path within the share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncPath {
    pub host: String,
    pub share: String,
    /// Path below the share, without a leading separator
    pub path: String,
}

impl UncPath {
    pub fn parse(unc: &str) -> Result<Self> {
        let rest = unc
            .strip_prefix("\\\\")
            .ok_or_else(|| Error::InvalidPath(format!("{:?} does not start with \\\\", unc)))?;

        let (host, rest) = rest
            .split_once('\\')
            .ok_or_else(|| Error::InvalidPath(format!("{:?} has no share", unc)))?;
        let (share, path) = rest
            .split_once('\\')
            .ok_or_else(|| Error::InvalidPath(format!("{:?} has no file path", unc)))?;

        if host.is_empty() || share.is_empty() || path.is_empty() {
            return Err(Error::InvalidPath(format!(
                "{:?} has an empty host, share or file segment",
                unc
            )));
        }

        Ok(Self {
            host: host.to_string(),
            share: share.to_string(),
            path: path.to_string(),
        })
    }

    /// File name as sent in OPEN requests, relative to the share root
    pub fn file_name(&self) -> String {
        format!("\\{}", self.path)
    }
}

impl fmt::Display for UncPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\\\{}\\{}\\{}", self.host, self.share, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_path() {
        let unc = UncPath::parse(r"\\FILESRV\public\docs\readme.txt").unwrap();
        assert_eq!(unc.host, "FILESRV");
        assert_eq!(unc.share, "public");
        assert_eq!(unc.path, r"docs\readme.txt");
        assert_eq!(unc.file_name(), r"\docs\readme.txt");
        assert_eq!(unc.to_string(), r"\\FILESRV\public\docs\readme.txt");
    }

    #[test]
    fn test_missing_segments() {
        for bad in [
            r"\\host",
            r"\\host\share",
            r"\\host\share\",
            r"\\\share\file",
            r"\host\share\file",
            r"//host/share/file",
            "",
        ] {
            assert!(
                matches!(UncPath::parse(bad), Err(Error::InvalidPath(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
