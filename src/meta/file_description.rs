use std::io;
use std::path::{Path, PathBuf};

use crate::io::checksum_file;

/// A vendor file the converted run was read from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceFile {
    /// The file name without its directory
    pub name: String,
    /// A `file://` URI of the directory holding the file
    pub location: String,
    /// Lowercase hexadecimal SHA-1 digest of the file's contents
    pub sha1: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, location: impl Into<String>, sha1: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            sha1: sha1.into(),
        }
    }

    /// Describe the file at `path`, hashing its contents
    pub fn from_path<P: AsRef<Path>>(path: P, host: Option<&str>) -> io::Result<Self> {
        let path = path.as_ref();
        let sha1 = checksum_file(path)?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = dir.canonicalize().unwrap_or(dir);
        Ok(Self {
            name,
            location: directory_uri(&dir, host),
            sha1,
        })
    }

    /// The full URI of the file, as written in mzXML `parentFile` elements
    pub fn uri(&self) -> String {
        if self.location.ends_with('/') {
            format!("{}{}", self.location, self.name)
        } else {
            format!("{}/{}", self.location, self.name)
        }
    }
}

/// Build a `file://` URI for `dir`, using forward slashes whatever the platform
pub fn directory_uri(dir: &Path, host: Option<&str>) -> String {
    let path = dir.to_string_lossy().replace('\\', "/");
    let path = path.trim_end_matches('/');
    let host = host.unwrap_or("");
    if path.starts_with('/') {
        format!("file://{host}{path}")
    } else {
        format!("file://{host}/{path}")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_uri() {
        assert_eq!(
            directory_uri(Path::new("/data/runs/"), None),
            "file:///data/runs"
        );
        assert_eq!(
            directory_uri(Path::new("C:\\data\\runs"), Some("lab-pc")),
            "file://lab-pc/C:/data/runs"
        );
        let sf = SourceFile::new("a.raw", "file:///data", "00");
        assert_eq!(sf.uri(), "file:///data/a.raw");
    }

    #[test]
    fn test_from_path() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("run.raw");
        fs::write(&path, b"abc")?;
        let sf = SourceFile::from_path(&path, None)?;
        assert_eq!(sf.name, "run.raw");
        assert_eq!(sf.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert!(sf.location.starts_with("file://"));
        assert!(sf.uri().ends_with("/run.raw"));
        Ok(())
    }
}
