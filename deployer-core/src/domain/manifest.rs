//! Manifest domain types
//!
//! The manifest is a flat text file, one record per line, comma-separated
//! fields. Field 0 is the unit id; a field 0 starting with `#` disables the
//! line. There is no header and no quoting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = "clients.csv";

const COMMENT_PREFIX: char = '#';
const FIELD_SEPARATOR: char = ',';

/// Errors raised while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be opened or read
    #[error("unable to read manifest {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One line of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// 1-based line number in the source file
    pub line_number: usize,
    /// Line text as read, without the line terminator
    pub raw_line: String,
    /// Comma-separated fields, in order
    pub fields: Vec<String>,
    pub is_comment: bool,
}

impl ManifestRecord {
    /// Parses a single non-empty manifest line
    pub fn parse(line_number: usize, line: &str) -> Self {
        let fields: Vec<String> = line.split(FIELD_SEPARATOR).map(str::to_string).collect();
        let is_comment = fields
            .first()
            .is_some_and(|f| f.starts_with(COMMENT_PREFIX));

        Self {
            line_number,
            raw_line: line.to_string(),
            fields,
            is_comment,
        }
    }

    /// Field 0, the identifier handed to the pipeline
    pub fn unit_id(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }

    /// Fields after the unit id
    pub fn trailing_fields(&self) -> &[String] {
        self.fields.get(1..).unwrap_or_default()
    }
}

/// Records loaded from a manifest, in file order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Where the records came from, used in diagnostics
    pub source: String,
    pub records: Vec<ManifestRecord>,
}

impl Manifest {
    /// Loads a manifest from disk
    ///
    /// # Errors
    /// Returns `ManifestError::Unreadable` if the file is missing, unreadable
    /// or not valid UTF-8.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest = Self::parse(path.display().to_string(), &text);
        debug!(
            "Loaded {} record(s) from {} ({} disabled)",
            manifest.records.len(),
            manifest.source,
            manifest.records.iter().filter(|r| r.is_comment).count()
        );

        Ok(manifest)
    }

    /// Parses manifest text
    ///
    /// Empty lines are skipped and a trailing `\r` is dropped, so CRLF files
    /// read the same as LF files.
    pub fn parse(source: impl Into<String>, text: &str) -> Self {
        let records = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_number, line)| ManifestRecord::parse(line_number, line))
            .collect();

        Self {
            source: source.into(),
            records,
        }
    }

    /// Records that are not commented out, in file order
    pub fn active_records(&self) -> impl Iterator<Item = &ManifestRecord> {
        self.records.iter().filter(|r| !r.is_comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "client1,web\nclient1,api\n#client2,web\nclient3,web\n";

    #[test]
    fn test_parse_preserves_order() {
        let manifest = Manifest::parse("clients.csv", SAMPLE);
        let ids: Vec<_> = manifest.records.iter().map(|r| r.unit_id()).collect();
        assert_eq!(ids, vec!["client1", "client1", "#client2", "client3"]);
        assert_eq!(manifest.records[1].line_number, 2);
    }

    #[test]
    fn test_comment_detection() {
        let manifest = Manifest::parse("clients.csv", SAMPLE);
        assert!(manifest.records[2].is_comment);
        let active: Vec<_> = manifest.active_records().map(|r| r.unit_id()).collect();
        assert_eq!(active, vec!["client1", "client1", "client3"]);
    }

    #[test]
    fn test_hash_outside_first_field_is_not_comment() {
        let record = ManifestRecord::parse(1, "client1,#web");
        assert!(!record.is_comment);
        assert_eq!(record.trailing_fields(), &["#web".to_string()]);
    }

    #[test]
    fn test_comment_marker_must_open_the_line() {
        let record = ManifestRecord::parse(1, " #client2,web");
        assert!(!record.is_comment);
        assert_eq!(record.unit_id(), " #client2");
    }

    #[test]
    fn test_skips_blank_lines_and_crlf() {
        let manifest = Manifest::parse("clients.csv", "client1,web\r\n\r\n   \nclient3,api\r\n");
        assert_eq!(manifest.records.len(), 2);
        assert_eq!(manifest.records[0].raw_line, "client1,web");
        assert_eq!(manifest.records[1].line_number, 4);
    }

    #[test]
    fn test_single_field_line() {
        let record = ManifestRecord::parse(1, "client9");
        assert_eq!(record.unit_id(), "client9");
        assert!(record.trailing_fields().is_empty());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let manifest = Manifest::load(file.path()).unwrap();
        assert_eq!(manifest.records.len(), 4);
        assert_eq!(manifest.source, file.path().display().to_string());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Unreadable { .. }));
        assert!(err.to_string().contains("missing.csv"));
    }
}
