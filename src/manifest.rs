//! Sarek input TSV, one row per usable lane
//!
//! Columns: subject, sex, status (always 0, normal), sample, lane label, forward read, reverse read.
//! No header row is written.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tinytemplate::TinyTemplate;

use crate::fastq::FastqPair;
use crate::reference::SexTag;

/// included row template, tab separated
static ROW: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/manifest_row.txt"));

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("can't render manifest row: {0}")]
    Render(#[from] tinytemplate::error::Error),
    #[error("can't write manifest {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rendering context for a single manifest row
#[derive(Serialize)]
struct RowContext<'a> {
    subject: &'a str,
    sex: String,
    status: u8,
    sample: &'a str,
    lane: String,
    forward: String,
    reverse: String,
}

/// Render every row of the manifest, in the order the pairs were supplied
pub fn render(sample_id: &str, sex: SexTag, pairs: &[FastqPair]) -> Result<String, ManifestError> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("row", ROW)?;

    let mut content = String::new();
    for pair in pairs {
        let context = RowContext {
            subject: sample_id,
            sex: sex.to_string(),
            status: 0,
            sample: sample_id,
            lane: format!("{sample_id}_{}", pair.lane),
            forward: pair.forward.display().to_string(),
            reverse: pair.reverse.display().to_string(),
        };
        content.push_str(&tt.render("row", &context)?);
    }
    Ok(content)
}

/// Write the manifest to `destination`, replacing any existing file
///
/// Rows go to a temporary file in the destination directory which is then renamed over the old
/// manifest, so a reader never sees a half written or appended-to file. The destination directory
/// must already exist.
pub fn write(sample_id: &str, sex: SexTag, pairs: &[FastqPair], destination: &Path) -> Result<(), ManifestError> {
    let content = render(sample_id, sex, pairs)?;
    let write_err = |source: io::Error| ManifestError::Write { path: destination.to_path_buf(), source };

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;

    if destination.exists() {
        info!("Replacing existing manifest {}", destination.display());
    }
    file.persist(destination).map_err(|err| write_err(err.error))?;
    info!("Writing tsv file in {}", destination.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn pair(lane: usize) -> FastqPair {
        FastqPair {
            forward: PathBuf::from(format!("/data/S1_L00{lane}_R1_001.fastq.gz")),
            reverse: PathBuf::from(format!("/data/S1_L00{lane}_R2_001.fastq.gz")),
            lane,
        }
    }

    #[test]
    fn one_tab_separated_row_per_pair() {
        let content = render("S1", SexTag::ZZ, &[pair(1), pair(2)]).unwrap();
        let rows: Vec<&str> = content.lines().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            "S1\tZZ\t0\tS1\tS1_1\t/data/S1_L001_R1_001.fastq.gz\t/data/S1_L001_R2_001.fastq.gz"
        );
        assert!(rows[1].starts_with("S1\tZZ\t0\tS1\tS1_2\t"));
    }

    #[test]
    fn paths_are_not_html_escaped() {
        let mut odd = pair(1);
        odd.forward = PathBuf::from("/data/a&b/<S1>_R1_.fastq.gz");
        let content = render("S1", SexTag::XX, &[odd]).unwrap();
        assert!(content.contains("/data/a&b/<S1>_R1_.fastq.gz"));
        assert!(content.starts_with("S1\tXX\t"));
    }

    #[test]
    fn rewriting_replaces_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("S1.tsv");
        fs::write(&out, "stale\tline\n").unwrap();

        write("S1", SexTag::ZZ, &[pair(1), pair(2)], &out).unwrap();
        let first = fs::read_to_string(&out).unwrap();
        write("S1", SexTag::ZZ, &[pair(1), pair(2)], &out).unwrap();
        let second = fs::read_to_string(&out).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.lines().count(), 2);
        assert!(!second.contains("stale"));
    }

    #[test]
    fn no_pairs_writes_an_empty_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("S1.tsv");
        write("S1", SexTag::ZZ, &[], &out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "");
    }

    #[test]
    fn missing_directory_is_a_write_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("missing").join("S1.tsv");
        let err = write("S1", SexTag::ZZ, &[pair(1)], &out).unwrap_err();
        assert!(matches!(err, ManifestError::Write { .. }));
        assert!(!out.exists());
    }
}
