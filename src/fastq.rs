//! Locate paired raw reads for a sample
//!
//! Forward reads match `<root>/DATA/<project>/<sample>/*/*/*R1*.gz`. The reverse read is found by
//! swapping the `_R1_` marker in the file name for `_R2_`. Directory listings are sorted before
//! lane numbers are given out, so lane indices don't depend on filesystem enumeration order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, info, warn};
use regex::Regex;
use thiserror::Error;

use crate::layout::ProjectLayout;

static FORWARD_MARKER: &str = "_R1_";
static REVERSE_MARKER: &str = "_R2_";

#[derive(Debug, Error)]
pub enum FastqError {
    #[error("can't read fastq directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One sequencing lane: a forward/reverse read file pair
///
/// `lane` is 1-based and only counts usable pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastqPair {
    pub forward: PathBuf,
    pub reverse: PathBuf,
    pub lane: usize,
}

/// Usable pairs for a sample, plus the number of forward reads that were considered
#[derive(Debug, Default)]
pub struct Located {
    pub pairs: Vec<FastqPair>,
    pub candidates: usize,
}

/// Find the forward/reverse read pairs belonging to a sample
///
/// A missing sample directory isn't an error, it just yields no candidates. Forward reads without
/// an existing mate are dropped with a warning.
pub fn locate(layout: &ProjectLayout, project_id: &str, sample_id: &str) -> Result<Located, FastqError> {
    let sample_dir = layout.sample_data_dir(project_id, sample_id);
    debug!("Searching for fastq files in {}", sample_dir.display());

    let mut forward_reads: Vec<PathBuf> = Vec::new();
    for prep in subdirectories(&sample_dir)? {
        for run in subdirectories(&prep)? {
            for path in list_dir(&run)? {
                if is_forward_read(&path) {
                    forward_reads.push(path);
                }
            }
        }
    }
    forward_reads.sort_by_cached_key(|path| sort_key(path));

    let candidates = forward_reads.len();
    let mut pairs: Vec<FastqPair> = Vec::with_capacity(candidates);
    for forward in forward_reads {
        let Some(reverse) = mate_path(&forward) else {
            warn!("No {FORWARD_MARKER} marker in {}, can't derive reverse read. Skipping lane.", forward.display());
            continue;
        };
        if forward.is_file() && reverse.is_file() {
            let lane = pairs.len() + 1;
            pairs.push(FastqPair { forward, reverse, lane });
        } else {
            warn!("Issue locating one or more fastq files: {} {}. Skipping lane.", forward.display(), reverse.display());
        }
    }

    info!("Found {} usable fastq pairs ({} candidates) for sample {}", pairs.len(), candidates, sample_id);
    Ok(Located { pairs, candidates })
}

/// Derive the reverse read path by swapping the last `_R1_` in the file name
pub fn mate_path(forward: &Path) -> Option<PathBuf> {
    let name = forward.file_name()?.to_str()?;
    let at = name.rfind(FORWARD_MARKER)?;
    let mut mate = String::with_capacity(name.len());
    mate.push_str(&name[..at]);
    mate.push_str(REVERSE_MARKER);
    mate.push_str(&name[at + FORWARD_MARKER.len()..]);
    Some(forward.with_file_name(mate))
}

/// Lane token parsed from Illumina style names, e.g. `_L002_` -> 2
pub fn lane_token(path: &Path) -> Option<u32> {
    static LANE: OnceLock<Regex> = OnceLock::new();
    let re = LANE.get_or_init(|| Regex::new(r"_L(\d+)_").expect("valid lane regex"));
    let name = path.file_name()?.to_str()?;
    re.captures(name)?.get(1)?.as_str().parse().ok()
}

/// Same shape as the glob `*R1*.gz`, hidden files excluded
fn is_forward_read(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.')
        && name
            .strip_suffix(".gz")
            .map_or(false, |stem| stem.contains("R1"))
}

/// Run directory first, then lane, then file name
fn sort_key(path: &Path) -> (PathBuf, u32, PathBuf) {
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let lane = lane_token(path).unwrap_or(u32::MAX);
    let name = path.file_name().map(PathBuf::from).unwrap_or_default();
    (parent, lane, name)
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, FastqError> {
    let mut dirs: Vec<PathBuf> = list_dir(dir)?
        .into_iter()
        .filter(|path| path.is_dir() && !is_hidden(path))
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, FastqError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(FastqError::ReadDir { path: dir.to_path_buf(), source }),
    };
    entries
        .map(|res| res.map(|e| e.path()))
        .collect::<Result<Vec<PathBuf>, io::Error>>()
        .map_err(|source| FastqError::ReadDir { path: dir.to_path_buf(), source })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"@read\nACGT\n+\nIIII\n").unwrap();
        path
    }

    fn layout(dir: &TempDir) -> ProjectLayout {
        ProjectLayout::new(dir.path(), "sarek_ngi")
    }

    #[test]
    fn pairs_are_found_and_numbered_by_lane() {
        let dir = TempDir::new().unwrap();
        let run = "DATA/P0001/S1/A/FC1";
        touch(dir.path(), &format!("{run}/S1_S1_L002_R1_001.fastq.gz"));
        touch(dir.path(), &format!("{run}/S1_S1_L002_R2_001.fastq.gz"));
        touch(dir.path(), &format!("{run}/S1_S1_L001_R1_001.fastq.gz"));
        touch(dir.path(), &format!("{run}/S1_S1_L001_R2_001.fastq.gz"));

        let located = locate(&layout(&dir), "P0001", "S1").unwrap();

        assert_eq!(located.candidates, 2);
        assert_eq!(located.pairs.len(), 2);
        assert_eq!(located.pairs[0].lane, 1);
        assert!(located.pairs[0].forward.ends_with("S1_S1_L001_R1_001.fastq.gz"));
        assert!(located.pairs[0].reverse.ends_with("S1_S1_L001_R2_001.fastq.gz"));
        assert_eq!(located.pairs[1].lane, 2);
        assert!(located.pairs[1].forward.ends_with("S1_S1_L002_R1_001.fastq.gz"));
    }

    #[test]
    fn pairs_without_mate_are_dropped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "DATA/P0001/S1/A/FC1/S1_L001_R1_001.fastq.gz");
        touch(dir.path(), "DATA/P0001/S1/A/FC1/S1_L002_R1_001.fastq.gz");
        touch(dir.path(), "DATA/P0001/S1/A/FC1/S1_L002_R2_001.fastq.gz");

        let located = locate(&layout(&dir), "P0001", "S1").unwrap();

        assert_eq!(located.candidates, 2);
        assert_eq!(located.pairs.len(), 1);
        assert_eq!(located.pairs[0].lane, 1);
        assert!(located.pairs[0].forward.ends_with("S1_L002_R1_001.fastq.gz"));
    }

    #[test]
    fn missing_sample_directory_is_empty_not_an_error() {
        let dir = TempDir::new().unwrap();
        let located = locate(&layout(&dir), "P0001", "S3").unwrap();
        assert_eq!(located.candidates, 0);
        assert!(located.pairs.is_empty());
    }

    #[test]
    fn only_gzipped_forward_reads_two_levels_down_are_candidates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "DATA/P0001/S1/S1_L001_R1_001.fastq.gz");
        touch(dir.path(), "DATA/P0001/S1/A/FC1/S1_L001_R1_001.fastq");
        touch(dir.path(), "DATA/P0001/S1/A/FC1/.S1_L001_R1_001.fastq.gz");
        touch(dir.path(), "DATA/P0001/S1/A/FC1/S1_L001_I1_001.fastq.gz");

        let located = locate(&layout(&dir), "P0001", "S1").unwrap();
        assert_eq!(located.candidates, 0);
    }

    #[test]
    fn flowcells_are_kept_together() {
        let dir = TempDir::new().unwrap();
        for fc in ["FC2", "FC1"] {
            for lane in ["L002", "L001"] {
                touch(dir.path(), &format!("DATA/P0001/S1/A/{fc}/S1_{lane}_R1_001.fastq.gz"));
                touch(dir.path(), &format!("DATA/P0001/S1/A/{fc}/S1_{lane}_R2_001.fastq.gz"));
            }
        }

        let located = locate(&layout(&dir), "P0001", "S1").unwrap();
        let order: Vec<String> = located
            .pairs
            .iter()
            .map(|p| {
                let fc = p.forward.parent().unwrap().file_name().unwrap().to_string_lossy();
                format!("{fc}:{}", lane_token(&p.forward).unwrap())
            })
            .collect();
        assert_eq!(order, ["FC1:1", "FC1:2", "FC2:1", "FC2:2"]);
    }

    #[test]
    fn mate_path_swaps_last_marker_in_file_name_only() {
        let forward = Path::new("/data/_R1_dir/S_R1_x_L001_R1_001.fastq.gz");
        assert_eq!(mate_path(forward).unwrap(), PathBuf::from("/data/_R1_dir/S_R1_x_L001_R2_001.fastq.gz"));
        assert_eq!(mate_path(Path::new("/data/S1_R1.fastq.gz")), None);
    }
}
