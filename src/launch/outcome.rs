use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::charon::client::TrackingError;
use crate::charon::sample::AnalysisStatus;
use crate::fastq::FastqError;
use crate::manifest::ManifestError;
use crate::slurm::submit::{JobId, SubmitError};
use crate::slurm::template::TemplateError;

/// Why a sample was left alone this run. None of these touch the filesystem or Charon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Named in the sample list but Charon doesn't know it
    NotInProject,
    Status(Option<AnalysisStatus>),
    /// No forward read files at all
    NoFastq,
    /// Forward reads were found but none had an existing mate
    NoCompletePairs { candidates: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::NotInProject => write!(f, "not a sample of this project in charon"),
            SkipReason::Status(Some(status)) => write!(f, "analysis status is {status}, not TO_ANALYZE"),
            SkipReason::Status(None) => write!(f, "no analysis status set, not TO_ANALYZE"),
            SkipReason::NoFastq => write!(f, "no fastq files found"),
            SkipReason::NoCompletePairs { candidates } => {
                write!(f, "none of {candidates} forward read files has a reverse read")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("can't create analysis directory {}: {source}", .path.display())]
    AnalysisDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Script(#[from] TemplateError),
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("fastq discovery failed: {0}")]
    Discovery(#[from] FastqError),
    #[error("setting up the run failed: {0}")]
    Artifacts(#[from] ArtifactError),
    #[error("submission failed: {0}")]
    Submission(#[from] SubmitError),
}

/// Files written for a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub manifest: PathBuf,
    pub script: PathBuf,
    pub lanes: usize,
}

/// How a single sample's launch attempt ended
#[derive(Debug)]
pub enum SampleOutcome {
    /// `replaces` is the SLURM id of an earlier job for this sample that Charon never confirmed
    Submitted { job: JobId, artifacts: Artifacts, replaces: Option<String> },
    /// Files written, nothing submitted (dry run)
    Staged(Artifacts),
    Skipped(SkipReason),
    Failed(SampleError),
    /// SLURM has the job but Charon still says TO_ANALYZE
    Orphaned { job: JobId, error: TrackingError },
    /// An earlier failure stopped the batch before this sample
    NotAttempted,
}

impl SampleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SampleOutcome::Failed(_) | SampleOutcome::Orphaned { .. })
    }

    /// Failures that stop the rest of the batch under fail-fast
    ///
    /// Artifact problems are local to the sample. A failed submission or an orphaned job probably
    /// means the scheduler or Charon is unwell for every sample that follows.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            SampleOutcome::Failed(SampleError::Submission(_)) | SampleOutcome::Orphaned { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SampleOutcome::Submitted { .. } => "submitted",
            SampleOutcome::Staged(_) => "staged",
            SampleOutcome::Skipped(_) => "skipped",
            SampleOutcome::Failed(_) => "failed",
            SampleOutcome::Orphaned { .. } => "orphaned",
            SampleOutcome::NotAttempted => "not attempted",
        }
    }
}

impl fmt::Display for SampleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SampleOutcome::Submitted { job, artifacts, replaces } => {
                write!(f, "job {job}, {} lanes", artifacts.lanes)?;
                match replaces {
                    Some(earlier) => write!(f, ", replaces unconfirmed job {earlier}"),
                    None => Ok(()),
                }
            }
            SampleOutcome::Staged(artifacts) => {
                write!(f, "{} lanes, script {}", artifacts.lanes, artifacts.script.display())
            }
            SampleOutcome::Skipped(reason) => write!(f, "{reason}"),
            SampleOutcome::Failed(err) => write!(f, "{err}"),
            SampleOutcome::Orphaned { job, error } => {
                write!(f, "job {job} is queued but charon was not updated: {error}")
            }
            SampleOutcome::NotAttempted => write!(f, "batch stopped before this sample"),
        }
    }
}
