//! Launch Sarek for every eligible sample of a project
//!
//! Each sample goes through the same stages: eligibility (Charon status is TO_ANALYZE), fastq
//! discovery, staging (analysis directory, manifest, sbatch script), submission and finally the
//! Charon update to UNDER_ANALYSIS. Samples never depend on each other; every stage that can end
//! a sample's attempt produces a [SampleOutcome] and the batch carries on unless the failure policy
//! says otherwise.

pub mod outcome;
pub mod summary;

use std::collections::HashMap;
use std::fs;

use log::{error, info, warn};
use rusqlite::Connection;
use thiserror::Error;

use crate::charon::client::{TrackingError, TrackingService};
use crate::charon::sample::{AnalysisStatus, Sample};
use crate::db::job::load::{load_orphans, Orphan};
use crate::db::job::LaunchRecord;
use crate::db::ledger::{Ledger, LedgerError};
use crate::fastq::{self, FastqPair};
use crate::launch::outcome::{ArtifactError, Artifacts, SampleError, SampleOutcome, SkipReason};
use crate::launch::summary::RunSummary;
use crate::layout::{ProjectLayout, SamplePaths};
use crate::manifest;
use crate::reference::{Genome, SexTag};
use crate::slurm::submit::{JobSubmission, Scheduler};
use crate::slurm::template::{Placeholder, ScriptTemplate, Substitutions};

/// What to do with the rest of the batch after a submission failure or orphaned job
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep going and report everything at the end
    #[default]
    BestEffort,
    /// Stop at the first failure, remaining samples are not attempted
    FailFast,
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub genome: Genome,
    pub sex: SexTag,
    /// Write manifests and scripts for every eligible sample but submit nothing
    pub dry_run: bool,
    pub policy: FailurePolicy,
    /// Only these samples, in this order
    pub sample_list: Option<Vec<String>>,
}

impl LaunchOptions {
    pub fn new(genome: Genome) -> LaunchOptions {
        LaunchOptions { genome, sex: SexTag::default(), dry_run: false, policy: FailurePolicy::default(), sample_list: None }
    }
}

/// Problems that stop a run before any sample is looked at
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("can't get samples of project {project_id} from charon: {source}")]
    Samples {
        project_id: String,
        #[source]
        source: TrackingError,
    },
    #[error("could not find any samples for project {0}")]
    NoSamples(String),
}

pub struct Launcher<'a, T: TrackingService, S: Scheduler> {
    pub tracking: T,
    pub scheduler: S,
    pub layout: ProjectLayout,
    pub template: ScriptTemplate,
    pub ledger: &'a Ledger,
    pub options: LaunchOptions,
}

impl<'a, T: TrackingService, S: Scheduler> Launcher<'a, T, S> {
    pub fn new(
        tracking: T,
        scheduler: S,
        layout: ProjectLayout,
        template: ScriptTemplate,
        ledger: &'a Ledger,
        options: LaunchOptions,
    ) -> Launcher<'a, T, S> {
        Launcher { tracking, scheduler, layout, template, ledger, options }
    }

    /// Process every selected sample of the project once
    pub fn run(&self, project_id: &str) -> Result<RunSummary, LaunchError> {
        let samples = self
            .tracking
            .project_samples(project_id)
            .map_err(|source| LaunchError::Samples { project_id: project_id.to_string(), source })?;
        if samples.is_empty() {
            return Err(LaunchError::NoSamples(project_id.to_string()));
        }

        let orphans = self.known_orphans(project_id);
        let mut summary = RunSummary::new(project_id);
        let mut halted = false;

        for (sample_id, sample) in self.select(samples) {
            if halted {
                summary.push(&sample_id, SampleOutcome::NotAttempted);
                continue;
            }
            let outcome = match sample {
                Some(sample) => self.launch_sample(project_id, &sample, orphans.get(&sample_id)),
                None => {
                    warn!("Sample {sample_id} is not part of project {project_id} in charon - Not analysing sample");
                    SampleOutcome::Skipped(SkipReason::NotInProject)
                }
            };
            if outcome.is_batch_fatal() && self.options.policy == FailurePolicy::FailFast {
                error!("Stopping after failure for sample {sample_id}, remaining samples are not attempted");
                halted = true;
            }
            summary.push(&sample_id, outcome);
        }

        Ok(summary)
    }

    /// Samples in Charon order, or in sample list order when a list was given
    fn select(&self, samples: Vec<Sample>) -> Vec<(String, Option<Sample>)> {
        match &self.options.sample_list {
            None => samples.into_iter().map(|sample| (sample.id.clone(), Some(sample))).collect(),
            Some(list) => {
                let by_id: HashMap<String, Sample> =
                    samples.into_iter().map(|sample| (sample.id.clone(), sample)).collect();
                list.iter().map(|id| (id.clone(), by_id.get(id).cloned())).collect()
            }
        }
    }

    fn launch_sample(&self, project_id: &str, sample: &Sample, orphan: Option<&Orphan>) -> SampleOutcome {
        let sample_id = sample.id.as_str();
        if !sample.is_eligible() {
            info!("Sample status not 'TO_ANALYZE' - Not analysing sample: {sample_id}");
            return SampleOutcome::Skipped(SkipReason::Status(sample.analysis_status.clone()));
        }

        let located = match fastq::locate(&self.layout, project_id, sample_id) {
            Ok(located) => located,
            Err(err) => {
                error!("Issue searching for fastq files of sample {sample_id}: {err}");
                return SampleOutcome::Failed(SampleError::Discovery(err));
            }
        };
        if located.pairs.is_empty() {
            let reason = match located.candidates {
                0 => SkipReason::NoFastq,
                candidates => SkipReason::NoCompletePairs { candidates },
            };
            info!("Issue locating fastq files - Not analyzing sample: {sample_id} ({reason})");
            return SampleOutcome::Skipped(reason);
        }

        let paths = self.layout.sample_paths(project_id, sample_id);
        let artifacts = match self.stage(project_id, sample_id, &located.pairs, &paths) {
            Ok(artifacts) => artifacts,
            Err(err) => {
                error!("Issue setting up Sarek run for sample {sample_id}: {err}");
                return SampleOutcome::Failed(SampleError::Artifacts(err));
            }
        };
        let record = self.record("stage", |conn| LaunchRecord::stage(conn, project_id, sample_id));

        if self.options.dry_run {
            info!("Generated files for {sample_id}. Not submitting jobs.");
            return SampleOutcome::Staged(artifacts);
        }

        if let Some(orphan) = orphan {
            warn!(
                "Sample {sample_id} already had SLURM job {} submitted at {} that charon never confirmed, submitting again",
                orphan.slurm_id, orphan.submitted_at
            );
        }

        let job = match self.scheduler.submit(&JobSubmission::from(&paths)) {
            Ok(job) => job,
            Err(err) => {
                error!("Issue submitting Sarek job for sample {sample_id}: {err}");
                return SampleOutcome::Failed(SampleError::Submission(err));
            }
        };
        info!("Sarek job {job} submitted for sample {sample_id}");
        if let Some(record) = &record {
            self.record("submit", |conn| record.submit(conn, job));
        }

        match self.tracking.update_status(project_id, sample_id, &AnalysisStatus::UnderAnalysis) {
            Ok(()) => {
                info!("Updated analysis status in charon for {sample_id}");
                if let Some(record) = &record {
                    self.record("track", |conn| record.track(conn));
                }
                let replaces = orphan.map(|orphan| orphan.slurm_id.clone());
                SampleOutcome::Submitted { job, artifacts, replaces }
            }
            Err(error) => {
                error!(
                    "ORPHANED JOB {job}: project {project_id} sample {sample_id} is queued in SLURM but charon still says TO_ANALYZE ({error}). Set it to UNDER_ANALYSIS by hand, then clear it with --resolve-orphan {sample_id}."
                );
                SampleOutcome::Orphaned { job, error }
            }
        }
    }

    /// Create the analysis directory and write the manifest and sbatch script into it
    ///
    /// Both files are replaced if they exist, so staging the same sample twice gives the same
    /// result.
    fn stage(
        &self,
        project_id: &str,
        sample_id: &str,
        pairs: &[FastqPair],
        paths: &SamplePaths,
    ) -> Result<Artifacts, ArtifactError> {
        if !paths.analysis_dir.exists() {
            info!("Creating analysis directory {}", paths.analysis_dir.display());
        }
        fs::create_dir_all(&paths.analysis_dir)
            .map_err(|source| ArtifactError::AnalysisDir { path: paths.analysis_dir.clone(), source })?;

        manifest::write(sample_id, self.options.sex, pairs, &paths.manifest)?;

        let substitutions = Substitutions::new()
            .with(Placeholder::ProjectId, project_id)
            .with(Placeholder::SampleId, sample_id)
            .with(Placeholder::Reference, self.options.genome.to_string());
        self.template.write(&substitutions, &paths.script)?;

        Ok(Artifacts { manifest: paths.manifest.clone(), script: paths.script.clone(), lanes: pairs.len() })
    }

    /// Ledger writes never stop a launch, they're only logged when they fail
    fn record<R>(&self, step: &str, write: impl FnOnce(&Connection) -> rusqlite::Result<R>) -> Option<R> {
        let written = match self.ledger.writable() {
            Ok(Some(conn)) => write(conn).map_err(LedgerError::from),
            Ok(None) => return None,
            Err(err) => Err(err),
        };
        match written {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Can't {step} launch in ledger: {err}");
                None
            }
        }
    }

    /// Orphans from earlier runs, keyed by sample. Only the latest one per sample is kept.
    fn known_orphans(&self, project_id: &str) -> HashMap<String, Orphan> {
        let loaded = match self.ledger.existing() {
            Ok(Some(conn)) => load_orphans(conn, project_id).map_err(LedgerError::from),
            Ok(None) => Ok(Vec::new()),
            Err(err) => Err(err),
        };
        match loaded {
            Ok(orphans) => orphans.into_iter().map(|orphan| (orphan.sample_id.clone(), orphan)).collect(),
            Err(err) => {
                warn!("Can't read orphaned jobs from ledger: {err}");
                HashMap::new()
            }
        }
    }
}
