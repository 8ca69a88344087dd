use std::fmt;

use log::{error, info, warn};

use crate::launch::outcome::SampleOutcome;

#[derive(Debug)]
pub struct SampleReport {
    pub sample_id: String,
    pub outcome: SampleOutcome,
}

/// Every sample's outcome for one run, in processing order
#[derive(Debug)]
pub struct RunSummary {
    pub project_id: String,
    pub samples: Vec<SampleReport>,
}

impl RunSummary {
    pub fn new(project_id: &str) -> RunSummary {
        RunSummary { project_id: project_id.to_string(), samples: Vec::new() }
    }

    pub fn push(&mut self, sample_id: &str, outcome: SampleOutcome) {
        self.samples.push(SampleReport { sample_id: sample_id.to_string(), outcome });
    }

    pub fn outcome(&self, sample_id: &str) -> Option<&SampleOutcome> {
        self.samples
            .iter()
            .find(|report| report.sample_id == sample_id)
            .map(|report| &report.outcome)
    }

    fn count(&self, label: &str) -> usize {
        self.samples.iter().filter(|report| report.outcome.label() == label).count()
    }

    pub fn has_failures(&self) -> bool {
        self.samples.iter().any(|report| report.outcome.is_failure())
    }

    /// 0 when nothing failed, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        match self.has_failures() {
            true => 1,
            false => 0,
        }
    }

    /// Log one line per sample at a level matching its outcome
    pub fn log(&self) {
        for report in &self.samples {
            let line = format!("{} {}: {}", report.sample_id, report.outcome.label(), report.outcome);
            match &report.outcome {
                SampleOutcome::Failed(_) | SampleOutcome::Orphaned { .. } => error!("{line}"),
                SampleOutcome::NotAttempted => warn!("{line}"),
                _ => info!("{line}"),
            }
        }
        info!("{}", self.totals());
    }

    fn totals(&self) -> String {
        let labels = ["submitted", "staged", "skipped", "failed", "orphaned", "not attempted"];
        let counts: Vec<String> = labels
            .iter()
            .map(|label| format!("{} {label}", self.count(label)))
            .collect();
        format!("Project {}: {}", self.project_id, counts.join(", "))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.totals())?;
        let width = self.samples.iter().map(|r| r.sample_id.len()).max().unwrap_or(0);
        for report in &self.samples {
            writeln!(
                f,
                "  {:width$}  {:13}  {}",
                report.sample_id,
                report.outcome.label(),
                report.outcome,
                width = width
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::launch::outcome::{Artifacts, SkipReason};
    use crate::slurm::submit::JobId;

    fn artifacts() -> Artifacts {
        Artifacts { manifest: PathBuf::from("S1.tsv"), script: PathBuf::from("run_germlineS1.sbatch"), lanes: 2 }
    }

    #[test]
    fn skips_alone_exit_cleanly() {
        let mut summary = RunSummary::new("P0001");
        summary.push("S1", SampleOutcome::Submitted { job: JobId(1), artifacts: artifacts(), replaces: None });
        summary.push("S2", SampleOutcome::Skipped(SkipReason::NoFastq));

        assert!(!summary.has_failures());
        assert_eq!(summary.exit_code(), 0);
        assert!(matches!(summary.outcome("S2"), Some(SampleOutcome::Skipped(SkipReason::NoFastq))));
        assert!(summary.outcome("S9").is_none());
    }

    #[test]
    fn report_lists_every_sample() {
        let mut summary = RunSummary::new("P0001");
        summary.push("S1", SampleOutcome::Staged(artifacts()));
        summary.push("S22", SampleOutcome::NotAttempted);

        let report = summary.to_string();

        assert!(report.starts_with("Project P0001: 0 submitted, 1 staged, 0 skipped, 0 failed, 0 orphaned, 1 not attempted\n"));
        assert!(report.contains("  S1   staged"));
        assert!(report.contains("  S22  not attempted"));
        assert_eq!(summary.exit_code(), 0);
    }
}
