//! Fixed filesystem convention of the NGI project area
//!
//! ```text
//! <root>/DATA/<project>/<sample>/<prep>/<run>/*R1*.gz
//! <root>/ANALYSIS/<project>/<workflow>/<sample>/
//! ```

use std::path::PathBuf;

/// Workflow directory used under ANALYSIS when the config doesn't set one
pub static DEFAULT_WORKFLOW: &str = "sarek_ngi";

/// Prefix of rendered submission scripts, `run_germline<sample>.sbatch`
static SCRIPT_PREFIX: &str = "run_germline";

#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub workflow: String,
}

/// Every path a single sample's launch attempt touches
///
/// All of them live in the sample's own analysis directory, so nothing is shared between samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePaths {
    pub analysis_dir: PathBuf,
    pub manifest: PathBuf,
    pub script: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub job_name: String,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>, workflow: impl Into<String>) -> ProjectLayout {
        ProjectLayout { root: root.into(), workflow: workflow.into() }
    }

    pub fn sample_data_dir(&self, project_id: &str, sample_id: &str) -> PathBuf {
        self.root.join("DATA").join(project_id).join(sample_id)
    }

    pub fn workflow_dir(&self, project_id: &str) -> PathBuf {
        self.root.join("ANALYSIS").join(project_id).join(&self.workflow)
    }

    pub fn sample_paths(&self, project_id: &str, sample_id: &str) -> SamplePaths {
        let analysis_dir = self.workflow_dir(project_id).join(sample_id);
        let job_name = format!("{sample_id}_sarek");
        SamplePaths {
            manifest: analysis_dir.join(format!("{sample_id}.tsv")),
            script: analysis_dir.join(format!("{SCRIPT_PREFIX}{sample_id}.sbatch")),
            stdout_log: analysis_dir.join(format!("{job_name}.out")),
            stderr_log: analysis_dir.join(format!("{job_name}.err")),
            job_name,
            analysis_dir,
        }
    }

    /// Default ledger location when the config doesn't name one
    pub fn ledger_path(&self, project_id: &str) -> PathBuf {
        self.workflow_dir(project_id).join("start_sarek.db")
    }
}
