use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::sync::OnceLock;

use log::info;
use regex::Regex;
use thiserror::Error;

use crate::layout::SamplePaths;

/// SLURM job id parsed from sbatch's acknowledgement
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything sbatch is called with for one sample
///
/// Job-specific configuration lives in the rendered script itself; only the job name and log
/// locations are passed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    pub script: PathBuf,
    pub name: String,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
}

impl From<&SamplePaths> for JobSubmission {
    fn from(paths: &SamplePaths) -> JobSubmission {
        JobSubmission {
            script: paths.script.clone(),
            name: paths.job_name.clone(),
            stdout_log: paths.stdout_log.clone(),
            stderr_log: paths.stderr_log.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The scheduler process couldn't be started at all
    #[error("can't run scheduler {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    /// sbatch ran and refused the job
    #[error("sbatch rejected {} ({status}): stdout={stdout:?} stderr={stderr:?}", .script.display())]
    Rejected {
        script: PathBuf,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    /// sbatch exited cleanly but didn't report a job id
    #[error("could not submit sbatch file {}, no job id in output: stdout={stdout:?} stderr={stderr:?}", .script.display())]
    MalformedAck {
        script: PathBuf,
        stdout: String,
        stderr: String,
    },
}

/// Something that can queue a rendered job script
pub trait Scheduler {
    fn submit(&self, job: &JobSubmission) -> Result<JobId, SubmitError>;
}

/// Submits jobs by running the `sbatch` binary synchronously
#[derive(Debug, Clone)]
pub struct Sbatch {
    program: PathBuf,
}

impl Sbatch {
    pub fn new(program: impl Into<PathBuf>) -> Sbatch {
        Sbatch { program: program.into() }
    }

    fn command(&self, job: &JobSubmission) -> Command {
        let mut sbatch = Command::new(&self.program);
        sbatch
            .arg("-J")
            .arg(&job.name)
            .arg("-e")
            .arg(&job.stderr_log)
            .arg("-o")
            .arg(&job.stdout_log)
            .arg(&job.script);
        sbatch
    }
}

impl Scheduler for Sbatch {
    fn submit(&self, job: &JobSubmission) -> Result<JobId, SubmitError> {
        let mut cmd = self.command(job);
        info!("Running sbatch process ");
        info!("{:?}", &cmd);
        let output = cmd
            .output()
            .map_err(|source| SubmitError::Launch { program: self.program.clone(), source })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(SubmitError::Rejected { script: job.script.clone(), status: output.status, stdout, stderr });
        }

        parse_job_id(&stdout).ok_or_else(|| SubmitError::MalformedAck { script: job.script.clone(), stdout, stderr })
    }
}

/// Extract the id from `Submitted batch job <id>`
pub fn parse_job_id(stdout: &str) -> Option<JobId> {
    static ACK: OnceLock<Regex> = OnceLock::new();
    let re = ACK.get_or_init(|| Regex::new(r"(?m)^Submitted batch job (\d+)").expect("valid sbatch regex"));
    let id = re.captures(stdout)?.get(1)?.as_str();
    id.parse().ok().map(JobId)
}
