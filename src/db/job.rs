//! Launch attempt bookkeeping
//!
//! A row is inserted once a sample's files are staged (manifest and script written to disk) and
//! updated when sbatch accepts the job and again when Charon confirms the new status.

pub mod load;
pub mod update;
pub mod state;

/// One launch attempt of one sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub id: i64,
    pub project_id: String,
    pub sample_id: String,
}
