/// Progress of a launch attempt.
///
/// Staged: manifest and sbatch script written. Submitted: sbatch returned a job id. Tracked:
/// Charon accepted the UNDER_ANALYSIS update. A row that is submitted but not tracked is an
/// orphaned job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Staged,
    Submitted,
    Tracked,
}

impl JobState {
    /// each state is a 0/1 column in the launch table
    pub fn column(&self) -> &'static str {
        match self {
            JobState::Staged => "staged",
            JobState::Submitted => "submitted",
            JobState::Tracked => "tracked",
        }
    }
}
