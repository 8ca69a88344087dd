//! Render submission scripts and hand them to SLURM

/// Literal placeholder substitution of sbatch script templates
pub mod template;

/// Run sbatch and parse the job id it reports
pub mod submit;
