//! Launch Sarek germline analyses on SLURM for samples tracked in Charon

/// Charon sample tracking client
pub mod charon;
pub mod config;
/// Launch ledger
pub mod db;
pub mod fastq;
pub mod launch;
pub mod layout;
pub mod manifest;
pub mod reference;
/// Job script templates and sbatch submission
pub mod slurm;
