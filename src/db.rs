//! Local ledger of launch attempts, stored in SQLite
//!
//! Charon stays the source of truth for sample status. The ledger only remembers which SLURM job
//! was submitted for which sample, so jobs whose Charon update failed can be reconciled by hand.

/// Connect to a SQLite database
pub mod open;
pub mod ledger;
pub mod job;
