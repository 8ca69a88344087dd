//! Charon, the NGI sample tracking service
//!
//! Charon is the system of record for a sample's analysis status. Nothing read from it is cached;
//! every run asks again.

/// Samples and their analysis status as Charon reports them
pub mod sample;

/// The tracking service seam and its HTTP implementation
pub mod client;
