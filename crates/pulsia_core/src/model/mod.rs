//! Candidate domain model shared by the registry and store layers.
//!
//! # Responsibility
//! - Define the persisted candidate shape (`CandidateRecord`) as read from the
//!   remote store after boundary validation.
//! - Define the display-ready projection (`Candidate`) owned by the registry.
//! - Define the change notifications delivered by the remote change feed.
//!
//! # Invariants
//! - Every candidate is identified by a stable `CandidateId`.
//! - `Candidate` has no optional fields; defaults are applied when mapping.

pub mod candidate;
pub mod change;
