//! Persistence for the local candidate store.
//!
//! # Responsibility
//! - Keep SQL for the `candidates` table behind a use-case shaped trait.
//!
//! # Invariants
//! - Writes validate records before touching SQL.
//! - Reads reject invalid persisted state instead of masking it.

pub mod candidate_repo;
