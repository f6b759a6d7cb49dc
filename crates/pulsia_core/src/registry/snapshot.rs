//! Snapshot loading.
//!
//! # Responsibility
//! - Issue one bulk read of the candidate collection, most recent first.
//! - Validate rows at the boundary and map accepted ones to view models.
//!
//! # Invariants
//! - A failed or timed-out read yields `Err`, never a partial list.
//! - Accepted rows keep the store's order.

use super::error::RegistryError;
use crate::clock::Clock;
use crate::model::candidate::Candidate;
use crate::payload::parse_rows;
use crate::store::CandidateStore;
use crate::view::to_view_model;
use log::{error, info};
use std::time::{Duration, Instant};

/// Result of a successful snapshot read.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub candidates: Vec<Candidate>,
    /// Rows dropped by boundary validation.
    pub rejected: usize,
}

pub struct SnapshotLoader<'a, S: CandidateStore + ?Sized> {
    store: &'a S,
    timeout: Option<Duration>,
}

impl<'a, S: CandidateStore + ?Sized> SnapshotLoader<'a, S> {
    pub fn new(store: &'a S, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    /// Reads and maps the full collection.
    ///
    /// Labels are computed against `clock` once the read has completed.
    pub async fn load(&self, clock: &dyn Clock) -> Result<Snapshot, RegistryError> {
        let started_at = Instant::now();
        info!("event=snapshot_load module=registry status=start");

        let fetched = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.store.fetch_snapshot()).await {
                Ok(result) => result.map_err(|err| RegistryError::load(err.to_string())),
                Err(_) => Err(RegistryError::load(format!(
                    "timed out after {} ms",
                    limit.as_millis()
                ))),
            },
            None => self
                .store
                .fetch_snapshot()
                .await
                .map_err(|err| RegistryError::load(err.to_string())),
        };

        let rows = match fetched {
            Ok(rows) => rows,
            Err(err) => {
                error!(
                    "event=snapshot_load module=registry status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                return Err(err);
            }
        };

        let (records, rejected) = parse_rows(&rows);
        let now = clock.now();
        let candidates: Vec<Candidate> = records
            .into_iter()
            .map(|record| to_view_model(record, now))
            .collect();

        info!(
            "event=snapshot_load module=registry status=ok duration_ms={} count={} rejected={}",
            started_at.elapsed().as_millis(),
            candidates.len(),
            rejected
        );
        Ok(Snapshot {
            candidates,
            rejected,
        })
    }
}
