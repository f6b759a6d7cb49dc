//! Observer-facing registry state.

use super::error::RegistryError;
use crate::model::candidate::{Candidate, CandidateId};
use std::sync::Arc;
use tokio::sync::watch;

/// Where the registry is in its activation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not activated, or deactivated.
    Inactive,
    /// Snapshot read in flight; feed events are being buffered.
    Loading,
    /// Snapshot applied and the change feed is open.
    Live,
    /// Feed dropped; reconnect attempts in progress.
    Reconnecting,
    /// Feed unavailable and no further attempts will be made.
    Disconnected,
}

/// Immutable state published after every mutation.
#[derive(Debug, Clone)]
pub struct RegistryState {
    pub candidates: Arc<[Candidate]>,
    pub loading: bool,
    pub phase: SyncPhase,
    /// Most recent failure, cleared once the registry recovers.
    pub error: Option<RegistryError>,
}

impl RegistryState {
    pub(crate) fn inactive() -> Self {
        Self {
            candidates: Arc::from(Vec::new()),
            loading: true,
            phase: SyncPhase::Inactive,
            error: None,
        }
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| &candidate.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .map(|candidate| candidate.id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Read-only handle for registry observers.
#[derive(Debug, Clone)]
pub struct RegistryView {
    receiver: watch::Receiver<RegistryState>,
}

impl RegistryView {
    pub(crate) fn new(receiver: watch::Receiver<RegistryState>) -> Self {
        Self { receiver }
    }

    /// Latest published state.
    pub fn current(&self) -> RegistryState {
        self.receiver.borrow().clone()
    }

    /// Waits for the next publication. `false` once the registry is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Waits until a published state satisfies `predicate`.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&RegistryState) -> bool,
    ) -> Option<RegistryState> {
        self.receiver
            .wait_for(predicate)
            .await
            .ok()
            .map(|state| state.clone())
    }
}
