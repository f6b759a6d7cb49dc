//! Remote candidate store boundary.
//!
//! # Responsibility
//! - Define the two capabilities the registry needs from the authoritative
//!   store: one bulk read and one change subscription.
//! - Carry raw payloads only; validation happens in `crate::payload`.
//!
//! # Invariants
//! - `fetch_snapshot` returns rows ordered by `last_message_time` descending.
//! - A `ChangeFeed` delivers messages for the same id in causal order.

pub mod local;

use crate::payload::RawChange;
use crate::repo::candidate_repo::RepoError;
use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use uuid::Uuid;

pub type SubscriptionId = Uuid;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// Transport, auth or server failure reported by the remote side.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "candidate store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Receiving half of one change subscription.
///
/// The feed ends (`recv` yields `None`) when the store drops the sending half.
#[derive(Debug)]
pub struct ChangeFeed {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<RawChange>,
}

impl ChangeFeed {
    pub fn new(id: SubscriptionId, receiver: mpsc::UnboundedReceiver<RawChange>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next message. Cancel-safe.
    pub async fn recv(&mut self) -> Option<RawChange> {
        self.receiver.recv().await
    }

    /// Takes one already-delivered message without waiting.
    pub fn try_recv(&mut self) -> Result<RawChange, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Stops delivery; messages sent afterwards are refused by the channel.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Reads the full collection, most recent activity first.
    async fn fetch_snapshot(&self) -> StoreResult<Vec<Value>>;

    /// Opens a change subscription scoped to the candidate collection.
    async fn subscribe(&self) -> StoreResult<ChangeFeed>;

    /// Releases a subscription. Unknown ids are ignored.
    async fn unsubscribe(&self, id: SubscriptionId);
}
