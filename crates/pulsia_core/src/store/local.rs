//! SQLite-backed candidate store with in-process change broadcast.
//!
//! # Responsibility
//! - Serve snapshot reads from the local `candidates` table.
//! - Persist writes through the repository and fan each committed change out
//!   to every live subscriber, mirroring the managed service's realtime feed.
//!
//! # Invariants
//! - A change is broadcast only after its write succeeded.
//! - Broadcast happens under the connection lock, so subscribers see changes
//!   in commit order.
//! - Subscribers whose receiving half is gone are pruned on broadcast.

use super::{CandidateStore, ChangeFeed, StoreError, StoreResult, SubscriptionId};
use crate::db::{open_db, open_db_in_memory};
use crate::model::candidate::{CandidateId, CandidateRecord};
use crate::payload::{encode_record, RawChange};
use crate::repo::candidate_repo::{
    CandidateListQuery, CandidateRepository, RepoResult, SqliteCandidateRepository,
};
use async_trait::async_trait;
use log::{debug, info, warn};
use rusqlite::Connection;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use uuid::Uuid;

type Subscribers = BTreeMap<SubscriptionId, mpsc::UnboundedSender<RawChange>>;

pub struct LocalCandidateStore {
    conn: Mutex<Connection>,
    subscribers: Mutex<Subscribers>,
}

impl LocalCandidateStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path).map_err(|err| StoreError::Repo(err.into()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(|err| StoreError::Repo(err.into()))?;
        Ok(Self::from_connection(conn))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            subscribers: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn insert_candidate(&self, record: &CandidateRecord) -> StoreResult<()> {
        self.write("insert", &record.id, |repo| {
            repo.insert_candidate(record).map(|()| RawChange::insert(record))
        })
    }

    pub fn update_candidate(&self, record: &CandidateRecord) -> StoreResult<()> {
        self.write("update", &record.id, |repo| {
            repo.update_candidate(record).map(|()| RawChange::update(record))
        })
    }

    pub fn delete_candidate(&self, id: &CandidateId) -> StoreResult<()> {
        self.write("delete", id, |repo| {
            repo.delete_candidate(id).map(|()| RawChange::delete(id))
        })
    }

    pub fn get_candidate(&self, id: &CandidateId) -> StoreResult<Option<CandidateRecord>> {
        let conn = self.lock_conn()?;
        Ok(SqliteCandidateRepository::new(&conn).get_candidate(id)?)
    }

    /// Inserts many records; stops at the first failure.
    pub fn seed(&self, records: &[CandidateRecord]) -> StoreResult<usize> {
        for record in records {
            self.insert_candidate(record)?;
        }
        Ok(records.len())
    }

    /// Live subscriptions (after pruning closed ones).
    pub fn subscriber_count(&self) -> usize {
        match self.lock_subscribers() {
            Ok(mut subscribers) => {
                subscribers.retain(|_, sender| !sender.is_closed());
                subscribers.len()
            }
            Err(_) => 0,
        }
    }

    /// Drops every subscriber's sending half, ending their feeds.
    ///
    /// Models the remote channel going away (network loss, server restart).
    pub fn disconnect_subscribers(&self) -> usize {
        match self.lock_subscribers() {
            Ok(mut subscribers) => {
                let dropped = subscribers.len();
                subscribers.clear();
                warn!(
                    "event=feed_disconnect module=store status=ok dropped={}",
                    dropped
                );
                dropped
            }
            Err(_) => 0,
        }
    }

    fn write(
        &self,
        op: &'static str,
        id: &CandidateId,
        apply: impl FnOnce(&SqliteCandidateRepository<'_>) -> RepoResult<RawChange>,
    ) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        match apply(&SqliteCandidateRepository::new(&conn)) {
            Ok(change) => {
                debug!(
                    "event=store_write module=store status=ok op={} candidate_id={}",
                    op, id
                );
                // `conn` stays locked until the change is queued.
                self.broadcast(change);
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=store_write module=store status=error op={} candidate_id={} error={}",
                    op, id, err
                );
                Err(err.into())
            }
        }
    }

    fn broadcast(&self, change: RawChange) {
        let Ok(mut subscribers) = self.lock_subscribers() else {
            return;
        };
        subscribers.retain(|_, sender| sender.send(change.clone()).is_ok());
    }

    fn lock_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    fn lock_subscribers(&self) -> StoreResult<MutexGuard<'_, Subscribers>> {
        self.subscribers
            .lock()
            .map_err(|_| StoreError::Unavailable("subscriber lock poisoned".to_string()))
    }
}

#[async_trait]
impl CandidateStore for LocalCandidateStore {
    async fn fetch_snapshot(&self) -> StoreResult<Vec<Value>> {
        let conn = self.lock_conn()?;
        let records =
            SqliteCandidateRepository::new(&conn).list_recent(&CandidateListQuery::default())?;
        Ok(records.iter().map(encode_record).collect())
    }

    async fn subscribe(&self) -> StoreResult<ChangeFeed> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.lock_subscribers()?.insert(id, sender);
        info!(
            "event=feed_subscribe module=store status=ok subscription_id={}",
            id
        );
        Ok(ChangeFeed::new(id, receiver))
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut subscribers) = self.lock_subscribers() {
            if subscribers.remove(&id).is_some() {
                info!(
                    "event=feed_unsubscribe module=store status=ok subscription_id={}",
                    id
                );
            }
        }
    }
}
